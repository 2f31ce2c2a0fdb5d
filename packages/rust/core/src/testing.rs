//! In-memory toolkit double for pipeline tests.
//!
//! Models the mapset as named cell vectors so tests can observe what a
//! scenario run wrote, removed, and stamped without a GRASS
//! installation. Operations can be told to fail by name.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use runoff_shared::{Result, RunoffError};
use runoff_toolkit::{
    CopyColorsArgs, SimWaterArgs, SlopeAspectArgs, ThresholdMaskArgs, Toolkit, WriteHistoryArgs,
};

#[derive(Default)]
struct MockState {
    rasters: HashMap<String, Vec<Option<f64>>>,
    colors: HashMap<String, String>,
    history: HashMap<String, Vec<String>>,
    calls: Vec<String>,
    removed: Vec<String>,
    fail_ops: HashSet<String>,
}

/// Recording, in-memory [`Toolkit`] implementation.
pub struct MockToolkit {
    state: Mutex<MockState>,
    /// Depth cells the fake simulation writes before the seed sentinel.
    sim_template: Vec<Option<f64>>,
}

impl MockToolkit {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            sim_template: vec![Some(0.05), Some(0.005), Some(0.02), Some(0.01)],
        }
    }

    /// Pre-populate a raster, e.g. the input elevation.
    pub fn seed_raster(&self, name: &str, cells: &[Option<f64>]) {
        self.state
            .lock()
            .expect("lock")
            .rasters
            .insert(name.to_string(), cells.to_vec());
    }

    /// Make the named operation fail with a tool error.
    pub fn fail_on(&self, operation: &str) {
        self.state
            .lock()
            .expect("lock")
            .fail_ops
            .insert(operation.to_string());
    }

    pub fn raster(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.state.lock().expect("lock").rasters.get(name).cloned()
    }

    pub fn raster_names(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("lock")
            .rasters
            .keys()
            .cloned()
            .collect()
    }

    pub fn color_source(&self, name: &str) -> Option<String> {
        self.state.lock().expect("lock").colors.get(name).cloned()
    }

    pub fn history(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .expect("lock")
            .history
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// External operations invoked, in order (removals included).
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("lock").calls.clone()
    }

    /// Raster names removed, in removal order.
    pub fn removed(&self) -> Vec<String> {
        self.state.lock().expect("lock").removed.clone()
    }

    fn begin(&self, operation: &str) -> Result<std::sync::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(operation.to_string());
        if state.fail_ops.contains(operation) {
            return Err(RunoffError::tool(
                operation,
                Some(1),
                "simulated toolkit failure",
            ));
        }
        Ok(state)
    }
}

impl Default for MockToolkit {
    fn default() -> Self {
        Self::new()
    }
}

fn require_raster(state: &MockState, operation: &str, name: &str) -> Result<()> {
    if !state.rasters.contains_key(name) {
        return Err(RunoffError::tool(
            operation,
            Some(1),
            format!("raster `{name}` not found"),
        ));
    }
    Ok(())
}

impl Toolkit for MockToolkit {
    fn slope_aspect(&self, args: &SlopeAspectArgs) -> Result<()> {
        args.validate()?;
        let mut state = self.begin("r.slope.aspect")?;
        require_raster(&state, "r.slope.aspect", &args.elevation)?;
        state.rasters.insert(args.dx.clone(), vec![Some(1.0)]);
        state.rasters.insert(args.dy.clone(), vec![Some(1.0)]);
        Ok(())
    }

    fn sim_water(&self, args: &SimWaterArgs) -> Result<()> {
        args.validate()?;
        let mut state = self.begin("r.sim_water")?;
        require_raster(&state, "r.sim_water", &args.elevation)?;
        require_raster(&state, "r.sim_water", &args.dx)?;
        require_raster(&state, "r.sim_water", &args.dy)?;

        let mut cells = self.sim_template.clone();
        // A fixed seed reproduces the run bit-for-bit; without one the
        // call counter stands in for simulation randomness.
        match args.random_seed {
            Some(seed) => cells.push(Some(seed as f64)),
            None => cells.push(Some(state.calls.len() as f64)),
        }
        state.rasters.insert(args.depth.clone(), cells);
        Ok(())
    }

    fn threshold_mask(&self, args: &ThresholdMaskArgs) -> Result<()> {
        args.validate()?;
        let mut state = self.begin("r.mapcalc")?;
        require_raster(&state, "r.mapcalc", &args.source)?;

        let masked: Vec<Option<f64>> = state.rasters[&args.source]
            .iter()
            .copied()
            .map(|cell| cell.filter(|v| *v >= args.min_depth))
            .collect();
        state.rasters.insert(args.destination.clone(), masked);
        Ok(())
    }

    fn copy_colors(&self, args: &CopyColorsArgs) -> Result<()> {
        args.validate()?;
        let mut state = self.begin("r.colors")?;
        require_raster(&state, "r.colors", &args.raster)?;
        state.colors.insert(args.map.clone(), args.raster.clone());
        Ok(())
    }

    fn remove_raster(&self, name: &str) -> Result<()> {
        let mut state = self.begin("g.remove")?;
        // Forced removal of a never-written name succeeds quietly.
        state.rasters.remove(name);
        state.removed.push(name.to_string());
        Ok(())
    }

    fn write_history(&self, args: &WriteHistoryArgs) -> Result<()> {
        args.validate()?;
        let mut state = self.begin("r.support")?;
        require_raster(&state, "r.support", &args.map)?;
        state
            .history
            .entry(args.map.clone())
            .or_default()
            .push(args.history.clone());
        Ok(())
    }
}
