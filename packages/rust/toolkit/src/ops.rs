//! Operation surface of the external toolkit.
//!
//! Each operation the pipeline needs is a trait method with a typed
//! argument struct. Argument validation happens here, before dispatch,
//! so a missing raster name is reported by name instead of surfacing
//! later as an opaque external-process failure.

use runoff_shared::{Result, RunoffError};

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// Injected capability for invoking external toolkit operations.
///
/// All side effects land in the toolkit's active mapset and are visible
/// to later invocations reading the same raster names.
pub trait Toolkit: Send + Sync {
    /// Derive the partial derivatives (dx/dy) of an elevation raster.
    fn slope_aspect(&self, args: &SlopeAspectArgs) -> Result<()>;

    /// Run the overland flow simulation, writing a water depth raster.
    fn sim_water(&self, args: &SimWaterArgs) -> Result<()>;

    /// Write `destination` keeping every `source` cell at or above
    /// `min_depth` unchanged and nulling the rest.
    fn threshold_mask(&self, args: &ThresholdMaskArgs) -> Result<()>;

    /// Copy the color table of one raster onto another.
    fn copy_colors(&self, args: &CopyColorsArgs) -> Result<()>;

    /// Remove a raster from the active mapset. Removing a name that was
    /// never written must succeed.
    fn remove_raster(&self, name: &str) -> Result<()>;

    /// Append a history line to a raster's metadata.
    fn write_history(&self, args: &WriteHistoryArgs) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Argument structs
// ---------------------------------------------------------------------------

/// Arguments for gradient derivation (`r.slope.aspect`).
#[derive(Debug, Clone)]
pub struct SlopeAspectArgs {
    /// Input elevation raster.
    pub elevation: String,
    /// Output raster for the x partial derivative.
    pub dx: String,
    /// Output raster for the y partial derivative.
    pub dy: String,
}

impl SlopeAspectArgs {
    /// Check that every required raster name is present.
    pub fn validate(&self) -> Result<()> {
        require("elevation", &self.elevation)?;
        require("dx", &self.dx)?;
        require("dy", &self.dy)
    }
}

/// Arguments for the overland flow simulation (`r.sim_water`).
#[derive(Debug, Clone)]
pub struct SimWaterArgs {
    /// Input elevation raster.
    pub elevation: String,
    /// x partial derivative raster.
    pub dx: String,
    /// y partial derivative raster.
    pub dy: String,
    /// Uniform rainfall rate (mm/hr).
    pub rain_value: f64,
    /// Output water depth raster.
    pub depth: String,
    /// Worker count for the simulation.
    pub nprocs: u32,
    /// Random seed; `None` lets the simulation pick its own.
    pub random_seed: Option<i64>,
}

impl SimWaterArgs {
    /// Check that every required argument is present.
    pub fn validate(&self) -> Result<()> {
        require("elevation", &self.elevation)?;
        require("dx", &self.dx)?;
        require("dy", &self.dy)?;
        require("depth", &self.depth)
    }
}

/// Arguments for the depth threshold mask (`r.mapcalc`).
#[derive(Debug, Clone)]
pub struct ThresholdMaskArgs {
    /// Input depth raster.
    pub source: String,
    /// Output raster receiving the masked depths.
    pub destination: String,
    /// Cells below this depth (m) become null.
    pub min_depth: f64,
}

impl ThresholdMaskArgs {
    /// Check that both raster names are present.
    pub fn validate(&self) -> Result<()> {
        require("source", &self.source)?;
        require("destination", &self.destination)
    }

    /// Map algebra expression implementing the mask. Surviving cells
    /// keep their exact source value.
    pub fn expression(&self) -> String {
        format!(
            "{dest} = if({src} >= {min}, {src}, null())",
            dest = self.destination,
            src = self.source,
            min = self.min_depth,
        )
    }
}

/// Arguments for copying a color table (`r.colors`).
#[derive(Debug, Clone)]
pub struct CopyColorsArgs {
    /// Raster whose colors are rewritten.
    pub map: String,
    /// Raster to take the color table from.
    pub raster: String,
}

impl CopyColorsArgs {
    /// Check that both raster names are present.
    pub fn validate(&self) -> Result<()> {
        require("map", &self.map)?;
        require("raster", &self.raster)
    }
}

/// Arguments for a raster history write (`r.support`).
#[derive(Debug, Clone)]
pub struct WriteHistoryArgs {
    /// Raster whose history is appended to.
    pub map: String,
    /// History line to record.
    pub history: String,
}

impl WriteHistoryArgs {
    /// Check that the target raster name is present.
    pub fn validate(&self) -> Result<()> {
        require("map", &self.map)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RunoffError::invalid_argument(format!(
            "missing required raster name `{field}`"
        )));
    }
    Ok(())
}
