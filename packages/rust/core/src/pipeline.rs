//! End-to-end scenario pipeline: gradients → simulation → filter → stamp.
//!
//! One run owns its scratch names and cleanup registry, so independent
//! runs can execute concurrently against a shared mapset. Teardown runs
//! on every path; removal and stamping failures surface as warnings,
//! never as run failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use runoff_shared::{
    PROVENANCE_SCHEMA_VERSION, ProvenanceRecord, RasterHandle, Result, RunId, RunoffError,
};
use runoff_toolkit::{SimWaterArgs, SlopeAspectArgs, Toolkit, WriteHistoryArgs};

use crate::cleanup::CleanupRegistry;
use crate::filter;
use crate::names::NameAllocator;

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// Parameters for one overland flow scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioRequest {
    /// Input elevation raster.
    pub elevation: String,
    /// Name of the output depth raster.
    pub output: String,
    /// Uniform rainfall rate (mm/hr).
    pub rainfall_rate: f64,
    /// Worker count handed to the simulation.
    pub nprocs: u32,
    /// Random seed; `None` lets the simulation pick its own.
    pub seed: Option<i64>,
    /// Keep only depths at or above `min_depth` in the output.
    pub filter_depths: bool,
    /// Minimum retained depth (m); used only when `filter_depths` is set.
    pub min_depth: f64,
}

impl ScenarioRequest {
    /// Validate every field before any external tool runs.
    fn validate(&self) -> Result<()> {
        if self.elevation.is_empty() {
            return Err(RunoffError::invalid_argument("elevation raster is required"));
        }
        if self.output.is_empty() {
            return Err(RunoffError::invalid_argument("output raster name is required"));
        }
        if !self.rainfall_rate.is_finite() || self.rainfall_rate <= 0.0 {
            return Err(RunoffError::invalid_argument(format!(
                "rainfall_rate must be a positive number, got {}",
                self.rainfall_rate
            )));
        }
        if self.nprocs < 1 {
            return Err(RunoffError::invalid_argument(format!(
                "nprocs must be at least 1, got {}",
                self.nprocs
            )));
        }
        if self.filter_depths && (!self.min_depth.is_finite() || self.min_depth < 0.0) {
            return Err(RunoffError::invalid_argument(format!(
                "min_depth must be zero or greater, got {}",
                self.min_depth
            )));
        }
        Ok(())
    }
}

/// Terminal state of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    Success,
    Failed,
}

/// Result of a scenario run.
///
/// Warnings (failed removals, failed provenance stamps) travel in their
/// own channel and never turn a successful run into a failed one.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Terminal state of the run.
    pub status: ScenarioStatus,
    /// Output depth raster, present on success.
    pub output: Option<RasterHandle>,
    /// Non-fatal problems encountered during the run.
    pub warnings: Vec<String>,
    /// What failed, when `status` is `Failed`.
    pub error: Option<RunoffError>,
    /// Run identifier, also recorded in the provenance stamp.
    pub run_id: RunId,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl ScenarioOutcome {
    /// Whether the run produced its output.
    pub fn is_success(&self) -> bool {
        self.status == ScenarioStatus::Success
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &ScenarioOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &ScenarioOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drives one scenario run against an injected toolkit capability.
pub struct ScenarioPipeline {
    tools: Arc<dyn Toolkit>,
    tool_version: String,
}

impl ScenarioPipeline {
    /// Create a pipeline bound to a toolkit capability.
    pub fn new(tools: Arc<dyn Toolkit>, tool_version: impl Into<String>) -> Self {
        Self {
            tools,
            tool_version: tool_version.into(),
        }
    }

    /// Run the full scenario.
    ///
    /// 1. Validate the request (no side effects on failure)
    /// 2. Derive elevation gradients into scratch rasters
    /// 3. Simulate overland flow
    /// 4. Filter shallow depths (if requested)
    /// 5. Stamp provenance into the output's history
    /// 6. Remove every scratch raster, success or not
    #[instrument(skip_all, fields(elevation = %request.elevation, output = %request.output))]
    pub fn run(&self, request: &ScenarioRequest, progress: &dyn ProgressReporter) -> ScenarioOutcome {
        let start = Instant::now();
        let run_id = RunId::new();

        info!(%run_id, "starting scenario run");

        let mut warnings = Vec::new();

        if let Err(e) = request.validate() {
            let outcome = self.finish(run_id, Err(e), warnings, start);
            progress.done(&outcome);
            return outcome;
        }

        let mut cleanup = CleanupRegistry::new();
        let result = self.execute(request, &run_id, &mut cleanup, &mut warnings, progress);

        // Teardown runs exactly once, on every path.
        warnings.extend(cleanup.run_all());

        let outcome = self.finish(run_id, result, warnings, start);
        progress.done(&outcome);
        outcome
    }

    /// The pipeline body. Every scratch raster is registered for cleanup
    /// before the tool that populates it runs.
    fn execute(
        &self,
        request: &ScenarioRequest,
        run_id: &RunId,
        cleanup: &mut CleanupRegistry,
        warnings: &mut Vec<String>,
        progress: &dyn ProgressReporter,
    ) -> Result<RasterHandle> {
        let mut names = NameAllocator::new();

        let dx = self.scratch(&mut names, cleanup, "dx")?;
        let dy = self.scratch(&mut names, cleanup, "dy")?;

        progress.phase("Deriving elevation gradients");
        self.tools.slope_aspect(&SlopeAspectArgs {
            elevation: request.elevation.clone(),
            dx: dx.name.clone(),
            dy: dy.name.clone(),
        })?;

        // With filtering the simulation writes to a scratch depth raster;
        // otherwise straight to the requested output.
        let depth = if request.filter_depths {
            self.scratch(&mut names, cleanup, "depth")?
        } else {
            RasterHandle::persistent(&request.output)
        };

        debug!(
            nprocs = request.nprocs,
            seed = ?request.seed,
            "running simulation"
        );
        progress.phase("Simulating overland flow");
        self.tools.sim_water(&SimWaterArgs {
            elevation: request.elevation.clone(),
            dx: dx.name.clone(),
            dy: dy.name.clone(),
            rain_value: request.rainfall_rate,
            depth: depth.name.clone(),
            nprocs: request.nprocs,
            random_seed: request.seed,
        })?;

        let output = if request.filter_depths {
            progress.phase("Filtering shallow depths");
            filter::limit_depths(self.tools.as_ref(), &depth, request.min_depth, &request.output)?
        } else {
            depth
        };

        progress.phase("Recording provenance");
        if let Err(e) = self.stamp(request, run_id, &output) {
            warn!(error = %e, "provenance stamp failed");
            warnings.push(format!("failed to stamp provenance on `{output}`: {e}"));
        }

        Ok(output)
    }

    /// Mint a scratch raster name and register its removal before
    /// anything writes to it.
    fn scratch(
        &self,
        names: &mut NameAllocator,
        cleanup: &mut CleanupRegistry,
        prefix: &str,
    ) -> Result<RasterHandle> {
        let name = names.generate(prefix)?;
        let tools = Arc::clone(&self.tools);
        let raster = name.clone();
        cleanup.register(name.as_str(), move || tools.remove_raster(&raster));
        Ok(RasterHandle::ephemeral(name))
    }

    /// Record the request parameters into the output raster's history.
    fn stamp(&self, request: &ScenarioRequest, run_id: &RunId, output: &RasterHandle) -> Result<()> {
        let record = ProvenanceRecord {
            schema_version: PROVENANCE_SCHEMA_VERSION,
            run_id: run_id.clone(),
            tool_version: self.tool_version.clone(),
            elevation: request.elevation.clone(),
            rainfall_rate: request.rainfall_rate,
            nprocs: request.nprocs,
            seed: request.seed,
            min_depth: request.filter_depths.then_some(request.min_depth),
            finished_at: Utc::now(),
        };

        self.tools.write_history(&WriteHistoryArgs {
            map: output.name.clone(),
            history: record.to_history_line(),
        })
    }

    fn finish(
        &self,
        run_id: RunId,
        result: Result<RasterHandle>,
        warnings: Vec<String>,
        start: Instant,
    ) -> ScenarioOutcome {
        let elapsed = start.elapsed();
        let outcome = match result {
            Ok(output) => ScenarioOutcome {
                status: ScenarioStatus::Success,
                output: Some(output),
                warnings,
                error: None,
                run_id,
                elapsed,
            },
            Err(e) => ScenarioOutcome {
                status: ScenarioStatus::Failed,
                output: None,
                warnings,
                error: Some(e),
                run_id,
                elapsed,
            },
        };

        info!(
            run_id = %outcome.run_id,
            status = ?outcome.status,
            warnings = outcome.warnings.len(),
            elapsed_ms = outcome.elapsed.as_millis(),
            "scenario run finished"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::MockToolkit;

    fn pipeline(tools: &Arc<MockToolkit>) -> ScenarioPipeline {
        ScenarioPipeline::new(Arc::clone(tools) as Arc<dyn Toolkit>, "0.1.0-test")
    }

    fn seeded_tools() -> Arc<MockToolkit> {
        let tools = Arc::new(MockToolkit::new());
        tools.seed_raster("elevation", &[Some(120.0), Some(121.5)]);
        tools
    }

    fn request() -> ScenarioRequest {
        ScenarioRequest {
            elevation: "elevation".into(),
            output: "depth_out".into(),
            rainfall_rate: 10.0,
            nprocs: 30,
            seed: Some(42),
            filter_depths: false,
            min_depth: 0.01,
        }
    }

    #[test]
    fn invalid_rainfall_fails_fast_with_no_invocations() {
        let tools = seeded_tools();
        let outcome = pipeline(&tools).run(
            &ScenarioRequest {
                rainfall_rate: 0.0,
                ..request()
            },
            &SilentProgress,
        );

        assert_eq!(outcome.status, ScenarioStatus::Failed);
        assert!(matches!(
            outcome.error,
            Some(RunoffError::InvalidArgument { .. })
        ));
        assert!(tools.calls().is_empty(), "no tool may run on a bad request");
    }

    #[test]
    fn zero_nprocs_fails_fast_with_no_invocations() {
        let tools = seeded_tools();
        let outcome = pipeline(&tools).run(
            &ScenarioRequest {
                nprocs: 0,
                ..request()
            },
            &SilentProgress,
        );

        assert_eq!(outcome.status, ScenarioStatus::Failed);
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn negative_min_depth_is_rejected_only_when_filtering() {
        let tools = seeded_tools();
        let accepted = pipeline(&tools).run(
            &ScenarioRequest {
                min_depth: -1.0,
                filter_depths: false,
                ..request()
            },
            &SilentProgress,
        );
        assert!(accepted.is_success());

        let rejected = pipeline(&tools).run(
            &ScenarioRequest {
                min_depth: -1.0,
                filter_depths: true,
                ..request()
            },
            &SilentProgress,
        );
        assert_eq!(rejected.status, ScenarioStatus::Failed);
    }

    #[test]
    fn unfiltered_run_writes_output_and_removes_scratch() {
        let tools = seeded_tools();
        let outcome = pipeline(&tools).run(&request(), &SilentProgress);

        assert!(outcome.is_success());
        assert!(outcome.warnings.is_empty());
        let output = outcome.output.expect("output handle");
        assert_eq!(output.name, "depth_out");
        assert!(tools.raster("depth_out").is_some());

        // Both gradient rasters were removed, and nothing scratch-named
        // survives in the mapset.
        let removed = tools.removed();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().any(|n| n.starts_with("dx_")));
        assert!(removed.iter().any(|n| n.starts_with("dy_")));
        assert!(
            tools
                .raster_names()
                .iter()
                .all(|n| !n.starts_with("dx_") && !n.starts_with("dy_"))
        );

        assert_eq!(
            tools.calls(),
            vec![
                "r.slope.aspect",
                "r.sim_water",
                "r.support",
                "g.remove",
                "g.remove",
            ]
        );

        let history = tools.history("depth_out");
        assert_eq!(history.len(), 1);
        assert!(history[0].contains("rainfall_rate"));
        assert!(history[0].contains(&outcome.run_id.to_string()));
    }

    #[test]
    fn filtered_run_masks_shallow_cells() {
        let tools = seeded_tools();
        let outcome = pipeline(&tools).run(
            &ScenarioRequest {
                filter_depths: true,
                min_depth: 0.01,
                seed: Some(1),
                ..request()
            },
            &SilentProgress,
        );

        assert!(outcome.is_success());
        // Template depths [0.05, 0.005, 0.02, 0.01] plus the seed cell:
        // everything below 0.01 is nulled, survivors keep exact values.
        assert_eq!(
            tools.raster("depth_out"),
            Some(vec![Some(0.05), None, Some(0.02), Some(0.01), Some(1.0)])
        );

        // The scratch depth raster is gone and the output kept its legend.
        let removed = tools.removed();
        assert_eq!(removed.len(), 3);
        assert!(removed.iter().any(|n| n.starts_with("depth_") && n != "depth_out"));
        assert!(
            tools
                .color_source("depth_out")
                .expect("colors copied")
                .starts_with("depth_")
        );
    }

    #[test]
    fn simulate_failure_still_removes_gradients_once() {
        let tools = seeded_tools();
        tools.fail_on("r.sim_water");

        let outcome = pipeline(&tools).run(&request(), &SilentProgress);

        assert_eq!(outcome.status, ScenarioStatus::Failed);
        match outcome.error {
            Some(RunoffError::Tool { ref operation, .. }) => {
                assert_eq!(operation, "r.sim_water");
            }
            ref other => panic!("expected Tool error, got {other:?}"),
        }

        // Exactly one removal per gradient raster, no stamping, no filter.
        let removed = tools.removed();
        assert_eq!(removed.len(), 2);
        assert_eq!(removed.iter().collect::<HashSet<_>>().len(), 2);
        assert!(!tools.calls().contains(&"r.support".to_string()));
        assert!(!tools.calls().contains(&"r.mapcalc".to_string()));
    }

    #[test]
    fn derive_failure_aborts_before_simulation() {
        let tools = seeded_tools();
        tools.fail_on("r.slope.aspect");

        let outcome = pipeline(&tools).run(&request(), &SilentProgress);

        assert_eq!(outcome.status, ScenarioStatus::Failed);
        assert!(!tools.calls().contains(&"r.sim_water".to_string()));
        assert_eq!(tools.removed().len(), 2);
    }

    #[test]
    fn stamp_failure_is_a_warning_not_a_failure() {
        let tools = seeded_tools();
        tools.fail_on("r.support");

        let outcome = pipeline(&tools).run(&request(), &SilentProgress);

        assert!(outcome.is_success());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("provenance"));
        assert!(outcome.output.is_some());
    }

    #[test]
    fn cleanup_failure_is_a_warning_not_a_failure() {
        let tools = seeded_tools();
        tools.fail_on("g.remove");

        let outcome = pipeline(&tools).run(&request(), &SilentProgress);

        assert!(outcome.is_success());
        assert_eq!(outcome.warnings.len(), 2, "one warning per gradient raster");
        assert!(outcome.warnings.iter().all(|w| w.contains("remove")));
    }

    #[test]
    fn same_seed_reproduces_output() {
        let tools = seeded_tools();
        let p = pipeline(&tools);

        p.run(&request(), &SilentProgress);
        let first = tools.raster("depth_out").expect("first output");

        p.run(&request(), &SilentProgress);
        let second = tools.raster("depth_out").expect("second output");

        assert_eq!(first, second);

        p.run(
            &ScenarioRequest {
                seed: Some(43),
                ..request()
            },
            &SilentProgress,
        );
        let reseeded = tools.raster("depth_out").expect("reseeded output");
        assert_ne!(first, reseeded);
    }

    #[test]
    fn scratch_names_are_distinct_across_runs() {
        let tools = seeded_tools();
        let p = pipeline(&tools);

        p.run(&request(), &SilentProgress);
        p.run(&request(), &SilentProgress);

        let removed = tools.removed();
        assert_eq!(removed.len(), 4);
        assert_eq!(
            removed.iter().collect::<HashSet<_>>().len(),
            4,
            "runs sharing a mapset must never reuse scratch names"
        );
    }
}
