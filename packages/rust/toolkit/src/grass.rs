//! GRASS-backed [`Toolkit`] implementation.
//!
//! Every operation shells out as `grass <project> --exec <tool> key=value ...`
//! and captures stderr as the diagnostic text on failure. No toolkit
//! state is shared between invocations beyond the mapset itself.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use runoff_shared::{Result, RunoffError};

use crate::ops::{
    CopyColorsArgs, SimWaterArgs, SlopeAspectArgs, ThresholdMaskArgs, Toolkit, WriteHistoryArgs,
};

/// Invokes GRASS tools against a fixed project (location) directory.
pub struct GrassToolkit {
    grass_bin: PathBuf,
    project: PathBuf,
}

impl GrassToolkit {
    /// Create a toolkit bound to a GRASS launcher binary and project.
    pub fn new(grass_bin: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        Self {
            grass_bin: grass_bin.into(),
            project: project.into(),
        }
    }

    /// Run one external tool and wait for it to finish.
    fn exec(&self, operation: &str, args: &[String]) -> Result<()> {
        debug!(operation, ?args, "invoking toolkit");

        let output = Command::new(&self.grass_bin)
            .arg(&self.project)
            .arg("--exec")
            .arg(operation)
            .args(args)
            .output()
            .map_err(|e| {
                RunoffError::tool(
                    operation,
                    None,
                    format!(
                        "failed to launch `{}`: {e}. Is GRASS installed?",
                        self.grass_bin.display()
                    ),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunoffError::tool(
                operation,
                output.status.code(),
                stderr.trim().to_string(),
            ));
        }

        Ok(())
    }
}

impl Toolkit for GrassToolkit {
    fn slope_aspect(&self, args: &SlopeAspectArgs) -> Result<()> {
        args.validate()?;
        self.exec("r.slope.aspect", &slope_aspect_args(args))
    }

    fn sim_water(&self, args: &SimWaterArgs) -> Result<()> {
        args.validate()?;
        self.exec("r.sim_water", &sim_water_args(args))
    }

    fn threshold_mask(&self, args: &ThresholdMaskArgs) -> Result<()> {
        args.validate()?;
        self.exec("r.mapcalc", &threshold_mask_args(args))
    }

    fn copy_colors(&self, args: &CopyColorsArgs) -> Result<()> {
        args.validate()?;
        self.exec("r.colors", &copy_colors_args(args))
    }

    fn remove_raster(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(RunoffError::invalid_argument(
                "missing required raster name `name`",
            ));
        }
        self.exec("g.remove", &remove_raster_args(name))
    }

    fn write_history(&self, args: &WriteHistoryArgs) -> Result<()> {
        args.validate()?;
        self.exec("r.support", &write_history_args(args))
    }
}

// ---------------------------------------------------------------------------
// Command-line rendering
// ---------------------------------------------------------------------------
//
// Kept as free functions so the exact external invocation is testable
// without a GRASS installation.

fn slope_aspect_args(args: &SlopeAspectArgs) -> Vec<String> {
    vec![
        format!("elevation={}", args.elevation),
        format!("dx={}", args.dx),
        format!("dy={}", args.dy),
        "--overwrite".into(),
    ]
}

fn sim_water_args(args: &SimWaterArgs) -> Vec<String> {
    let mut rendered = vec![
        format!("elevation={}", args.elevation),
        format!("dx={}", args.dx),
        format!("dy={}", args.dy),
        // r.sim_water's `rain` takes a raster; the scalar rate goes to
        // `rain_value`.
        format!("rain_value={}", args.rain_value),
        format!("depth={}", args.depth),
        format!("nprocs={}", args.nprocs),
    ];
    if let Some(seed) = args.random_seed {
        rendered.push(format!("random_seed={seed}"));
    }
    rendered.push("--overwrite".into());
    rendered
}

fn threshold_mask_args(args: &ThresholdMaskArgs) -> Vec<String> {
    vec![
        format!("expression={}", args.expression()),
        "--overwrite".into(),
    ]
}

fn copy_colors_args(args: &CopyColorsArgs) -> Vec<String> {
    vec![
        format!("map={}", args.map),
        format!("raster={}", args.raster),
    ]
}

fn remove_raster_args(name: &str) -> Vec<String> {
    vec![
        "type=raster".into(),
        format!("name={name}"),
        "-f".into(),
        "--quiet".into(),
    ]
}

fn write_history_args(args: &WriteHistoryArgs) -> Vec<String> {
    vec![
        format!("map={}", args.map),
        format!("history={}", args.history),
    ]
}
