//! Depth threshold filtering.
//!
//! Writes a copy of a depth raster keeping only cells at or above a
//! minimum depth; everything shallower becomes null. Surviving cells are
//! never altered, and the output inherits the source's color table so
//! its legend still reads as water depth.

use runoff_shared::{RasterHandle, Result};
use runoff_toolkit::{CopyColorsArgs, ThresholdMaskArgs, Toolkit};

/// Filter `source` into `destination`, dropping cells below `min_depth`.
pub fn limit_depths(
    tools: &dyn Toolkit,
    source: &RasterHandle,
    min_depth: f64,
    destination: &str,
) -> Result<RasterHandle> {
    tools.threshold_mask(&ThresholdMaskArgs {
        source: source.name.clone(),
        destination: destination.to_string(),
        min_depth,
    })?;

    // Color copy runs after the value transform so the legend of the
    // filtered output matches the original depth raster.
    tools.copy_colors(&CopyColorsArgs {
        map: destination.to_string(),
        raster: source.name.clone(),
    })?;

    Ok(RasterHandle::persistent(destination))
}

#[cfg(test)]
mod tests {
    use runoff_shared::RasterKind;

    use super::*;
    use crate::testing::MockToolkit;

    #[test]
    fn survivors_keep_their_exact_values() {
        let tools = MockToolkit::new();
        tools.seed_raster("depth_1_2", &[Some(0.05), Some(0.005), Some(0.02), Some(0.01)]);

        let source = RasterHandle::ephemeral("depth_1_2");
        let output = limit_depths(&tools, &source, 0.01, "flood").expect("filter");

        assert_eq!(output.kind, RasterKind::Persistent);
        assert_eq!(
            tools.raster("flood"),
            Some(vec![Some(0.05), None, Some(0.02), Some(0.01)])
        );
    }

    #[test]
    fn null_cells_stay_null() {
        let tools = MockToolkit::new();
        tools.seed_raster("depth_1_2", &[None, Some(0.3)]);

        let source = RasterHandle::ephemeral("depth_1_2");
        limit_depths(&tools, &source, 0.01, "flood").expect("filter");

        assert_eq!(tools.raster("flood"), Some(vec![None, Some(0.3)]));
    }

    #[test]
    fn colors_are_copied_from_the_source() {
        let tools = MockToolkit::new();
        tools.seed_raster("depth_1_2", &[Some(0.5)]);

        let source = RasterHandle::ephemeral("depth_1_2");
        limit_depths(&tools, &source, 0.01, "flood").expect("filter");

        assert_eq!(tools.color_source("flood"), Some("depth_1_2".to_string()));
    }
}
