//! The extraction plan: one crop + one resample.
//!
//! Every backend consumes the same six-value instruction, regardless of
//! whether the pixels come from the original, a derivative or a pyramid
//! tile. Keeping the geometry in one validated struct means backends never
//! re-derive dimensions and can never disagree about them.

use crate::error::TransformError;
use crate::iiif::{Rect, Size};

/// A validated crop + resample instruction.
///
/// `source_*` select the pixels to read from the input image; `dest_*` give
/// the output raster size. All six values are positive; a plan that would
/// produce zero pixels cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub source_x: u32,
    pub source_y: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub dest_width: u32,
    pub dest_height: u32,
}

impl ExtractionPlan {
    /// Build a plan, rejecting empty crops and empty destinations.
    pub fn new(
        source_x: u32,
        source_y: u32,
        source_width: u32,
        source_height: u32,
        dest_width: u32,
        dest_height: u32,
    ) -> Result<Self, TransformError> {
        if source_width == 0 || source_height == 0 {
            return Err(TransformError::InvalidPlan {
                message: format!("empty source region {source_width}x{source_height}"),
            });
        }
        if dest_width == 0 || dest_height == 0 {
            return Err(TransformError::InvalidPlan {
                message: format!("empty destination {dest_width}x{dest_height}"),
            });
        }
        Ok(Self {
            source_x,
            source_y,
            source_width,
            source_height,
            dest_width,
            dest_height,
        })
    }

    /// Build the plan for a region/size pair against known source bounds.
    pub fn for_region(region: Rect, size: Size, bounds: (u32, u32)) -> Result<Self, TransformError> {
        let (bounds_width, bounds_height) = bounds;
        if region.x + region.width > bounds_width || region.y + region.height > bounds_height {
            return Err(TransformError::InvalidPlan {
                message: format!(
                    "region {}x{}+{}+{} exceeds source {}x{}",
                    region.width, region.height, region.x, region.y, bounds_width, bounds_height
                ),
            });
        }
        let (dest_width, dest_height) =
            size.resolve(region.width, region.height)
                .ok_or_else(|| TransformError::InvalidPlan {
                    message: "size resolves to zero pixels".to_string(),
                })?;
        Self::new(
            region.x,
            region.y,
            region.width,
            region.height,
            dest_width,
            dest_height,
        )
    }

    /// Whether the resample step changes nothing.
    pub fn is_identity_scale(&self) -> bool {
        self.source_width == self.dest_width && self.source_height == self.dest_height
    }

    /// Whether the crop step changes nothing for an input of the given size.
    pub fn is_identity_crop(&self, input_width: u32, input_height: u32) -> bool {
        self.source_x == 0
            && self.source_y == 0
            && self.source_width == input_width
            && self.source_height == input_height
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_for_full_region_derived_height() {
        // The canonical aspect case: 4000x3000 at width 1000 is 1000x750
        let plan = ExtractionPlan::for_region(
            Rect::new(0, 0, 4000, 3000),
            Size::Width(1000),
            (4000, 3000),
        )
        .unwrap();

        assert_eq!(plan.source_width, 4000);
        assert_eq!(plan.dest_width, 1000);
        assert_eq!(plan.dest_height, 750);
        assert!(!plan.is_identity_scale());
        assert!(plan.is_identity_crop(4000, 3000));
    }

    #[test]
    fn test_plan_aspect_follows_region_not_source() {
        // A square region of a landscape source stays square
        let plan = ExtractionPlan::for_region(
            Rect::new(100, 100, 500, 500),
            Size::Width(100),
            (4000, 3000),
        )
        .unwrap();
        assert_eq!((plan.dest_width, plan.dest_height), (100, 100));
        assert!(!plan.is_identity_crop(4000, 3000));
    }

    #[test]
    fn test_plan_rejects_out_of_bounds_region() {
        let result = ExtractionPlan::for_region(
            Rect::new(3900, 0, 200, 100),
            Size::Full,
            (4000, 3000),
        );
        assert!(matches!(result, Err(TransformError::InvalidPlan { .. })));
    }

    #[test]
    fn test_plan_rejects_empty_geometry() {
        assert!(ExtractionPlan::new(0, 0, 0, 100, 10, 10).is_err());
        assert!(ExtractionPlan::new(0, 0, 100, 100, 0, 10).is_err());
        assert!(ExtractionPlan::new(0, 0, 100, 100, 10, 10).is_ok());
    }

    #[test]
    fn test_identity_checks() {
        let plan = ExtractionPlan::new(0, 0, 100, 100, 100, 100).unwrap();
        assert!(plan.is_identity_scale());
        assert!(plan.is_identity_crop(100, 100));
        assert!(!plan.is_identity_crop(200, 200));

        let offset = ExtractionPlan::new(10, 10, 100, 100, 100, 100).unwrap();
        assert!(!offset.is_identity_crop(200, 200));
    }
}
