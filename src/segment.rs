use image::{GrayImage, Luma};
use ndarray::prelude::*;

use crate::errors::{Result, SamOverlayError};

/// One detected segment: a boolean membership grid shaped `(height, width)`
/// and the number of pixels it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMask {
    segmentation: Array2<bool>,
    area: usize,
}

impl SegmentMask {
    pub fn new(segmentation: Array2<bool>) -> Self {
        let area = segmentation.iter().filter(|&&inside| inside).count();
        Self { segmentation, area }
    }

    /// Builds a mask of `width` x `height` from a predicate over pixel coordinates.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let segmentation =
            Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                f(x as u32, y as u32)
            });
        Self::new(segmentation)
    }

    pub fn segmentation(&self) -> ArrayView2<'_, bool> {
        self.segmentation.view()
    }

    pub const fn area(&self) -> usize {
        self.area
    }

    pub fn is_empty(&self) -> bool {
        self.area == 0
    }

    /// `(width, height)`, in the same order as `image::GenericImageView::dimensions`.
    pub fn dimensions(&self) -> (u32, u32) {
        mask_dimensions(self.segmentation.view())
    }
}

pub(crate) fn mask_dimensions(mask: ArrayView2<bool>) -> (u32, u32) {
    let (height, width) = mask.dim();
    (width as u32, height as u32)
}

/// Boolean mask to an 8-bit grayscale mask: `true` -> 255, `false` -> 0.
pub fn mask_to_luma(mask: ArrayView2<bool>) -> GrayImage {
    let (width, height) = mask_dimensions(mask);
    GrayImage::from_fn(width, height, |x, y| {
        if mask[[y as usize, x as usize]] {
            Luma([u8::MAX])
        } else {
            Luma([0])
        }
    })
}

/// Orders masks largest-area-first. The sort is stable, so equal areas keep
/// the order the provider returned them in.
pub fn sort_by_area_desc(masks: &mut [SegmentMask]) {
    masks.sort_by(|a, b| b.area.cmp(&a.area));
}

/// Checks that every mask matches the image size.
pub fn validate_masks(masks: &[SegmentMask], image_dimensions: (u32, u32)) -> Result<()> {
    masks
        .iter()
        .try_for_each(|mask| SamOverlayError::ensure_dimensions(image_dimensions, mask.dimensions()))
}
