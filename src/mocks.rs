use crate::errors::Result;
use crate::segment::SegmentMask;
use crate::traits::SegmentationProvider;
use image::RgbImage;

/// Mock segmentation provider for tests.
///
/// Returns three masks derived from the image size, deliberately not in area
/// order: the top-left quadrant, the whole image, and the left half.
#[derive(Debug, Clone, Default)]
pub struct MockSegmentationProvider;

impl MockSegmentationProvider {
    pub const fn new() -> Self {
        Self
    }
}

impl SegmentationProvider for MockSegmentationProvider {
    fn generate(&self, image: &RgbImage) -> Result<Vec<SegmentMask>> {
        let (width, height) = image.dimensions();
        let (half_w, half_h) = (width / 2, height / 2);

        Ok(vec![
            SegmentMask::from_fn(width, height, |x, y| x < half_w && y < half_h),
            SegmentMask::from_fn(width, height, |_, _| true),
            SegmentMask::from_fn(width, height, |x, _| x < half_w),
        ])
    }
}

/// Mock provider that never finds a segment.
#[derive(Debug, Clone, Default)]
pub struct EmptySegmentationProvider;

impl SegmentationProvider for EmptySegmentationProvider {
    fn generate(&self, _image: &RgbImage) -> Result<Vec<SegmentMask>> {
        Ok(Vec::new())
    }
}
