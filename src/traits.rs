use crate::errors::Result;
use crate::segment::SegmentMask;
use image::RgbImage;

/// Source of segment masks for an image.
///
/// The renderer only relies on this contract, so the ONNX backed
/// [`crate::model::MaskGenerator`] and the test mocks are interchangeable.
pub trait SegmentationProvider: Send + Sync {
    /// Every segment found in `image`, in no particular order. Each mask must
    /// have the same dimensions as `image`.
    fn generate(&self, image: &RgbImage) -> Result<Vec<SegmentMask>>;
}

