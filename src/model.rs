use std::path::Path;

use crate::{
    errors::{Result, SamOverlayError},
    segment::SegmentMask,
    traits::SegmentationProvider,
};
use image::{imageops, imageops::FilterType, ImageBuffer, Luma, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::debug;

const INPUT_NAME: &str = "image";
const OUTPUT_NAME: &str = "masks";

/// Logits above this are inside the segment.
const MASK_THRESHOLD: f32 = 0.0;

const PIXEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const PIXEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Automatic mask generator backed by an ONNX export of SAM2.
///
/// The graph takes `image: f32[1, 3, S, S]` and returns
/// `masks: f32[1, N, S, S]` logits, one channel per segment.
pub struct MaskGenerator {
    pub image_size: u32,
    session: Mutex<Session>,
}

impl MaskGenerator {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(|e| SamOverlayError::Model {
                operation: "session builder initialisation".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| SamOverlayError::Model {
                operation: "execution provider registration".to_string(),
                source: Box::new(e),
            })?
            .with_memory_pattern(true)
            .map_err(|e| SamOverlayError::Model {
                operation: "memory pattern configuration".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| SamOverlayError::Model {
                operation: format!("model load: {}", model_path.display()),
                source: Box::new(e),
            })?;

        let input_dim =
            session.inputs[0]
                .input_type
                .tensor_shape()
                .ok_or_else(|| SamOverlayError::Model {
                    operation: "model input shape lookup".to_string(),
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "first model input is not a tensor",
                    )),
                })?[2];
        let image_size = static_input_size(input_dim)?;
        debug!("Model input size: {image_size}x{image_size}");

        // warm up
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![INPUT_NAME => TensorRef::from_array_view(&data)?])
            .map_err(|e| SamOverlayError::Model {
                operation: "warm-up run".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            image_size,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(
            ort::inputs![INPUT_NAME => TensorRef::from_array_view(&tensor.as_standard_layout())?],
        )?;
        Ok(outputs[OUTPUT_NAME]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl SegmentationProvider for MaskGenerator {
    fn generate(&self, image: &RgbImage) -> Result<Vec<SegmentMask>> {
        let (tensor, resized) = preprocess(image, self.image_size)?;
        let logits = self.predict(tensor.view())?;
        let (width, height) = image.dimensions();

        let masks = logits
            .index_axis(Axis(0), 0)
            .outer_iter()
            .map(|channel| postprocess_mask(channel, resized, width, height))
            .filter(|mask| !mask.is_empty())
            .collect::<Vec<_>>();
        debug!("Model returned {} non-empty masks", masks.len());
        Ok(masks)
    }
}

/// Longest-side resize to `image_size`, black padding on the bottom/right,
/// then per-channel mean/std normalisation.
///
/// Returns the NCHW tensor and the size of the resized (unpadded) region.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Result<(Array4<f32>, (u32, u32))> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SamOverlayError::Validation {
            field: "image".to_string(),
            reason: format!("has an empty dimension ({width}x{height})"),
        });
    }

    let (w, h) = fit_longest_side(width, height, image_size);
    let resized = imageops::resize(image, w, h, FilterType::Triangle);
    let mut canvas = RgbImage::new(image_size, image_size);
    imageops::overlay(&mut canvas, &resized, 0, 0);

    let mut tensor = canvas
        .as_ndarray3()
        .mapv(|v| f32::from(v) / 255.0)
        .insert_axis(Axis(0));
    for (c, mut channel) in tensor.axis_iter_mut(Axis(1)).enumerate() {
        channel.mapv_inplace(|v| (v - PIXEL_MEAN[c]) / PIXEL_STD[c]);
    }

    Ok((tensor, (w, h)))
}

/// Square input side from the model's declared shape. Dynamic (`-1`) or
/// out-of-range dimensions are rejected.
fn static_input_size(dim: i64) -> Result<u32> {
    u32::try_from(dim)
        .ok()
        .filter(|&size| size > 0)
        .ok_or_else(|| SamOverlayError::Model {
            operation: "model input shape lookup".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("input side {dim} is not a fixed positive size"),
            )),
        })
}

fn fit_longest_side(width: u32, height: u32, image_size: u32) -> (u32, u32) {
    let scale = image_size as f32 / width.max(height) as f32;
    let fit = |side: u32| ((side as f32 * scale).round() as u32).clamp(1, image_size);
    (fit(width), fit(height))
}

/// Crops one square logit map to the resized region, scales it back to the
/// source size and thresholds it.
pub fn postprocess_mask(
    logits: ArrayView2<f32>,
    resized: (u32, u32),
    width: u32,
    height: u32,
) -> SegmentMask {
    let (rows, cols) = logits.dim();
    let logit_image: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(cols as u32, rows as u32, |x, y| {
            Luma([logits[[y as usize, x as usize]]])
        });

    let (w, h) = resized;
    let cropped = imageops::crop_imm(
        &logit_image,
        0,
        0,
        w.min(cols as u32),
        h.min(rows as u32),
    )
    .to_image();
    let restored = imageops::resize(&cropped, width, height, FilterType::Triangle);

    SegmentMask::from_fn(width, height, |x, y| {
        restored.get_pixel(x, y).0[0] > MASK_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_fit_longest_side() {
        assert_eq!(fit_longest_side(2048, 1024, 1024), (1024, 512));
        assert_eq!(fit_longest_side(300, 600, 1024), (512, 1024));
        assert_eq!(fit_longest_side(4000, 1, 1024), (1024, 1));
    }

    #[test]
    fn test_static_input_size() {
        assert_eq!(static_input_size(1024).unwrap(), 1024);
        assert!(matches!(
            static_input_size(-1),
            Err(SamOverlayError::Model { .. })
        ));
        assert!(static_input_size(0).is_err());
        assert!(static_input_size(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_preprocess_shape_and_padding() -> Result<()> {
        let image = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));
        let (tensor, resized) = preprocess(&image, 64)?;

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(resized, (64, 32));

        // white inside the resized region, black padding below it
        let white_red = (1.0 - PIXEL_MEAN[0]) / PIXEL_STD[0];
        let black_red = -PIXEL_MEAN[0] / PIXEL_STD[0];
        assert!((tensor[[0, 0, 10, 10]] - white_red).abs() < 1e-5);
        assert!((tensor[[0, 0, 50, 10]] - black_red).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_preprocess_rejects_empty_image() {
        assert!(preprocess(&RgbImage::new(0, 5), 64).is_err());
    }

    #[test]
    fn test_postprocess_crops_and_thresholds() {
        // 8x8 logits, resized region 8x4; left half positive
        let logits = Array2::from_shape_fn((8, 8), |(_, x)| if x < 4 { 5.0 } else { -5.0 });
        let mask = postprocess_mask(logits.view(), (8, 4), 16, 8);

        assert_eq!(mask.dimensions(), (16, 8));
        assert!(mask.segmentation()[[4, 2]]);
        assert!(!mask.segmentation()[[4, 13]]);
    }
}
