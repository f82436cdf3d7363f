//! Mask-to-image compositing.
//!
//! Every function receives the source image explicitly and returns a new
//! buffer; nothing here mutates its inputs or keeps state between calls.

use std::path::Path;

use image::{buffer::ConvertBuffer, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::ArrayView2;
use num_traits::AsPrimitive;
use tracing::debug;

use crate::errors::{Result, SamOverlayError};
use crate::segment::{mask_dimensions, mask_to_luma};

/// Converts a unit-range channel to 8 bits by truncation (`int(x * 255)`),
/// saturating outside `[0, 1]`.
#[inline]
pub fn unit_to_u8(value: f32) -> u8 {
    (value * 255.0).as_()
}

pub fn build_plain_color_image(width: u32, height: u32, color: Rgb<f32>) -> RgbImage {
    let Rgb([red, green, blue]) = color;
    ImageBuffer::from_pixel(
        width,
        height,
        Rgb([unit_to_u8(red), unit_to_u8(green), unit_to_u8(blue)]),
    )
}

/// Copy of `image` whose alpha channel is the mask (`true` -> 255).
///
/// When `save_path` is set the cutout is written there before it is returned.
pub fn build_segment_cutout(
    image: &RgbImage,
    mask: ArrayView2<bool>,
    save_path: Option<&Path>,
) -> Result<RgbaImage> {
    SamOverlayError::ensure_dimensions(image.dimensions(), mask_dimensions(mask))?;

    let cutout = replace_alpha(image, &mask_to_luma(mask));
    if let Some(path) = save_path {
        save_png(&cutout, path)?;
    }
    Ok(cutout)
}

/// Flat `color` image the size of `image`, alpha `trunc(mask * alpha * 255)`.
pub fn build_colored_overlay(
    image: &RgbImage,
    mask: ArrayView2<bool>,
    color: Rgb<f32>,
    alpha: f32,
    save_path: Option<&Path>,
) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    SamOverlayError::ensure_dimensions((width, height), mask_dimensions(mask))?;

    let plain = build_plain_color_image(width, height, color);
    let opacity = unit_to_u8(alpha);
    let alpha_mask = ImageBuffer::from_fn(width, height, |x, y| {
        if mask[[y as usize, x as usize]] {
            Luma([opacity])
        } else {
            Luma([0u8])
        }
    });

    let overlay = replace_alpha(&plain, &alpha_mask);
    if let Some(path) = save_path {
        save_png(&overlay, path)?;
    }
    Ok(overlay)
}

/// Pastes every overlay onto a copy of `image`, in the order given, using each
/// overlay's alpha as the paste mask. Callers pass overlays largest-area-first
/// so small segments stay visible on top.
pub fn composite_overlays(image: &RgbImage, overlays: &[RgbaImage]) -> Result<RgbaImage> {
    let mut canvas = promote_to_rgba(image);
    for overlay in overlays {
        SamOverlayError::ensure_dimensions(canvas.dimensions(), overlay.dimensions())?;
        paste_with_alpha(&mut canvas, overlay);
    }
    Ok(canvas)
}

/// RGB to RGBA with a fully opaque alpha channel.
pub fn promote_to_rgba(image: &RgbImage) -> RgbaImage {
    image.convert()
}

/// Rounded integer blend `(dst * (255 - a) + src * a) / 255` on the colour
/// channels. Destination alpha is left untouched.
#[inline]
pub fn blend_channel(dst: u8, src: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let mixed = u32::from(dst) * (255 - a) + u32::from(src) * a + 128;
    ((mixed + (mixed >> 8)) >> 8) as u8
}

fn paste_with_alpha(canvas: &mut RgbaImage, overlay: &RgbaImage) {
    for (dst, src) in canvas.pixels_mut().zip(overlay.pixels()) {
        let Rgba([sr, sg, sb, sa]) = *src;
        match sa {
            0 => {}
            u8::MAX => {
                dst.0[..3].copy_from_slice(&[sr, sg, sb]);
            }
            _ => {
                let Rgba([dr, dg, db, da]) = *dst;
                *dst = Rgba([
                    blend_channel(dr, sr, sa),
                    blend_channel(dg, sg, sa),
                    blend_channel(db, sb, sa),
                    da,
                ]);
            }
        }
    }
}

fn replace_alpha(image: &RgbImage, alpha: &ImageBuffer<Luma<u8>, Vec<u8>>) -> RgbaImage {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let Rgb([red, green, blue]) = *image.get_pixel(x, y);
        let Luma([a]) = *alpha.get_pixel(x, y);
        Rgba([red, green, blue, a])
    })
}

pub(crate) fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    debug!("Saving {}", path.display());
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| SamOverlayError::ImageProcessing {
            path: path.display().to_string(),
            operation: "image save".to_string(),
            source: Box::new(e),
        })
}
