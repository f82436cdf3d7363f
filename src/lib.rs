pub mod compositor;
pub mod config;
pub mod errors;
pub mod model;
pub mod palette;
pub mod segment;
pub mod traits;

pub mod mocks;

use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

pub use config::{Config, ModelSize};
pub use errors::{Result, SamOverlayError};
pub use model::MaskGenerator;
pub use segment::SegmentMask;
pub use traits::*;

/// Outcome of one directory run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
}

pub struct OverlayRenderer<P: SegmentationProvider> {
    provider: P,
    config: Config,
}

impl<P: SegmentationProvider> OverlayRenderer<P> {
    pub const fn new(provider: P, config: Config) -> Self {
        Self { provider, config }
    }

    pub fn process_directory(&self) -> Result<RunSummary> {
        let input_path = &self.config.img_dir;

        if !input_path.is_dir() {
            return Err(SamOverlayError::FileSystem {
                path: input_path.clone(),
                operation: "input directory lookup".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        let image_files = self.collect_image_files(input_path)?;
        let mut summary = RunSummary::default();

        if image_files.is_empty() {
            info!("No .jpg images found in {}", input_path.display());
            return Ok(summary);
        }

        let pb = ProgressBar::new(image_files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .map_err(|e| SamOverlayError::Configuration {
                    message: e.to_string(),
                })?
                .progress_chars("#>-"),
        );

        for (index, input_file) in image_files.iter().enumerate() {
            pb.suspend(|| {
                info!(
                    "Processing {} / {} images ({})",
                    index,
                    image_files.len(),
                    input_file.display()
                )
            });

            let started = Instant::now();
            match self.process_single_image(index, input_file) {
                Ok(_) => {
                    pb.suspend(|| {
                        info!(
                            "Processed image in {:.3} seconds",
                            started.elapsed().as_secs_f64()
                        )
                    });
                    summary.processed += 1;
                }
                Err(e) if self.config.keep_going => {
                    pb.suspend(|| error!("Failed to process {}: {}", input_file.display(), e));
                    summary.failed += 1;
                }
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        if summary.failed > 0 {
            warn!("{} of {} images failed", summary.failed, image_files.len());
        }
        info!("Processed {} images", summary.processed);
        Ok(summary)
    }

    /// `.jpg` files directly inside `input_path`, sorted by file name. The
    /// extension match is case-sensitive, so `IMG.JPG` is skipped.
    pub fn collect_image_files(&self, input_path: &Path) -> Result<Vec<PathBuf>> {
        let mut image_files = Vec::new();

        for entry in WalkDir::new(input_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| SamOverlayError::FileSystem {
                path: input_path.to_path_buf(),
                operation: "directory listing".to_string(),
                source: e.into(),
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && self.is_supported_image_format(path) {
                image_files.push(path.to_path_buf());
            }
        }

        Ok(image_files)
    }

    pub fn is_supported_image_format(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "jpg")
    }

    /// Segments one image and writes its overlays.
    ///
    /// `index` is the image's position in the sorted directory listing and
    /// seeds its colour assignment. Returns the combined overlay path.
    pub fn process_single_image(&self, index: usize, input_file: &Path) -> Result<PathBuf> {
        let image = load_rgb_image(input_file)?;

        let mut masks = self
            .provider
            .generate(&image)
            .map_err(|e| SamOverlayError::ImageProcessing {
                path: input_file.display().to_string(),
                operation: "segmentation".to_string(),
                source: Box::new(e),
            })?;
        segment::validate_masks(&masks, image.dimensions())?;
        segment::sort_by_area_desc(&mut masks);

        let stub = file_stub(input_file)?;
        let segment_dir = self.segment_dir(&stub);
        if self.config.save_segment_imgs {
            fs::create_dir_all(&segment_dir).map_err(|e| SamOverlayError::FileSystem {
                path: segment_dir.clone(),
                operation: "segment directory creation".to_string(),
                source: e,
            })?;
        }

        let colors = palette::assign_colors(index, masks.len());
        let mut overlays = Vec::with_capacity(masks.len());
        for (i, (mask, color)) in masks.iter().zip(colors).enumerate() {
            if self.config.save_segment_imgs {
                let cutout_path = segment_dir.join(format!("{stub}_mask_{i}.png"));
                compositor::build_segment_cutout(
                    &image,
                    mask.segmentation(),
                    Some(cutout_path.as_path()),
                )?;
            }

            let overlay_path = self
                .config
                .save_segment_imgs
                .then(|| segment_dir.join(format!("{stub}_mask_{i}_overlay.png")));
            overlays.push(compositor::build_colored_overlay(
                &image,
                mask.segmentation(),
                color,
                self.config.alpha,
                overlay_path.as_deref(),
            )?);
        }

        let combined = compositor::composite_overlays(&image, &overlays)?;
        let output_file = self.combined_overlay_path(&stub);
        compositor::save_png(&combined, &output_file)?;

        debug!("{} segments composited", masks.len());
        Ok(output_file)
    }

    /// Subdirectory holding the per-segment images of `stub`.
    pub fn segment_dir(&self, stub: &str) -> PathBuf {
        self.config
            .img_dir
            .join(format!("{stub}_{}", self.config.model_type))
    }

    pub fn combined_overlay_path(&self, stub: &str) -> PathBuf {
        self.config.img_dir.join(format!(
            "{stub}_combined_overlay_{}.png",
            self.config.model_type
        ))
    }
}

impl OverlayRenderer<MaskGenerator> {
    /// Loads the checkpoint selected by `config` and wraps it in a renderer.
    pub fn with_onnx_model(config: Config) -> Result<Self> {
        let model = MaskGenerator::new(&config.checkpoint_path(), config.device_id)?;
        Ok(Self::new(model, config))
    }
}

/// Decodes `path` to RGB8 with its EXIF orientation applied.
pub fn load_rgb_image(path: &Path) -> Result<RgbImage> {
    let load_error = |e: image::ImageError| SamOverlayError::ImageProcessing {
        path: path.display().to_string(),
        operation: "image load".to_string(),
        source: Box::new(e),
    };

    let mut decoder = ImageReader::open(path)
        .map_err(|e| SamOverlayError::FileSystem {
            path: path.to_path_buf(),
            operation: "image open".to_string(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| SamOverlayError::FileSystem {
            path: path.to_path_buf(),
            operation: "image format detection".to_string(),
            source: e,
        })?
        .into_decoder()
        .map_err(load_error)?;
    let orientation = decoder.orientation().map_err(load_error)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(load_error)?;
    image.apply_orientation(orientation);
    Ok(image.into_rgb8())
}

fn file_stub(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| SamOverlayError::Validation {
            field: path.display().to_string(),
            reason: "has no UTF-8 file stem".to_string(),
        })
}
