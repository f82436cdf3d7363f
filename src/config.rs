use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// SAM2.1 Hiera backbone sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelSize {
    Tiny,
    Small,
    #[value(name = "base_plus")]
    BasePlus,
    Large,
}

impl ModelSize {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::BasePlus => "base_plus",
            Self::Large => "large",
        }
    }

    /// File name of the exported model inside the checkpoint directory.
    pub fn checkpoint_file_name(self) -> String {
        format!("sam2.1_hiera_{}.onnx", self.as_str())
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run SAM2 on a directory of images to produce overlays
#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory containing images to process
    #[arg(short = 'd', long)]
    pub img_dir: PathBuf,

    /// Model size to use
    #[arg(short, long, value_enum, default_value_t = ModelSize::Tiny)]
    pub model_type: ModelSize,

    /// Directory where model checkpoints were downloaded
    #[arg(long, default_value_os_t = default_checkpoint_dir())]
    pub model_checkpoint_dir: PathBuf,

    /// Save the individual segment images in a subdirectory
    #[arg(long)]
    pub save_segment_imgs: bool,

    /// Opacity of each coloured segment overlay
    #[arg(long, default_value_t = 0.5, value_parser = check_alpha)]
    pub alpha: f32,

    /// GPU used by the CUDA / TensorRT execution providers
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// Log failed images and continue with the rest
    #[arg(long)]
    pub keep_going: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Config {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.model_checkpoint_dir
            .join(self.model_type.checkpoint_file_name())
    }
}

fn default_checkpoint_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join("sam2")
        .join("checkpoints")
}

fn check_alpha(s: &str) -> Result<f32, String> {
    let alpha: f32 = s
        .parse()
        .map_err(|_| format!("{} is not a number", s))?;
    if !(0.0..=1.0).contains(&alpha) {
        return Err(format!("{} is outside the range 0.0..=1.0", alpha));
    }
    Ok(alpha)
}
