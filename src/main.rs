use anyhow::{ensure, Context, Result};
use clap::Parser;

use sam_overlay_rs::{Config, OverlayRenderer};

fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    ensure!(
        config.img_dir.is_dir(),
        "Input directory does not exist: {}",
        config.img_dir.display()
    );
    let checkpoint = config.checkpoint_path();
    ensure!(
        checkpoint.exists(),
        "Model checkpoint does not exist: {}",
        checkpoint.display()
    );

    tracing::info!("Loading {} model from {}", config.model_type, checkpoint.display());
    let renderer = OverlayRenderer::with_onnx_model(config)
        .with_context(|| format!("Failed to load model: {}", checkpoint.display()))?;

    let summary = renderer.process_directory()?;
    ensure!(
        summary.failed == 0,
        "{} image(s) failed to process",
        summary.failed
    );

    Ok(())
}
