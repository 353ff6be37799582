//! Production build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capira_pipeline::{BuildResult, Pipeline};

use crate::config::ConfigFile;

/// Run the build command.
pub async fn run(config: &ConfigFile, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Building...");

    let mut pipeline_config = config.pipeline_config();
    if let Some(output) = output {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        pipeline_config.dist_dir = output_dir(&cwd, &output);
    }
    if let Some(minify) = minify {
        pipeline_config.minify = minify;
    }

    let result = build(Pipeline::new(pipeline_config)?).await?;

    tracing::info!(
        "Built {} files ({} bytes) in {}ms",
        result.output.files,
        result.output.bytes,
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}

/// Run the default plan on `pipeline`.
pub async fn build(pipeline: Pipeline) -> Result<BuildResult> {
    Ok(pipeline.build().await?)
}

/// `--output` is relative to where the command runs, not to the config file.
fn output_dir(cwd: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        cwd.join(output)
    }
}
