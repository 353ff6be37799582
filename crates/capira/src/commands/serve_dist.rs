//! Build, then preview the distribution tree.

use anyhow::{Context, Result};
use capira_pipeline::Pipeline;
use capira_server::{PreviewConfig, PreviewServer};

use crate::commands::build;
use crate::config::ConfigFile;

/// Run the serve-dist command.
pub async fn run(config: &ConfigFile, port: u16, open: bool) -> Result<()> {
    let pipeline = Pipeline::new(config.pipeline_config())?;
    let result = build::build(pipeline).await?;

    tracing::info!(
        "Built {} files in {}ms",
        result.output.files,
        result.duration_ms
    );

    PreviewServer::new(PreviewConfig {
        dist_dir: result.output_dir,
        port,
        host: config.serve.host.clone(),
        open: config.serve.open && open,
    })
    .start()
    .await
    .context("Preview server failed")?;

    Ok(())
}
