//! Remove build output.

use anyhow::Result;
use capira_pipeline::Pipeline;

use crate::config::ConfigFile;

pub async fn run(config: &ConfigFile) -> Result<()> {
    let pipeline = Pipeline::new(config.pipeline_config())?;
    pipeline.run_task("clean").await?;

    let ctx = pipeline.context();
    tracing::info!("Removed {} and {}", ctx.tmp_dir.display(), ctx.dist_dir.display());
    Ok(())
}
