//! Precache manifest command.

use anyhow::Result;
use capira_pipeline::Pipeline;

use crate::config::ConfigFile;

pub fn run(config: &ConfigFile) -> Result<()> {
    let pipeline = Pipeline::new(config.pipeline_config())?;

    if !pipeline.context().dist_dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'capira build' first.",
            pipeline.context().dist_dir.display()
        );
    }

    let path = pipeline.precache()?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}
