//! Development server command.

use anyhow::{Context, Result};
use capira_pipeline::Pipeline;
use capira_server::DevServer;

use crate::config::ConfigFile;

/// Run the dev server command.
pub async fn run(config: &ConfigFile, port: Option<u16>, open: bool) -> Result<()> {
    let mut server_config = config.dev_server_config();
    if let Some(port) = port {
        server_config.port = port;
    }
    server_config.open = server_config.open && open;

    if !server_config.src_dir.exists() {
        anyhow::bail!("Source directory not found: {}", server_config.src_dir.display());
    }

    // Watch-triggered rebuilds only touch changed stylesheets and never abort on lint
    let mut pipeline_config = config.pipeline_config();
    pipeline_config.incremental = true;
    pipeline_config.lint_fail_on_error = false;
    let pipeline = Pipeline::new(pipeline_config)?;

    tracing::info!("Starting development server...");

    DevServer::new(server_config, pipeline)
        .start()
        .await
        .context("Development server failed")?;

    Ok(())
}
