//! TODO list command.

use anyhow::Result;
use capira_pipeline::todo;

use crate::config::ConfigFile;

pub fn run(config: &ConfigFile, query: Option<&str>) -> Result<()> {
    let (path, count) = todo::write_todo_list(&config.root, query)?;
    tracing::info!("Wrote {} entries to {}", count, path.display());
    Ok(())
}
