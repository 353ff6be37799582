//! Overlay palette command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use capira_palette::Catalog;

/// List, dump or validate the overlay catalog.
pub fn run(file: Option<&Path>, json: bool, check: bool) -> Result<()> {
    let catalog = load(file)?;

    if check {
        if let Err(errors) = catalog.validate() {
            for error in &errors {
                tracing::error!("{}", error);
            }
            anyhow::bail!("Palette has {} invalid entries", errors.len());
        }
        tracing::info!("Palette is valid ({} overlays)", catalog.len());
        return Ok(());
    }

    if json {
        println!("{}", catalog.to_json()?);
        return Ok(());
    }

    for line in listing(&catalog) {
        println!("{}", line);
    }
    Ok(())
}

fn load(file: Option<&Path>) -> Result<Catalog> {
    let Some(path) = file else {
        return Ok(Catalog::builtin()?);
    };

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let catalog = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Catalog::from_json(&source)?,
        _ => Catalog::from_yaml(&source)?,
    };
    Ok(catalog)
}

/// One `category / title (kind)` line per offerable overlay.
fn listing(catalog: &Catalog) -> Vec<String> {
    catalog
        .offerable()
        .map(|(category, overlay)| match overlay.kind() {
            Some(kind) => format!("{} / {} ({})", category.name, overlay.title, kind),
            None => format!("{} / {}", category.name, overlay.title),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_builtin_offerable_overlays() {
        let catalog = Catalog::builtin().unwrap();
        let lines = listing(&catalog);

        assert_eq!(lines.len(), catalog.offerable().count());
        assert!(lines.iter().all(|line| line.contains(" / ")));
    }

    #[test]
    fn loads_json_catalog_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("palette.json");
        fs::write(&path, Catalog::builtin().unwrap().to_json().unwrap()).unwrap();

        let catalog = load(Some(&path)).unwrap();

        assert_eq!(catalog, Catalog::builtin().unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempdir().unwrap();
        assert!(load(Some(&temp.path().join("nope.yaml"))).is_err());
    }
}
