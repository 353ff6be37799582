//! `capira.toml` loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capira_pipeline::{PipelineConfig, DEFAULT_BROWSERS};
use capira_server::{DevServerConfig, DEFAULT_PROXY_TARGET};
use serde::Deserialize;

/// Configuration file structure (capira.toml).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Directory the config was loaded from; relative paths resolve here
    #[serde(skip)]
    pub root: PathBuf,

    pub paths: PathsConfig,
    pub build: BuildSettings,
    pub serve: ServeSettings,
    pub proxy: ProxySettings,

    /// Extra dev-server mounts: URL prefix → directory
    pub routes: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub src: PathBuf,
    pub dist: PathBuf,
    pub tmp: PathBuf,
    pub bower: PathBuf,
    pub cache: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub minify: bool,
    pub browsers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServeSettings {
    pub port: u16,
    pub host: String,
    pub open: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub target: String,
    pub prefixes: Vec<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let dev = DevServerConfig::default();
        Self {
            root: PathBuf::from("."),
            paths: PathsConfig::default(),
            build: BuildSettings::default(),
            serve: ServeSettings::default(),
            proxy: ProxySettings::default(),
            routes: dev.routes.into_iter().collect(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            src: pipeline.src_dir,
            dist: pipeline.dist_dir,
            tmp: pipeline.tmp_dir,
            bower: pipeline.bower_dir,
            cache: pipeline.cache_dir,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: true,
            browsers: DEFAULT_BROWSERS.iter().map(|b| b.to_string()).collect(),
        }
    }
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            target: DEFAULT_PROXY_TARGET.to_string(),
            prefixes: vec!["/api/".to_string()],
        }
    }
}

impl ConfigFile {
    /// Pipeline settings for a production build.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            root: self.root.clone(),
            src_dir: self.paths.src.clone(),
            dist_dir: self.paths.dist.clone(),
            tmp_dir: self.paths.tmp.clone(),
            bower_dir: self.paths.bower.clone(),
            cache_dir: self.paths.cache.clone(),
            minify: self.build.minify,
            browsers: self.build.browsers.clone(),
            lint_fail_on_error: true,
            incremental: false,
        }
    }

    /// Dev server settings with paths resolved against the project root.
    pub fn dev_server_config(&self) -> DevServerConfig {
        DevServerConfig {
            src_dir: self.resolve(&self.paths.src),
            routes: self
                .routes
                .iter()
                .map(|(prefix, dir)| (prefix.clone(), self.resolve(dir)))
                .collect(),
            proxy_target: self.proxy.target.clone(),
            proxy_prefixes: self.proxy.prefixes.clone(),
            port: self.serve.port,
            host: self.serve.host.clone(),
            open: self.serve.open,
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load(path: &Path) -> Result<ConfigFile> {
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile {
            root,
            ..Default::default()
        });
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut config: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.root = root;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = load(&temp.path().join("capira.toml")).unwrap();

        assert_eq!(config.root, temp.path());
        assert_eq!(config.paths.src, PathBuf::from("src"));
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.proxy.target, "http://capira.de/build/socratic");
        assert!(config.build.minify);
        assert_eq!(config.routes.len(), 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("capira.toml");
        fs::write(
            &path,
            "[build]\nminify = false\n\n[proxy]\ntarget = \"http://localhost:8080\"\n\n[routes]\n\"/media\" = \"media\"\n",
        )
        .unwrap();

        let config = load(&path).unwrap();

        assert!(!config.build.minify);
        assert_eq!(config.build.browsers.len(), DEFAULT_BROWSERS.len());
        assert_eq!(config.proxy.target, "http://localhost:8080");
        assert_eq!(config.proxy.prefixes, vec!["/api/".to_string()]);
        assert_eq!(config.paths.dist, PathBuf::from("dist"));
        assert_eq!(config.routes.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("capira.toml");
        fs::write(&path, "[serve]\nport = \"not a number\"\n").unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn resolves_dev_server_paths() {
        let temp = tempdir().unwrap();
        let config = load(&temp.path().join("capira.toml")).unwrap();

        let dev = config.dev_server_config();

        assert_eq!(dev.src_dir, temp.path().join("src"));
        assert_eq!(
            dev.routes[0],
            ("/bower_components".to_string(), temp.path().join("bower_components"))
        );

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.root, temp.path());
        assert!(pipeline.lint_fail_on_error);
    }
}
