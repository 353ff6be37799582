//! Resolved paths and settings shared by every task of a run.

use std::path::{Path, PathBuf};

use lightningcss::targets::{Browsers, Targets};

use crate::builder::PipelineConfig;

/// Browser support floor used for vendor prefixing.
pub const DEFAULT_BROWSERS: &[&str] = &[
    "ie >= 10",
    "ie_mob >= 10",
    "ff >= 30",
    "chrome >= 34",
    "safari >= 7",
    "opera >= 23",
    "ios >= 7",
    "android >= 4.4",
    "bb >= 10",
];

/// Everything a task needs to know about the build it is part of.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Project root
    pub root: PathBuf,

    /// Source tree
    pub src_dir: PathBuf,

    /// Distribution output
    pub dist_dir: PathBuf,

    /// Intermediate, pre-minification output
    pub tmp_dir: PathBuf,

    /// Bower packages
    pub bower_dir: PathBuf,

    /// Content-addressed cache that survives `clean`
    pub cache_dir: PathBuf,

    pub minify: bool,

    /// Fail the lint task when errors are found
    pub lint_fail_on_error: bool,

    /// Skip sources whose intermediate output is newer
    pub incremental: bool,

    browsers: Browsers,
}

impl BuildContext {
    /// Resolve a pipeline configuration against its root.
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let root = config.root.clone();
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };

        Ok(Self {
            src_dir: resolve(&config.src_dir),
            dist_dir: resolve(&config.dist_dir),
            tmp_dir: resolve(&config.tmp_dir),
            bower_dir: resolve(&config.bower_dir),
            cache_dir: resolve(&config.cache_dir),
            minify: config.minify,
            lint_fail_on_error: config.lint_fail_on_error,
            incremental: config.incremental,
            browsers: parse_browsers(&config.browsers)?,
            root,
        })
    }

    /// Prefixing targets for lightningcss.
    pub fn targets(&self) -> Targets {
        Targets::from(self.browsers)
    }

    /// Path of `relative` inside the source tree.
    pub fn src(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.src_dir.join(relative)
    }

    /// Path of `relative` inside the distribution tree.
    pub fn dist(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dist_dir.join(relative)
    }

    /// Path of `relative` inside the intermediate tree.
    pub fn tmp(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.tmp_dir.join(relative)
    }
}

/// Invalid pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid browser query '{0}': expected '<browser> >= <version>'")]
    BrowserQuery(String),
}

/// Parse `"<browser> >= <version>"` queries into lightningcss targets.
///
/// Browsers lightningcss has no data for (IE mobile, BlackBerry) are skipped.
pub fn parse_browsers<S: AsRef<str>>(queries: &[S]) -> Result<Browsers, ConfigError> {
    let mut browsers = Browsers::default();

    for query in queries {
        let query = query.as_ref();
        let (name, version) = split_query(query)
            .ok_or_else(|| ConfigError::BrowserQuery(query.to_string()))?;
        let version =
            encode_version(version).ok_or_else(|| ConfigError::BrowserQuery(query.to_string()))?;

        let slot = match name.to_ascii_lowercase().as_str() {
            "ie" | "explorer" => &mut browsers.ie,
            "ff" | "firefox" => &mut browsers.firefox,
            "chrome" => &mut browsers.chrome,
            "safari" => &mut browsers.safari,
            "opera" => &mut browsers.opera,
            "ios" | "ios_saf" => &mut browsers.ios_saf,
            "android" => &mut browsers.android,
            "edge" => &mut browsers.edge,
            "samsung" => &mut browsers.samsung,
            other => {
                tracing::debug!("No prefix data for browser '{}', skipping", other);
                continue;
            }
        };

        // Keep the lowest floor when a browser is listed twice
        *slot = Some(slot.map_or(version, |existing| existing.min(version)));
    }

    Ok(browsers)
}

fn split_query(query: &str) -> Option<(&str, &str)> {
    if let Some((name, version)) = query.split_once(">=") {
        return Some((name.trim(), version.trim()));
    }
    let mut parts = query.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(version), None) => Some((name, version)),
        _ => None,
    }
}

/// Encode `major[.minor[.patch]]` the way lightningcss expects.
fn encode_version(version: &str) -> Option<u32> {
    let mut parts = version.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    if major > 255 || minor > 255 || patch > 255 {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_browser_list() {
        let browsers = parse_browsers(DEFAULT_BROWSERS).unwrap();

        assert_eq!(browsers.ie, Some(10 << 16));
        assert_eq!(browsers.firefox, Some(30 << 16));
        assert_eq!(browsers.android, Some((4 << 16) | (4 << 8)));
        assert_eq!(browsers.safari, Some(7 << 16));
        assert_eq!(browsers.edge, None);
    }

    #[test]
    fn rejects_malformed_queries() {
        assert!(parse_browsers(&["chrome"]).is_err());
        assert!(parse_browsers(&["chrome >= latest"]).is_err());
    }

    #[test]
    fn keeps_lowest_version() {
        let browsers = parse_browsers(&["chrome >= 40", "chrome 34"]).unwrap();

        assert_eq!(browsers.chrome, Some(34 << 16));
    }

    #[test]
    fn resolves_relative_paths_against_root() {
        let config = PipelineConfig {
            root: PathBuf::from("/project"),
            ..Default::default()
        };

        let ctx = BuildContext::new(&config).unwrap();

        assert_eq!(ctx.src_dir, PathBuf::from("/project/src"));
        assert_eq!(ctx.dist("styles"), PathBuf::from("/project/dist/styles"));
        assert_eq!(ctx.tmp_dir, PathBuf::from("/project/.tmp"));
    }
}
