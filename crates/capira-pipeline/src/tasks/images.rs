use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;

use crate::context::BuildContext;
use crate::task::{Task, TaskError, TaskReport};
use crate::tasks::{collect_files, has_extension, write_file};

/// Optimize `src/images/**` into `dist/images`.
///
/// Results are cached under the cache directory, keyed by a content hash of
/// the source, so unchanged images are not reprocessed after a clean.
pub struct ImageTask;

impl ImageTask {
    pub fn new() -> Self {
        Self
    }

    fn process(&self, ctx: &BuildContext, source_root: &Path, path: &Path) -> Result<u64, TaskError> {
        let relative = path.strip_prefix(source_root).unwrap_or(path);
        let output = ctx.dist("images").join(relative);
        let bytes = fs::read(path).map_err(TaskError::io(path))?;

        let cached = cache_path(&ctx.cache_dir, &bytes, path);
        if let Ok(optimized) = fs::read(&cached) {
            tracing::debug!("{} served from cache", relative.display());
            return write_file(&output, optimized);
        }

        let optimized = optimize(path, bytes);
        if let Err(e) = write_file(&cached, &optimized) {
            tracing::warn!("Failed to cache {}: {}", relative.display(), e);
        }
        write_file(&output, optimized)
    }
}

impl Default for ImageTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for ImageTask {
    fn name(&self) -> &str {
        "images"
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let source_root = ctx.src("images");
        let files = collect_files(&source_root, |_| true);

        let results: Vec<Result<u64, TaskError>> = files
            .par_iter()
            .map(|path| self.process(ctx, &source_root, path))
            .collect();

        let mut report = TaskReport::default();
        for result in results {
            report.add_file(result?);
        }
        Ok(report)
    }
}

fn cache_path(cache_dir: &Path, contents: &[u8], path: &Path) -> PathBuf {
    let hash = blake3::hash(contents).to_hex();
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", hash, ext),
        None => hash.to_string(),
    };
    cache_dir.join("images").join(name)
}

/// Shrink an image. SVG markup is minified and PNGs are recompressed
/// losslessly; other formats, and files that fail to optimize, pass through.
fn optimize(path: &Path, bytes: Vec<u8>) -> Vec<u8> {
    if has_extension(path, &["svg"]) {
        return match String::from_utf8(bytes) {
            Ok(svg) => minify_svg(&svg).into_bytes(),
            Err(e) => e.into_bytes(),
        };
    }

    if has_extension(path, &["png"]) {
        return match oxipng::optimize_from_memory(&bytes, &oxipng::Options::from_preset(2)) {
            Ok(optimized) => optimized,
            Err(e) => {
                tracing::warn!("Failed to optimize {}: {}", path.display(), e);
                bytes
            }
        };
    }

    bytes
}

fn minify_svg(svg: &str) -> String {
    static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<!--.*?-->|<metadata\b.*?</metadata>|<!DOCTYPE[^>]*>")
            .expect("Invalid SVG noise regex")
    });
    static GAP_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r">\s+<").expect("Invalid SVG gap regex"));

    let stripped = NOISE_RE.replace_all(svg, "");
    GAP_RE.replace_all(&stripped, "><").trim().to_string()
}
