use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;

use crate::assets::AssetPipeline;
use crate::context::BuildContext;
use crate::task::{TaskError, TaskReport};
use crate::tasks::{collect_files, has_extension, write_file};
use crate::useref::{parse_blocks, BlockKind};

const ELEMENTS_ENTRY: &str = "elements/elements.html";
const ELEMENTS_VULCANIZED: &str = "elements/elements.vulcanized.html";

/// A processed page and the bundles its build blocks produced.
struct Page {
    output: PathBuf,
    html: String,
    bundles: Vec<(PathBuf, String)>,
}

/// Bundle build blocks and minify the app's pages.
pub(crate) fn run(ctx: &BuildContext) -> Result<TaskReport, TaskError> {
    let files = collect_files(&ctx.src_dir, |p| {
        has_extension(p, &["html"]) && !is_excluded(p.strip_prefix(&ctx.src_dir).unwrap_or(p))
    });

    let pages: Vec<Result<Page, TaskError>> = files
        .par_iter()
        .map(|path| process_page(ctx, path))
        .collect();

    // Pages sharing a bundle produce the same contents; write each once
    let mut outputs: BTreeMap<PathBuf, String> = BTreeMap::new();
    for page in pages {
        let page = page?;
        outputs.extend(page.bundles);
        outputs.insert(page.output, page.html);
    }

    let mut report = TaskReport::default();
    for (path, contents) in &outputs {
        report.add_file(write_file(path, contents)?);
    }
    Ok(report)
}

fn is_excluded(relative: &Path) -> bool {
    matches!(
        relative.components().next(),
        Some(Component::Normal(first)) if first == "elements" || first == "test"
    )
}

fn process_page(ctx: &BuildContext, path: &Path) -> Result<Page, TaskError> {
    let relative = path.strip_prefix(&ctx.src_dir).unwrap_or(path);
    let doc_dir = relative.parent().unwrap_or(Path::new(""));

    let source = fs::read_to_string(path).map_err(TaskError::io(path))?;
    let source = source.replace(ELEMENTS_ENTRY, ELEMENTS_VULCANIZED);

    let mut html = String::with_capacity(source.len());
    let mut bundles = Vec::new();
    let mut last = 0;

    for block in parse_blocks(&source) {
        let mut contents = Vec::with_capacity(block.references.len());
        for reference in &block.references {
            let asset = resolve_asset(ctx, doc_dir, reference).ok_or_else(|| {
                TaskError::MissingAsset {
                    path: path.to_path_buf(),
                    reference: reference.clone(),
                }
            })?;
            contents.push(fs::read_to_string(&asset).map_err(TaskError::io(&asset))?);
        }

        let mut bundle = contents.join("\n");
        if ctx.minify {
            bundle = match block.kind {
                BlockKind::Css => AssetPipeline::minify_css(&bundle, ctx.targets()).map_err(|message| {
                    TaskError::Css {
                        path: path.to_path_buf(),
                        message,
                    }
                })?,
                BlockKind::Js => AssetPipeline::minify_js(&bundle).map_err(|message| TaskError::Js {
                    path: path.to_path_buf(),
                    message,
                })?,
            };
        }

        bundles.push((ctx.dist(doc_dir).join(&block.output), bundle));
        html.push_str(&source[last..block.span.start]);
        html.push_str(&block.replacement_tag());
        last = block.span.end;
    }
    html.push_str(&source[last..]);

    if ctx.minify {
        html = AssetPipeline::minify_html(&html);
    }

    Ok(Page {
        output: ctx.dist(relative),
        html,
        bundles,
    })
}

/// Find a referenced asset in the intermediate, source or distribution tree.
fn resolve_asset(ctx: &BuildContext, doc_dir: &Path, reference: &str) -> Option<PathBuf> {
    let reference = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    let relative = match reference.strip_prefix('/') {
        Some(absolute) => PathBuf::from(absolute),
        None => doc_dir.join(reference),
    };

    [&ctx.tmp_dir, &ctx.src_dir, &ctx.dist_dir]
        .into_iter()
        .map(|root| root.join(&relative))
        .find(|candidate| candidate.is_file())
}
