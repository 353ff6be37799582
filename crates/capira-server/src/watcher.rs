//! File watching and the mapping from changed sources to dev-server actions.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// A changed path reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(path) | WatchEvent::Modified(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// What the dev server does in response to a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Reload connected browsers
    Reload,

    /// Re-run a build task, then reload
    Rebuild(&'static str),

    /// Lint a script and log the result
    Lint(PathBuf),
}

/// Map a changed file under `src_dir` to the action it triggers.
///
/// | change                      | action                 |
/// |-----------------------------|------------------------|
/// | `**/*.html`                 | reload                 |
/// | `styles/**/*.css`           | `styles`, then reload  |
/// | `elements/**/*.css`         | `elements`, then reload|
/// | `{scripts,elements}/**/*.js`| lint                   |
/// | `images/**`                 | reload                 |
pub fn classify(src_dir: &Path, event: &WatchEvent) -> Option<WatchAction> {
    let path = event.path();
    let relative = path.strip_prefix(src_dir).ok()?;
    let top = match relative.components().next()? {
        Component::Normal(name) => name.to_str()?,
        _ => return None,
    };
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match (top, ext) {
        (_, "html") => Some(WatchAction::Reload),
        ("styles", "css") => Some(WatchAction::Rebuild("styles")),
        ("elements", "css") => Some(WatchAction::Rebuild("elements")),
        ("scripts" | "elements", "js") => match event {
            WatchEvent::Removed(_) => None,
            _ => Some(WatchAction::Lint(path.to_path_buf())),
        },
        ("images", _) if relative.components().count() > 1 => Some(WatchAction::Reload),
        _ => None,
    }
}

/// Collapse a burst of actions, keeping the first occurrence of each.
pub fn dedupe(actions: impl IntoIterator<Item = WatchAction>) -> Vec<WatchAction> {
    let mut unique = Vec::new();
    for action in actions {
        if !unique.contains(&action) {
            unique.push(action);
        }
    }
    unique
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively.
    ///
    /// Returns the watcher and a channel to receive events. Paths that do not
    /// exist are skipped.
    pub fn new(paths: &[PathBuf]) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            }
        }

        // Forward events onto the async channel
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    if let Some(e) = convert_event(path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn convert_event(path: PathBuf, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path)),
        EventKind::Modify(_) => Some(WatchEvent::Modified(path)),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn modified(path: &str) -> WatchEvent {
        WatchEvent::Modified(Path::new("/app/src").join(path))
    }

    #[test]
    fn classifies_source_changes() {
        let src = Path::new("/app/src");

        assert_eq!(classify(src, &modified("index.html")), Some(WatchAction::Reload));
        assert_eq!(
            classify(src, &modified("elements/quiz/quiz.html")),
            Some(WatchAction::Reload)
        );
        assert_eq!(
            classify(src, &modified("styles/main.css")),
            Some(WatchAction::Rebuild("styles"))
        );
        assert_eq!(
            classify(src, &modified("elements/quiz/quiz.css")),
            Some(WatchAction::Rebuild("elements"))
        );
        assert_eq!(
            classify(src, &modified("scripts/app.js")),
            Some(WatchAction::Lint(PathBuf::from("/app/src/scripts/app.js")))
        );
        assert_eq!(
            classify(src, &modified("images/logo.png")),
            Some(WatchAction::Reload)
        );
    }

    #[test]
    fn ignores_unrelated_changes() {
        let src = Path::new("/app/src");

        assert_eq!(classify(src, &modified("fonts/roboto.woff")), None);
        assert_eq!(classify(src, &modified("main.css")), None);
        assert_eq!(
            classify(src, &WatchEvent::Removed(src.join("scripts/old.js"))),
            None
        );
        assert_eq!(
            classify(src, &WatchEvent::Modified(PathBuf::from("/app/dist/index.html"))),
            None
        );
    }

    #[test]
    fn dedupes_bursts() {
        let actions = dedupe([
            WatchAction::Rebuild("styles"),
            WatchAction::Reload,
            WatchAction::Rebuild("styles"),
        ]);

        assert_eq!(actions, vec![WatchAction::Rebuild("styles"), WatchAction::Reload]);
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("index.html");

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()]).unwrap();

        // Give the backend time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, "<html></html>").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        assert!(event.unwrap().is_some(), "channel should not be closed");
    }
}
