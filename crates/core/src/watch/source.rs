use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::types::{SitepipeError, SitepipeResult};
use crate::watch::coordinator::WatchEvent;

/// Keeps the filesystem watcher alive; events stop when this is dropped.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
}

/// Watch `root` recursively, forwarding content changes as site-relative paths
pub fn watch_filesystem(root: &Path) -> SitepipeResult<(FsWatcher, mpsc::UnboundedReceiver<WatchEvent>)> {
    // notify reports canonical paths on some platforms
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let (tx, rx) = mpsc::unbounded_channel();

    let prefix = root.clone();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                let paths = relative_paths(&prefix, event.paths);
                if !paths.is_empty() {
                    // The receiver is gone once the watch loop ends
                    let _ = tx.send(WatchEvent { paths });
                }
            }
            Err(e) => tracing::warn!(error = %e, "filesystem watch error"),
        })
        .map_err(|e| SitepipeError::Watch(e.to_string()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| SitepipeError::Watch(e.to_string()))?;
    tracing::debug!(root = %root.display(), "filesystem watcher started");

    Ok((FsWatcher { _watcher: watcher }, rx))
}

fn relative_paths(root: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter_map(|p| p.strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}
