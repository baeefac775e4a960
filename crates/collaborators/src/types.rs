//! Plain data exchanged with collaborators.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for [`VersionControl::commit`](crate::VersionControl::commit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Create the commit even when nothing is staged.
    ///
    /// The publish pipeline relies on this: a rebuild that produced identical
    /// files must still be able to commit and push.
    pub allow_empty: bool,
}

impl CommitOptions {
    #[must_use]
    pub const fn allow_empty() -> Self {
        Self { allow_empty: true }
    }
}

/// Configuration handed to [`LiveReload::start`](crate::LiveReload::start).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeConfig {
    /// Directories served to the browser, searched in order
    pub base_dirs: Vec<PathBuf>,
    pub port: u16,
    /// File extensions that are hot-injected instead of triggering a full reload
    pub inject_file_types: Vec<String>,
}

impl ServeConfig {
    pub const DEFAULT_PORT: u16 = 3000;

    #[must_use]
    pub fn new(base_dirs: Vec<PathBuf>) -> Self {
        Self {
            base_dirs,
            port: Self::DEFAULT_PORT,
            inject_file_types: ["css", "map", "png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Whether a change to `path` can be injected without a page reload.
    #[must_use]
    pub fn is_injectable(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.inject_file_types.iter().any(|t| t == ext))
            .unwrap_or(false)
    }
}

/// Signal pushed to live-reload clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Swap the listed assets in place
    Inject(Vec<PathBuf>),
    /// Reload the whole page
    Reload(Vec<PathBuf>),
}

impl ReloadEvent {
    /// Classify a batch of changed paths: inject only if every path is injectable.
    #[must_use]
    pub fn for_paths(config: &ServeConfig, paths: Vec<PathBuf>) -> Self {
        if !paths.is_empty() && paths.iter().all(|p| config.is_injectable(p)) {
            Self::Inject(paths)
        } else {
            Self::Reload(paths)
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Inject(paths) | Self::Reload(paths) => paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_changes_are_injected() {
        let config = ServeConfig::new(vec![PathBuf::from("dist")]);
        let event = ReloadEvent::for_paths(
            &config,
            vec![PathBuf::from(".tmp/css/main.css"), PathBuf::from("img/a.png")],
        );
        assert!(matches!(event, ReloadEvent::Inject(_)));
    }

    #[test]
    fn test_html_change_forces_reload() {
        let config = ServeConfig::new(vec![PathBuf::from("dist")]);
        let event = ReloadEvent::for_paths(
            &config,
            vec![PathBuf::from("main.css"), PathBuf::from("index.html")],
        );
        assert!(matches!(event, ReloadEvent::Reload(_)));
        assert_eq!(event.paths().len(), 2);
    }

    #[test]
    fn test_empty_batch_is_a_reload() {
        let config = ServeConfig::new(Vec::new());
        assert_eq!(
            ReloadEvent::for_paths(&config, Vec::new()),
            ReloadEvent::Reload(Vec::new())
        );
    }
}
