use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sitepipe_collaborators::{LiveReload, ReloadError, ReloadEvent, ServeConfig};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Live-reload signals fanned out over a `tokio` broadcast channel.
///
/// Browser-facing transports subscribe with [`BroadcastReload::subscribe`];
/// lagging subscribers lose old events instead of slowing the build down.
pub struct BroadcastReload {
    sender: broadcast::Sender<ReloadEvent>,
    config: Mutex<Option<ServeConfig>>,
}

impl Default for BroadcastReload {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastReload {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            config: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    fn lock_config(&self) -> MutexGuard<'_, Option<ServeConfig>> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LiveReload for BroadcastReload {
    async fn start(&self, config: ServeConfig) -> Result<(), ReloadError> {
        if config.base_dirs.is_empty() {
            return Err(ReloadError::Start("no directories to serve".to_string()));
        }

        let mut current = self.lock_config();
        if current.is_some() {
            return Err(ReloadError::AlreadyStarted);
        }
        tracing::info!(
            port = config.port,
            dirs = %config
                .base_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "live reload started"
        );
        *current = Some(config);
        Ok(())
    }

    fn notify(&self, changed: &[PathBuf]) {
        let event = match self.lock_config().as_ref() {
            Some(config) => ReloadEvent::for_paths(config, changed.to_vec()),
            None => {
                tracing::debug!("live reload not started, dropping notification");
                return;
            }
        };
        // No subscribers is not an error
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(paths = changed.len(), receivers, "reload broadcast");
    }
}
