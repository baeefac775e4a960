//! Traits implemented by the external tools a build delegates to.
//!
//! Implementations are expected to be thin: spawn a tool, copy some files,
//! push a message on a channel. Anything resembling real compilation or a
//! network protocol belongs in the tool being wrapped, not here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{ReloadError, TransferError, TransformError, VcsError};
use crate::types::{CommitOptions, ServeConfig};

/// A file transform: reads files matching `inputs` and writes equivalent
/// output under `destination`.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use async_trait::async_trait;
/// use sitepipe_collaborators::{Transform, TransformError};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Transform for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     async fn apply(&self, inputs: &[String], _destination: &Path) -> Result<(), TransformError> {
///         if inputs.is_empty() {
///             return Err(TransformError::malformed("", "no inputs"));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transform: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Produce output files under `destination`.
    ///
    /// Fails with [`TransformError`] when an input is malformed or the
    /// underlying tool reports an error.
    async fn apply(&self, inputs: &[String], destination: &Path) -> Result<(), TransformError>;
}

/// Version-control operations needed to publish the built site to a branch.
///
/// Every failure carries the underlying tool's message in [`VcsError`].
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn create_branch(&self, branch: &str) -> Result<(), VcsError>;

    async fn checkout(&self, branch: &str) -> Result<(), VcsError>;

    /// Fetch every configured remote.
    async fn fetch_all(&self) -> Result<(), VcsError>;

    /// Stage the given pathspecs.
    async fn add(&self, pathspecs: &[String]) -> Result<(), VcsError>;

    async fn commit(&self, message: &str, options: CommitOptions) -> Result<(), VcsError>;

    async fn push(&self, remote: &str, branch: &str) -> Result<(), VcsError>;

    /// Machine-readable working tree status.
    async fn status(&self) -> Result<String, VcsError>;
}

/// Mirror of the build output on a remote host.
///
/// All operations are idempotent, so a failed deploy can simply be retried.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Remove everything under the remote root.
    async fn clean_remote(&self) -> Result<(), TransferError>;

    /// Upload every file under `local_dir`, preserving relative paths.
    async fn upload_all(&self, local_dir: &Path) -> Result<(), TransferError>;

    /// Apply `mode` (e.g. `"755"`) recursively to the remote root.
    async fn set_permissions(&self, mode: &str) -> Result<(), TransferError>;
}

/// Browser live-reload broadcaster.
#[async_trait]
pub trait LiveReload: Send + Sync {
    /// Begin serving and broadcasting.
    async fn start(&self, config: ServeConfig) -> Result<(), ReloadError>;

    /// Push a reload signal for `changed` to every connected client.
    ///
    /// Fire-and-forget: no acknowledgement, never blocks on slow clients.
    fn notify(&self, changed: &[PathBuf]);
}
