//! Collaborator contracts for sitepipe
//!
//! A sitepipe build never compiles stylesheets, talks FTP or speaks git by
//! itself. Every task that touches the outside world goes through one of the
//! narrow traits defined here:
//!
//! - [`Transform`] - turn a set of input path patterns into files under a destination
//! - [`VersionControl`] - branch, commit and push the published site
//! - [`FileTransfer`] - mirror the build output to a remote host
//! - [`LiveReload`] - tell connected browsers to refresh
//!
//! Each operation returns a tagged `Result` so the task runner can apply a
//! single fail-fast (sequential) or collect-all (parallel) policy.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ReloadError, TransferError, TransformError, VcsError};
pub use traits::{FileTransfer, LiveReload, Transform, VersionControl};
pub use types::{CommitOptions, ReloadEvent, ServeConfig};
