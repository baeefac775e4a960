//! Concrete collaborators
//!
//! Thin adapters from the traits in `sitepipe_collaborators` to the tools a
//! site build shells out to: the user's transform commands, `git`, `lftp`,
//! and an in-process live-reload broadcast channel.

pub mod git;
pub mod reload;
pub mod transfer;
pub mod transform;

pub use git::GitCli;
pub use reload::BroadcastReload;
pub use transfer::LftpTransfer;
pub use transform::{CommandTransform, CopyTransform};
