//! File watching and debounced rebuilds
//!
//! - [`binding`] - glob patterns mapped to the tasks they re-run
//! - [`coordinator`] - the debounce loop driving rebuilds and live reload
//! - [`source`] - filesystem events from `notify`

pub mod binding;
pub mod coordinator;
pub mod source;

pub use binding::{bindings_from_config, default_bindings, WatchBinding, DEFAULT_DEBOUNCE};
pub use coordinator::{WatchCoordinator, WatchEvent, WatchSummary};
pub use source::{watch_filesystem, FsWatcher};
