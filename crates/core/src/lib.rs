//! Sitepipe Core Library
//!
//! This is the core library for the sitepipe static-site build orchestrator. It
//! provides the task registry, dependency resolution, the sequential and
//! parallel runners, the watch loop and the built-in site pipeline.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`site_manager`] - High-level site management interface
//! - [`registry`] - Named tasks with prerequisites and parallel groups
//! - [`resolver`] - Execution plans from requested targets
//! - [`execution`] - Sequential and parallel runners, external commands
//! - [`watch`] - Debounced rebuilds driven by filesystem changes
//! - [`pipeline`] - The built-in site tasks and composite targets
//! - [`backends`] - Concrete collaborators (transform tools, git, lftp, live reload)
//! - [`graph`] - Task graph export and cycle diagnostics
//! - [`tasks`] - Task colour management
//! - [`configs`] - Site settings and the optional pipeline file
//! - [`results`] - Result types for site operations
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! The primary entry point is the [`SiteManager`] which provides a high-level
//! interface for all site operations:
//!
//! ```rust,no_run
//! use sitepipe_core::site_manager::{SiteManager, SiteManagerConfig};
//! use std::path::PathBuf;
//!
//! # fn example() -> sitepipe_core::types::SitepipeResult<()> {
//! let manager = SiteManager::new(SiteManagerConfig {
//!     site_root: PathBuf::from("."),
//! })?;
//!
//! let tasks = manager.list_tasks();
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod configs;
pub mod execution;
pub mod graph;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod results;
pub mod site_manager;
pub mod tasks;
pub mod types;
pub mod watch;

// Re-export the main types for easier usage
pub use site_manager::{SiteManager, SiteManagerConfig};
pub use types::{SitepipeError, SitepipeResult};
