//! Task execution module
//!
//! This module handles the actual execution of tasks: the sequential runner,
//! the parallel group runner, external command execution and dependency
//! level reporting.

pub mod command;
pub mod levels;
pub mod parallel;
pub mod runner;

pub use command::{CommandError, CommandExecutor};
pub use levels::group_by_dependency_levels;
pub use runner::TaskRunner;
