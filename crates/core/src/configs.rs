//! Configuration parsing
//!
//! - [`site`] - immutable site settings from the environment and `.env`
//! - [`pipeline`] - optional `.sitepipe/pipeline.yml` overrides
//! - [`tasks`] - custom command tasks declared in the pipeline file

pub mod pipeline;
pub mod site;
pub mod tasks;
