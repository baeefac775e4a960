use thiserror::Error;

/// The main error type for sitepipe operations
#[derive(Debug, Error)]
pub enum SitepipeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Bad or missing settings, detected before any task runs
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on '{prerequisite}' which is not registered")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("Task '{0}' not found")]
    UnknownTask(String),

    /// The task graph contains a cycle; the path starts and ends on the same task
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Task '{task}' failed: {cause}")]
    TaskExecution { task: String, cause: String },

    #[error("{} task(s) failed: {}", .failures.len(), describe_failures(.failures))]
    AggregateTask { failures: Vec<(String, String)> },

    #[error("Run cancelled before task '{0}'")]
    Cancelled(String),

    #[error("Watch error: {0}")]
    Watch(String),
}

impl SitepipeError {
    /// Registration and graph errors are programming mistakes, never retried
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            SitepipeError::DuplicateTask(_)
                | SitepipeError::UnknownPrerequisite { .. }
                | SitepipeError::UnknownTask(_)
                | SitepipeError::CyclicDependency(_)
        )
    }
}

fn describe_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(task, cause)| format!("{} ({})", task, cause))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for sitepipe operations
pub type SitepipeResult<T> = Result<T, SitepipeError>;
