use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use globset::{Glob, GlobMatcher};
use sitepipe_collaborators::{Transform, TransformError};

use crate::configs::tasks::Command as TaskCommand;
use crate::execution::command::CommandExecutor;

/// Runs the external tool configured for a pipeline step
pub struct CommandTransform {
    name: String,
    command: TaskCommand,
    executor: CommandExecutor,
    vars: Vec<(&'static str, String)>,
}

const INPUTS: &str = "{inputs}";

impl CommandTransform {
    pub fn new(
        name: impl Into<String>,
        command: TaskCommand,
        executor: CommandExecutor,
        vars: Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            command,
            executor,
            vars,
        }
    }

    /// The configured command with placeholders filled in.
    ///
    /// An argv element that is exactly `{inputs}` becomes one argument per
    /// input; in a shell line each input is single-quoted so `sh` passes the
    /// pattern through unexpanded.
    fn render(&self, inputs: &[String], dest: &str) -> TaskCommand {
        let mut vars = self.vars.clone();
        vars.push(("dest", dest.to_string()));

        match self.command.substitute(&vars) {
            TaskCommand::Single(line) => {
                let quoted: Vec<String> = inputs.iter().map(|i| shell_quote(i)).collect();
                TaskCommand::Single(line.replace(INPUTS, &quoted.join(" ")))
            }
            TaskCommand::Multiple(args) => {
                let mut expanded = Vec::with_capacity(args.len() + inputs.len());
                for arg in args {
                    if arg == INPUTS {
                        expanded.extend(inputs.iter().cloned());
                    } else {
                        expanded.push(arg.replace(INPUTS, &inputs.join(" ")));
                    }
                }
                TaskCommand::Multiple(expanded)
            }
        }
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[async_trait]
impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, inputs: &[String], destination: &Path) -> Result<(), TransformError> {
        tokio::fs::create_dir_all(destination).await?;

        let dest = destination
            .strip_prefix(self.executor.root())
            .unwrap_or(destination);
        let command = self.render(inputs, &dest.display().to_string());
        self.executor
            .execute_task_command(&command)
            .await
            .map_err(|e| TransformError::tool(&self.name, e.to_string()))
    }
}

/// Copies files matching glob patterns, keeping paths relative to each
/// pattern's literal prefix
pub struct CopyTransform {
    root: PathBuf,
}

impl CopyTransform {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Transform for CopyTransform {
    fn name(&self) -> &str {
        "copy"
    }

    async fn apply(&self, inputs: &[String], destination: &Path) -> Result<(), TransformError> {
        let root = self.root.clone();
        let inputs = inputs.to_vec();
        let destination = destination.to_path_buf();

        let copied = tokio::task::spawn_blocking(move || copy_matching(&root, &inputs, &destination))
            .await
            .map_err(|e| TransformError::tool("copy", e.to_string()))??;
        tracing::debug!(files = copied, "copied");
        Ok(())
    }
}

/// Split a pattern into the directory before its first wildcard and the full matcher
fn split_pattern(pattern: &str) -> Result<(PathBuf, GlobMatcher), TransformError> {
    let glob = Glob::new(pattern).map_err(|e| TransformError::malformed(pattern, e.to_string()))?;

    let mut base = PathBuf::new();
    let mut has_wildcard = false;
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                if part.contains(['*', '?', '[', '{']) {
                    has_wildcard = true;
                    break;
                }
                base.push(&*part);
            }
            Component::CurDir => {}
            _ => {
                return Err(TransformError::malformed(
                    pattern,
                    "patterns must be relative to the site root",
                ))
            }
        }
    }
    // A literal file path is copied into the destination under its own name
    if !has_wildcard {
        base.pop();
    }

    Ok((base, glob.compile_matcher()))
}

fn copy_matching(root: &Path, inputs: &[String], destination: &Path) -> Result<usize, TransformError> {
    let mut copied = 0;

    for pattern in inputs {
        let (base, matcher) = split_pattern(pattern)?;
        let base_dir = root.join(&base);
        if !base_dir.exists() {
            continue;
        }

        let mut queue = VecDeque::new();
        queue.push_back(base_dir.clone());

        while let Some(current_dir) = queue.pop_front() {
            let entries = std::fs::read_dir(&current_dir)
                .map_err(|e| TransformError::malformed(&current_dir, e.to_string()))?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    // Never descend into the destination when it sits under the source
                    if path != destination {
                        queue.push_back(path);
                    }
                    continue;
                }

                let relative_path = path.strip_prefix(root).unwrap_or(&path);
                if !matcher.is_match(relative_path) {
                    continue;
                }

                let target = destination.join(path.strip_prefix(&base_dir).unwrap_or(&path));
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&path, &target)?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}
