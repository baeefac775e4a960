//! Command execution utilities
//!
//! This module provides a unified interface for executing external tools
//! (shell commands, scripts, executables with args) from the site root with
//! consistent error reporting. Collaborator backends and custom tasks all go
//! through [`CommandExecutor`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

use crate::configs::tasks::Command as TaskCommand;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{context}: {source}")]
    Spawn {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context} with exit code {code}{}", stderr_suffix(.stderr))]
    Failed {
        context: String,
        code: i32,
        stderr: String,
    },

    #[error("Script file '{}' not found", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Empty command")]
    Empty,
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Runs external commands from the site root
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    root: PathBuf,
    envs: Vec<(String, String)>,
}

impl CommandExecutor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            envs: Vec::new(),
        }
    }

    /// Add an environment variable for every command run by this executor
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn prepare(&self, command: &mut Command) {
        command.current_dir(&self.root);
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command.kill_on_drop(true);
    }

    /// Run with inherited stdio, failing on a non-zero exit
    pub async fn execute_command(
        &self,
        command: &mut Command,
        context: &str,
    ) -> Result<(), CommandError> {
        self.prepare(command);

        let status = command.status().await.map_err(|e| CommandError::Spawn {
            context: format!("Failed to execute {}", context),
            source: e,
        })?;

        if !status.success() {
            return Err(CommandError::Failed {
                context: format!("{} failed", context),
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            });
        }
        Ok(())
    }

    /// Run and capture stdout; stderr is folded into the error on failure
    pub async fn capture(&self, command: &mut Command, context: &str) -> Result<String, CommandError> {
        self.prepare(command);
        command.stdin(Stdio::null());

        let output = command.output().await.map_err(|e| CommandError::Spawn {
            context: format!("Failed to execute {}", context),
            source: e,
        })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                context: format!("{} failed", context),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Execute a script file, relative paths resolved against the site root
    pub async fn execute_script(&self, script_path: &str) -> Result<(), CommandError> {
        let script_path_buf = PathBuf::from(script_path);
        let full_script_path = if script_path_buf.is_relative() {
            self.root.join(script_path_buf)
        } else {
            script_path_buf
        };

        if !full_script_path.exists() {
            return Err(CommandError::ScriptNotFound(full_script_path));
        }

        let mut command = Command::new(&full_script_path);
        self.execute_command(&mut command, &format!("script {}", full_script_path.display()))
            .await
    }

    /// Execute a command with arguments
    pub async fn execute_command_with_args(
        &self,
        command_path: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        let mut command = Command::new(command_path);
        command.args(args);
        self.execute_command(&mut command, &format!("command '{}'", command_path))
            .await
    }

    /// Execute a single shell command
    pub async fn execute_shell_command(&self, cmd: &str) -> Result<(), CommandError> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        self.execute_command(&mut command, &format!("command '{}'", cmd))
            .await
    }

    /// Execute a configured command, shell line or argv list
    pub async fn execute_task_command(&self, command: &TaskCommand) -> Result<(), CommandError> {
        match command {
            TaskCommand::Single(cmd) => self.execute_shell_command(cmd).await,
            TaskCommand::Multiple(cmds) => match cmds.split_first() {
                Some((program, args)) => self.execute_command_with_args(program, args).await,
                None => Err(CommandError::Empty),
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_command_runs_in_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(temp_dir.path());
        executor
            .execute_shell_command("echo hi > marker.txt")
            .await
            .unwrap();
        assert!(temp_dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn test_failure_reports_exit_code_and_stderr() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(temp_dir.path());
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo broken >&2; exit 3");
        let err = executor.capture(&mut command, "sh").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit code 3"), "{message}");
        assert!(message.contains("broken"), "{message}");
    }

    #[tokio::test]
    async fn test_env_is_passed_through() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(temp_dir.path()).with_env("SITEPIPE_PROBE", "42");
        let mut command = Command::new("sh");
        command.arg("-c").arg("printf %s \"$SITEPIPE_PROBE\"");
        assert_eq!(executor.capture(&mut command, "sh").await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_missing_script() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(temp_dir.path());
        let err = executor.execute_script("nope.sh").await.unwrap_err();
        assert!(matches!(err, CommandError::ScriptNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_argv_is_rejected() {
        let executor = CommandExecutor::new(".");
        let err = executor
            .execute_task_command(&TaskCommand::Multiple(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Empty));
    }
}
