use std::path::Path;

use async_trait::async_trait;
use sitepipe_collaborators::{FileTransfer, TransferError};
use tokio::process::Command;

use crate::configs::site::FtpCredentials;
use crate::execution::command::CommandExecutor;

/// FTP mirroring through the `lftp` client.
///
/// The password is handed over in `LFTP_PASSWORD` rather than on the
/// command line.
pub struct LftpTransfer {
    credentials: FtpCredentials,
    executor: CommandExecutor,
}

impl LftpTransfer {
    pub fn new(credentials: FtpCredentials, executor: CommandExecutor) -> Self {
        let executor = executor.with_env("LFTP_PASSWORD", credentials.password.clone());
        Self {
            credentials,
            executor,
        }
    }

    fn remote_dir(&self) -> &str {
        let dir = self.credentials.remote_dir.trim_end_matches('/');
        if dir.is_empty() {
            "/"
        } else {
            dir
        }
    }

    /// Full lftp script for one operation
    fn script(&self, commands: &str) -> String {
        format!("set cmd:fail-exit yes; {}; bye", commands)
    }

    fn command(&self, commands: &str) -> Command {
        let mut command = Command::new("lftp");
        command
            .arg("-u")
            .arg(&self.credentials.user)
            .arg("--env-password")
            .arg(&self.credentials.host)
            .arg("-e")
            .arg(self.script(commands));
        command
    }

    async fn run(&self, operation: &str, commands: &str) -> Result<(), TransferError> {
        tracing::info!(operation, host = %self.credentials.host, "file transfer");
        let mut command = self.command(commands);
        self.executor
            .capture(&mut command, &format!("lftp {}", operation))
            .await
            .map(|_| ())
            .map_err(|e| TransferError::operation(operation, e.to_string()))
    }

    pub(crate) fn clean_commands(&self) -> String {
        // rm -f tolerates an already empty remote, keeping the operation idempotent
        format!("cd {}; glob -a --exist rm -r -f *", quote(self.remote_dir()))
    }

    pub(crate) fn upload_commands(&self, local_dir: &Path) -> String {
        format!(
            "mirror --reverse --overwrite --no-perms {} {}",
            quote(&local_dir.display().to_string()),
            quote(self.remote_dir())
        )
    }

    pub(crate) fn chmod_commands(&self, mode: &str) -> String {
        format!("chmod -R {} {}", mode, quote(self.remote_dir()))
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl FileTransfer for LftpTransfer {
    async fn clean_remote(&self) -> Result<(), TransferError> {
        let commands = self.clean_commands();
        self.run("clean", &commands).await
    }

    async fn upload_all(&self, local_dir: &Path) -> Result<(), TransferError> {
        if !local_dir.is_dir() {
            return Err(TransferError::operation(
                "upload",
                format!("{} is not a directory", local_dir.display()),
            ));
        }
        let commands = self.upload_commands(local_dir);
        self.run("upload", &commands).await
    }

    async fn set_permissions(&self, mode: &str) -> Result<(), TransferError> {
        if mode.is_empty() || !mode.chars().all(|c| c.is_ascii_digit()) {
            return Err(TransferError::operation(
                "chmod",
                format!("invalid permission mode '{}'", mode),
            ));
        }
        let commands = self.chmod_commands(mode);
        self.run("chmod", &commands).await
    }
}
