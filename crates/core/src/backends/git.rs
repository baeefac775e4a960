use async_trait::async_trait;
use sitepipe_collaborators::{CommitOptions, VcsError, VersionControl};
use tokio::process::Command;

use crate::execution::command::{CommandError, CommandExecutor};

/// Version control through the `git` executable
pub struct GitCli {
    executor: CommandExecutor,
}

impl GitCli {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    async fn git(&self, operation: &str, args: &[&str]) -> Result<String, VcsError> {
        let mut command = Command::new("git");
        command.args(args);
        tracing::debug!(operation, args = %args.join(" "), "git");
        self.executor
            .capture(&mut command, &format!("git {}", operation))
            .await
            .map_err(|e| VcsError::new(operation, e.to_string()))
    }

    /// `show-ref --verify` exits with 1 when the ref is missing; any other
    /// failure (no repository, no git) is reported
    async fn branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
        let refname = format!("refs/heads/{}", branch);
        let mut command = Command::new("git");
        command.args(["show-ref", "--verify", "--quiet", refname.as_str()]);
        match self.executor.capture(&mut command, "git show-ref").await {
            Ok(_) => Ok(true),
            Err(CommandError::Failed { code: 1, .. }) => Ok(false),
            Err(e) => Err(VcsError::new("show-ref", e.to_string())),
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    /// Creating a branch that already exists is not an error, so the
    /// publish pipeline can run repeatedly
    async fn create_branch(&self, branch: &str) -> Result<(), VcsError> {
        if self.branch_exists(branch).await? {
            tracing::debug!(branch, "branch already exists");
            return Ok(());
        }
        self.git("branch", &["branch", branch]).await.map(|_| ())
    }

    async fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.git("checkout", &["checkout", branch]).await.map(|_| ())
    }

    async fn fetch_all(&self) -> Result<(), VcsError> {
        self.git("fetch", &["fetch", "--all"]).await.map(|_| ())
    }

    async fn add(&self, pathspecs: &[String]) -> Result<(), VcsError> {
        if pathspecs.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--all", "--"];
        args.extend(pathspecs.iter().map(String::as_str));
        self.git("add", &args).await.map(|_| ())
    }

    async fn commit(&self, message: &str, options: CommitOptions) -> Result<(), VcsError> {
        let mut args = vec!["commit", "-m", message];
        if options.allow_empty {
            args.push("--allow-empty");
        }
        self.git("commit", &args).await.map(|_| ())
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.git("push", &["push", remote, branch]).await.map(|_| ())
    }

    async fn status(&self) -> Result<String, VcsError> {
        self.git("status", &["status", "--porcelain"]).await
    }
}
