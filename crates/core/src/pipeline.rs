//! Built-in site pipeline
//!
//! Registers the site's tasks (transform steps, cleans, copies, publishing
//! and deployment operations) and the composite targets that chain them.
//! A composite is a no-op task whose prerequisites, in declaration order,
//! form its sequence; the resolver turns it into the concrete stack.
//!
//! Every task that touches the outside world goes through one of the
//! collaborator traits, so the whole pipeline can run against fakes.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use globset::{Glob, GlobSetBuilder};
use sitepipe_collaborators::{
    CommitOptions, FileTransfer, LiveReload, ServeConfig, TransferError, Transform, VcsError,
    VersionControl,
};

use crate::backends::{BroadcastReload, CommandTransform, CopyTransform, GitCli, LftpTransfer};
use crate::configs::pipeline::PipelineConfig;
use crate::configs::site::SiteConfig;
use crate::configs::tasks::TaskConfig;
use crate::execution::command::CommandExecutor;
use crate::registry::{Task, TaskAction, TaskRegistry};
use crate::resolver::ExecutionPlan;
use crate::types::{SitepipeError, SitepipeResult};

/// Transform steps whose tool is configured in `pipeline.yml`
pub const STEP_NAMES: &[&str] = &[
    "contents",
    "sass",
    "wiredep",
    "ngTemplates",
    "js",
    "minify",
    "uglify:js",
    "uglify:css",
];

/// Tasks that need file-transfer credentials
pub const TRANSFER_TASKS: &[&str] = &["ftp:clean", "ftp:send", "ftp:chmod"];

pub const PUBLISH_BRANCH: &str = "gh-pages";
pub const MAIN_BRANCH: &str = "master";
pub const PUBLISH_REMOTE: &str = "origin";
pub const PUBLISH_MESSAGE: &str = "Automatic publication";

/// Composite targets and the sequence each one expands to
pub const COMPOSITES: &[(&str, &str, &[&str])] = &[
    (
        "default",
        "Asset pipeline without minification",
        &["contents", "sass", "wiredep", "ngTemplates", "js", "images", "fonts"],
    ),
    (
        "build",
        "Clean, run the asset pipeline, minify and package into the build directory",
        &["clean:tmp", "clean:build", "default", "minify", "uglify", "prepare"],
    ),
    (
        "build:serve",
        "Build, then serve the build directory with live reload",
        &["build", "serve:built"],
    ),
    (
        "build:gh-pages",
        "Build and publish to the gh-pages branch",
        &[
            "build",
            "git:branch:gh-pages",
            "git:co:gh-pages",
            "git:fetch",
            "clean:gh-pages",
            "dist:copy",
            "gh-pages:clean-build",
            "git:commit:gh-pages",
            "git:push:gh-pages",
            "git:co:master",
        ],
    ),
    (
        "ftp",
        "Replace the remote copy of the build directory",
        &["ftp:clean", "ftp:send", "ftp:chmod"],
    ),
    ("build:ftp", "Build and upload over FTP", &["build", "ftp"]),
];

/// The external tools the pipeline delegates to
#[derive(Clone)]
pub struct Collaborators {
    /// Configured transform steps by name; missing steps are skipped with a warning
    pub transforms: HashMap<String, Arc<dyn Transform>>,
    pub copier: Arc<dyn Transform>,
    pub vcs: Arc<dyn VersionControl>,
    /// `None` when no credentials are configured
    pub transfer: Option<Arc<dyn FileTransfer>>,
    pub reload: Arc<dyn LiveReload>,
}

impl Collaborators {
    /// Concrete backends for a real site
    pub fn from_config(site: &SiteConfig, pipeline: &PipelineConfig) -> SitepipeResult<Self> {
        validate_steps(pipeline)?;

        let executor = CommandExecutor::new(&site.root);
        let vars = site.placeholders();

        let transforms = pipeline
            .steps
            .iter()
            .flatten()
            .map(|(name, command)| {
                let transform: Arc<dyn Transform> = Arc::new(CommandTransform::new(
                    name.clone(),
                    command.clone(),
                    executor.clone(),
                    vars.clone(),
                ));
                (name.clone(), transform)
            })
            .collect();

        let transfer = site.ftp.credentials().ok().map(|credentials| {
            Arc::new(LftpTransfer::new(credentials, executor.clone())) as Arc<dyn FileTransfer>
        });

        Ok(Self {
            transforms,
            copier: Arc::new(CopyTransform::new(&site.root)),
            vcs: Arc::new(GitCli::new(executor)),
            transfer,
            reload: Arc::new(BroadcastReload::new()),
        })
    }
}

fn validate_steps(pipeline: &PipelineConfig) -> SitepipeResult<()> {
    if let Some(unknown) = pipeline
        .steps
        .iter()
        .flatten()
        .map(|(name, _)| name)
        .find(|name| !STEP_NAMES.contains(&name.as_str()))
    {
        return Err(SitepipeError::Config(format!(
            "unknown pipeline step '{}' (expected one of: {})",
            unknown,
            STEP_NAMES.join(", ")
        )));
    }
    Ok(())
}

/// Live-reload server settings for the given directories
pub fn serve_config(pipeline: &PipelineConfig, base_dirs: Vec<PathBuf>) -> ServeConfig {
    let mut config = ServeConfig::new(base_dirs);
    if let Some(serve) = &pipeline.serve {
        if let Some(port) = serve.port {
            config.port = port;
        }
        if let Some(types) = &serve.inject_file_types {
            config.inject_file_types = types.clone();
        }
    }
    config
}

/// Whether running `plan` needs file-transfer credentials
pub fn needs_transfer(plan: &ExecutionPlan) -> bool {
    TRANSFER_TASKS.iter().any(|task| plan.contains(task))
}

/// Top-level entries of the site root that belong to the published site.
///
/// The site's own working directories and dot-directories are never
/// included, whatever the globs say.
pub fn publishable_entries(site: &SiteConfig) -> SitepipeResult<Vec<String>> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &site.publish_globs {
        let glob = Glob::new(pattern).map_err(|e| {
            SitepipeError::Config(format!("invalid publish glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    let matcher = builder
        .build()
        .map_err(|e| SitepipeError::Config(format!("invalid publish globs: {}", e)))?;

    let protected = [&site.src_dir, &site.build_dir, &site.tmp_dir, &site.content_dir];

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(&site.root)?.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || protected.iter().any(|dir| dir.as_path() == Path::new(&name)) {
            continue;
        }
        if matcher.is_match(&name) {
            entries.push(name);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Registry of every task a site can run
pub struct SitePipeline {
    registry: TaskRegistry,
}

impl SitePipeline {
    pub fn build(
        site: &SiteConfig,
        pipeline: &PipelineConfig,
        collaborators: Collaborators,
    ) -> SitepipeResult<Self> {
        validate_steps(pipeline)?;

        let mut registry = TaskRegistry::new();
        register_steps(&mut registry, site, &collaborators)?;
        register_cleans(&mut registry, site)?;
        register_transfers(&mut registry, site, &collaborators)?;
        register_publishing(&mut registry, site, &collaborators)?;
        register_serving(&mut registry, site, pipeline, &collaborators)?;

        for (name, description, sequence) in COMPOSITES {
            registry.register_task(
                Task::new(*name, TaskAction::Noop)
                    .with_prerequisites(sequence.iter().copied())
                    .with_description(*description),
            )?;
        }

        if let Some(custom) = &pipeline.tasks {
            let tasks = custom
                .iter()
                .map(|config| custom_task(config, site))
                .collect::<SitepipeResult<Vec<_>>>()?;
            registry.register_batch(tasks)?;
        }

        tracing::debug!(tasks = registry.len(), "pipeline registered");
        Ok(Self { registry })
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

fn dir_string(path: &Path) -> String {
    path.display().to_string()
}

fn register_steps(
    registry: &mut TaskRegistry,
    site: &SiteConfig,
    collaborators: &Collaborators,
) -> SitepipeResult<()> {
    let src = dir_string(&site.src_dir);
    let tmp = dir_string(&site.tmp_dir);
    let build = dir_string(&site.build_dir);
    let content = dir_string(&site.content_dir);

    let step = |name: &'static str, inputs: Vec<String>, dest: PathBuf| {
        Task::new(
            name,
            transform_action(name, collaborators.transforms.get(name).cloned(), inputs, dest),
        )
    };
    let copy = |name: &'static str, inputs: Vec<String>, dest: PathBuf| {
        Task::new(
            name,
            transform_action(name, Some(Arc::clone(&collaborators.copier)), inputs, dest),
        )
    };

    let tasks = vec![
        step(
            "contents",
            vec![
                format!("{}/render/**/*.{{html,js}}", src),
                format!("{}/**/*.{{json,md}}", content),
            ],
            site.tmp(),
        )
        .with_description("Render pages from templates and content"),
        step("sass", vec![format!("{}/sass/**/*.scss", src)], site.tmp().join("css"))
            .with_description("Compile stylesheets"),
        step("wiredep", vec!["bower.json".to_string()], site.tmp())
            .with_description("Inject front-end dependencies"),
        step(
            "ngTemplates",
            vec![format!("{}/ng/**/*.html", src)],
            site.tmp().join("js"),
        )
        .with_description("Inline application templates"),
        step("js", vec![format!("{}/ng/**/*.js", src)], site.tmp().join("js"))
            .with_description("Bundle application scripts"),
        copy(
            "images",
            vec![format!("{}/images/**/*.{{svg,jpg,png,gif}}", src)],
            site.tmp().join("images"),
        )
        .with_description("Copy images"),
        copy(
            "fonts",
            vec![format!("{}/fonts/**/*.{{eot,svg,ttf,woff,woff2}}", src)],
            site.tmp().join("fonts"),
        )
        .with_prerequisites(["contents"])
        .with_description("Copy fonts"),
        step("minify", vec![format!("{}/**/*.html", tmp)], site.build())
            .with_description("Minify pages into the build directory"),
        step("uglify:js", vec![format!("{}/**/*.js", build)], site.build())
            .with_description("Minify built scripts in place"),
        step("uglify:css", vec![format!("{}/**/*.css", build)], site.build())
            .with_description("Minify built stylesheets in place"),
        copy(
            "prepare",
            vec![
                format!("{}/**/*.{{svg,jpg,png,gif}}", tmp),
                format!("{}/**/*.{{eot,svg,ttf,woff,woff2}}", tmp),
            ],
            site.build(),
        )
        .with_description("Copy images and fonts into the build directory"),
        copy("dist:copy", vec![format!("{}/**/*", build)], site.root.clone())
            .with_description("Copy the build directory into the site root"),
    ];
    for task in tasks {
        registry.register_task(task)?;
    }

    registry.register_task(
        Task::new(
            "uglify",
            TaskAction::Parallel(vec!["uglify:js".to_string(), "uglify:css".to_string()]),
        )
        .with_description("Minify built scripts and stylesheets concurrently"),
    )
}

fn register_cleans(registry: &mut TaskRegistry, site: &SiteConfig) -> SitepipeResult<()> {
    registry.register_task(
        Task::new("clean:tmp", clean_dir_action(site.tmp())).with_description("Remove the temp directory"),
    )?;
    registry.register_task(
        Task::new("clean:build", clean_dir_action(site.build()))
            .with_description("Remove the build directory"),
    )?;
    registry.register_task(
        Task::new("gh-pages:clean-build", clean_dir_action(site.build()))
            .with_description("Remove the build directory once copied for publishing"),
    )?;

    let config = site.clone();
    registry.register_task(
        Task::new(
            "clean:gh-pages",
            TaskAction::run(move || {
                let config = config.clone();
                async move {
                    for entry in publishable_entries(&config)? {
                        remove_path(&config.root.join(entry)).await?;
                    }
                    Ok(())
                }
            }),
        )
        .with_description("Remove previously published files from the site root"),
    )
}

fn register_transfers(
    registry: &mut TaskRegistry,
    site: &SiteConfig,
    collaborators: &Collaborators,
) -> SitepipeResult<()> {
    let transfer = collaborators.transfer.clone();
    let build = site.build();
    let mode = site.ftp.permissions.clone();

    registry.register_task(
        Task::new(
            "ftp:clean",
            transfer_action(transfer.clone(), |t| async move { t.clean_remote().await }),
        )
        .with_description("Empty the remote directory"),
    )?;
    registry.register_task(
        Task::new(
            "ftp:send",
            transfer_action(transfer.clone(), move |t| {
                let build = build.clone();
                async move { t.upload_all(&build).await }
            }),
        )
        .with_description("Upload the build directory"),
    )?;
    registry.register_task(
        Task::new(
            "ftp:chmod",
            transfer_action(transfer, move |t| {
                let mode = mode.clone();
                async move { t.set_permissions(&mode).await }
            }),
        )
        .with_description("Set permissions on the uploaded files"),
    )
}

fn register_publishing(
    registry: &mut TaskRegistry,
    site: &SiteConfig,
    collaborators: &Collaborators,
) -> SitepipeResult<()> {
    let vcs = &collaborators.vcs;
    let config = site.clone();

    let tasks = vec![
        Task::new(
            "git:branch:gh-pages",
            vcs_action(vcs, |v| async move { v.create_branch(PUBLISH_BRANCH).await }),
        ),
        Task::new(
            "git:co:gh-pages",
            vcs_action(vcs, |v| async move { v.checkout(PUBLISH_BRANCH).await }),
        ),
        Task::new("git:fetch", vcs_action(vcs, |v| async move { v.fetch_all().await })),
        Task::new(
            "git:commit:gh-pages",
            vcs_action(vcs, move |v| commit_publication(v, config.clone())),
        )
        .with_description("Commit the published files, even if unchanged"),
        Task::new(
            "git:push:gh-pages",
            vcs_action(vcs, |v| async move { v.push(PUBLISH_REMOTE, PUBLISH_BRANCH).await }),
        ),
        Task::new(
            "git:co:master",
            vcs_action(vcs, |v| async move { v.checkout(MAIN_BRANCH).await }),
        ),
        Task::new(
            "git:status",
            vcs_action(vcs, log_status),
        )
        .with_description("Show the working tree status"),
    ];
    for task in tasks {
        registry.register_task(task)?;
    }
    Ok(())
}

/// Stage whatever is publishable and commit it, even when nothing changed
async fn commit_publication(vcs: Arc<dyn VersionControl>, site: SiteConfig) -> Result<(), VcsError> {
    let entries = publishable_entries(&site).map_err(|e| VcsError::new("add", e.to_string()))?;
    vcs.add(&entries).await?;
    vcs.commit(PUBLISH_MESSAGE, CommitOptions::allow_empty()).await
}

async fn log_status(vcs: Arc<dyn VersionControl>) -> Result<(), VcsError> {
    let status = vcs.status().await?;
    for line in status.lines() {
        tracing::info!("{}", line);
    }
    Ok(())
}

fn register_serving(
    registry: &mut TaskRegistry,
    site: &SiteConfig,
    pipeline: &PipelineConfig,
    collaborators: &Collaborators,
) -> SitepipeResult<()> {
    let built = serve_config(pipeline, vec![site.build()]);
    let dev = serve_config(pipeline, vec![site.root.clone(), site.tmp()]);

    registry.register_task(
        Task::new("serve:built", serve_action(&collaborators.reload, built))
            .with_description("Serve the build directory with live reload"),
    )?;
    registry.register_task(
        Task::new("serve", serve_action(&collaborators.reload, dev))
            .with_description("Serve the site root and temp directory with live reload"),
    )
}

fn custom_task(config: &TaskConfig, site: &SiteConfig) -> SitepipeResult<Task> {
    let executor = CommandExecutor::new(&site.root);
    let dependencies = config.dependencies.clone().unwrap_or_default();

    let action = match (&config.script, &config.command) {
        (Some(_), Some(_)) => {
            return Err(SitepipeError::Config(format!(
                "task '{}' sets both script and command",
                config.name
            )))
        }
        (Some(script), None) => {
            let script = script.clone();
            TaskAction::run(move || {
                let executor = executor.clone();
                let script = script.clone();
                async move {
                    executor.execute_script(&script).await?;
                    Ok(())
                }
            })
        }
        (None, Some(command)) => {
            let command = command.substitute(&site.placeholders());
            TaskAction::run(move || {
                let executor = executor.clone();
                let command = command.clone();
                async move {
                    executor.execute_task_command(&command).await?;
                    Ok(())
                }
            })
        }
        (None, None) if !dependencies.is_empty() => TaskAction::Noop,
        (None, None) => {
            return Err(SitepipeError::Config(format!(
                "task '{}' needs a script, a command or dependencies",
                config.name
            )))
        }
    };

    let mut task = Task::new(config.name.clone(), action).with_prerequisites(dependencies);
    if let Some(description) = &config.description {
        task = task.with_description(description.clone());
    }
    Ok(task)
}

fn transform_action(
    step: &'static str,
    transform: Option<Arc<dyn Transform>>,
    inputs: Vec<String>,
    destination: PathBuf,
) -> TaskAction {
    TaskAction::run(move || {
        let transform = transform.clone();
        let inputs = inputs.clone();
        let destination = destination.clone();
        async move {
            match transform {
                Some(transform) => {
                    tracing::debug!(step, tool = transform.name(), "applying transform");
                    transform.apply(&inputs, &destination).await?;
                }
                None => tracing::warn!(step, "no command configured for step, skipping"),
            }
            Ok(())
        }
    })
}

fn clean_dir_action(dir: PathBuf) -> TaskAction {
    TaskAction::run(move || {
        let dir = dir.clone();
        async move { remove_path(&dir).await }
    })
}

/// Remove a file or directory tree; a missing path is already clean
async fn remove_path(path: &Path) -> anyhow::Result<()> {
    let result = if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

fn vcs_action<F, Fut>(vcs: &Arc<dyn VersionControl>, operation: F) -> TaskAction
where
    F: Fn(Arc<dyn VersionControl>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), VcsError>> + Send + 'static,
{
    let vcs = Arc::clone(vcs);
    TaskAction::run(move || {
        let call = operation(Arc::clone(&vcs));
        async move {
            call.await?;
            Ok(())
        }
    })
}

fn transfer_action<F, Fut>(transfer: Option<Arc<dyn FileTransfer>>, operation: F) -> TaskAction
where
    F: Fn(Arc<dyn FileTransfer>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TransferError>> + Send + 'static,
{
    TaskAction::run(move || {
        let call = transfer.clone().map(&operation);
        async move {
            match call {
                Some(call) => call.await?,
                None => {
                    return Err(TransferError::MissingCredentials(
                        "FTP_HOST, FTP_USER, FTP_PASSWORD".to_string(),
                    )
                    .into())
                }
            }
            Ok(())
        }
    })
}

fn serve_action(reload: &Arc<dyn LiveReload>, config: ServeConfig) -> TaskAction {
    let reload = Arc::clone(reload);
    TaskAction::run(move || {
        let reload = Arc::clone(&reload);
        let config = config.clone();
        async move {
            reload.start(config).await?;
            Ok(())
        }
    })
}

/// Recording collaborators for tests
#[cfg(test)]
pub(crate) mod fakes {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use sitepipe_collaborators::{
        CommitOptions, FileTransfer, LiveReload, ReloadError, ServeConfig, TransferError, Transform,
        TransformError, VcsError, VersionControl,
    };

    use super::{Collaborators, STEP_NAMES};
    use crate::backends::CopyTransform;

    pub type CallLog = Arc<Mutex<Vec<String>>>;

    pub struct RecordingTransform {
        pub name: String,
        pub log: CallLog,
        pub fail: bool,
    }

    #[async_trait]
    impl Transform for RecordingTransform {
        fn name(&self) -> &str {
            &self.name
        }

        async fn apply(&self, _inputs: &[String], destination: &Path) -> Result<(), TransformError> {
            self.log.lock().unwrap().push(format!("transform:{}", self.name));
            if self.fail {
                return Err(TransformError::tool(&self.name, "boom"));
            }
            tokio::fs::create_dir_all(destination).await?;
            Ok(())
        }
    }

    pub struct RecordingVcs {
        pub log: CallLog,
    }

    impl RecordingVcs {
        fn record(&self, call: String) -> Result<(), VcsError> {
            self.log.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl VersionControl for RecordingVcs {
        async fn create_branch(&self, branch: &str) -> Result<(), VcsError> {
            self.record(format!("git:branch {}", branch))
        }

        async fn checkout(&self, branch: &str) -> Result<(), VcsError> {
            self.record(format!("git:checkout {}", branch))
        }

        async fn fetch_all(&self) -> Result<(), VcsError> {
            self.record("git:fetch".to_string())
        }

        async fn add(&self, pathspecs: &[String]) -> Result<(), VcsError> {
            self.record(format!("git:add {}", pathspecs.join(" ")))
        }

        async fn commit(&self, message: &str, options: CommitOptions) -> Result<(), VcsError> {
            self.record(format!("git:commit {} allow_empty={}", message, options.allow_empty))
        }

        async fn push(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
            self.record(format!("git:push {} {}", remote, branch))
        }

        async fn status(&self) -> Result<String, VcsError> {
            self.record("git:status".to_string())?;
            Ok(String::new())
        }
    }

    pub struct RecordingTransfer {
        pub log: CallLog,
    }

    #[async_trait]
    impl FileTransfer for RecordingTransfer {
        async fn clean_remote(&self) -> Result<(), TransferError> {
            self.log.lock().unwrap().push("ftp:clean".to_string());
            Ok(())
        }

        async fn upload_all(&self, local_dir: &Path) -> Result<(), TransferError> {
            let name = local_dir.file_name().map(|n| n.to_string_lossy().into_owned());
            self.log
                .lock()
                .unwrap()
                .push(format!("ftp:send {}", name.unwrap_or_default()));
            Ok(())
        }

        async fn set_permissions(&self, mode: &str) -> Result<(), TransferError> {
            self.log.lock().unwrap().push(format!("ftp:chmod {}", mode));
            Ok(())
        }
    }

    pub struct RecordingReload {
        pub log: CallLog,
        pub started: Mutex<Vec<ServeConfig>>,
    }

    #[async_trait]
    impl LiveReload for RecordingReload {
        async fn start(&self, config: ServeConfig) -> Result<(), ReloadError> {
            self.log.lock().unwrap().push("reload:start".to_string());
            self.started.lock().unwrap().push(config);
            Ok(())
        }

        fn notify(&self, changed: &[PathBuf]) {
            self.log
                .lock()
                .unwrap()
                .push(format!("reload:notify {}", changed.len()));
        }
    }

    /// Recording collaborators for every step, real copies under `root`
    pub fn collaborators(root: &Path, log: &CallLog, with_transfer: bool) -> Collaborators {
        let transforms = STEP_NAMES
            .iter()
            .map(|name| {
                let transform: Arc<dyn Transform> = Arc::new(RecordingTransform {
                    name: name.to_string(),
                    log: Arc::clone(log),
                    fail: false,
                });
                (name.to_string(), transform)
            })
            .collect();
        Collaborators {
            transforms,
            copier: Arc::new(CopyTransform::new(root)),
            vcs: Arc::new(RecordingVcs { log: Arc::clone(log) }),
            transfer: with_transfer.then(|| {
                Arc::new(RecordingTransfer { log: Arc::clone(log) }) as Arc<dyn FileTransfer>
            }),
            reload: Arc::new(RecordingReload {
                log: Arc::clone(log),
                started: Mutex::new(Vec::new()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{self, CallLog};
    use super::*;
    use crate::configs::pipeline::parse_pipeline_config;
    use crate::execution::runner::TaskRunner;
    use crate::resolver::plan;
    use std::fs;
    use std::sync::Mutex;

    fn site(root: &Path) -> SiteConfig {
        SiteConfig::from_lookup(root, |_| None).unwrap()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_build_expands_to_original_stack() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let config = site(temp_dir.path());
        let pipeline = SitePipeline::build(
            &config,
            &PipelineConfig::default(),
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .unwrap();

        let plan = plan(pipeline.registry(), &["build"]).unwrap();
        assert_eq!(
            plan.tasks(),
            &[
                "clean:tmp",
                "clean:build",
                "contents",
                "sass",
                "wiredep",
                "ngTemplates",
                "js",
                "images",
                "fonts",
                "default",
                "minify",
                "uglify",
                "prepare",
                "build",
            ]
        );
        assert!(!needs_transfer(&plan));
    }

    #[test]
    fn test_every_composite_plans() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let pipeline = SitePipeline::build(
            &site(temp_dir.path()),
            &PipelineConfig::default(),
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .unwrap();
        pipeline.registry().validate().unwrap();

        let ftp = plan(pipeline.registry(), &["build:ftp"]).unwrap();
        assert!(needs_transfer(&ftp));
        assert!(ftp.position("prepare").unwrap() < ftp.position("ftp:clean").unwrap());
    }

    #[tokio::test]
    async fn test_gh_pages_publication_sequence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(&root.join("src/images/logo.png"));
        touch(&root.join("src/fonts/site.woff2"));
        // Leftovers from the previous publication
        touch(&root.join("old.html"));
        touch(&root.join("js/stale.js"));
        touch(&root.join("README.md"));

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let config = site(root);
        let pipeline = SitePipeline::build(
            &config,
            &PipelineConfig::default(),
            fakes::collaborators(root, &log, false),
        )
        .unwrap();

        let plan = plan(pipeline.registry(), &["build:gh-pages"]).unwrap();
        let report = TaskRunner::new(pipeline.registry())
            .run_sequential(&plan)
            .await
            .unwrap();
        assert!(report.is_success());

        // Published assets land in the root and the build dir is gone
        assert!(root.join("images/logo.png").exists());
        assert!(root.join("fonts/site.woff2").exists());
        assert!(!root.join("old.html").exists());
        assert!(!root.join("js/stale.js").exists());
        assert!(root.join("README.md").exists());
        assert!(!root.join("dist").exists());
        assert!(root.join("src/images/logo.png").exists());

        let calls = log.lock().unwrap().clone();
        let git: Vec<&str> = calls
            .iter()
            .map(String::as_str)
            .filter(|c| c.starts_with("git:"))
            .collect();
        assert_eq!(
            git,
            vec![
                "git:branch gh-pages",
                "git:checkout gh-pages",
                "git:fetch",
                "git:add fonts images",
                "git:commit Automatic publication allow_empty=true",
                "git:push origin gh-pages",
                "git:checkout master",
            ]
        );
    }

    #[tokio::test]
    async fn test_parallel_uglify_runs_both_steps() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let pipeline = SitePipeline::build(
            &site(temp_dir.path()),
            &PipelineConfig::default(),
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .unwrap();

        let plan = plan(pipeline.registry(), &["uglify"]).unwrap();
        TaskRunner::new(pipeline.registry())
            .run_sequential(&plan)
            .await
            .unwrap();

        let mut calls = log.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["transform:uglify:css", "transform:uglify:js"]);
    }

    #[tokio::test]
    async fn test_unconfigured_step_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut collaborators = fakes::collaborators(temp_dir.path(), &log, false);
        collaborators.transforms.remove("sass");
        let pipeline =
            SitePipeline::build(&site(temp_dir.path()), &PipelineConfig::default(), collaborators)
                .unwrap();

        let plan = plan(pipeline.registry(), &["sass"]).unwrap();
        let report = TaskRunner::new(pipeline.registry())
            .run_sequential(&plan)
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ftp_without_credentials_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let pipeline = SitePipeline::build(
            &site(temp_dir.path()),
            &PipelineConfig::default(),
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .unwrap();

        let plan = plan(pipeline.registry(), &["ftp"]).unwrap();
        let err = TaskRunner::new(pipeline.registry())
            .run_sequential(&plan)
            .await
            .unwrap_err();
        match err {
            SitepipeError::TaskExecution { task, cause } => {
                assert_eq!(task, "ftp:clean");
                assert!(cause.contains("FTP_HOST"), "{cause}");
            }
            other => panic!("expected task failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ftp_sequence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let pipeline = SitePipeline::build(
            &site(temp_dir.path()),
            &PipelineConfig::default(),
            fakes::collaborators(temp_dir.path(), &log, true),
        )
        .unwrap();

        let plan = plan(pipeline.registry(), &["ftp"]).unwrap();
        TaskRunner::new(pipeline.registry())
            .run_sequential(&plan)
            .await
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["ftp:clean", "ftp:send dist", "ftp:chmod 755"]
        );
    }

    #[test]
    fn test_unknown_step_is_a_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let pipeline_config = parse_pipeline_config("steps:\n  coffee: coffee -c src\n").unwrap();
        let err = SitePipeline::build(
            &site(temp_dir.path()),
            &pipeline_config,
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SitepipeError::Config(msg) if msg.contains("coffee")));
    }

    #[test]
    fn test_custom_tasks_may_reference_each_other_and_builtins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let yaml = r#"
tasks:
  - name: deploy-check
    dependencies: [lint, build]
  - name: lint
    command: ["eslint", "{srcDir}/ng"]
"#;
        let pipeline_config = parse_pipeline_config(yaml).unwrap();
        let pipeline = SitePipeline::build(
            &site(temp_dir.path()),
            &pipeline_config,
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .unwrap();

        let plan = plan(pipeline.registry(), &["deploy-check"]).unwrap();
        assert_eq!(plan.tasks().first().map(String::as_str), Some("lint"));
        assert_eq!(plan.tasks().last().map(String::as_str), Some("deploy-check"));
    }

    #[test]
    fn test_custom_task_clashing_with_builtin() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let pipeline_config =
            parse_pipeline_config("tasks:\n  - name: sass\n    command: sassc\n").unwrap();
        let err = SitePipeline::build(
            &site(temp_dir.path()),
            &pipeline_config,
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SitepipeError::DuplicateTask(name) if name == "sass"));
    }

    #[test]
    fn test_publishable_entries_skip_working_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        for dir in ["css", "js", "src", "dist", ".git"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        touch(&root.join("index.html"));
        touch(&root.join("bower.json"));

        let mut config = site(root);
        config.publish_globs.push("*".to_string());
        assert_eq!(
            publishable_entries(&config).unwrap(),
            vec!["bower.json", "css", "index.html", "js"]
        );
    }

    #[test]
    fn test_serve_config_overrides() {
        let pipeline_config =
            parse_pipeline_config("serve:\n  port: 8080\n  injectFileTypes: [css]\n").unwrap();
        let config = serve_config(&pipeline_config, vec![PathBuf::from("dist")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.inject_file_types, vec!["css"]);
    }
}
