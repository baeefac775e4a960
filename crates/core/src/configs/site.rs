//! Site settings
//!
//! [`SiteConfig`] is built once at start-up and passed by reference to
//! everything that needs a directory or a credential. Values come from the
//! process environment first, then from an optional `.env` file in the site
//! root, then from defaults.

use std::collections::HashMap;
use std::env;
use std::path::{Component, Path, PathBuf};

use crate::types::{SitepipeError, SitepipeResult};

pub const DEFAULT_SRC_DIR: &str = "src";
pub const DEFAULT_BUILD_DIR: &str = "dist";
pub const DEFAULT_TMP_DIR: &str = ".tmp";
pub const DEFAULT_CONTENT_DIR: &str = "contents";
pub const DEFAULT_PUBLISH_GLOBS: &[&str] = &["css", "fonts", "images", "js", "*.html"];
pub const DEFAULT_FTP_REMOTE_DIR: &str = "/";
pub const DEFAULT_FTP_PERMISSIONS: &str = "755";

const ENV_FILE: &str = ".env";

/// Immutable build settings for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub root: PathBuf,
    pub src_dir: PathBuf,
    pub build_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub content_dir: PathBuf,
    /// Top-level entries of the site root that make up the published site
    pub publish_globs: Vec<String>,
    /// Deployment environment name (`ENV`)
    pub env: Option<String>,
    pub ftp: FtpSettings,
}

/// File-transfer settings; credentials are only checked when a transfer is planned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtpSettings {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub remote_dir: String,
    pub permissions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub remote_dir: String,
    pub permissions: String,
}

impl FtpSettings {
    /// Complete credentials, or a configuration error naming every missing variable
    pub fn credentials(&self) -> SitepipeResult<FtpCredentials> {
        let missing: Vec<&str> = [
            ("FTP_HOST", &self.host),
            ("FTP_USER", &self.user),
            ("FTP_PASSWORD", &self.password),
        ]
        .iter()
        .filter(|(_, value)| value.as_deref().map(str::is_empty).unwrap_or(true))
        .map(|(name, _)| *name)
        .collect();

        match (&self.host, &self.user, &self.password) {
            (Some(host), Some(user), Some(password)) if missing.is_empty() => Ok(FtpCredentials {
                host: host.clone(),
                user: user.clone(),
                password: password.clone(),
                remote_dir: self.remote_dir.clone(),
                permissions: self.permissions.clone(),
            }),
            _ => Err(SitepipeError::Config(format!(
                "file transfer requested but {} not set",
                missing.join(", ")
            ))),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

impl SiteConfig {
    /// Load settings for the site rooted at `root`
    pub fn load(root: &Path) -> SitepipeResult<Self> {
        let dotenv = read_env_file(&root.join(ENV_FILE))?;
        Self::from_lookup(root, |key| {
            env::var(key)
                .ok()
                .or_else(|| dotenv.get(key).cloned())
        })
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(root: &Path, lookup: F) -> SitepipeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dir = |key: &str, default: &str| -> SitepipeResult<PathBuf> {
            let value = lookup(key).unwrap_or_else(|| default.to_string());
            validate_relative_dir(key, &value)
        };

        let config = Self {
            root: root.to_path_buf(),
            src_dir: dir("SITEPIPE_SRC_DIR", DEFAULT_SRC_DIR)?,
            build_dir: dir("SITEPIPE_BUILD_DIR", DEFAULT_BUILD_DIR)?,
            tmp_dir: dir("SITEPIPE_TMP_DIR", DEFAULT_TMP_DIR)?,
            content_dir: dir("SITEPIPE_CONTENT_DIR", DEFAULT_CONTENT_DIR)?,
            publish_globs: lookup("SITEPIPE_PUBLISH_GLOBS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_else(|| DEFAULT_PUBLISH_GLOBS.iter().map(|s| s.to_string()).collect()),
            env: lookup("ENV").filter(|v| !v.is_empty()),
            ftp: FtpSettings {
                host: lookup("FTP_HOST"),
                user: lookup("FTP_USER"),
                password: lookup("FTP_PASSWORD"),
                remote_dir: lookup("FTP_REMOTE_DIR")
                    .unwrap_or_else(|| DEFAULT_FTP_REMOTE_DIR.to_string()),
                permissions: lookup("FTP_CHMOD")
                    .unwrap_or_else(|| DEFAULT_FTP_PERMISSIONS.to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SitepipeResult<()> {
        let dirs = [
            ("source", &self.src_dir),
            ("build", &self.build_dir),
            ("temp", &self.tmp_dir),
            ("content", &self.content_dir),
        ];
        // Cleaning one directory must never wipe another
        for (i, (name, dir)) in dirs.iter().enumerate() {
            for (other_name, other) in &dirs[i + 1..] {
                if dir.starts_with(other) || other.starts_with(dir) {
                    return Err(SitepipeError::Config(format!(
                        "{} and {} directories overlap: '{}' and '{}'",
                        name,
                        other_name,
                        dir.display(),
                        other.display()
                    )));
                }
            }
        }
        if self.publish_globs.is_empty() {
            return Err(SitepipeError::Config(
                "SITEPIPE_PUBLISH_GLOBS must name at least one entry".to_string(),
            ));
        }
        Ok(())
    }

    pub fn src(&self) -> PathBuf {
        self.root.join(&self.src_dir)
    }

    pub fn build(&self) -> PathBuf {
        self.root.join(&self.build_dir)
    }

    pub fn tmp(&self) -> PathBuf {
        self.root.join(&self.tmp_dir)
    }

    pub fn content(&self) -> PathBuf {
        self.root.join(&self.content_dir)
    }

    /// Placeholder values available to configured step commands
    pub fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("srcDir", self.src_dir.display().to_string()),
            ("buildDir", self.build_dir.display().to_string()),
            ("tmpDir", self.tmp_dir.display().to_string()),
            ("contentDir", self.content_dir.display().to_string()),
            ("env", self.env.clone().unwrap_or_default()),
        ]
    }
}

/// Directories are cleaned wholesale, so they must stay strictly inside the site root
fn validate_relative_dir(key: &str, value: &str) -> SitepipeResult<PathBuf> {
    let path = Path::new(value.trim());
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    // `./dist` and `dist` name the same directory
    let normalized: PathBuf = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if escapes || normalized.as_os_str().is_empty() {
        return Err(SitepipeError::Config(format!(
            "{} must be a sub-directory of the site root, got '{}'",
            key, value
        )));
    }
    Ok(normalized)
}

fn read_env_file(path: &Path) -> SitepipeResult<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        SitepipeError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            SitepipeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        vars.insert(key, value);
    }
    Ok(vars)
}
