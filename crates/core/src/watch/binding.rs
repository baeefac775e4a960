use std::path::Path;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::configs::pipeline::WatchConfig;
use crate::configs::site::SiteConfig;
use crate::types::{SitepipeError, SitepipeResult};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Glob patterns paired with the tasks a matching change re-runs
#[derive(Debug, Clone)]
pub struct WatchBinding {
    patterns: Vec<String>,
    tasks: Vec<String>,
    matcher: GlobSet,
}

impl WatchBinding {
    pub fn new<P, T>(patterns: P, tasks: T) -> SitepipeResult<Self>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let tasks: Vec<String> = tasks.into_iter().map(Into::into).collect();
        if patterns.is_empty() || tasks.is_empty() {
            return Err(SitepipeError::Config(
                "watch bindings need at least one pattern and one task".to_string(),
            ));
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                SitepipeError::Config(format!("invalid watch pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let matcher = builder
            .build()
            .map_err(|e| SitepipeError::Config(format!("invalid watch patterns: {}", e)))?;

        Ok(Self {
            patterns,
            tasks,
            matcher,
        })
    }

    /// `path` is relative to the site root
    pub fn matches(&self, path: &Path) -> bool {
        self.matcher.is_match(path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }
}

fn expand(pattern: &str, config: &SiteConfig) -> String {
    pattern
        .replace("{src}", &config.src_dir.display().to_string())
        .replace("{content}", &config.content_dir.display().to_string())
}

/// The site's standard bindings, one per source kind
pub fn default_bindings(config: &SiteConfig) -> SitepipeResult<Vec<WatchBinding>> {
    let table: [(&[&str], &str); 7] = [
        (&["bower.json"], "wiredep"),
        (&["{src}/sass/**/*.scss"], "sass"),
        (&["{src}/ng/**/*.js"], "js"),
        (&["{src}/ng/**/*.html"], "ngTemplates"),
        (
            &["{src}/render/**/*.{html,js}", "{content}/**/*.{json,md}"],
            "contents",
        ),
        (&["{src}/fonts/**/*.{eot,svg,ttf,woff,woff2}"], "fonts"),
        (&["{src}/images/**/*.{svg,jpg,png,gif}"], "images"),
    ];

    table
        .iter()
        .map(|(patterns, task)| {
            WatchBinding::new(patterns.iter().map(|p| expand(p, config)), [*task])
        })
        .collect()
}

/// Bindings and debounce window from `pipeline.yml`, falling back to the defaults
pub fn bindings_from_config(
    config: &SiteConfig,
    watch: Option<&WatchConfig>,
) -> SitepipeResult<(Vec<WatchBinding>, Duration)> {
    let debounce = watch
        .and_then(|w| w.debounce_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_DEBOUNCE);

    let bindings = match watch.and_then(|w| w.bindings.as_ref()) {
        Some(configured) => configured
            .iter()
            .map(|b| {
                WatchBinding::new(
                    b.patterns.iter().map(|p| expand(p, config)),
                    b.tasks.iter().cloned(),
                )
            })
            .collect::<SitepipeResult<Vec<_>>>()?,
        None => default_bindings(config)?,
    };

    Ok((bindings, debounce))
}
