use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cache::PageCache;
use crate::config::{AppConfig, load_config};
use crate::filesystem::normalize_for_display;

pub const APP_DIR_NAME: &str = "tldrpp";
pub const CONFIG_FILENAME: &str = "config.toml";
pub const EXEC_LOG_FILENAME: &str = "exec.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub config: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
    pub home_dir: Option<PathBuf>,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self {
            cwd,
            home_dir: dirs::home_dir(),
        })
    }

    /// `<home>` when known, otherwise the working directory.
    fn base_dir(&self) -> &Path {
        self.home_dir.as_deref().unwrap_or(&self.cwd)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub exec_log_path: PathBuf,
    pub config_source: ValueSource,
    pub cache_source: ValueSource,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "config_path={} ({})\ncache_dir={} ({})\nexec_log_path={}",
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
            normalize_for_display(&self.cache_dir),
            self.cache_source.as_str(),
            normalize_for_display(&self.exec_log_path),
        )
    }
}

/// Resolved paths plus the config they were read from.
#[derive(Debug, Clone)]
pub struct Runtime {
    pub paths: ResolvedPaths,
    pub config: AppConfig,
}

impl Runtime {
    pub fn resolve(context: &ResolutionContext, overrides: &PathOverrides) -> Result<Self> {
        Self::resolve_with_lookup(context, overrides, |key| env::var(key).ok())
    }

    pub fn resolve_with_lookup<F>(
        context: &ResolutionContext,
        overrides: &PathOverrides,
        lookup_env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup_env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
            (absolutize(path, &context.cwd), ValueSource::Flag)
        } else if let Some(value) = lookup("TLDRPP_CONFIG") {
            (absolutize(Path::new(&value), &context.cwd), ValueSource::Env)
        } else {
            (
                context
                    .base_dir()
                    .join(".config")
                    .join(APP_DIR_NAME)
                    .join(CONFIG_FILENAME),
                ValueSource::Default,
            )
        };

        let config = load_config(&config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;

        let (cache_dir, cache_source) = if let Some(path) = overrides.cache_dir.as_deref() {
            (absolutize(path, &context.cwd), ValueSource::Flag)
        } else if let Some(value) = lookup("TLDRPP_CACHE_DIR") {
            (absolutize(Path::new(&value), &context.cwd), ValueSource::Env)
        } else if let Some(value) = config.cache_dir.as_deref().map(str::trim)
            && !value.is_empty()
        {
            (expand_home(value, context), ValueSource::Config)
        } else {
            (
                context
                    .base_dir()
                    .join(".cache")
                    .join(APP_DIR_NAME)
                    .join("pages"),
                ValueSource::Default,
            )
        };

        let exec_log_path = cache_dir
            .parent()
            .unwrap_or(&cache_dir)
            .join(EXEC_LOG_FILENAME);

        Ok(Self {
            paths: ResolvedPaths {
                config_path,
                cache_dir,
                exec_log_path,
                config_source,
                cache_source,
            },
            config,
        })
    }

    pub fn page_cache(&self) -> PageCache {
        PageCache::new(&self.paths.cache_dir)
    }
}

fn expand_home(value: &str, context: &ResolutionContext) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        return context.base_dir().join(rest);
    }
    absolutize(Path::new(value), &context.cwd)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
