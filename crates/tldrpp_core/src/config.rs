use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::safety::DEFAULT_DESTRUCTIVE_COMMANDS;

pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/tldr-pages/tldr/main/pages.json";
pub const DEFAULT_PAGES_BASE_URL: &str =
    "https://raw.githubusercontent.com/tldr-pages/tldr/main/pages";
pub const DEFAULT_USER_AGENT: &str = "tldrpp/0.2";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_PLATFORMS: &[&str] = &["common", "linux"];

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub cache_dir: Option<String>,
    pub platforms: Option<Vec<String>>,
    pub confirm_destructive: Option<bool>,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub safety: SafetySection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RemoteSection {
    pub index_url: Option<String>,
    pub pages_base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SafetySection {
    pub destructive_commands: Option<Vec<String>>,
}

/// Remote endpoints and HTTP settings after env and default resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub index_url: String,
    pub pages_base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub workers: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        AppConfig::default().remote_with_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn platforms(&self) -> Vec<String> {
        self.platforms.clone().unwrap_or_else(|| {
            DEFAULT_PLATFORMS
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }

    pub fn confirm_destructive(&self) -> bool {
        self.confirm_destructive.unwrap_or(true)
    }

    pub fn destructive_commands(&self) -> Vec<String> {
        self.safety.destructive_commands.clone().unwrap_or_else(|| {
            DEFAULT_DESTRUCTIVE_COMMANDS
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }

    /// Resolve remote settings: env > config > default.
    pub fn remote(&self) -> RemoteConfig {
        self.remote_with_lookup(|key| env::var(key).ok())
    }

    pub fn remote_with_lookup<F>(&self, lookup_env: F) -> RemoteConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup_env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let remote = &self.remote;
        RemoteConfig {
            index_url: lookup("TLDRPP_INDEX_URL")
                .or_else(|| remote.index_url.clone())
                .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
            pages_base_url: lookup("TLDRPP_PAGES_URL")
                .or_else(|| remote.pages_base_url.clone())
                .unwrap_or_else(|| DEFAULT_PAGES_BASE_URL.to_string()),
            timeout_ms: lookup("TLDRPP_HTTP_TIMEOUT_MS")
                .and_then(|value| value.parse::<u64>().ok())
                .or(remote.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            user_agent: lookup("TLDRPP_USER_AGENT")
                .or_else(|| remote.user_agent.clone())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            workers: lookup("TLDRPP_WORKERS")
                .and_then(|value| value.parse::<usize>().ok())
                .or(remote.workers)
                .unwrap_or(DEFAULT_WORKERS)
                .max(1),
        }
    }
}

/// Load an `AppConfig` from a TOML file. Returns defaults if the file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    if !config_path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: AppConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

pub fn render_default_config() -> String {
    let platforms = DEFAULT_PLATFORMS
        .iter()
        .map(|platform| format!("\"{platform}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "# tldrpp configuration (materialized by `tldrpp init`)\n\n# cache_dir = \"~/.cache/tldrpp/pages\"\nplatforms = [{platforms}]\nconfirm_destructive = true\n\n[remote]\n# index_url = \"{DEFAULT_INDEX_URL}\"\n# pages_base_url = \"{DEFAULT_PAGES_BASE_URL}\"\ntimeout_ms = {DEFAULT_TIMEOUT_MS}\n# user_agent = \"{DEFAULT_USER_AGENT}\"\nworkers = {DEFAULT_WORKERS}\n\n[safety]\n# Commands treated as destructive by `tldrpp exec`. Omit to use the built-in list.\n# destructive_commands = [\"rm\", \"dd\", \"mkfs\"]\n"
    )
}

/// Write the commented default config unless a file already exists.
/// Returns `true` when a write occurred.
pub fn materialize_default_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }
    let parent = config_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("config path has no parent: {}", config_path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    fs::write(config_path, render_default_config())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_resolves_builtin_values() {
        let config = AppConfig::default();
        assert_eq!(config.platforms(), vec!["common", "linux"]);
        assert!(config.confirm_destructive());
        assert!(config.destructive_commands().contains(&"rm".to_string()));

        let remote = config.remote_with_lookup(|_| None);
        assert_eq!(remote.index_url, DEFAULT_INDEX_URL);
        assert_eq!(remote.pages_base_url, DEFAULT_PAGES_BASE_URL);
        assert_eq!(remote.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(remote.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/tldrpp.toml")).expect("load config");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
cache_dir = "/srv/tldr"
platforms = ["osx"]
confirm_destructive = false

[remote]
index_url = "https://mirror.example.org/pages.json"
timeout_ms = 500
workers = 2

[safety]
destructive_commands = ["terraform"]
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.cache_dir.as_deref(), Some("/srv/tldr"));
        assert_eq!(config.platforms(), vec!["osx"]);
        assert!(!config.confirm_destructive());
        assert_eq!(config.destructive_commands(), vec!["terraform"]);

        let remote = config.remote_with_lookup(|_| None);
        assert_eq!(remote.index_url, "https://mirror.example.org/pages.json");
        assert_eq!(remote.pages_base_url, DEFAULT_PAGES_BASE_URL);
        assert_eq!(remote.timeout_ms, 500);
        assert_eq!(remote.workers, 2);
    }

    #[test]
    fn env_overrides_config_values() {
        let config = AppConfig {
            remote: RemoteSection {
                index_url: Some("https://config.example.org/pages.json".to_string()),
                workers: Some(3),
                ..RemoteSection::default()
            },
            ..AppConfig::default()
        };
        let remote = config.remote_with_lookup(|key| match key {
            "TLDRPP_INDEX_URL" => Some(" https://env.example.org/pages.json ".to_string()),
            "TLDRPP_WORKERS" => Some("0".to_string()),
            "TLDRPP_HTTP_TIMEOUT_MS" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(remote.index_url, "https://env.example.org/pages.json");
        assert_eq!(remote.workers, 1);
        assert_eq!(remote.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[remote\nindex_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn materialized_default_config_parses_and_is_not_overwritten() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("tldrpp").join("config.toml");

        assert!(materialize_default_config(&config_path).expect("write"));
        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.platforms(), vec!["common", "linux"]);
        assert_eq!(config.remote.workers, Some(DEFAULT_WORKERS));

        fs::write(&config_path, "platforms = [\"windows\"]\n").expect("edit config");
        assert!(!materialize_default_config(&config_path).expect("second write"));
        let config = load_config(&config_path).expect("reload config");
        assert_eq!(config.platforms(), vec!["windows"]);
    }
}
