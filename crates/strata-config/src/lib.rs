use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    #[serde(default = "default_max_stage_depth")]
    pub max_stage_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_stage_depth: default_max_stage_depth(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            load: LoadConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("strata.db")
}

fn default_max_stage_depth() -> usize {
    64
}

fn repo_default_config_path() -> PathBuf {
    PathBuf::from("strata.toml")
}

fn resolve_config_path_with_overrides(
    raw_path: Option<PathBuf>,
    env_keys: &[&str],
    repo_default: PathBuf,
) -> Option<PathBuf> {
    if let Some(path) = raw_path {
        return Some(path);
    }

    for key in env_keys {
        if let Ok(value) = std::env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
    }

    if repo_default.exists() {
        return Some(repo_default);
    }

    None
}

/// `None` means no config source anywhere; callers fall back to
/// `AppConfig::default()`.
pub fn resolve_config_path(raw_path: Option<PathBuf>) -> Option<PathBuf> {
    resolve_config_path_with_overrides(raw_path, &["STRATA_CONFIG"], repo_default_config_path())
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
    let cfg: AppConfig = toml::from_str(&content).context("failed to parse TOML config")?;
    Ok(cfg)
}
