//! Configuration surface (§6). Loaded from the first `config.toml` found on
//! a small search path, then overridden key-by-key from `APP_`-prefixed
//! environment variables — the same load-then-override shape the teacher
//! uses, with `figment`-style layering done by hand since the teacher never
//! pulls in a config crate either.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_MIN_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub downloads_dir: String,
    pub storage_dir: String,
    pub video_dir: String,
    pub trash_dir: String,
    pub cache_dir: String,
    pub config_dir: String,

    pub database_url: String,

    pub tmdb_api_key: Option<String>,
    pub tvdb_api_key: Option<String>,

    pub min_file_size_bytes: u64,
    pub max_files_per_subdir: u32,
    pub match_score_threshold: f64,

    pub observability: ObservabilityConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub log_rotation_size_bytes: u64,
    pub log_retention_count: u32,
    pub metrics_enabled: bool,
    pub metrics_port: Option<u16>,
    pub loki_enabled: bool,
    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            log_rotation_size_bytes: 10 * 1024 * 1024,
            log_retention_count: 5,
            metrics_enabled: true,
            metrics_port: Some(9090),
            loki_enabled: false,
            loki_url: "http://127.0.0.1:3100".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub cron_expression: String,
    pub association_scan_cron_expression: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cron_expression: "0 0 * * * *".to_string(),
            association_scan_cron_expression: "0 0 3 * * *".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads_dir: "./downloads".to_string(),
            storage_dir: "./storage".to_string(),
            video_dir: "./video".to_string(),
            trash_dir: "./trash".to_string(),
            cache_dir: "./cache".to_string(),
            config_dir: "./config".to_string(),
            database_url: "sqlite://data/cinevault.db?mode=rwc".to_string(),
            tmdb_api_key: None,
            tvdb_api_key: None,
            min_file_size_bytes: DEFAULT_MIN_FILE_SIZE_BYTES,
            max_files_per_subdir: 500,
            match_score_threshold: 85.0,
            observability: ObservabilityConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = paths
            .iter()
            .find(|p| p.exists())
            .map_or_else(
                || {
                    info!("no config file found, using defaults");
                    Ok(Self::default())
                },
                |path| {
                    info!(path = %path.display(), "loading config");
                    Self::load_from_path(path)
                },
            )?;

        config.apply_env_overrides();
        config.expand_tildes();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::default_config_path())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to_path(&path)?;
        info!(path = %path.display(), "created default config file");
        Ok(true)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cinevault").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".cinevault").join("config.toml"));
        }
        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Every key on the table in §6 is overridable via `APP_<KEY>` in
    /// SCREAMING_SNAKE_CASE. Unset variables leave the loaded value alone.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_var("APP_DOWNLOADS_DIR") {
            self.downloads_dir = v;
        }
        if let Some(v) = env_var("APP_STORAGE_DIR") {
            self.storage_dir = v;
        }
        if let Some(v) = env_var("APP_VIDEO_DIR") {
            self.video_dir = v;
        }
        if let Some(v) = env_var("APP_TRASH_DIR") {
            self.trash_dir = v;
        }
        if let Some(v) = env_var("APP_CACHE_DIR") {
            self.cache_dir = v;
        }
        if let Some(v) = env_var("APP_DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = env_var("APP_TMDB_API_KEY") {
            self.tmdb_api_key = Some(v);
        }
        if let Some(v) = env_var("APP_TVDB_API_KEY") {
            self.tvdb_api_key = Some(v);
        }
        if let Some(v) = env_var("APP_MIN_FILE_SIZE_BYTES").and_then(|v| v.parse().ok()) {
            self.min_file_size_bytes = v;
        }
        if let Some(v) = env_var("APP_MAX_FILES_PER_SUBDIR").and_then(|v| v.parse().ok()) {
            self.max_files_per_subdir = v;
        }
        if let Some(v) = env_var("APP_MATCH_SCORE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.match_score_threshold = v;
        }
        if let Some(v) = env_var("APP_LOG_LEVEL") {
            self.observability.log_level = v;
        }
        if let Some(v) = env_var("APP_LOG_FILE") {
            self.observability.log_file = Some(v);
        }
    }

    fn expand_tildes(&mut self) {
        self.downloads_dir = expand_tilde(&self.downloads_dir);
        self.storage_dir = expand_tilde(&self.storage_dir);
        self.video_dir = expand_tilde(&self.video_dir);
        self.trash_dir = expand_tilde(&self.trash_dir);
        self.cache_dir = expand_tilde(&self.cache_dir);
        self.config_dir = expand_tilde(&self.config_dir);
    }

    pub fn validate(&self) -> Result<()> {
        if self.downloads_dir.is_empty() {
            anyhow::bail!("downloads_dir cannot be empty");
        }
        if self.storage_dir.is_empty() {
            anyhow::bail!("storage_dir cannot be empty");
        }
        if self.video_dir.is_empty() {
            anyhow::bail!("video_dir cannot be empty");
        }
        if !(0.0..=100.0).contains(&self.match_score_threshold) {
            anyhow::bail!("match_score_threshold must be between 0 and 100");
        }
        if self.tmdb_api_key.is_none() && self.tvdb_api_key.is_none() {
            tracing::warn!("no catalog API keys configured; matching will fail for all items");
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_threshold() {
        let config = Config::default();
        assert!((config.match_score_threshold - 85.0).abs() < f64::EPSILON);
        assert_eq!(config.min_file_size_bytes, DEFAULT_MIN_FILE_SIZE_BYTES);
    }

    #[test]
    fn serializes_round_trip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.storage_dir, config.storage_dir);
    }

    #[test]
    fn validate_rejects_empty_roots() {
        let mut config = Config::default();
        config.downloads_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn expand_tilde_substitutes_home() {
        if let Some(home) = dirs::home_dir() {
            let expanded = expand_tilde("~/cinevault");
            assert_eq!(expanded, home.join("cinevault").to_string_lossy());
        }
    }
}
