//! Configuration with file and environment variable loading.
//!
//! Environment variables:
//! - `PROFILEKEEP_PROFILE_DIR`: Directory holding `<username>-<session>.json` files
//! - `PROFILEKEEP_BACKUP_DIR`: Directory receiving zip snapshots
//! - `PROFILEKEEP_ENABLE_BACKUP`: "true"/"1" to schedule backups
//! - `PROFILEKEEP_ENABLE_NAME_CHANGE`: "true"/"1" to install the dedup guard
//! - `PROFILEKEEP_BACKUP_INTERVAL`: Seconds between backups
//! - `PROFILEKEEP_COMPRESS_PROFILES`: "true"/"1" for single-line JSON
//!
//! File locations, first match wins:
//! 1. explicit path (`--config`)
//! 2. `./profilekeep.toml`
//! 3. `~/.config/profilekeep/config.toml`

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings for the guard, scheduler and archiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepConfig {
    /// Schedule periodic zip backups of `profile_dir`.
    #[serde(alias = "enableBackup")]
    pub enable_backup: bool,

    /// Install the dedup guard as the persistence strategy.
    #[serde(alias = "enableNameChange")]
    pub enable_name_change: bool,

    /// Minimum seconds between backups.
    #[serde(alias = "timeBetweenSavesSeconds")]
    pub time_between_saves_seconds: f64,

    pub profile_dir: PathBuf,

    pub backup_dir: PathBuf,

    /// Write profiles as single-line JSON.
    pub compress_profiles: bool,
}

impl Default for KeepConfig {
    fn default() -> Self {
        Self {
            enable_backup: true,
            enable_name_change: true,
            time_between_saves_seconds: 3600.0,
            profile_dir: PathBuf::from("user/profiles"),
            backup_dir: PathBuf::from("user/profiles_backups"),
            compress_profiles: false,
        }
    }
}

impl KeepConfig {
    /// Load from the first config file found, then apply environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match discover_config_file(config_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let applied = config.apply_env_overrides(|key| env::var(key).ok());
        if !applied.is_empty() {
            tracing::debug!(?applied, "applied environment overrides");
        }
        Ok(config)
    }

    /// Load from a TOML file.
    ///
    /// Reads a `[profilekeep]` section if present, otherwise the top-level table:
    /// ```toml
    /// [profilekeep]
    /// enable_backup = true
    /// time_between_saves_seconds = 1800
    /// profile_dir = "~/game/user/profiles"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table = contents.parse().context("failed to parse TOML")?;

        let section = match table.get("profilekeep") {
            Some(section) => section.clone(),
            None => toml::Value::Table(table),
        };
        let mut config: KeepConfig = section
            .try_into()
            .context("failed to parse profilekeep settings")?;

        config.profile_dir = expand_path(&config.profile_dir.to_string_lossy());
        config.backup_dir = expand_path(&config.backup_dir.to_string_lossy());
        Ok(config)
    }

    /// Apply `PROFILEKEEP_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric values are ignored. Returns the variables applied.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut applied = Vec::new();

        if let Some(v) = lookup("PROFILEKEEP_PROFILE_DIR") {
            self.profile_dir = expand_path(&v);
            applied.push("PROFILEKEEP_PROFILE_DIR".to_string());
        }
        if let Some(v) = lookup("PROFILEKEEP_BACKUP_DIR") {
            self.backup_dir = expand_path(&v);
            applied.push("PROFILEKEEP_BACKUP_DIR".to_string());
        }
        if let Some(v) = lookup("PROFILEKEEP_ENABLE_BACKUP") {
            self.enable_backup = parse_flag(&v);
            applied.push("PROFILEKEEP_ENABLE_BACKUP".to_string());
        }
        if let Some(v) = lookup("PROFILEKEEP_ENABLE_NAME_CHANGE") {
            self.enable_name_change = parse_flag(&v);
            applied.push("PROFILEKEEP_ENABLE_NAME_CHANGE".to_string());
        }
        if let Some(v) = lookup("PROFILEKEEP_BACKUP_INTERVAL") {
            if let Ok(secs) = v.parse::<f64>() {
                self.time_between_saves_seconds = secs;
                applied.push("PROFILEKEEP_BACKUP_INTERVAL".to_string());
            }
        }
        if let Some(v) = lookup("PROFILEKEEP_COMPRESS_PROFILES") {
            self.compress_profiles = parse_flag(&v);
            applied.push("PROFILEKEEP_COMPRESS_PROFILES".to_string());
        }

        applied
    }

    /// Backup interval as a `Duration`. Negative or NaN values clamp to zero.
    pub fn backup_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_between_saves_seconds).unwrap_or(Duration::ZERO)
    }
}

fn parse_flag(v: &str) -> bool {
    v.eq_ignore_ascii_case("true") || v == "1"
}

/// First existing config file, in priority order.
pub fn discover_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from("profilekeep.toml");
    if local.exists() {
        return Some(local);
    }

    directories::BaseDirs::new()
        .map(|d| d.config_dir().join("profilekeep/config.toml"))
        .filter(|p| p.exists())
}

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
