//! TOML-based application configuration.
//!
//! Stores:
//! - The default owner used by the CLI
//! - Scheduler settings (working window, window source, day walk, horizon ceiling)
//! - Block splitting defaults
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::{DayWalkStart, WindowSource};

/// Scheduler configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Working window start, `HH:MM`
    #[serde(default = "default_day_start")]
    pub day_start: String,
    /// Working window end, `HH:MM`
    #[serde(default = "default_day_end")]
    pub day_end: String,
    #[serde(default)]
    pub window_source: WindowSource,
    #[serde(default)]
    pub day_walk_start: DayWalkStart,
    /// Upper bound on days walked per task
    #[serde(default = "default_max_horizon_days")]
    pub max_horizon_days: u32,
    #[serde(default)]
    pub min_slot_minutes: u32,
}

/// Block splitting defaults used when the caller leaves a field out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplittingSection {
    #[serde(default = "default_block_minutes")]
    pub default_block_minutes: u32,
    #[serde(default = "default_importance")]
    pub default_importance: u8,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub splitting: SplittingSection,
}

// Default functions
fn default_owner() -> String {
    "local".into()
}
fn default_day_start() -> String {
    "08:00".into()
}
fn default_day_end() -> String {
    "22:00".into()
}
fn default_max_horizon_days() -> u32 {
    366
}
fn default_block_minutes() -> u32 {
    30
}
fn default_importance() -> u8 {
    crate::schedule::DEFAULT_IMPORTANCE
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            window_source: WindowSource::default(),
            day_walk_start: DayWalkStart::default(),
            max_horizon_days: default_max_horizon_days(),
            min_slot_minutes: 0,
        }
    }
}

impl Default for SplittingSection {
    fn default() -> Self {
        Self {
            default_block_minutes: default_block_minutes(),
            default_importance: default_importance(),
        }
    }
}

impl SplittingSection {
    /// Both defaults are handed to the splitter and must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str| ConfigError::InvalidValue {
            key: format!("splitting.{key}"),
            message: "must be at least 1".to_string(),
        };
        if self.default_block_minutes == 0 {
            return Err(invalid("default_block_minutes"));
        }
        if self.default_importance == 0 {
            return Err(invalid("default_importance"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            scheduler: SchedulerSection::default(),
            splitting: SplittingSection::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, returning the default when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    ///
    /// The change is only applied when the resulting configuration still
    /// yields a valid scheduler configuration and valid splitting defaults.
    /// Call [`Config::save`] to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        crate::scheduler::SchedulerConfig::try_from(&updated)?;
        updated.splitting.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.owner, "local");
        assert_eq!(parsed.scheduler.day_start, "08:00");
        assert_eq!(parsed.scheduler.window_source, WindowSource::Fixed);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: Config = toml::from_str(
            "owner = \"alice\"\n[scheduler]\nwindow_source = \"working_hours\"\n",
        )
        .unwrap();
        assert_eq!(parsed.owner, "alice");
        assert_eq!(parsed.scheduler.window_source, WindowSource::WorkingHours);
        assert_eq!(parsed.scheduler.day_end, "22:00");
        assert_eq!(parsed.scheduler.max_horizon_days, 366);
        assert_eq!(parsed.splitting.default_block_minutes, 30);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduler.day_start").as_deref(), Some("08:00"));
        assert_eq!(cfg.get("scheduler.max_horizon_days").as_deref(), Some("366"));
        assert_eq!(cfg.get("scheduler.day_walk_start").as_deref(), Some("today"));
        assert!(cfg.get("scheduler.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("scheduler.day_end", "20:30").unwrap();
        cfg.set("scheduler.max_horizon_days", "30").unwrap();
        cfg.set("scheduler.day_walk_start", "task_start").unwrap();
        cfg.set("owner", "bob").unwrap();
        assert_eq!(cfg.scheduler.day_end, "20:30");
        assert_eq!(cfg.scheduler.max_horizon_days, 30);
        assert_eq!(cfg.scheduler.day_walk_start, DayWalkStart::TaskStart);
        assert_eq!(cfg.owner, "bob");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("scheduler.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_invalid_values_and_keeps_old_state() {
        let mut cfg = Config::default();
        assert!(cfg.set("scheduler.max_horizon_days", "soon").is_err());
        assert!(cfg.set("scheduler.window_source", "calendar").is_err());
        assert!(cfg.set("scheduler.day_start", "8 o'clock").is_err());
        assert!(cfg.set("scheduler.day_start", "23:00").is_err());
        assert_eq!(cfg.scheduler.day_start, "08:00");
        assert_eq!(cfg.scheduler.window_source, WindowSource::Fixed);
    }

    #[test]
    fn set_rejects_zero_splitting_defaults() {
        let mut cfg = Config::default();
        let err = cfg.set("splitting.default_block_minutes", "0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "splitting.default_block_minutes"
        ));
        assert!(cfg.set("splitting.default_importance", "0").is_err());
        assert_eq!(cfg.splitting.default_block_minutes, 30);
        assert_eq!(cfg.splitting.default_importance, default_importance());

        cfg.set("splitting.default_block_minutes", "45").unwrap();
        assert_eq!(cfg.splitting.default_block_minutes, 45);
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(Config::load_from(&path).unwrap().owner, "local");

        let mut cfg = Config::default();
        cfg.set("scheduler.min_slot_minutes", "15").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.scheduler.min_slot_minutes, 15);
    }

    #[test]
    fn load_from_reports_parse_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "owner = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
