//! TOML-based device configuration.
//!
//! Stores the timing constants of a scoring box:
//! - Arbitration window and evaluation delay
//! - Buzzer and light durations, indicator lock wait
//! - Match preset, rest length and clock second length
//! - Poll interval of the live loop
//!
//! Configuration is stored at `~/.config/touchbox/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::data_dir;
use crate::clock::{DurationPreset, DEFAULT_REST_SECS};
use crate::error::{ConfigError, CoreError, Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_eval_delay_ms")]
    pub eval_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectsConfig {
    #[serde(default = "default_buzzer_ms")]
    pub buzzer_ms: u64,
    #[serde(default = "default_light_ms")]
    pub light_ms: u64,
    #[serde(default = "default_lock_wait_ms")]
    pub indicator_lock_wait_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default)]
    pub duration: DurationPreset,
    #[serde(default = "default_rest_secs")]
    pub rest_secs: u32,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Device configuration.
///
/// Serialized to/from TOML at `~/.config/touchbox/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub arbitration: ArbitrationConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

// Default functions
fn default_window_ms() -> u64 {
    40
}
fn default_eval_delay_ms() -> u64 {
    45
}
fn default_buzzer_ms() -> u64 {
    800
}
fn default_light_ms() -> u64 {
    3000
}
fn default_lock_wait_ms() -> u64 {
    10
}
fn default_rest_secs() -> u32 {
    DEFAULT_REST_SECS
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_poll_interval_ms() -> u64 {
    1
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            eval_delay_ms: default_eval_delay_ms(),
        }
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            buzzer_ms: default_buzzer_ms(),
            light_ms: default_light_ms(),
            indicator_lock_wait_ms: default_lock_wait_ms(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            duration: DurationPreset::default(),
            rest_secs: default_rest_secs(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                info!(path = %path.display(), "wrote default config");
                Ok(cfg)
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
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

    /// Set a config value by key. The result must still validate.
    ///
    /// Does not save; call [`Config::save_to`] afterwards.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check the timing relations the core relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let a = &self.arbitration;
        if a.window_ms > a.eval_delay_ms {
            return Err(ValidationError::WindowExceedsDelay {
                window_ms: a.window_ms,
                eval_delay_ms: a.eval_delay_ms,
            });
        }
        let e = &self.effects;
        if e.buzzer_ms >= e.light_ms {
            return Err(ValidationError::BuzzerOutlastsLights {
                buzzer_ms: e.buzzer_ms,
                light_ms: e.light_ms,
            });
        }
        for (field, value) in [
            ("effects.indicator_lock_wait_ms", e.indicator_lock_wait_ms),
            ("clock.rest_secs", u64::from(self.clock.rest_secs)),
            ("clock.tick_ms", self.clock.tick_ms),
            ("runtime.poll_interval_ms", self.runtime.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ValidationError::Zero { field });
            }
        }
        Ok(())
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
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.arbitration.window_ms, 40);
        assert_eq!(cfg.arbitration.eval_delay_ms, 45);
        assert_eq!(cfg.effects.buzzer_ms, 800);
        assert_eq!(cfg.effects.light_ms, 3000);
        assert_eq!(cfg.effects.indicator_lock_wait_ms, 10);
        assert_eq!(cfg.clock.duration, DurationPreset::Preset180);
        assert_eq!(cfg.clock.rest_secs, 60);
        assert_eq!(cfg.clock.tick_ms, 1000);
        assert_eq!(cfg.runtime.poll_interval_ms, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[clock]\nduration = \"preset300\"\n").unwrap();
        assert_eq!(cfg.clock.duration, DurationPreset::Preset300);
        assert_eq!(cfg.clock.rest_secs, 60);
        assert_eq!(cfg.arbitration, ArbitrationConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("arbitration.window_ms").as_deref(), Some("40"));
        assert_eq!(cfg.get("clock.duration").as_deref(), Some("preset180"));
        assert!(cfg.get("clock.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_number_and_enum() {
        let mut cfg = Config::default();
        cfg.set("effects.light_ms", "2500").unwrap();
        cfg.set("clock.duration", "preset300").unwrap();
        assert_eq!(cfg.effects.light_ms, 2500);
        assert_eq!(cfg.clock.duration, DurationPreset::Preset300);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("clock.nonexistent", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("arbitration.window_ms", "soon").is_err());
        assert!(cfg.set("clock.duration", "preset240").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_values_that_break_timing() {
        let mut cfg = Config::default();
        let err = cfg.set("arbitration.window_ms", "50").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::WindowExceedsDelay { .. })
        ));
        assert_eq!(cfg.arbitration.window_ms, 40);
    }

    #[test]
    fn validate_catches_zero_and_inverted_effects() {
        let mut cfg = Config::default();
        cfg.effects.buzzer_ms = 3000;
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::BuzzerOutlastsLights { .. })
        ));

        let mut cfg = Config::default();
        cfg.clock.tick_ms = 0;
        assert_eq!(
            cfg.validate(),
            Err(ValidationError::Zero {
                field: "clock.tick_ms"
            })
        );
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("clock.rest_secs", "30").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.clock.rest_secs, 30);
    }

    #[test]
    fn broken_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[clock\nrest_secs = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::LoadFailed { .. })));
    }
}
