//! Addon Configuration
//!
//! Loaded from a TOML file; every key is optional. A missing file is
//! created with the defaults so operators have something to edit.
//!
//! ```toml
//! [display]
//! show_locked = true
//! icon_size = 16
//!
//! [auto_refresh]
//! enabled = true
//! interval = 60      # zero or less turns polling off
//!
//! [icons]
//! dir = "icons"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Failed to write default config: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Complete addon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub auto_refresh: AutoRefreshConfig,
    #[serde(default)]
    pub icons: IconsConfig,
}

/// How markers look
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Draw private waystones too
    #[serde(default = "default_true")]
    pub show_locked: bool,
    /// Icon edge length in pixels
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_locked: true,
            icon_size: default_icon_size(),
        }
    }
}

/// Periodic change detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoRefreshConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between catalog polls; zero or less disables polling
    #[serde(default = "default_interval")]
    pub interval: i64,
}

impl Default for AutoRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_interval(),
        }
    }
}

/// Where the icon images live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconsConfig {
    #[serde(default = "default_icons_dir")]
    pub dir: PathBuf,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            dir: default_icons_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_icon_size() -> u32 {
    16
}

fn default_interval() -> i64 {
    60
}

fn default_icons_dir() -> PathBuf {
    PathBuf::from("icons")
}

impl AddonConfig {
    /// Load from a TOML file, writing the defaults first if it is missing
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, toml::to_string_pretty(&config)?)?;
            tracing::info!(path = %path.display(), "Wrote default configuration");
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WAYMARK_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognised: `WAYMARK_SHOW_LOCKED`, `WAYMARK_ICON_SIZE`,
    /// `WAYMARK_REFRESH_ENABLED`, `WAYMARK_REFRESH_INTERVAL`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("WAYMARK_SHOW_LOCKED") {
            self.display.show_locked = parse_bool("WAYMARK_SHOW_LOCKED", &value)?;
        }
        if let Some(value) = lookup("WAYMARK_ICON_SIZE") {
            self.display.icon_size = parse_number("WAYMARK_ICON_SIZE", &value)?;
        }
        if let Some(value) = lookup("WAYMARK_REFRESH_ENABLED") {
            self.auto_refresh.enabled = parse_bool("WAYMARK_REFRESH_ENABLED", &value)?;
        }
        if let Some(value) = lookup("WAYMARK_REFRESH_INTERVAL") {
            self.auto_refresh.interval = parse_number("WAYMARK_REFRESH_INTERVAL", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.icon_size == 0 {
            return Err(ConfigError::Invalid {
                key: "display.icon_size",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Polling period, or `None` when polling is off
    pub fn refresh_interval(&self) -> Option<Duration> {
        if !self.auto_refresh.enabled {
            return None;
        }
        u64::try_from(self.auto_refresh.interval)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got {:?}", other),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config: AddonConfig = toml::from_str("").unwrap();
        assert_eq!(config, AddonConfig::default());
        assert!(config.display.show_locked);
        assert_eq!(config.display.icon_size, 16);
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.icons.dir, PathBuf::from("icons"));
    }

    #[test]
    fn test_partial_file() {
        let config: AddonConfig = toml::from_str(
            r#"
            [display]
            show_locked = false

            [auto_refresh]
            interval = 15
            "#,
        )
        .unwrap();

        assert!(!config.display.show_locked);
        assert_eq!(config.display.icon_size, 16);
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_polling_disabled() {
        let mut config = AddonConfig::default();
        config.auto_refresh.interval = 0;
        assert_eq!(config.refresh_interval(), None);

        config.auto_refresh.interval = 30;
        config.auto_refresh.enabled = false;
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn test_missing_file_written_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/waymark.toml");

        let config = AddonConfig::load(&path).unwrap();

        assert_eq!(config, AddonConfig::default());
        assert!(path.exists());
        assert_eq!(AddonConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_zero_icon_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waymark.toml");
        std::fs::write(&path, "[display]\nicon_size = 0\n").unwrap();

        assert!(matches!(
            AddonConfig::load(&path),
            Err(ConfigError::Invalid { key: "display.icon_size", .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WAYMARK_SHOW_LOCKED", "false"),
            ("WAYMARK_REFRESH_INTERVAL", "5"),
        ]
        .into_iter()
        .collect();

        let config = AddonConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(!config.display.show_locked);
        assert_eq!(config.auto_refresh.interval, 5);
        assert_eq!(config.display.icon_size, 16);
    }

    #[test]
    fn test_negative_interval_disables_polling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waymark.toml");
        std::fs::write(&path, "[auto_refresh]\ninterval = -1\n").unwrap();

        let config = AddonConfig::load(&path).unwrap();
        assert_eq!(config.auto_refresh.interval, -1);
        assert!(config.auto_refresh.enabled);
        assert_eq!(config.refresh_interval(), None);

        let config = AddonConfig::default()
            .with_overrides(|key| (key == "WAYMARK_REFRESH_INTERVAL").then(|| "-30".to_string()))
            .unwrap();
        assert_eq!(config.auto_refresh.interval, -30);
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn test_bad_override() {
        let result = AddonConfig::default().with_overrides(|key| {
            (key == "WAYMARK_REFRESH_INTERVAL").then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "WAYMARK_REFRESH_INTERVAL", .. })
        ));
    }
}
