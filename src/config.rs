use crate::accounts::AccountSettings;
use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Where the persistent key/value profile lives
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

const DEFAULT_REMEMBER_DAYS: i64 = 7;
const DEFAULT_SESSION_HOURS: i64 = 24;
const MAX_REMEMBER_DAYS: i64 = 3_650;
const MAX_SESSION_HOURS: i64 = 24 * 365;

/// Session lifetimes. Unset fields fall back to the defaults, so a layer
/// only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Lifetime with "remember me" ticked
    #[serde(default)]
    pub remember_days: Option<i64>,
    #[serde(default)]
    pub default_hours: Option<i64>,
}

impl SessionConfig {
    pub fn remember_days(&self) -> i64 {
        self.remember_days.unwrap_or(DEFAULT_REMEMBER_DAYS)
    }

    pub fn default_hours(&self) -> i64 {
        self.default_hours.unwrap_or(DEFAULT_SESSION_HOURS)
    }
}

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_MINUTES: i64 = 15;
const MAX_LOCKOUT_MINUTES: i64 = 60 * 24 * 365;

/// Advisory login lockout
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LockoutConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub lockout_minutes: Option<i64>,
}

impl LockoutConfig {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn lockout_minutes(&self) -> i64 {
        self.lockout_minutes.unwrap_or(DEFAULT_LOCKOUT_MINUTES)
    }
}

/// Fixed delays for simulated work, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub run_test_ms: Option<u64>,
    #[serde(default)]
    pub web_services_ms: Option<u64>,
    #[serde(default)]
    pub download_ms: Option<u64>,
}

impl SimulationConfig {
    pub fn instant() -> Self {
        Self {
            run_test_ms: Some(0),
            web_services_ms: Some(0),
            download_ms: Some(0),
        }
    }

    pub fn run_test_ms(&self) -> u64 {
        self.run_test_ms.unwrap_or(1_500)
    }

    pub fn web_services_ms(&self) -> u64 {
        self.web_services_ms.unwrap_or(1_500)
    }

    pub fn download_ms(&self) -> u64 {
        self.download_ms.unwrap_or(1_000)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Per-user settings directory (`~/.testdeck`)
pub fn user_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".testdeck"))
}

/// Per-project settings directory (`.testdeck`)
pub fn project_dir() -> PathBuf {
    Path::new(".testdeck").to_path_buf()
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.testdeck/config.local.toml) > project (.testdeck/config.toml) > user (~/.testdeck/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = user_dir() {
            let user_config = dir.join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = project_dir().join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Local overrides, should be gitignored
        let local_config = project_dir().join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Only fields the other layer actually sets are taken
    pub fn merge(&mut self, other: Config) {
        if other.storage.path.is_some() {
            self.storage.path = other.storage.path;
        }

        if other.session.remember_days.is_some() {
            self.session.remember_days = other.session.remember_days;
        }
        if other.session.default_hours.is_some() {
            self.session.default_hours = other.session.default_hours;
        }

        if other.lockout.max_attempts.is_some() {
            self.lockout.max_attempts = other.lockout.max_attempts;
        }
        if other.lockout.lockout_minutes.is_some() {
            self.lockout.lockout_minutes = other.lockout.lockout_minutes;
        }

        if other.simulation.run_test_ms.is_some() {
            self.simulation.run_test_ms = other.simulation.run_test_ms;
        }
        if other.simulation.web_services_ms.is_some() {
            self.simulation.web_services_ms = other.simulation.web_services_ms;
        }
        if other.simulation.download_ms.is_some() {
            self.simulation.download_ms = other.simulation.download_ms;
        }
    }

    /// Storage file: configured path, else ~/.testdeck/storage.json, else the project dir
    pub fn storage_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        user_dir()
            .unwrap_or_else(project_dir)
            .join("storage.json")
    }

    /// Lifetimes and limits for the account store.
    ///
    /// Values `validate()` would reject fall back to the defaults.
    pub fn account_settings(&self) -> AccountSettings {
        let defaults = AccountSettings::default();
        AccountSettings {
            remember_me: Duration::try_days(self.session.remember_days())
                .unwrap_or(defaults.remember_me),
            session: Duration::try_hours(self.session.default_hours())
                .unwrap_or(defaults.session),
            max_attempts: self.lockout.max_attempts(),
            lockout: Duration::try_minutes(self.lockout.lockout_minutes())
                .unwrap_or(defaults.lockout),
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_range(
            &mut errors,
            "session.remember_days",
            self.session.remember_days(),
            1,
            MAX_REMEMBER_DAYS,
        );
        check_range(
            &mut errors,
            "session.default_hours",
            self.session.default_hours(),
            1,
            MAX_SESSION_HOURS,
        );
        if self.lockout.max_attempts() == 0 {
            errors.push(ValidationError {
                field: "lockout.max_attempts".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }
        check_range(
            &mut errors,
            "lockout.lockout_minutes",
            self.lockout.lockout_minutes(),
            0,
            MAX_LOCKOUT_MINUTES,
        );
        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: "storage.path".to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_range(errors: &mut Vec<ValidationError>, field: &str, value: i64, min: i64, max: i64) {
    if value < min || value > max {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("Must be between {} and {}, got {}", min, max, value),
        });
    }
}
