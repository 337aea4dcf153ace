#![forbid(unsafe_code)]

//! Startup configuration for a [`Settings`](crate::Settings) registry.
//!
//! # Environment variables
//!
//! | Variable | Field | Accepted values |
//! |----------|-------|-----------------|
//! | `STRATUM_LOCALE` | `locale` | non-empty locale tag (`en-US`) |
//! | `STRATUM_UNIT_SCHEMA` | `unit_schema` | `si`, `metric`, `imperial-uk`, `imperial` |
//! | `STRATUM_UNIT_DECIMALS` | `unit_decimals` | integer in `0..=9` |
//! | `STRATUM_SETTINGS_PATH` | `storage_path` | file path |
//!
//! Invalid values are reported as [`ConfigError`] diagnostics and the
//! default for that field is kept.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::context::{DEFAULT_LOCALE, Locale, UnitSystemSchema};

pub const ENV_LOCALE: &str = "STRATUM_LOCALE";
pub const ENV_UNIT_SCHEMA: &str = "STRATUM_UNIT_SCHEMA";
pub const ENV_UNIT_DECIMALS: &str = "STRATUM_UNIT_DECIMALS";
pub const ENV_SETTINGS_PATH: &str = "STRATUM_SETTINGS_PATH";

/// Upper bound for `unit_decimals`.
pub const MAX_UNIT_DECIMALS: u32 = 9;

/// Initial context values and storage location for a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsConfig {
    pub locale: Locale,
    pub unit_schema: UnitSystemSchema,
    pub unit_decimals: u32,
    pub storage_path: Option<PathBuf>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_owned(),
            unit_schema: UnitSystemSchema::SI,
            unit_decimals: 2,
            storage_path: None,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: SettingsConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl SettingsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = locale.into();
        self
    }

    #[must_use]
    pub fn with_unit_schema(mut self, schema: UnitSystemSchema) -> Self {
        self.unit_schema = schema;
        self
    }

    #[must_use]
    pub fn with_unit_decimals(mut self, decimals: u32) -> Self {
        self.unit_decimals = decimals;
        self
    }

    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> SettingsConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.locale.trim().is_empty() {
            errors.push(ConfigError::new(
                "locale",
                self.locale.clone(),
                "locale must not be empty",
            ));
        }
        if self.unit_decimals > MAX_UNIT_DECIMALS {
            errors.push(ConfigError::new(
                "unit_decimals",
                self.unit_decimals.to_string(),
                format!("expected at most {MAX_UNIT_DECIMALS}"),
            ));
        }
        if let Some(path) = &self.storage_path {
            if path.as_os_str().is_empty() {
                errors.push(ConfigError::new(
                    "storage_path",
                    "",
                    "path must not be empty",
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn from_env_with<F>(mut get: F) -> ConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = SettingsConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_LOCALE) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            errors.push(ConfigError::new("locale", value, "expected non-empty locale"));
        } else {
            config.locale = trimmed.to_owned();
        }
    }

    if let Some(value) = get(ENV_UNIT_SCHEMA) {
        match UnitSystemSchema::parse(&value) {
            Some(parsed) => config.unit_schema = parsed,
            None => errors.push(ConfigError::new(
                "unit_schema",
                value,
                "expected si|imperial-uk",
            )),
        }
    }

    if let Some(value) = get(ENV_UNIT_DECIMALS) {
        match value.trim().parse::<u32>() {
            Ok(parsed) if parsed <= MAX_UNIT_DECIMALS => config.unit_decimals = parsed,
            _ => errors.push(ConfigError::new(
                "unit_decimals",
                value,
                format!("expected integer in 0..={MAX_UNIT_DECIMALS}"),
            )),
        }
    }

    if let Some(value) = get(ENV_SETTINGS_PATH) {
        if value.trim().is_empty() {
            errors.push(ConfigError::new("storage_path", value, "expected file path"));
        } else {
            config.storage_path = Some(PathBuf::from(value));
        }
    }

    if let Err(mut validation) = config.validate() {
        errors.append(&mut validation);
    }

    ConfigParse { config, errors }
}
