#![forbid(unsafe_code)]

//! Application settings registry built on `stratum-core` properties.
//!
//! # Role in Stratum
//! `stratum-settings` organizes properties into a group → section → setting
//! hierarchy, keeps a string-keyed value store with defaults, and carries
//! the formatting context (locale, unit system) shared by the application.
//!
//! # Example
//!
//! ```
//! use stratum_core::PropertyInt;
//! use stratum_settings::Settings;
//!
//! let settings = Settings::new();
//! let general = settings.add_group("general").unwrap();
//! let display = settings.add_section(general, "display").unwrap();
//! let zoom = PropertyInt::new(None, "zoom", 100);
//! let index = settings.add_setting(zoom, display).unwrap();
//! assert_eq!(settings.setting_key(index).unwrap(), "general/display/zoom");
//!
//! settings.set_default_value("app/recent", "none");
//! assert_eq!(settings.value("app/recent").as_str().unwrap(), "none");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod registry;
pub mod storage;

pub use config::{ConfigError, ConfigParse, SettingsConfig};
pub use context::{DEFAULT_LOCALE, Locale, TextOptions, UnitSystemSchema};
pub use error::{Level, SettingsError, SettingsResult, StorageError, StorageResult};
pub use index::{GroupIndex, RegistryId, SectionIndex, SettingIndex};
pub use registry::{
    DEFAULT_SECTION_IDENTIFIER, EnumValue, KEY_UNIT_SYSTEM_DECIMALS, KEY_UNIT_SYSTEM_SCHEMA,
    LoadReport, Settings, ValueChanged,
};
#[cfg(feature = "state-persistence")]
pub use storage::FileStorage;
pub use storage::{MemoryStorage, SettingsMap, StorageBackend};
