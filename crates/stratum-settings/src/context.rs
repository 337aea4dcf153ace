#![forbid(unsafe_code)]

//! Process-wide formatting context consulted by value formatting code.
//!
//! These values are trusted configuration: the registry stores them but does
//! not validate them.

use std::fmt;

use stratum_core::Variant;

/// Locale identifier (e.g., `"en-US"`, `"fr-FR"`).
pub type Locale = String;

pub const DEFAULT_LOCALE: &str = "en-US";

/// Unit system used when formatting physical quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitSystemSchema {
    /// International System of Units.
    #[default]
    SI,
    /// Imperial units as used in the UK.
    ImperialUK,
}

impl UnitSystemSchema {
    pub const ALL: [UnitSystemSchema; 2] = [UnitSystemSchema::SI, UnitSystemSchema::ImperialUK];

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::SI => 0,
            Self::ImperialUK => 1,
        }
    }

    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_i64() == value)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SI => "si",
            Self::ImperialUK => "imperial-uk",
        }
    }

    /// Parse a schema name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "si" | "metric" => Some(Self::SI),
            "imperial-uk" | "imperialuk" | "imperial" => Some(Self::ImperialUK),
            _ => None,
        }
    }
}

impl fmt::Display for UnitSystemSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<UnitSystemSchema> for Variant {
    fn from(value: UnitSystemSchema) -> Self {
        Variant::Enum(value.as_i64())
    }
}

/// Options handed to text formatting routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    pub locale: Locale,
    pub unit_schema: UnitSystemSchema,
    pub unit_decimals: u32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_owned(),
            unit_schema: UnitSystemSchema::SI,
            unit_decimals: 2,
        }
    }
}
