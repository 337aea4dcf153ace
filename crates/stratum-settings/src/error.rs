#![forbid(unsafe_code)]

//! Errors from registry operations and storage backends.

use std::fmt;
use std::io;

use stratum_core::VariantError;

/// Level of the setting hierarchy an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Group,
    Section,
    Setting,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Group => "group",
            Self::Section => "section",
            Self::Setting => "setting",
        })
    }
}

/// Errors from [`Settings`](crate::Settings) operations.
#[derive(Debug)]
pub enum SettingsError {
    /// An identifier is already used at this level.
    DuplicateIdentifier { level: Level, identifier: String },
    /// The identifier is reserved for the registry's own use.
    ReservedIdentifier { level: Level, identifier: String },
    /// The property is already registered as a setting of this registry.
    AlreadyRegistered { label: String },
    /// The index was issued by another registry instance.
    ForeignIndex { level: Level },
    /// The index does not address an existing entry.
    IndexOutOfRange { level: Level, index: usize },
    /// A stored value cannot be projected to the requested type.
    Conversion { key: String, source: VariantError },
    /// A stored enum value has no matching variant.
    UnknownEnumValue { key: String, value: i64 },
    /// The storage backend failed.
    Storage(StorageError),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIdentifier { level, identifier } => {
                write!(f, "duplicate {level} identifier '{identifier}'")
            }
            Self::ReservedIdentifier { level, identifier } => {
                write!(f, "{level} identifier '{identifier}' is reserved")
            }
            Self::AlreadyRegistered { label } => {
                write!(f, "property '{label}' is already registered")
            }
            Self::ForeignIndex { level } => {
                write!(f, "{level} index was issued by another registry")
            }
            Self::IndexOutOfRange { level, index } => {
                write!(f, "{level} index {index} is out of range")
            }
            Self::Conversion { key, source } => write!(f, "value of '{key}': {source}"),
            Self::UnknownEnumValue { key, value } => {
                write!(f, "value of '{key}': {value} matches no enum variant")
            }
            Self::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Conversion { source, .. } => Some(source),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for SettingsError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Errors from a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    /// Stored data could not be decoded.
    Format(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Format(msg) => write!(f, "malformed settings data: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(_) => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "state-persistence")]
impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use stratum_core::Variant;

    #[test]
    fn display_messages() {
        let e = SettingsError::DuplicateIdentifier {
            level: Level::Group,
            identifier: "general".into(),
        };
        assert_eq!(e.to_string(), "duplicate group identifier 'general'");
        let e = SettingsError::IndexOutOfRange {
            level: Level::Section,
            index: 4,
        };
        assert_eq!(e.to_string(), "section index 4 is out of range");
        let e = SettingsError::ReservedIdentifier {
            level: Level::Section,
            identifier: "__default".into(),
        };
        assert_eq!(e.to_string(), "section identifier '__default' is reserved");
    }

    #[test]
    fn conversion_exposes_source() {
        let e = SettingsError::Conversion {
            key: "app/zoom".into(),
            source: VariantError::new("bool", &Variant::Double(1.0)),
        };
        assert!(e.source().is_some());
        assert_eq!(
            e.to_string(),
            "value of 'app/zoom': cannot convert double value to bool"
        );
    }

    #[test]
    fn storage_wraps_io() {
        let e: SettingsError =
            StorageError::from(io::Error::new(io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(e, SettingsError::Storage(StorageError::Io(_))));
    }
}
