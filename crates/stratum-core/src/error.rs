#![forbid(unsafe_code)]

//! Error types for property mutation and group membership.
//!
//! # Taxonomy
//!
//! | Error | Cause | Recovery |
//! |-------|-------|----------|
//! | [`ValidationError`] | A group's domain rule rejected a candidate value | Value rolled back, caller informed |
//! | [`VariantError`] | A dynamic value could not be converted to the property's kind | Nothing was written |
//! | [`Misuse`] | A contract violation (duplicate member, foreign member, ...) | Not expected in correct code |

use std::fmt;

use crate::variant::Variant;

/// A candidate value failed a group's validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    reason: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Human-readable reason for the rejection.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation rejected: {}", self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// A [`Variant`] held a kind that cannot be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantError {
    /// Requested kind.
    pub expected: &'static str,
    /// Kind actually held.
    pub found: &'static str,
}

impl VariantError {
    #[must_use]
    pub fn new(expected: &'static str, found: &Variant) -> Self {
        Self {
            expected,
            found: found.type_name(),
        }
    }
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert {} value to {}",
            self.found, self.expected
        )
    }
}

impl std::error::Error for VariantError {}

/// Programming-contract violations on group membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misuse {
    /// The property is already a member of this group.
    DuplicateMember { label: String },
    /// The property was constructed for a different group.
    ForeignMember { label: String },
    /// The property is not a member of this group.
    NotAMember { label: String },
}

impl fmt::Display for Misuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMember { label } => {
                write!(f, "property '{label}' is already a group member")
            }
            Self::ForeignMember { label } => {
                write!(f, "property '{label}' belongs to another group")
            }
            Self::NotAMember { label } => write!(f, "property '{label}' is not a group member"),
        }
    }
}

impl std::error::Error for Misuse {}

/// Errors returned by property operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    Rejected(ValidationError),
    Conversion(VariantError),
    Misuse(Misuse),
}

impl PropertyError {
    /// Shorthand for a validation rejection.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(ValidationError::new(reason))
    }

    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => e.fmt(f),
            Self::Conversion(e) => e.fmt(f),
            Self::Misuse(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for PropertyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(e) => Some(e),
            Self::Conversion(e) => Some(e),
            Self::Misuse(e) => Some(e),
        }
    }
}

impl From<ValidationError> for PropertyError {
    fn from(e: ValidationError) -> Self {
        Self::Rejected(e)
    }
}

impl From<VariantError> for PropertyError {
    fn from(e: VariantError) -> Self {
        Self::Conversion(e)
    }
}

impl From<Misuse> for PropertyError {
    fn from(e: Misuse) -> Self {
        Self::Misuse(e)
    }
}

/// Result alias for property operations.
pub type PropertyResult<T = ()> = Result<T, PropertyError>;
