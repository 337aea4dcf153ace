#![forbid(unsafe_code)]

//! Dynamic, type-erased property values.
//!
//! [`Variant`] is the closed set of value kinds that properties expose to
//! collaborators (UI factories, storage backends, the settings key/value
//! store). Conversions are explicit: every `to_*` accessor either returns the
//! value or a [`VariantError`] naming what was expected and what was found.
//!
//! # Conversion rules
//!
//! | From \ To | bool | int | double | string | enum |
//! |-----------|------|-----|--------|--------|------|
//! | `Bool`    | yes  | 0/1 | no     | no     | no   |
//! | `Int`     | no   | yes | yes    | no     | yes  |
//! | `Double`  | no   | integral only | yes | no | no |
//! | `String`  | no   | no  | no     | yes    | no   |
//! | `Enum`    | no   | yes | no     | no     | yes  |
//!
//! `Null` converts to nothing.

use std::fmt;

use crate::error::VariantError;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "value", rename_all = "lowercase")
)]
pub enum Variant {
    /// No value. Returned for unset keys without a default.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    #[cfg_attr(feature = "state-persistence", serde(with = "double_repr"))]
    Double(f64),
    String(String),
    /// An enumerated value, stored as its integer discriminant.
    Enum(i64),
}

/// Serialized form of `Variant::Double`.
///
/// JSON has no NaN or infinity, so non-finite values are written as the
/// strings `"NaN"`, `"inf"` and `"-inf"`. A `null` payload reads back as NaN.
#[cfg(feature = "state-persistence")]
mod double_repr {
    use serde::de::{self, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
        Missing,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Missing => Ok(f64::NAN),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    Unexpected::Str(other),
                    &"a number, \"NaN\", \"inf\" or \"-inf\"",
                )),
            },
        }
    }
}

impl Variant {
    /// Stable name of the value kind, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Variant::Null => "null",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Double(_) => "double",
            Variant::String(_) => "string",
            Variant::Enum(_) => "enum",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Variant::Null)
    }

    pub fn to_bool(&self) -> Result<bool, VariantError> {
        match self {
            Variant::Bool(b) => Ok(*b),
            other => Err(VariantError::new("bool", other)),
        }
    }

    pub fn to_int(&self) -> Result<i64, VariantError> {
        match self {
            Variant::Int(i) | Variant::Enum(i) => Ok(*i),
            Variant::Bool(b) => Ok(i64::from(*b)),
            Variant::Double(d) if d.fract() == 0.0 && d.is_finite() => {
                // Integral doubles inside the i64 range convert exactly.
                if *d >= i64::MIN as f64 && *d < i64::MAX as f64 {
                    Ok(*d as i64)
                } else {
                    Err(VariantError::new("int", self))
                }
            }
            other => Err(VariantError::new("int", other)),
        }
    }

    pub fn to_double(&self) -> Result<f64, VariantError> {
        match self {
            Variant::Double(d) => Ok(*d),
            Variant::Int(i) => Ok(*i as f64),
            other => Err(VariantError::new("double", other)),
        }
    }

    pub fn to_enum(&self) -> Result<i64, VariantError> {
        match self {
            Variant::Enum(i) | Variant::Int(i) => Ok(*i),
            other => Err(VariantError::new("enum", other)),
        }
    }

    /// Borrow the string payload.
    pub fn as_str(&self) -> Result<&str, VariantError> {
        match self {
            Variant::String(s) => Ok(s),
            other => Err(VariantError::new("string", other)),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Null => f.write_str("null"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Double(d) => write!(f, "{d}"),
            Variant::String(s) => f.write_str(s),
            Variant::Enum(i) => write!(f, "enum({i})"),
        }
    }
}

// ── Conversions into Variant ───────────────────────────────────────────

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Int(i64::from(value))
    }
}

impl From<u32> for Variant {
    fn from(value: u32) -> Self {
        Variant::Int(i64::from(value))
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Double(value)
    }
}

impl From<f32> for Variant {
    fn from(value: f32) -> Self {
        Variant::Double(f64::from(value))
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}

// ── Conversions out of Variant ─────────────────────────────────────────

/// Typed projection out of a [`Variant`].
///
/// Implementations must fail rather than guess when the variant holds an
/// incompatible kind.
pub trait FromVariant: Sized {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError>;
}

impl FromVariant for Variant {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        Ok(variant.clone())
    }
}

impl FromVariant for bool {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        variant.to_bool()
    }
}

impl FromVariant for i64 {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        variant.to_int()
    }
}

impl FromVariant for i32 {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        let wide = variant.to_int()?;
        i32::try_from(wide).map_err(|_| VariantError::new("i32", variant))
    }
}

impl FromVariant for u32 {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        let wide = variant.to_int()?;
        u32::try_from(wide).map_err(|_| VariantError::new("u32", variant))
    }
}

impl FromVariant for f64 {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        variant.to_double()
    }
}

impl FromVariant for f32 {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        Ok(variant.to_double()? as f32)
    }
}

impl FromVariant for String {
    fn from_variant(variant: &Variant) -> Result<Self, VariantError> {
        variant.as_str().map(str::to_owned)
    }
}
