#![forbid(unsafe_code)]

//! Core: observable, validated properties grouped under shared rules.
//!
//! # Role in Stratum
//! `stratum-core` owns the value model. `stratum-settings` builds the
//! application settings registry on top of it.
//!
//! # Primary responsibilities
//! - **Variant**: the closed set of dynamic value kinds.
//! - **Property**: a named, typed value whose writes follow a
//!   validate-then-commit-or-rollback protocol.
//! - **PropertyGroup**: ordered membership, validation policy, and
//!   synchronous change dispatch.
//! - **PropertyChangedBlocker**: scoped, nestable suppression of change
//!   dispatch.
//!
//! # Example
//!
//! ```
//! use stratum_core::{PropertyGroup, PropertyInt, Property, Variant};
//!
//! let group = PropertyGroup::new();
//! let count = PropertyInt::new(Some(&group), "Count", 1);
//! count.set_value_from_variant(&Variant::Int(3)).unwrap();
//! assert_eq!(count.value(), 3);
//! ```

pub mod enumeration;
pub mod error;
pub mod group;
pub mod logging;
pub mod property;
pub mod signal;
pub mod variant;

pub use enumeration::{Enumeration, EnumerationItem, PropertyEnumeration};
pub use error::{Misuse, PropertyError, PropertyResult, ValidationError, VariantError};
pub use group::{AcceptAll, ForwardToParent, GroupPolicy, PropertyChangedBlocker, PropertyGroup};
pub use property::{
    Property, PropertyBase, PropertyBool, PropertyDouble, PropertyInt, PropertyString,
    PropertyValue, TypedProperty, register, same_property, set_value_helper,
};
pub use signal::{Signal, Subscription};
pub use variant::{FromVariant, Variant};
