#![forbid(unsafe_code)]

//! Typed, named, validated values.
//!
//! # Design
//!
//! A property is always handled through an `Rc`. Its identity matters more
//! than its value, so properties are neither `Clone` nor movable out of their
//! `Rc`. Each property embeds a [`PropertyBase`] holding:
//!
//! - a `Weak` handle to itself (used for membership and change events),
//! - a `Weak` back-reference to its owning [`PropertyGroup`], fixed at
//!   construction and never reassigned,
//! - the immutable display label and the mutable user read-only flag.
//!
//! The back-reference is non-owning: a group is never kept alive because a
//! property points at it. Once the group is dropped the property behaves as
//! a detached one.
//!
//! # Commit protocol
//!
//! Every typed write goes through [`set_value_helper`]:
//!
//! 1. No owning group: assign. There is nobody to notify.
//! 2. Otherwise snapshot the previous value, assign the candidate, ask the
//!    group to validate. On success notify; on rejection restore the
//!    snapshot and return the rejection without notifying.
//!
//! Observers therefore never see a value that later proved invalid.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::{PropertyError, PropertyResult};
use crate::group::PropertyGroup;
use crate::variant::{FromVariant, Variant};

/// A single named, typed, validated, observable value.
pub trait Property {
    /// Shared state common to all property kinds.
    fn base(&self) -> &PropertyBase;

    /// Current value as a dynamic [`Variant`]. No side effects.
    fn value_as_variant(&self) -> Variant;

    /// Convert `value` to this property's kind and commit it.
    ///
    /// On failure the stored value is unchanged and no notification fires.
    /// The user read-only flag is not consulted; programmatic writes are
    /// always permitted.
    fn set_value_from_variant(&self, value: &Variant) -> PropertyResult;

    /// Stable identifier of the concrete value kind.
    fn dyn_type_name(&self) -> &'static str;

    fn label(&self) -> &str {
        self.base().label()
    }

    /// Owning group, if any and still alive.
    fn group(&self) -> Option<Rc<PropertyGroup>> {
        self.base().group()
    }

    fn is_user_read_only(&self) -> bool {
        self.base().is_user_read_only()
    }

    fn set_user_read_only(&self, on: bool) {
        self.base().set_user_read_only(on);
    }
}

impl fmt::Debug for dyn Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("type", &self.dyn_type_name())
            .field("label", &self.label())
            .field("value", &self.value_as_variant())
            .finish()
    }
}

/// State shared by every property implementation.
pub struct PropertyBase {
    handle: Weak<dyn Property>,
    group: Option<Weak<PropertyGroup>>,
    label: String,
    user_read_only: Cell<bool>,
}

impl PropertyBase {
    /// Build the base for a property under construction.
    ///
    /// `handle` is the weak self-reference obtained from [`Rc::new_cyclic`].
    /// After the `Rc` exists, pass it to [`register`] so the owning group
    /// records the membership.
    #[must_use]
    pub fn new(
        handle: Weak<dyn Property>,
        group: Option<&Rc<PropertyGroup>>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            group: group.map(Rc::downgrade),
            label: label.into(),
            user_read_only: Cell::new(false),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn group(&self) -> Option<Rc<PropertyGroup>> {
        self.group.as_ref().and_then(Weak::upgrade)
    }

    /// True while the owning group is alive. False for detached properties
    /// and once the group has been dropped.
    #[must_use]
    pub fn has_group(&self) -> bool {
        self.group().is_some()
    }

    /// Non-owning handle to the property itself.
    #[must_use]
    pub fn handle(&self) -> &Weak<dyn Property> {
        &self.handle
    }

    #[must_use]
    pub fn is_user_read_only(&self) -> bool {
        self.user_read_only.get()
    }

    pub fn set_user_read_only(&self, on: bool) {
        self.user_read_only.set(on);
    }

    pub(crate) fn is_owned_by(&self, group: &PropertyGroup) -> bool {
        self.group
            .as_ref()
            .is_some_and(|g| std::ptr::eq(g.as_ptr(), group))
    }
}

impl fmt::Debug for PropertyBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBase")
            .field("label", &self.label)
            .field("has_group", &self.has_group())
            .field("user_read_only", &self.user_read_only.get())
            .finish()
    }
}

/// Record a freshly constructed property in its owning group.
///
/// Every constructor of a grouped property must call this once.
pub fn register<P: Property>(prop: Rc<P>) -> Rc<P> {
    if let Some(group) = prop.group() {
        group.attach(prop.base());
    }
    prop
}

/// Returns true if `a` and `b` are the same property object.
#[must_use]
pub fn same_property(a: &dyn Property, b: &dyn Property) -> bool {
    std::ptr::addr_eq(a, b)
}

/// Validate-then-commit-or-rollback write of `new_value` into `slot`.
///
/// `slot` must be the backing storage read by `prop.value_as_variant()`.
pub fn set_value_helper<T>(prop: &dyn Property, slot: &RefCell<T>, new_value: T) -> PropertyResult {
    let Some(group) = prop.group() else {
        *slot.borrow_mut() = new_value;
        trace!(label = prop.label(), "committed detached property");
        return Ok(());
    };

    let previous = slot.replace(new_value);
    match group.is_property_valid(prop) {
        Ok(()) => {
            trace!(label = prop.label(), "committed property");
            group.notify_property_changed(prop);
            Ok(())
        }
        Err(rejection) => {
            slot.replace(previous);
            trace!(
                label = prop.label(),
                reason = rejection.reason(),
                "rolled back rejected property value"
            );
            Err(PropertyError::Rejected(rejection))
        }
    }
}

// ============================================================================
// Typed properties
// ============================================================================

/// Value kinds storable in a [`TypedProperty`].
pub trait PropertyValue: FromVariant + Into<Variant> + Clone + 'static {
    /// Result of [`Property::dyn_type_name`] for this kind.
    const TYPE_NAME: &'static str;
}

impl PropertyValue for bool {
    const TYPE_NAME: &'static str = "stratum::PropertyBool";
}

impl PropertyValue for i64 {
    const TYPE_NAME: &'static str = "stratum::PropertyInt";
}

impl PropertyValue for f64 {
    const TYPE_NAME: &'static str = "stratum::PropertyDouble";
}

impl PropertyValue for String {
    const TYPE_NAME: &'static str = "stratum::PropertyString";
}

/// A property holding a value of type `T`.
pub struct TypedProperty<T: PropertyValue> {
    base: PropertyBase,
    value: RefCell<T>,
}

pub type PropertyBool = TypedProperty<bool>;
pub type PropertyInt = TypedProperty<i64>;
pub type PropertyDouble = TypedProperty<f64>;
pub type PropertyString = TypedProperty<String>;

impl<T: PropertyValue> TypedProperty<T> {
    /// Create a property owned by `group` (or detached when `None`).
    ///
    /// The initial value is stored without validation or notification.
    pub fn new(group: Option<&Rc<PropertyGroup>>, label: impl Into<String>, value: T) -> Rc<Self> {
        let label = label.into();
        register(Rc::new_cyclic(|weak: &Weak<Self>| {
            let handle: Weak<dyn Property> = weak.clone();
            Self {
                base: PropertyBase::new(handle, group, label),
                value: RefCell::new(value),
            }
        }))
    }

    #[must_use]
    pub fn value(&self) -> T {
        self.value.borrow().clone()
    }

    /// Commit `value` through the validation protocol.
    pub fn set_value(&self, value: T) -> PropertyResult {
        set_value_helper(self, &self.value, value)
    }
}

impl<T: PropertyValue> Property for TypedProperty<T> {
    fn base(&self) -> &PropertyBase {
        &self.base
    }

    fn value_as_variant(&self) -> Variant {
        self.value.borrow().clone().into()
    }

    fn set_value_from_variant(&self, value: &Variant) -> PropertyResult {
        let converted = T::from_variant(value)?;
        self.set_value(converted)
    }

    fn dyn_type_name(&self) -> &'static str {
        T::TYPE_NAME
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for TypedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedProperty")
            .field("label", &self.base.label())
            .field("value", &*self.value.borrow())
            .finish()
    }
}
