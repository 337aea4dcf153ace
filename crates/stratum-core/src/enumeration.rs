#![forbid(unsafe_code)]

//! Named integer enumerations and the property kind built on them.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{PropertyError, PropertyResult};
use crate::group::PropertyGroup;
use crate::property::{Property, PropertyBase, register, set_value_helper};
use crate::variant::Variant;

/// One `(value, name)` entry of an [`Enumeration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationItem {
    pub value: i64,
    pub name: String,
}

/// An ordered list of named integer values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    items: Vec<EnumerationItem>,
}

impl Enumeration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item. Later duplicates of a value or name are shadowed by
    /// the first occurrence in lookups.
    #[must_use]
    pub fn with_item(mut self, value: i64, name: impl Into<String>) -> Self {
        self.items.push(EnumerationItem {
            value,
            name: name.into(),
        });
        self
    }

    #[must_use]
    pub fn items(&self) -> &[EnumerationItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        self.find_by_value(value).is_some()
    }

    #[must_use]
    pub fn find_by_value(&self, value: i64) -> Option<&EnumerationItem> {
        self.items.iter().find(|item| item.value == value)
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&EnumerationItem> {
        self.items.iter().find(|item| item.name == name)
    }
}

/// A property whose value must be one of an [`Enumeration`]'s items.
pub struct PropertyEnumeration {
    base: PropertyBase,
    enumeration: Rc<Enumeration>,
    value: RefCell<i64>,
}

impl PropertyEnumeration {
    pub const TYPE_NAME: &'static str = "stratum::PropertyEnumeration";

    /// Create the property. `value` is stored as-is, even if it is not an
    /// item of `enumeration`; later writes are checked.
    pub fn new(
        group: Option<&Rc<PropertyGroup>>,
        label: impl Into<String>,
        enumeration: Rc<Enumeration>,
        value: i64,
    ) -> Rc<Self> {
        let label = label.into();
        register(Rc::new_cyclic(|weak: &Weak<Self>| {
            let handle: Weak<dyn Property> = weak.clone();
            Self {
                base: PropertyBase::new(handle, group, label),
                enumeration,
                value: RefCell::new(value),
            }
        }))
    }

    #[must_use]
    pub fn enumeration(&self) -> &Enumeration {
        &self.enumeration
    }

    #[must_use]
    pub fn value(&self) -> i64 {
        *self.value.borrow()
    }

    /// Name of the current item, if the value is part of the enumeration.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        let value = self.value();
        self.enumeration
            .find_by_value(value)
            .map(|item| item.name.as_str())
    }

    pub fn set_value(&self, value: i64) -> PropertyResult {
        if !self.enumeration.contains(value) {
            return Err(PropertyError::rejected(format!(
                "{value} is not an item of the enumeration"
            )));
        }
        set_value_helper(self, &self.value, value)
    }

    pub fn set_name(&self, name: &str) -> PropertyResult {
        let Some(item) = self.enumeration.find_by_name(name) else {
            return Err(PropertyError::rejected(format!(
                "'{name}' is not an item of the enumeration"
            )));
        };
        let value = item.value;
        self.set_value(value)
    }
}

impl Property for PropertyEnumeration {
    fn base(&self) -> &PropertyBase {
        &self.base
    }

    fn value_as_variant(&self) -> Variant {
        Variant::Enum(self.value())
    }

    fn set_value_from_variant(&self, value: &Variant) -> PropertyResult {
        match value {
            Variant::String(name) => self.set_name(name),
            other => self.set_value(other.to_enum()?),
        }
    }

    fn dyn_type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl fmt::Debug for PropertyEnumeration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyEnumeration")
            .field("label", &self.base.label())
            .field("value", &self.value())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn schemas() -> Rc<Enumeration> {
        Rc::new(
            Enumeration::new()
                .with_item(0, "SI")
                .with_item(1, "ImperialUK"),
        )
    }

    #[test]
    fn lookups() {
        let e = schemas();
        assert_eq!(e.len(), 2);
        assert_eq!(e.find_by_name("ImperialUK").map(|i| i.value), Some(1));
        assert_eq!(e.find_by_value(0).map(|i| i.name.as_str()), Some("SI"));
        assert!(!e.contains(7));
    }

    #[test]
    fn accepts_enum_int_and_name() {
        let prop = PropertyEnumeration::new(None, "Unit system", schemas(), 0);
        prop.set_value_from_variant(&Variant::Enum(1)).unwrap();
        assert_eq!(prop.name(), Some("ImperialUK"));
        prop.set_value_from_variant(&Variant::Int(0)).unwrap();
        assert_eq!(prop.value(), 0);
        prop.set_value_from_variant(&Variant::from("ImperialUK"))
            .unwrap();
        assert_eq!(prop.value_as_variant(), Variant::Enum(1));
    }

    #[test]
    fn rejects_unknown_items_without_notifying() {
        let group = PropertyGroup::new();
        let prop = PropertyEnumeration::new(Some(&group), "Unit system", schemas(), 0);
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = group.subscribe(move |_| c.set(c.get() + 1));

        assert!(prop.set_value(9).unwrap_err().is_rejection());
        assert!(prop.set_name("Metric").unwrap_err().is_rejection());
        assert!(matches!(
            prop.set_value_from_variant(&Variant::Double(0.5)),
            Err(PropertyError::Conversion(_))
        ));
        assert_eq!(prop.value(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn type_name() {
        let prop = PropertyEnumeration::new(None, "u", schemas(), 0);
        assert_eq!(prop.dyn_type_name(), "stratum::PropertyEnumeration");
    }
}
