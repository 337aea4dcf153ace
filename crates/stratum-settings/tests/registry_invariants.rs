//! Invariant and scenario tests for the settings registry.
//!
//! 1. Indices chain to the indices they were issued under.
//! 2. Counts track membership exactly.
//! 3. Unwritten keys read their default; written keys read back as written.
//! 4. A suppression scope over a group silences notifications but not writes.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use stratum_core::{
    GroupPolicy, Property, PropertyGroup, PropertyInt, ValidationError, Variant, same_property,
};
use stratum_settings::{Settings, SettingsError};

struct Percent;

impl GroupPolicy for Percent {
    fn is_property_valid(
        &self,
        _group: &PropertyGroup,
        prop: &dyn Property,
    ) -> Result<(), ValidationError> {
        match prop.value_as_variant().to_int() {
            Ok(v) if (0..=100).contains(&v) => Ok(()),
            Ok(v) => Err(ValidationError::new(format!("{v} is not a percentage"))),
            Err(e) => Err(ValidationError::new(e.to_string())),
        }
    }
}

fn variant_strategy() -> impl Strategy<Value = Variant> {
    prop_oneof![
        Just(Variant::Null),
        any::<bool>().prop_map(Variant::Bool),
        any::<i64>().prop_map(Variant::Int),
        (-1.0e9f64..1.0e9).prop_map(Variant::Double),
        "[a-z]{0,8}".prop_map(Variant::String),
        (0i64..4).prop_map(Variant::Enum),
    ]
}

#[test]
fn scenario_hierarchy() {
    let settings = Settings::new();
    let g0 = settings.add_group("general").unwrap();
    let s0 = settings.add_section(g0, "display").unwrap();
    let numeric = PropertyInt::new(None, "zoom", 100);
    let t0 = settings.add_setting(numeric.clone(), s0).unwrap();

    assert_eq!(settings.section_count(g0).unwrap(), 1);
    assert_eq!(settings.setting_count(s0).unwrap(), 1);
    assert!(same_property(&*settings.property(t0).unwrap(), &*numeric));
}

#[test]
fn scenario_rejected_write_rolls_back() {
    let group = PropertyGroup::with_policy(Percent);
    let prop = PropertyInt::new(Some(&group), "opacity", 40);
    let settings = Settings::new();
    let g = settings.add_group("view").unwrap();
    let t = settings.add_setting_to_group(prop.clone(), g).unwrap();

    let registered = settings.property(t).unwrap();
    let err = registered
        .set_value_from_variant(&Variant::Int(150))
        .unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(registered.value_as_variant(), Variant::Int(40));
}

#[test]
fn scenario_default_fallback() {
    let settings = Settings::new();
    settings.set_default_value("app/zoom", 1.0);
    assert_eq!(settings.value("app/zoom"), Variant::Double(1.0));
    settings.set_value("app/zoom", 2.0);
    assert_eq!(settings.value("app/zoom"), Variant::Double(2.0));
}

#[test]
fn scenario_blocked_batch() {
    let group = PropertyGroup::new();
    let props: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|label| PropertyInt::new(Some(&group), label, 0))
        .collect();
    let settings = Settings::new();
    let g = settings.add_group("batch").unwrap();
    for prop in &props {
        settings.add_setting_to_group(prop.clone(), g).unwrap();
    }

    let fired = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&fired);
    let _sub = group.subscribe(move |_| counter.set(counter.get() + 1));

    {
        let _blocker = group.block_changes();
        for (i, prop) in props.iter().enumerate() {
            prop.set_value(i as i64 + 1).unwrap();
        }
        assert_eq!(fired.get(), 0);
    }

    let values: Vec<_> = props.iter().map(|p| p.value()).collect();
    assert_eq!(values, [1, 2, 3]);
    assert_eq!(fired.get(), 0);
}

#[test]
fn indices_from_another_registry_are_refused() {
    let a = Settings::new();
    let b = Settings::new();
    let g = a.add_group("general").unwrap();
    let err = b
        .add_setting_to_group(PropertyInt::new(None, "zoom", 1), g)
        .unwrap_err();
    assert!(matches!(err, SettingsError::ForeignIndex { .. }));
    assert_eq!(b.group_count(), 0);
}

proptest! {
    #[test]
    fn ancestor_chains_hold(layout in proptest::collection::vec(0usize..4, 1..6)) {
        let settings = Settings::new();
        for (gi, sections) in layout.iter().enumerate() {
            let g = settings.add_group(&format!("g{gi}")).unwrap();
            for si in 0..*sections {
                let s = settings.add_section(g, &format!("s{si}")).unwrap();
                prop_assert_eq!(s.group(), g);
                for ti in 0..si {
                    let t = settings
                        .add_setting(PropertyInt::new(None, format!("p{ti}"), 0), s)
                        .unwrap();
                    prop_assert_eq!(t.section(), s);
                    prop_assert_eq!(t.group(), s.group());
                }
                prop_assert_eq!(settings.setting_count(s).unwrap(), si);
            }
            prop_assert_eq!(settings.section_count(g).unwrap(), *sections);
        }
        prop_assert_eq!(settings.group_count(), layout.len());
    }

    #[test]
    fn unwritten_keys_read_their_default(key in "[a-z]{1,6}/[a-z]{1,6}", default in variant_strategy()) {
        let settings = Settings::new();
        prop_assert_eq!(settings.value(&key), settings.default_value(&key));
        settings.set_default_value(&key, default.clone());
        prop_assert_eq!(settings.value(&key), default);
    }

    #[test]
    fn written_values_read_back(writes in proptest::collection::vec(("[a-c]", variant_strategy()), 1..20)) {
        let settings = Settings::new();
        for (key, value) in &writes {
            settings.set_value(key, value.clone());
            prop_assert_eq!(&settings.value(key), value);
        }
    }
}
