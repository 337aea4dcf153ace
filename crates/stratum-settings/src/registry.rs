#![forbid(unsafe_code)]

//! The application settings registry.
//!
//! # Design
//!
//! [`Settings`] composes two independent stores:
//!
//! - a **hierarchy** of groups, sections and settings, where each setting is
//!   a shared [`Property`] addressed by a [`SettingIndex`];
//! - a **key/value store** of [`Variant`]s addressed by opaque string paths,
//!   with a parallel table of defaults.
//!
//! Each store has its own notification channel: property changes are
//! dispatched by the property's [`PropertyGroup`](stratum_core::PropertyGroup),
//! key changes by [`Settings::subscribe_value_changed`].
//!
//! All methods take `&self`. State lives behind a `RefCell` and no borrow is
//! held while callbacks run, so observers may read the registry.
//!
//! # Invariants
//!
//! 1. The hierarchy is append-only; an issued index stays valid for the
//!    lifetime of the registry.
//! 2. Every index embeds the [`RegistryId`] of its issuer and is rejected by
//!    any other registry.
//! 3. Group identifiers are unique in the registry, section identifiers are
//!    unique in their group, setting labels are unique in their section.
//! 4. For a key never written, `value(key) == default_value(key)`.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Foreign index | Index from another registry | `SettingsError::ForeignIndex` |
//! | Stale position | Index past the end | `SettingsError::IndexOutOfRange` |
//! | Duplicate identifier | Name already used at this level | `SettingsError::DuplicateIdentifier` |
//! | Reserved identifier | `add_section` with the default section's name | `SettingsError::ReservedIdentifier` |
//! | Double registration | Property already a setting of this registry | `SettingsError::AlreadyRegistered` |
//! | Typed read mismatch | Stored kind not convertible | `SettingsError::Conversion` |
//! | Rejected load entry | Group policy refuses a stored value | Logged at warn, skipped |

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use stratum_core::{
    FromVariant, Property, PropertyError, Signal, Subscription, Variant, same_property,
};
use stratum_core::logging::{debug, debug_span, trace, warn};

use crate::config::SettingsConfig;
use crate::context::{Locale, TextOptions, UnitSystemSchema};
use crate::error::{Level, SettingsError, SettingsResult};
use crate::index::{GroupIndex, RegistryId, SectionIndex, SettingIndex};
use crate::storage::{SettingsMap, StorageBackend};

/// Identifier of the section standing for "the group itself".
pub const DEFAULT_SECTION_IDENTIFIER: &str = "__default";

/// Key of the unit system schema in the key/value store.
pub const KEY_UNIT_SYSTEM_SCHEMA: &str = "application/unitSystemSchema";

/// Key of the number of decimals shown for unit values.
pub const KEY_UNIT_SYSTEM_DECIMALS: &str = "application/unitSystemDecimals";

/// Payload of the key/value change channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged {
    pub key: String,
    pub value: Variant,
}

/// Enumerations stored as [`Variant::Enum`] and read back with
/// [`Settings::value_as_enum`].
pub trait EnumValue: Sized {
    fn from_enum_value(value: i64) -> Option<Self>;
}

impl EnumValue for UnitSystemSchema {
    fn from_enum_value(value: i64) -> Option<Self> {
        Self::from_i64(value)
    }
}

/// Outcome of [`Settings::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Entries committed to registered settings.
    pub applied: usize,
    /// Entries placed in the key/value store.
    pub stored: usize,
    /// Entries refused by a setting, with the reason.
    pub rejected: Vec<(String, PropertyError)>,
}

impl LoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[derive(Debug)]
struct SectionEntry {
    identifier: String,
    title: String,
    is_default: bool,
    settings: Vec<Rc<dyn Property>>,
}

#[derive(Debug)]
struct GroupEntry {
    identifier: String,
    title: String,
    sections: Vec<SectionEntry>,
}

impl GroupEntry {
    fn default_section(&self) -> Option<usize> {
        self.sections.iter().position(|s| s.is_default)
    }
}

#[derive(Debug)]
struct Inner {
    id: RegistryId,
    groups: Vec<GroupEntry>,
    values: BTreeMap<String, Variant>,
    defaults: HashMap<String, Variant>,
    locale: Locale,
}

impl Inner {
    fn group(&self, index: GroupIndex) -> SettingsResult<&GroupEntry> {
        if index.registry() != self.id {
            return Err(SettingsError::ForeignIndex {
                level: Level::Group,
            });
        }
        self.groups
            .get(index.get())
            .ok_or(SettingsError::IndexOutOfRange {
                level: Level::Group,
                index: index.get(),
            })
    }

    fn group_mut(&mut self, index: GroupIndex) -> SettingsResult<&mut GroupEntry> {
        self.group(index)?;
        Ok(&mut self.groups[index.get()])
    }

    fn section(&self, index: SectionIndex) -> SettingsResult<&SectionEntry> {
        self.group(index.group())?
            .sections
            .get(index.get())
            .ok_or(SettingsError::IndexOutOfRange {
                level: Level::Section,
                index: index.get(),
            })
    }

    fn section_mut(&mut self, index: SectionIndex) -> SettingsResult<&mut SectionEntry> {
        self.section(index)?;
        Ok(&mut self.groups[index.group().get()].sections[index.get()])
    }

    fn setting(&self, index: SettingIndex) -> SettingsResult<&Rc<dyn Property>> {
        self.section(index.section())?
            .settings
            .get(index.get())
            .ok_or(SettingsError::IndexOutOfRange {
                level: Level::Setting,
                index: index.get(),
            })
    }

    fn is_registered(&self, prop: &dyn Property) -> bool {
        self.groups
            .iter()
            .flat_map(|g| &g.sections)
            .flat_map(|s| &s.settings)
            .any(|p| same_property(&**p, prop))
    }

    fn effective(&self, key: &str) -> Variant {
        self.values
            .get(key)
            .or_else(|| self.defaults.get(key))
            .cloned()
            .unwrap_or_default()
    }

    fn key_for(group: &GroupEntry, section: &SectionEntry, label: &str) -> String {
        if section.is_default {
            format!("{}/{label}", group.identifier)
        } else {
            format!("{}/{}/{label}", group.identifier, section.identifier)
        }
    }

    /// Every registered setting keyed by its storage path.
    fn settings_by_key(&self) -> Vec<(String, Rc<dyn Property>)> {
        let mut out = Vec::new();
        for group in &self.groups {
            for section in &group.sections {
                for prop in &section.settings {
                    out.push((Self::key_for(group, section, prop.label()), Rc::clone(prop)));
                }
            }
        }
        out
    }
}

/// Registry of application settings.
pub struct Settings {
    inner: RefCell<Inner>,
    value_changed: Signal<ValueChanged>,
    storage_path: Option<PathBuf>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Settings")
            .field("id", &inner.id)
            .field("groups", &inner.groups.len())
            .field("values", &inner.values.len())
            .field("locale", &inner.locale)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_config(SettingsConfig::default())
    }
}

thread_local! {
    static INSTANCE: Rc<Settings> = Rc::new(Settings::from_env());
}

impl Settings {
    /// Empty registry with default context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry whose context defaults come from `config`.
    ///
    /// The configured unit schema and decimals become the *defaults* of
    /// their keys, so values loaded from storage still take precedence.
    #[must_use]
    pub fn with_config(config: SettingsConfig) -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(
            KEY_UNIT_SYSTEM_SCHEMA.to_owned(),
            Variant::from(config.unit_schema),
        );
        defaults.insert(
            KEY_UNIT_SYSTEM_DECIMALS.to_owned(),
            Variant::from(config.unit_decimals),
        );
        let id = RegistryId::next();
        debug!(registry = ?id, locale = %config.locale, "settings registry created");
        Self {
            inner: RefCell::new(Inner {
                id,
                groups: Vec::new(),
                values: BTreeMap::new(),
                defaults,
                locale: config.locale,
            }),
            value_changed: Signal::new(),
            storage_path: config.storage_path,
        }
    }

    fn from_env() -> Self {
        let parsed = SettingsConfig::from_env_with_diagnostics();
        for error in &parsed.errors {
            warn!(%error, "ignoring invalid settings configuration");
        }
        Self::with_config(parsed.config)
    }

    /// The registry of the current thread, built from the environment on
    /// first access.
    #[must_use]
    pub fn instance() -> Rc<Settings> {
        INSTANCE.with(Rc::clone)
    }

    #[must_use]
    pub fn id(&self) -> RegistryId {
        self.inner.borrow().id
    }

    /// Storage location from the configuration, if any.
    #[must_use]
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    // -- groups -------------------------------------------------------------

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.inner.borrow().groups.len()
    }

    /// All groups in insertion order.
    #[must_use]
    pub fn groups(&self) -> Vec<GroupIndex> {
        let inner = self.inner.borrow();
        (0..inner.groups.len())
            .map(|i| GroupIndex::new(inner.id, i))
            .collect()
    }

    pub fn add_group(&self, identifier: &str) -> SettingsResult<GroupIndex> {
        let mut inner = self.inner.borrow_mut();
        if inner.groups.iter().any(|g| g.identifier == identifier) {
            return Err(SettingsError::DuplicateIdentifier {
                level: Level::Group,
                identifier: identifier.to_owned(),
            });
        }
        inner.groups.push(GroupEntry {
            identifier: identifier.to_owned(),
            title: identifier.to_owned(),
            sections: Vec::new(),
        });
        let index = GroupIndex::new(inner.id, inner.groups.len() - 1);
        debug!(identifier, index = index.get(), "group added");
        Ok(index)
    }

    #[must_use]
    pub fn find_group(&self, identifier: &str) -> Option<GroupIndex> {
        let inner = self.inner.borrow();
        inner
            .groups
            .iter()
            .position(|g| g.identifier == identifier)
            .map(|i| GroupIndex::new(inner.id, i))
    }

    pub fn group_identifier(&self, group: GroupIndex) -> SettingsResult<String> {
        Ok(self.inner.borrow().group(group)?.identifier.clone())
    }

    pub fn group_title(&self, group: GroupIndex) -> SettingsResult<String> {
        Ok(self.inner.borrow().group(group)?.title.clone())
    }

    pub fn set_group_title(&self, group: GroupIndex, title: impl Into<String>) -> SettingsResult<()> {
        self.inner.borrow_mut().group_mut(group)?.title = title.into();
        Ok(())
    }

    // -- sections -----------------------------------------------------------

    /// Number of sections in `group`, the default section included.
    pub fn section_count(&self, group: GroupIndex) -> SettingsResult<usize> {
        Ok(self.inner.borrow().group(group)?.sections.len())
    }

    pub fn sections(&self, group: GroupIndex) -> SettingsResult<Vec<SectionIndex>> {
        let count = self.section_count(group)?;
        Ok((0..count).map(|i| SectionIndex::new(group, i)).collect())
    }

    /// Add a user-visible section to `group`.
    ///
    /// [`DEFAULT_SECTION_IDENTIFIER`] is reserved for the section created by
    /// [`add_setting_to_group`](Self::add_setting_to_group).
    pub fn add_section(&self, group: GroupIndex, identifier: &str) -> SettingsResult<SectionIndex> {
        if identifier == DEFAULT_SECTION_IDENTIFIER {
            return Err(SettingsError::ReservedIdentifier {
                level: Level::Section,
                identifier: identifier.to_owned(),
            });
        }
        let index = self.push_section(group, identifier, false)?;
        debug!(identifier, group = group.get(), index = index.get(), "section added");
        Ok(index)
    }

    fn push_section(
        &self,
        group: GroupIndex,
        identifier: &str,
        is_default: bool,
    ) -> SettingsResult<SectionIndex> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.group_mut(group)?;
        if entry.sections.iter().any(|s| s.identifier == identifier) {
            return Err(SettingsError::DuplicateIdentifier {
                level: Level::Section,
                identifier: identifier.to_owned(),
            });
        }
        entry.sections.push(SectionEntry {
            identifier: identifier.to_owned(),
            title: identifier.to_owned(),
            is_default,
            settings: Vec::new(),
        });
        Ok(SectionIndex::new(group, entry.sections.len() - 1))
    }

    pub fn find_section(
        &self,
        group: GroupIndex,
        identifier: &str,
    ) -> SettingsResult<Option<SectionIndex>> {
        let inner = self.inner.borrow();
        Ok(inner
            .group(group)?
            .sections
            .iter()
            .position(|s| s.identifier == identifier)
            .map(|i| SectionIndex::new(group, i)))
    }

    /// The default section of `group`, if one was created.
    pub fn default_section(&self, group: GroupIndex) -> SettingsResult<Option<SectionIndex>> {
        let inner = self.inner.borrow();
        Ok(inner
            .group(group)?
            .default_section()
            .map(|i| SectionIndex::new(group, i)))
    }

    pub fn section_identifier(&self, section: SectionIndex) -> SettingsResult<String> {
        Ok(self.inner.borrow().section(section)?.identifier.clone())
    }

    pub fn section_title(&self, section: SectionIndex) -> SettingsResult<String> {
        Ok(self.inner.borrow().section(section)?.title.clone())
    }

    pub fn set_section_title(
        &self,
        section: SectionIndex,
        title: impl Into<String>,
    ) -> SettingsResult<()> {
        self.inner.borrow_mut().section_mut(section)?.title = title.into();
        Ok(())
    }

    /// True if `section` stands for its group rather than being user-visible.
    pub fn is_default_group_section(&self, section: SectionIndex) -> SettingsResult<bool> {
        Ok(self.inner.borrow().section(section)?.is_default)
    }

    // -- settings -----------------------------------------------------------

    pub fn setting_count(&self, section: SectionIndex) -> SettingsResult<usize> {
        Ok(self.inner.borrow().section(section)?.settings.len())
    }

    pub fn settings(&self, section: SectionIndex) -> SettingsResult<Vec<SettingIndex>> {
        let count = self.setting_count(section)?;
        Ok((0..count).map(|i| SettingIndex::new(section, i)).collect())
    }

    /// Add `prop` to `section`.
    ///
    /// A property can be registered once per registry.
    pub fn add_setting(
        &self,
        prop: Rc<dyn Property>,
        section: SectionIndex,
    ) -> SettingsResult<SettingIndex> {
        let mut inner = self.inner.borrow_mut();
        inner.section(section)?;
        if inner.is_registered(&*prop) {
            return Err(SettingsError::AlreadyRegistered {
                label: prop.label().to_owned(),
            });
        }
        let entry = inner.section_mut(section)?;
        if entry.settings.iter().any(|p| p.label() == prop.label()) {
            return Err(SettingsError::DuplicateIdentifier {
                level: Level::Setting,
                identifier: prop.label().to_owned(),
            });
        }
        debug!(label = prop.label(), section = section.get(), "setting added");
        entry.settings.push(prop);
        Ok(SettingIndex::new(section, entry.settings.len() - 1))
    }

    /// Add `prop` directly under `group`, creating its default section on
    /// first use.
    pub fn add_setting_to_group(
        &self,
        prop: Rc<dyn Property>,
        group: GroupIndex,
    ) -> SettingsResult<SettingIndex> {
        if self.inner.borrow().is_registered(&*prop) {
            return Err(SettingsError::AlreadyRegistered {
                label: prop.label().to_owned(),
            });
        }
        let section = match self.default_section(group)? {
            Some(section) => section,
            None => {
                let section = self.push_section(group, DEFAULT_SECTION_IDENTIFIER, true)?;
                debug!(group = group.get(), "default section created");
                section
            }
        };
        self.add_setting(prop, section)
    }

    /// The property registered at `setting`.
    pub fn property(&self, setting: SettingIndex) -> SettingsResult<Rc<dyn Property>> {
        Ok(Rc::clone(self.inner.borrow().setting(setting)?))
    }

    /// Storage path of `setting`: `group/section/label`, or `group/label`
    /// for settings of a default section.
    pub fn setting_key(&self, setting: SettingIndex) -> SettingsResult<String> {
        let inner = self.inner.borrow();
        let prop = inner.setting(setting)?;
        let group = inner.group(setting.group())?;
        let section = inner.section(setting.section())?;
        Ok(Inner::key_for(group, section, prop.label()))
    }

    // -- key/value store ----------------------------------------------------

    /// Stored value of `key`, falling back to its default, then to `Null`.
    #[must_use]
    pub fn value(&self, key: &str) -> Variant {
        self.inner.borrow().effective(key)
    }

    /// True if `key` holds an explicit value.
    #[must_use]
    pub fn has_value(&self, key: &str) -> bool {
        self.inner.borrow().values.contains_key(key)
    }

    /// Value of `key` converted to `T`.
    pub fn value_as<T: FromVariant>(&self, key: &str) -> SettingsResult<T> {
        T::from_variant(&self.value(key)).map_err(|source| SettingsError::Conversion {
            key: key.to_owned(),
            source,
        })
    }

    /// Value of `key` read as an enumeration.
    pub fn value_as_enum<E: EnumValue>(&self, key: &str) -> SettingsResult<E> {
        let raw = self
            .value(key)
            .to_enum()
            .map_err(|source| SettingsError::Conversion {
                key: key.to_owned(),
                source,
            })?;
        E::from_enum_value(raw).ok_or_else(|| SettingsError::UnknownEnumValue {
            key: key.to_owned(),
            value: raw,
        })
    }

    /// Store `value` under `key`.
    ///
    /// Subscribers are notified whenever the explicit entry of `key` changes,
    /// including the first write of a value equal to the default. Rewriting
    /// the value already stored is silent.
    pub fn set_value(&self, key: &str, value: impl Into<Variant>) {
        let value = value.into();
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.values.insert(key.to_owned(), value.clone());
            previous.as_ref() != Some(&value)
        };
        if changed {
            trace!(key, %value, "value changed");
            self.value_changed.emit(&ValueChanged {
                key: key.to_owned(),
                value,
            });
        }
    }

    /// Drop the explicit value of `key`, exposing its default again.
    ///
    /// Subscribers receive the default. Returns false, without notifying, if
    /// `key` had no explicit value.
    pub fn reset_value(&self, key: &str) -> bool {
        let value = {
            let mut inner = self.inner.borrow_mut();
            if inner.values.remove(key).is_none() {
                return false;
            }
            inner.effective(key)
        };
        trace!(key, %value, "value reset");
        self.value_changed.emit(&ValueChanged {
            key: key.to_owned(),
            value,
        });
        true
    }

    #[must_use]
    pub fn default_value(&self, key: &str) -> Variant {
        self.inner
            .borrow()
            .defaults
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Set the fallback for `key`. Does not notify.
    pub fn set_default_value(&self, key: &str, value: impl Into<Variant>) {
        self.inner
            .borrow_mut()
            .defaults
            .insert(key.to_owned(), value.into());
    }

    /// Register a callback for key/value changes.
    pub fn subscribe_value_changed(
        &self,
        callback: impl Fn(&ValueChanged) + 'static,
    ) -> Subscription {
        self.value_changed.subscribe(callback)
    }

    // -- context ------------------------------------------------------------

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.inner.borrow().locale.clone()
    }

    pub fn set_locale(&self, locale: impl Into<Locale>) {
        let locale = locale.into();
        debug!(%locale, "locale set");
        self.inner.borrow_mut().locale = locale;
    }

    /// Active unit schema. A malformed stored value falls back to the
    /// default schema.
    #[must_use]
    pub fn unit_system_schema(&self) -> UnitSystemSchema {
        self.value_as_enum(KEY_UNIT_SYSTEM_SCHEMA)
            .unwrap_or_else(|error| {
                warn!(%error, "invalid unit system schema, using default");
                UnitSystemSchema::default()
            })
    }

    pub fn set_unit_system_schema(&self, schema: UnitSystemSchema) {
        self.set_value(KEY_UNIT_SYSTEM_SCHEMA, schema);
    }

    /// Decimals shown for unit values. A malformed stored value falls back
    /// to the default.
    #[must_use]
    pub fn unit_system_decimals(&self) -> u32 {
        self.value_as(KEY_UNIT_SYSTEM_DECIMALS).unwrap_or_else(|error| {
            warn!(%error, "invalid unit decimals, using default");
            TextOptions::default().unit_decimals
        })
    }

    pub fn set_unit_system_decimals(&self, decimals: u32) {
        self.set_value(KEY_UNIT_SYSTEM_DECIMALS, decimals);
    }

    /// Formatting options reflecting the current context.
    #[must_use]
    pub fn default_text_options(&self) -> TextOptions {
        TextOptions {
            locale: self.locale(),
            unit_schema: self.unit_system_schema(),
            unit_decimals: self.unit_system_decimals(),
        }
    }

    // -- persistence --------------------------------------------------------

    /// Write explicit key/value entries and every setting's current value
    /// to `backend`. Returns the number of entries written.
    pub fn save(&self, backend: &dyn StorageBackend) -> SettingsResult<usize> {
        let _span = debug_span!("settings_save", backend = backend.name()).entered();
        let entries: SettingsMap = {
            let inner = self.inner.borrow();
            let mut entries = inner.values.clone();
            for (key, prop) in inner.settings_by_key() {
                entries.insert(key, prop.value_as_variant());
            }
            entries
        };
        backend.save_all(&entries)?;
        debug!(entries = entries.len(), "settings saved");
        Ok(entries.len())
    }

    /// Restore entries from `backend`.
    ///
    /// Entries addressing a registered setting go through the setting's
    /// commit protocol; refusals are logged and reported, never fatal. Other
    /// entries populate the key/value store without notifying.
    pub fn load(&self, backend: &dyn StorageBackend) -> SettingsResult<LoadReport> {
        let _span = debug_span!("settings_load", backend = backend.name()).entered();
        let entries = backend.load_all()?;
        let settings: HashMap<String, Rc<dyn Property>> =
            self.inner.borrow().settings_by_key().into_iter().collect();

        let mut report = LoadReport::default();
        for (key, value) in entries {
            match settings.get(&key) {
                Some(prop) => match prop.set_value_from_variant(&value) {
                    Ok(()) => report.applied += 1,
                    Err(error) => {
                        warn!(key = %key, %error, "stored setting rejected");
                        report.rejected.push((key, error));
                    }
                },
                None => {
                    self.inner.borrow_mut().values.insert(key, value);
                    report.stored += 1;
                }
            }
        }
        debug!(
            applied = report.applied,
            stored = report.stored,
            rejected = report.rejected.len(),
            "settings loaded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use stratum_core::{PropertyGroup, PropertyInt, PropertyString, same_property};

    use crate::storage::MemoryStorage;

    fn recorder(settings: &Settings) -> (Rc<RefCell<Vec<ValueChanged>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = settings.subscribe_value_changed(move |ev| sink.borrow_mut().push(ev.clone()));
        (log, sub)
    }

    #[test]
    fn hierarchy_crud() {
        let settings = Settings::new();
        let g0 = settings.add_group("general").unwrap();
        let s0 = settings.add_section(g0, "display").unwrap();
        let prop = PropertyInt::new(None, "zoom", 100);
        let t0 = settings.add_setting(prop.clone(), s0).unwrap();

        assert_eq!(settings.group_count(), 1);
        assert_eq!(settings.section_count(g0).unwrap(), 1);
        assert_eq!(settings.setting_count(s0).unwrap(), 1);
        assert!(same_property(&*settings.property(t0).unwrap(), &*prop));
        assert_eq!(t0.section(), s0);
        assert_eq!(t0.group(), g0);
        assert_eq!(settings.find_group("general"), Some(g0));
        assert_eq!(settings.find_section(g0, "display").unwrap(), Some(s0));
    }

    #[test]
    fn titles_default_to_identifier() {
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        let s = settings.add_section(g, "display").unwrap();
        assert_eq!(settings.group_title(g).unwrap(), "general");
        settings.set_group_title(g, "General").unwrap();
        settings.set_section_title(s, "Display").unwrap();
        assert_eq!(settings.group_title(g).unwrap(), "General");
        assert_eq!(settings.group_identifier(g).unwrap(), "general");
        assert_eq!(settings.section_title(s).unwrap(), "Display");
        assert_eq!(settings.section_identifier(s).unwrap(), "display");
    }

    #[test]
    fn duplicates_are_rejected() {
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        assert!(matches!(
            settings.add_group("general"),
            Err(SettingsError::DuplicateIdentifier {
                level: Level::Group,
                ..
            })
        ));
        let s = settings.add_section(g, "display").unwrap();
        assert!(settings.add_section(g, "display").is_err());

        settings
            .add_setting(PropertyInt::new(None, "zoom", 1), s)
            .unwrap();
        let err = settings
            .add_setting(PropertyInt::new(None, "zoom", 2), s)
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::DuplicateIdentifier {
                level: Level::Setting,
                ..
            }
        ));
        assert_eq!(settings.setting_count(s).unwrap(), 1);
    }

    #[test]
    fn foreign_and_stale_indices_are_rejected() {
        let a = Settings::new();
        let b = Settings::new();
        let ga = a.add_group("general").unwrap();
        b.add_group("general").unwrap();

        assert!(matches!(
            b.section_count(ga),
            Err(SettingsError::ForeignIndex {
                level: Level::Group
            })
        ));
        let stale = SectionIndex::new(ga, 5);
        assert!(matches!(
            a.setting_count(stale),
            Err(SettingsError::IndexOutOfRange {
                level: Level::Section,
                index: 5
            })
        ));
    }

    #[test]
    fn default_section_is_created_once() {
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        let t1 = settings
            .add_setting_to_group(PropertyInt::new(None, "a", 1), g)
            .unwrap();
        let t2 = settings
            .add_setting_to_group(PropertyInt::new(None, "b", 2), g)
            .unwrap();

        assert_eq!(t1.section(), t2.section());
        assert_eq!(settings.section_count(g).unwrap(), 1);
        assert!(settings.is_default_group_section(t1.section()).unwrap());
        assert_eq!(settings.default_section(g).unwrap(), Some(t1.section()));

        let explicit = settings.add_section(g, "display").unwrap();
        assert!(!settings.is_default_group_section(explicit).unwrap());
    }

    #[test]
    fn default_section_identifier_is_reserved() {
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        assert!(matches!(
            settings.add_section(g, DEFAULT_SECTION_IDENTIFIER),
            Err(SettingsError::ReservedIdentifier {
                level: Level::Section,
                ..
            })
        ));
        assert_eq!(settings.section_count(g).unwrap(), 0);

        let t = settings
            .add_setting_to_group(PropertyInt::new(None, "zoom", 1), g)
            .unwrap();
        assert!(settings.is_default_group_section(t.section()).unwrap());
        assert_eq!(
            settings.find_section(g, DEFAULT_SECTION_IDENTIFIER).unwrap(),
            Some(t.section())
        );
    }

    #[test]
    fn property_is_registered_once() {
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        let display = settings.add_section(g, "display").unwrap();
        let other = settings.add_section(g, "other").unwrap();
        let zoom = PropertyInt::new(None, "zoom", 1);

        settings.add_setting(zoom.clone(), display).unwrap();
        assert!(matches!(
            settings.add_setting(zoom.clone(), other),
            Err(SettingsError::AlreadyRegistered { ref label }) if label == "zoom"
        ));
        assert!(matches!(
            settings.add_setting_to_group(zoom.clone(), g),
            Err(SettingsError::AlreadyRegistered { .. })
        ));
        assert_eq!(settings.default_section(g).unwrap(), None);
        assert_eq!(settings.setting_count(other).unwrap(), 0);

        // Another registry may still hold the same property.
        let second = Settings::new();
        let g2 = second.add_group("general").unwrap();
        second.add_setting_to_group(zoom, g2).unwrap();
    }

    #[test]
    fn setting_keys() {
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        let s = settings.add_section(g, "display").unwrap();
        let in_section = settings
            .add_setting(PropertyString::new(None, "theme", "dark".to_owned()), s)
            .unwrap();
        let in_group = settings
            .add_setting_to_group(PropertyInt::new(None, "zoom", 1), g)
            .unwrap();
        assert_eq!(settings.setting_key(in_section).unwrap(), "general/display/theme");
        assert_eq!(settings.setting_key(in_group).unwrap(), "general/zoom");
    }

    #[test]
    fn value_falls_back_to_default() {
        let settings = Settings::new();
        assert_eq!(settings.value("app/zoom"), Variant::Null);
        settings.set_default_value("app/zoom", 1.0);
        assert_eq!(settings.value("app/zoom"), Variant::Double(1.0));
        assert!(!settings.has_value("app/zoom"));
        settings.set_value("app/zoom", 2.0);
        assert_eq!(settings.value("app/zoom"), Variant::Double(2.0));
        assert_eq!(settings.default_value("app/zoom"), Variant::Double(1.0));
    }

    #[test]
    fn value_changed_fires_when_explicit_entry_changes() {
        let settings = Settings::new();
        let (log, _sub) = recorder(&settings);

        settings.set_value("app/zoom", 2.0);
        settings.set_value("app/zoom", 2.0);
        settings.set_value("app/zoom", 3.0);
        assert_eq!(
            *log.borrow(),
            [
                ValueChanged {
                    key: "app/zoom".into(),
                    value: Variant::Double(2.0)
                },
                ValueChanged {
                    key: "app/zoom".into(),
                    value: Variant::Double(3.0)
                },
            ]
        );
    }

    #[test]
    fn writing_the_default_explicitly_notifies() {
        let settings = Settings::new();
        settings.set_default_value("app/zoom", 1.0);
        let (log, _sub) = recorder(&settings);

        settings.set_value("app/zoom", 1.0);
        assert!(settings.has_value("app/zoom"));
        assert_eq!(
            *log.borrow(),
            [ValueChanged {
                key: "app/zoom".into(),
                value: Variant::Double(1.0)
            }]
        );
    }

    #[test]
    fn same_value_different_kind_notifies() {
        let settings = Settings::new();
        settings.set_value("k", Variant::Int(1));
        let (log, _sub) = recorder(&settings);
        settings.set_value("k", Variant::Enum(1));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn reset_value_restores_default_and_notifies() {
        let settings = Settings::new();
        settings.set_default_value("app/zoom", 1.0);
        settings.set_value("app/zoom", 3.0);
        let (log, _sub) = recorder(&settings);

        assert!(settings.reset_value("app/zoom"));
        assert!(!settings.reset_value("app/zoom"));
        assert_eq!(settings.value("app/zoom"), Variant::Double(1.0));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].value, Variant::Double(1.0));
    }

    #[test]
    fn reset_of_value_equal_to_default_notifies() {
        let settings = Settings::new();
        settings.set_default_value("app/zoom", 1.0);
        settings.set_value("app/zoom", 1.0);
        let (log, _sub) = recorder(&settings);

        assert!(settings.reset_value("app/zoom"));
        assert!(!settings.has_value("app/zoom"));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn observers_may_read_the_registry() {
        let settings = Rc::new(Settings::new());
        let seen = Rc::new(RefCell::new(Variant::Null));
        let reader = Rc::clone(&settings);
        let sink = Rc::clone(&seen);
        let _sub = settings.subscribe_value_changed(move |ev| {
            *sink.borrow_mut() = reader.value(&ev.key);
        });
        settings.set_value("k", "v");
        assert_eq!(*seen.borrow(), Variant::from("v"));
    }

    #[test]
    fn typed_projections_fail_loudly() {
        let settings = Settings::new();
        settings.set_value("flag", true);
        settings.set_value("name", "x");
        assert!(settings.value_as::<bool>("flag").unwrap());
        assert!(matches!(
            settings.value_as::<bool>("name"),
            Err(SettingsError::Conversion { .. })
        ));

        settings.set_value("schema", Variant::Enum(7));
        assert!(matches!(
            settings.value_as_enum::<UnitSystemSchema>("schema"),
            Err(SettingsError::UnknownEnumValue { value: 7, .. })
        ));
    }

    #[test]
    fn context_defaults_and_overrides() {
        let settings = Settings::new();
        assert_eq!(settings.locale(), "en-US");
        assert_eq!(settings.unit_system_schema(), UnitSystemSchema::SI);
        assert_eq!(settings.unit_system_decimals(), 2);

        settings.set_locale("de-DE");
        settings.set_unit_system_schema(UnitSystemSchema::ImperialUK);
        settings.set_unit_system_decimals(3);
        assert_eq!(
            settings.default_text_options(),
            TextOptions {
                locale: "de-DE".into(),
                unit_schema: UnitSystemSchema::ImperialUK,
                unit_decimals: 3,
            }
        );
        assert_eq!(
            settings.value(KEY_UNIT_SYSTEM_SCHEMA),
            Variant::Enum(UnitSystemSchema::ImperialUK.as_i64())
        );
    }

    #[test]
    fn malformed_context_value_falls_back() {
        let settings = Settings::new();
        settings.set_value(KEY_UNIT_SYSTEM_DECIMALS, "many");
        assert_eq!(settings.unit_system_decimals(), 2);
    }

    #[test]
    fn with_config_seeds_context_defaults() {
        let settings = Settings::with_config(
            SettingsConfig::new()
                .with_locale("fr-FR")
                .with_unit_schema(UnitSystemSchema::ImperialUK)
                .with_unit_decimals(1)
                .with_storage_path("/tmp/s.json"),
        );
        assert_eq!(settings.locale(), "fr-FR");
        assert_eq!(settings.unit_system_schema(), UnitSystemSchema::ImperialUK);
        assert_eq!(settings.unit_system_decimals(), 1);
        assert!(!settings.has_value(KEY_UNIT_SYSTEM_SCHEMA));
        assert_eq!(settings.storage_path(), Some(Path::new("/tmp/s.json")));
    }

    #[test]
    fn instance_is_shared_per_thread() {
        let a = Settings::instance();
        let b = Settings::instance();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn save_and_load_round_trip() {
        let storage = MemoryStorage::new();
        {
            let settings = Settings::new();
            let g = settings.add_group("general").unwrap();
            settings
                .add_setting_to_group(PropertyInt::new(None, "zoom", 150), g)
                .unwrap();
            settings.set_value("app/recent", "a.txt");
            assert_eq!(settings.save(&storage).unwrap(), 2);
        }

        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        let zoom = PropertyInt::new(None, "zoom", 100);
        settings.add_setting_to_group(zoom.clone(), g).unwrap();
        let (log, _sub) = recorder(&settings);

        let report = settings.load(&storage).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.stored, 1);
        assert!(report.is_clean());
        assert_eq!(zoom.value(), 150);
        assert_eq!(settings.value("app/recent"), Variant::from("a.txt"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn load_skips_rejected_entries() {
        let storage = MemoryStorage::with_entries(SettingsMap::from([
            ("general/zoom".to_string(), Variant::from("huge")),
            ("general/count".to_string(), Variant::Int(4)),
        ]));
        let settings = Settings::new();
        let g = settings.add_group("general").unwrap();
        let group = PropertyGroup::new();
        let zoom = PropertyInt::new(Some(&group), "zoom", 100);
        let count = PropertyInt::new(Some(&group), "count", 1);
        settings.add_setting_to_group(zoom.clone(), g).unwrap();
        settings.add_setting_to_group(count.clone(), g).unwrap();

        let report = settings.load(&storage).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, "general/zoom");
        assert_eq!(zoom.value(), 100);
        assert_eq!(count.value(), 4);
    }
}
