#![forbid(unsafe_code)]

//! Hierarchical setting indices.
//!
//! Three index levels address the registry: a [`GroupIndex`] is a root, a
//! [`SectionIndex`] carries its group, and a [`SettingIndex`] carries its
//! section. Every index also carries the [`RegistryId`] of the registry that
//! issued it, so an index can never be resolved against another registry.
//!
//! Indices are plain `Copy` values, compared by identity, and stay valid for
//! the lifetime of the registry (the registry is append-only).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// An integer tagged with a role, so unrelated index kinds cannot mix.
pub struct TypedScalar<Tag> {
    scalar: usize,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Tag> TypedScalar<Tag> {
    #[must_use]
    pub const fn new(scalar: usize) -> Self {
        Self {
            scalar,
            _tag: PhantomData,
        }
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.scalar
    }
}

// Manual impls: derives would require `Tag` itself to implement the traits.
impl<Tag> Clone for TypedScalar<Tag> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tag> Copy for TypedScalar<Tag> {}

impl<Tag> PartialEq for TypedScalar<Tag> {
    fn eq(&self, other: &Self) -> bool {
        self.scalar == other.scalar
    }
}

impl<Tag> Eq for TypedScalar<Tag> {}

impl<Tag> Hash for TypedScalar<Tag> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scalar.hash(state);
    }
}

impl<Tag> fmt::Debug for TypedScalar<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scalar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupTag {}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionTag {}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingTag {}

/// Process-unique identity of a registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Root index: a group of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupIndex {
    registry: RegistryId,
    index: TypedScalar<GroupTag>,
}

impl GroupIndex {
    pub(crate) fn new(registry: RegistryId, index: usize) -> Self {
        Self {
            registry,
            index: TypedScalar::new(index),
        }
    }

    /// Position of the group in the registry.
    #[must_use]
    pub fn get(self) -> usize {
        self.index.get()
    }

    #[must_use]
    pub fn registry(self) -> RegistryId {
        self.registry
    }
}

/// A section inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionIndex {
    group: GroupIndex,
    index: TypedScalar<SectionTag>,
}

impl SectionIndex {
    pub(crate) fn new(group: GroupIndex, index: usize) -> Self {
        Self {
            group,
            index: TypedScalar::new(index),
        }
    }

    /// Position of the section inside its group.
    #[must_use]
    pub fn get(self) -> usize {
        self.index.get()
    }

    #[must_use]
    pub fn group(self) -> GroupIndex {
        self.group
    }

    #[must_use]
    pub fn registry(self) -> RegistryId {
        self.group.registry()
    }
}

/// A setting inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettingIndex {
    section: SectionIndex,
    index: TypedScalar<SettingTag>,
}

impl SettingIndex {
    pub(crate) fn new(section: SectionIndex, index: usize) -> Self {
        Self {
            section,
            index: TypedScalar::new(index),
        }
    }

    /// Position of the setting inside its section.
    #[must_use]
    pub fn get(self) -> usize {
        self.index.get()
    }

    #[must_use]
    pub fn section(self) -> SectionIndex {
        self.section
    }

    #[must_use]
    pub fn group(self) -> GroupIndex {
        self.section.group()
    }

    #[must_use]
    pub fn registry(self) -> RegistryId {
        self.section.registry()
    }
}
