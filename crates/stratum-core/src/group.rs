#![forbid(unsafe_code)]

//! Property groups: membership, validation policy, and change dispatch.
//!
//! # Design
//!
//! A [`PropertyGroup`] keeps an ordered list of non-owning handles to its
//! member properties. Members are owned elsewhere (usually by the struct that
//! also owns the group), so dropping a group never drops a property, and a
//! dropped property simply disappears from [`PropertyGroup::properties`].
//!
//! Domain rules live in a [`GroupPolicy`]: it is asked to validate every
//! candidate value during the commit protocol and is told about every
//! committed change. After the policy, the group's subscribers are notified
//! synchronously in registration order.
//!
//! # Invariants
//!
//! 1. Member order is insertion order.
//! 2. A property is a member of at most one group: the group it was
//!    constructed for.
//! 3. While the suppression depth is non-zero no change is dispatched, not
//!    even to the policy.
//! 4. Suppression nests: each [`PropertyChangedBlocker`] adds one level and
//!    removes it on drop, so an inner scope never re-enables dispatch for an
//!    outer one.
//!
//! # Failure Modes
//!
//! | Misuse | Behavior |
//! |--------|----------|
//! | Adding a member twice | `Misuse::DuplicateMember` |
//! | Adding another group's property | `Misuse::ForeignMember` |
//! | Removing a non-member | `Misuse::NotAMember` |
//! | Unblocking an unblocked group | Logged at `warn`, no-op |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::error::{Misuse, PropertyResult, ValidationError};
use crate::property::{Property, PropertyBase};
use crate::signal::{Signal, Subscription};

/// Validation and change-handling rules for a group.
pub trait GroupPolicy {
    /// Called during the commit protocol, after the candidate value has been
    /// written and before anyone is notified. Sibling properties may be
    /// read through `group`.
    fn is_property_valid(
        &self,
        group: &PropertyGroup,
        prop: &dyn Property,
    ) -> Result<(), ValidationError> {
        let _ = (group, prop);
        Ok(())
    }

    /// Called after a successful commit on a direct member, unless the group
    /// is blocked.
    fn on_property_changed(&self, group: &PropertyGroup, prop: &dyn Property) {
        let _ = (group, prop);
    }
}

/// Accepts everything and notifies only the group's own subscribers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl GroupPolicy for AcceptAll {}

/// Accepts everything and forwards change notifications to the parent group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardToParent;

impl GroupPolicy for ForwardToParent {
    fn on_property_changed(&self, group: &PropertyGroup, prop: &dyn Property) {
        if let Some(parent) = group.parent_group() {
            parent.notify_property_changed(prop);
        }
    }
}

/// An ordered collection of properties sharing validation and notification.
pub struct PropertyGroup {
    parent: Option<Weak<PropertyGroup>>,
    members: RefCell<Vec<Weak<dyn Property>>>,
    blocked_depth: Cell<u32>,
    policy: Box<dyn GroupPolicy>,
    changed: Signal<Rc<dyn Property>>,
}

impl PropertyGroup {
    /// A top-level group using [`AcceptAll`].
    #[must_use]
    pub fn new() -> Rc<Self> {
        Self::build(None, Box::new(AcceptAll))
    }

    /// A top-level group with custom rules.
    #[must_use]
    pub fn with_policy(policy: impl GroupPolicy + 'static) -> Rc<Self> {
        Self::build(None, Box::new(policy))
    }

    /// A group nested under `parent`. The parent is not kept alive by it.
    #[must_use]
    pub fn nested(parent: &Rc<PropertyGroup>, policy: impl GroupPolicy + 'static) -> Rc<Self> {
        Self::build(Some(Rc::downgrade(parent)), Box::new(policy))
    }

    fn build(parent: Option<Weak<PropertyGroup>>, policy: Box<dyn GroupPolicy>) -> Rc<Self> {
        Rc::new(Self {
            parent,
            members: RefCell::new(Vec::new()),
            blocked_depth: Cell::new(0),
            policy,
            changed: Signal::new(),
        })
    }

    #[must_use]
    pub fn parent_group(&self) -> Option<Rc<PropertyGroup>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Live members in insertion order. Dropped members are pruned.
    #[must_use]
    pub fn properties(&self) -> Vec<Rc<dyn Property>> {
        let mut members = self.members.borrow_mut();
        members.retain(|w| w.strong_count() > 0);
        members.iter().filter_map(Weak::upgrade).collect()
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties().len()
    }

    /// First member whose label equals `label`.
    #[must_use]
    pub fn find_property(&self, label: &str) -> Option<Rc<dyn Property>> {
        self.properties().into_iter().find(|p| p.label() == label)
    }

    #[must_use]
    pub fn contains(&self, prop: &dyn Property) -> bool {
        self.position_of(prop).is_some()
    }

    /// Add `prop` back to the member list, after a [`remove_property`].
    ///
    /// [`remove_property`]: Self::remove_property
    pub fn add_property(&self, prop: &dyn Property) -> PropertyResult {
        if !prop.base().is_owned_by(self) {
            return Err(Misuse::ForeignMember {
                label: prop.label().to_owned(),
            }
            .into());
        }
        if self.contains(prop) {
            return Err(Misuse::DuplicateMember {
                label: prop.label().to_owned(),
            }
            .into());
        }
        self.attach(prop.base());
        Ok(())
    }

    /// Remove `prop` from the member list. The property itself is untouched.
    pub fn remove_property(&self, prop: &dyn Property) -> PropertyResult {
        let Some(pos) = self.position_of(prop) else {
            return Err(Misuse::NotAMember {
                label: prop.label().to_owned(),
            }
            .into());
        };
        self.members.borrow_mut().remove(pos);
        debug!(label = prop.label(), "removed property from group");
        Ok(())
    }

    pub(crate) fn attach(&self, base: &PropertyBase) {
        self.members.borrow_mut().push(base.handle().clone());
        debug!(label = base.label(), "added property to group");
    }

    fn position_of(&self, prop: &dyn Property) -> Option<usize> {
        let target: *const dyn Property = prop;
        self.members
            .borrow()
            .iter()
            .position(|w| w.strong_count() > 0 && std::ptr::addr_eq(w.as_ptr(), target))
    }

    /// Ask the policy whether the current state of `prop` is acceptable.
    pub fn is_property_valid(&self, prop: &dyn Property) -> Result<(), ValidationError> {
        self.policy.is_property_valid(self, prop)
    }

    /// Dispatch a committed change of `prop`, unless blocked.
    pub fn notify_property_changed(&self, prop: &dyn Property) {
        if self.is_property_changed_blocked() {
            trace!(label = prop.label(), "property change suppressed");
            return;
        }
        self.policy.on_property_changed(self, prop);
        if let Some(handle) = prop.base().handle().upgrade() {
            self.changed.emit(&handle);
        }
    }

    /// Register a callback invoked after every dispatched change.
    pub fn subscribe(&self, callback: impl Fn(&Rc<dyn Property>) + 'static) -> Subscription {
        self.changed.subscribe(callback)
    }

    /// Raise (`true`) or lower (`false`) the suppression depth by one.
    pub fn block_property_changed(&self, on: bool) {
        let depth = self.blocked_depth.get();
        if on {
            self.blocked_depth.set(depth + 1);
        } else if depth == 0 {
            warn!("unblocking a property group that is not blocked");
        } else {
            self.blocked_depth.set(depth - 1);
        }
    }

    #[must_use]
    pub fn is_property_changed_blocked(&self) -> bool {
        self.blocked_depth.get() > 0
    }

    /// Suppress change dispatch until the returned guard is dropped.
    pub fn block_changes(&self) -> PropertyChangedBlocker<'_> {
        PropertyChangedBlocker::new(self)
    }
}

impl fmt::Debug for PropertyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyGroup")
            .field("has_parent", &self.parent.is_some())
            .field("member_count", &self.members.borrow().len())
            .field("blocked_depth", &self.blocked_depth.get())
            .field("subscriber_count", &self.changed.subscriber_count())
            .finish()
    }
}

/// Scope guard suppressing change dispatch on a group.
///
/// Changes made while blocked are not replayed when the guard drops; callers
/// that need a summary notification issue it themselves.
#[must_use = "the group is unblocked as soon as the blocker is dropped"]
pub struct PropertyChangedBlocker<'a> {
    group: &'a PropertyGroup,
}

impl<'a> PropertyChangedBlocker<'a> {
    pub fn new(group: &'a PropertyGroup) -> Self {
        group.block_property_changed(true);
        Self { group }
    }
}

impl Drop for PropertyChangedBlocker<'_> {
    fn drop(&mut self) {
        self.group.block_property_changed(false);
    }
}

impl fmt::Debug for PropertyChangedBlocker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChangedBlocker").finish_non_exhaustive()
    }
}
