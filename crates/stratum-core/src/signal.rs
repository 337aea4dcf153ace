#![forbid(unsafe_code)]

//! Synchronous subscriber lists with RAII unsubscription.
//!
//! # Design
//!
//! A [`Signal<T>`] stores subscriber callbacks as `Weak` references. The
//! strong `Rc` lives inside the [`Subscription`] guard handed back to the
//! subscriber, so dropping the guard is all it takes to unsubscribe.
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in registration order.
//! 2. Delivery is synchronous: `emit` returns after every live callback ran.
//! 3. Dead weak references are pruned lazily during `emit`.
//! 4. No internal borrow is held while callbacks run, so a callback may
//!    subscribe, emit, or drop its own guard.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

/// An ordered list of subscriber callbacks receiving `&T`.
pub struct Signal<T: ?Sized + 'static> {
    subscribers: RefCell<Vec<CallbackWeak<T>>>,
}

impl<T: ?Sized + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }
}

impl<T: ?Sized + 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T: ?Sized + 'static> Signal<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It stays registered while the returned
    /// [`Subscription`] is alive.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Invoke every live subscriber with `value`. Returns how many ran.
    pub fn emit(&self, value: &T) -> usize {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in &callbacks {
            cb(value);
        }
        callbacks.len()
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// RAII guard for a subscriber callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the callback"]
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
