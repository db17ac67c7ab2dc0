//! Observable command cells and their change-notification contract.
//!
//! A [`Command`] is a named, typed unit of simulation input state. Every
//! value-changing [`set_state`](Command::set_state) synchronously notifies
//! all current subscribers, in registration order, before returning.
//!
//! Commands are shared between the feature that owns them, the session
//! that drives them, and (while recording) the writer that listens to
//! them. The simulation is single-threaded, so sharing is modelled with
//! `Rc<RefCell<_>>` handles rather than locks.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::delta::{CommandDelta, CommandState, StateDelta};
use crate::id::SubscriptionId;

/// Shared handle to a typed command.
pub type CommandHandle<S> = Rc<RefCell<Command<S>>>;

/// Shared handle to a type-erased command.
pub type SharedCommand = Rc<RefCell<dyn AnyCommand>>;

/// Shared handle to a change listener.
pub type ListenerHandle = Rc<RefCell<dyn CommandListener>>;

/// Receives change notifications from the commands it subscribed to.
pub trait CommandListener {
    /// Called synchronously after `command` changed value.
    ///
    /// `subscription` is the tag the listener registered with. The
    /// command is borrowed for the duration of the call, so listeners
    /// must not try to borrow its handle again.
    fn on_command_changed(&mut self, command: &dyn AnyCommand, subscription: SubscriptionId);
}

struct Subscriber {
    listener: ListenerHandle,
    subscription: SubscriptionId,
}

fn same_listener(a: &ListenerHandle, b: &ListenerHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A named, observable state cell.
///
/// # Examples
///
/// ```
/// use reel_core::Command;
///
/// let mut drop = Command::<bool>::new("drop");
/// assert!(!drop.state());
/// assert!(drop.set_state(true));
/// assert!(!drop.set_state(true)); // unchanged, no notification
/// drop.reset();
/// assert!(!drop.state());
/// ```
pub struct Command<S: CommandState> {
    key: String,
    state: S,
    subscribers: SmallVec<[Subscriber; 2]>,
}

impl<S: CommandState> Command<S> {
    /// Create a command holding `S::default()`.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_state(key, S::default())
    }

    /// Create a command holding `state`.
    pub fn with_state(key: impl Into<String>, state: S) -> Self {
        Self {
            key: key.into(),
            state,
            subscribers: SmallVec::new(),
        }
    }

    /// Create a command and wrap it in a shared handle.
    pub fn shared(key: impl Into<String>) -> CommandHandle<S> {
        Rc::new(RefCell::new(Self::new(key)))
    }

    /// The command's unique key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The current state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Store `state` and notify subscribers if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set_state(&mut self, state: S) -> bool {
        if self.state.same_state(&state) {
            return false;
        }
        self.state = state;
        let this: &Self = self;
        for sub in &this.subscribers {
            sub.listener
                .borrow_mut()
                .on_command_changed(this, sub.subscription);
        }
        true
    }

    /// Restore the default state without notifying anyone.
    pub fn reset(&mut self) {
        self.state = S::default();
    }

    /// Register `listener`, replacing any earlier registration of the same listener.
    pub fn subscribe(&mut self, listener: ListenerHandle, subscription: SubscriptionId) {
        if let Some(sub) = self
            .subscribers
            .iter_mut()
            .find(|sub| same_listener(&sub.listener, &listener))
        {
            sub.subscription = subscription;
            return;
        }
        self.subscribers.push(Subscriber {
            listener,
            subscription,
        });
    }

    /// Remove `listener`. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, listener: &ListenerHandle) -> bool {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|sub| !same_listener(&sub.listener, listener));
        self.subscribers.len() != before
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<S: CommandState> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Type-erased view of a [`Command`], used wherever the engine handles
/// heterogeneous command lists.
pub trait AnyCommand: Any {
    /// The command's unique key.
    fn key(&self) -> &str;

    /// Allocate a fresh delta object matched to this command's state type.
    fn allocate_delta(&self) -> Box<dyn CommandDelta>;

    /// Restore the default state without notification.
    fn reset(&mut self);

    /// See [`Command::subscribe`].
    fn subscribe(&mut self, listener: ListenerHandle, subscription: SubscriptionId);

    /// See [`Command::unsubscribe`].
    fn unsubscribe(&mut self, listener: &ListenerHandle) -> bool;

    /// Debug rendering of the current state, for logs.
    fn describe_state(&self) -> String;

    /// Upcast for downcasting to the concrete command type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete command type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: CommandState> AnyCommand for Command<S> {
    fn key(&self) -> &str {
        &self.key
    }

    fn allocate_delta(&self) -> Box<dyn CommandDelta> {
        Box::new(StateDelta::<S>::new())
    }

    fn reset(&mut self) {
        Command::reset(self);
    }

    fn subscribe(&mut self, listener: ListenerHandle, subscription: SubscriptionId) {
        Command::subscribe(self, listener, subscription);
    }

    fn unsubscribe(&mut self, listener: &ListenerHandle) -> bool {
        Command::unsubscribe(self, listener)
    }

    fn describe_state(&self) -> String {
        format!("{:?}", self.state)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(String, SubscriptionId, String)>,
    }

    impl CommandListener for Recorder {
        fn on_command_changed(&mut self, command: &dyn AnyCommand, subscription: SubscriptionId) {
            self.seen.push((
                command.key().to_string(),
                subscription,
                command.describe_state(),
            ));
        }
    }

    fn recorder() -> (Rc<RefCell<Recorder>>, ListenerHandle) {
        let rec = Rc::new(RefCell::new(Recorder::default()));
        let handle: ListenerHandle = rec.clone();
        (rec, handle)
    }

    #[test]
    fn change_notifies_synchronously() {
        let (rec, handle) = recorder();
        let mut cmd = Command::<u64>::new("seed");
        cmd.subscribe(handle, SubscriptionId(3));

        assert!(cmd.set_state(42));
        let seen = &rec.borrow().seen;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("seed".to_string(), SubscriptionId(3), "42".to_string()));
    }

    #[test]
    fn unchanged_value_does_not_notify() {
        let (rec, handle) = recorder();
        let mut cmd = Command::<bool>::new("drop");
        cmd.subscribe(handle, SubscriptionId(0));

        assert!(!cmd.set_state(false));
        assert!(rec.borrow().seen.is_empty());
    }

    #[test]
    fn resubscribe_replaces_registration() {
        let (rec, handle) = recorder();
        let mut cmd = Command::<bool>::new("left");
        cmd.subscribe(handle.clone(), SubscriptionId(1));
        cmd.subscribe(handle, SubscriptionId(2));
        assert_eq!(cmd.subscriber_count(), 1);

        cmd.set_state(true);
        let seen = &rec.borrow().seen;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, SubscriptionId(2));
    }

    #[test]
    fn notifications_follow_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));

        struct Tagged(u32, Rc<RefCell<Vec<u32>>>);
        impl CommandListener for Tagged {
            fn on_command_changed(&mut self, _: &dyn AnyCommand, _: SubscriptionId) {
                self.1.borrow_mut().push(self.0);
            }
        }

        let mut cmd = Command::<u32>::new("n");
        for tag in [5, 1, 9] {
            let l: ListenerHandle = Rc::new(RefCell::new(Tagged(tag, order.clone())));
            cmd.subscribe(l, SubscriptionId(tag));
        }
        cmd.set_state(1);
        assert_eq!(*order.borrow(), vec![5, 1, 9]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let (rec, handle) = recorder();
        let mut cmd = Command::<bool>::new("drop");
        cmd.subscribe(handle.clone(), SubscriptionId(0));
        assert!(cmd.unsubscribe(&handle));
        assert!(!cmd.unsubscribe(&handle));

        cmd.set_state(true);
        assert!(rec.borrow().seen.is_empty());
    }

    #[test]
    fn reset_restores_default_silently() {
        let (rec, handle) = recorder();
        let mut cmd = Command::with_state("seed", 7u64);
        cmd.subscribe(handle, SubscriptionId(0));
        cmd.reset();
        assert_eq!(*cmd.state(), 0);
        assert!(rec.borrow().seen.is_empty());
    }

    #[test]
    fn erased_command_downcasts() {
        let typed = Command::<bool>::shared("drop");
        let erased: SharedCommand = typed.clone();
        assert_eq!(erased.borrow().key(), "drop");
        assert!(erased
            .borrow()
            .as_any()
            .downcast_ref::<Command<bool>>()
            .is_some());
        assert!(erased
            .borrow()
            .as_any()
            .downcast_ref::<Command<u64>>()
            .is_none());
    }
}
