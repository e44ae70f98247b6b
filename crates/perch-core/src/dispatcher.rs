//! Event dispatcher for the Perch client.
//!
//! The [`Dispatcher`] keeps four independent subscriber lists, one per
//! [`ChatEvent`] variant. Dispatching an event:
//!
//! 1. Selects the list matching the event's variant
//! 2. Takes a snapshot of that list
//! 3. Invokes every subscriber in subscription order, synchronously
//!
//! Because the snapshot is taken before any subscriber runs, a subscriber may
//! subscribe further callbacks; they are first invoked on the next dispatch.
//!
//! ```rust
//! use perch_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.on_join(|join| println!("{} joined {}", join.nick, join.channel));
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{Level, span, trace};

use crate::event::{ChatEvent, ChatMessage, CommandInvocation, Membership};

/// A subscriber callback for events of type `T`.
pub type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SubscriberList<T> {
    subscribers: RwLock<Vec<Subscriber<T>>>,
}

impl<T> SubscriberList<T> {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, subscriber: Subscriber<T>) {
        self.subscribers.write().push(subscriber);
    }

    fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Invokes every subscriber and returns how many ran.
    fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<Subscriber<T>> = self.subscribers.read().clone();
        for subscriber in &snapshot {
            subscriber(value);
        }
        snapshot.len()
    }
}

/// Routes chat events to the subscribers registered for their kind.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync`; the lists are guarded by locks that are
/// released before any subscriber is invoked.
pub struct Dispatcher {
    chat: SubscriberList<ChatMessage>,
    join: SubscriberList<Membership>,
    part: SubscriberList<Membership>,
    command: SubscriberList<CommandInvocation>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with empty subscriber lists.
    pub fn new() -> Self {
        Self {
            chat: SubscriberList::new(),
            join: SubscriberList::new(),
            part: SubscriberList::new(),
            command: SubscriberList::new(),
        }
    }

    /// Subscribes to channel messages.
    pub fn on_chat<F>(&self, f: F)
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.chat.push(Arc::new(f));
    }

    /// Subscribes to channel joins.
    pub fn on_join<F>(&self, f: F)
    where
        F: Fn(&Membership) + Send + Sync + 'static,
    {
        self.join.push(Arc::new(f));
    }

    /// Subscribes to channel parts.
    pub fn on_part<F>(&self, f: F)
    where
        F: Fn(&Membership) + Send + Sync + 'static,
    {
        self.part.push(Arc::new(f));
    }

    /// Subscribes to matched command invocations.
    pub fn on_command<F>(&self, f: F)
    where
        F: Fn(&CommandInvocation) + Send + Sync + 'static,
    {
        self.command.push(Arc::new(f));
    }

    /// Returns the total number of subscribers across all lists.
    pub fn subscriber_count(&self) -> usize {
        self.chat.len() + self.join.len() + self.part.len() + self.command.len()
    }

    /// Dispatches an event to every subscriber of its kind.
    ///
    /// Returns the number of subscribers invoked. An empty list is a no-op.
    pub fn dispatch(&self, event: &ChatEvent) -> usize {
        let span = span!(Level::TRACE, "dispatch", kind = event.kind());
        let _enter = span.enter();

        let invoked = match event {
            ChatEvent::Chat(msg) => self.chat.notify(msg),
            ChatEvent::Join(m) => self.join.notify(m),
            ChatEvent::Part(m) => self.part.notify(m),
            ChatEvent::CommandInvoked(inv) => self.command.notify(inv),
        };

        trace!(subscribers = invoked, "Event dispatched");
        invoked
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("chat", &self.chat.len())
            .field("join", &self.join.len())
            .field("part", &self.part.len())
            .field("command", &self.command.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn join_event() -> ChatEvent {
        ChatEvent::Join(Membership {
            nick: "viewer".into(),
            channel: "#chan".into(),
        })
    }

    #[test]
    fn test_dispatch_no_subscribers() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.dispatch(&join_event()), 0);
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();

        for i in 0..3 {
            let order = Arc::clone(&order);
            dispatcher.on_join(move |_| order.lock().push(i));
        }

        assert_eq!(dispatcher.dispatch(&join_event()), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_matching_list_is_invoked() {
        let joins = Arc::new(AtomicUsize::new(0));
        let parts = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new();

        let j = Arc::clone(&joins);
        dispatcher.on_join(move |_| {
            j.fetch_add(1, Ordering::SeqCst);
        });
        let p = Arc::clone(&parts);
        dispatcher.on_part(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&join_event());

        assert_eq!(joins.load(Ordering::SeqCst), 1);
        assert_eq!(parts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribing_during_dispatch_applies_next_time() {
        let dispatcher = Arc::new(Dispatcher::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let d = Arc::clone(&dispatcher);
        let late = Arc::clone(&late_calls);
        dispatcher.on_chat(move |_| {
            let late = Arc::clone(&late);
            d.on_chat(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        let event = ChatEvent::Chat(ChatMessage {
            channel: "#chan".into(),
            nick: "a".into(),
            message: "hi ".into(),
        });

        assert_eq!(dispatcher.dispatch(&event), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        assert_eq!(dispatcher.dispatch(&event), 2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }
}
