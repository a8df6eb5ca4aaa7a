/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Synchronous publish/subscribe channel.
//!
//! Subscribers are invoked in subscription order. `publish` snapshots the
//! subscriber list before iterating, so a callback may unsubscribe itself
//! (or anyone else) without disturbing the delivery in progress. Consumers
//! that prefer polling can take a `crossbeam-channel` receiver instead.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender, unbounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Rc<dyn Fn(&E)>;

pub struct EventBus<E> {
    subscribers: RefCell<Vec<(SubscriptionId, Callback<E>)>>,
    channels: RefCell<Vec<Sender<E>>>,
    next_id: Cell<u64>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            channels: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    /// Returns `false` when `id` was not (or no longer) subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len() + self.channels.borrow().len()
    }
}

impl<E: Clone> EventBus<E> {
    /// Receiver fed with a clone of every published event.
    pub fn subscribe_channel(&self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.channels.borrow_mut().push(tx);
        rx
    }

    pub fn publish(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }

        // Receivers that were dropped disconnect their sender.
        self.channels
            .borrow_mut()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.borrow().len())
            .field("channels", &self.channels.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_invokes_subscribers_in_order() {
        let bus = EventBus::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let seen = Rc::clone(&seen);
            bus.subscribe(move |value: &u32| seen.borrow_mut().push(format!("{tag}{value}")));
        }

        bus.publish(&7);

        assert_eq!(*seen.borrow(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_unsubscribe_during_publish_keeps_current_delivery() {
        let bus = Rc::new(EventBus::<u32>::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first_id = Rc::new(Cell::new(None));
        {
            let bus_handle = Rc::downgrade(&bus);
            let first_id_handle = Rc::clone(&first_id);
            let seen = Rc::clone(&seen);
            let id = bus.subscribe(move |value: &u32| {
                seen.borrow_mut().push(("first", *value));
                if let (Some(bus), Some(id)) = (bus_handle.upgrade(), first_id_handle.get()) {
                    bus.unsubscribe(id);
                }
            });
            first_id.set(Some(id));
        }
        {
            let seen = Rc::clone(&seen);
            bus.subscribe(move |value: &u32| seen.borrow_mut().push(("second", *value)));
        }

        bus.publish(&1);
        bus.publish(&2);

        assert_eq!(
            *seen.borrow(),
            vec![("first", 1), ("second", 1), ("second", 2)]
        );
    }

    #[test]
    fn test_unsubscribe_unknown_id_returns_false() {
        let bus = EventBus::<u32>::new();
        let id = bus.subscribe(|_| {});
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_channel_subscribers_receive_clones_and_prune_when_dropped() {
        let bus = EventBus::<String>::new();
        let rx = bus.subscribe_channel();
        let dropped = bus.subscribe_channel();
        drop(dropped);

        bus.publish(&"hello".to_string());

        assert_eq!(rx.try_recv().ok().as_deref(), Some("hello"));
        assert_eq!(bus.subscriber_count(), 1);
    }
}
