//! Named-channel publish/subscribe bus.
//!
//! Channels are identified by an `(owner, event)` pair of tags. The bus is an
//! explicitly constructed instance handed to every component that needs it,
//! shared via `Rc`; there is no process-global registry. Delivery is
//! synchronous and runs in subscription insertion order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};
use serde_json::Value;

use crate::error::{Error, Result};

/// Event payloads are opaque JSON values.
pub type Payload = Value;

/// A handler bound to a channel under a subscription name.
///
/// Invoked with the published payload and the publisher's owner tag.
pub type Reaction = Rc<dyn Fn(&Payload, &str)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChannelKey {
    owner: String,
    event: String,
}

impl ChannelKey {
    fn new(owner: &str, event: &str) -> Self {
        Self {
            owner: owner.to_string(),
            event: event.to_string(),
        }
    }
}

/// Ordered table of named subscriptions for one channel.
///
/// Names are unique at any instant. A replaced subscription keeps its
/// original slot, so delivery order always equals first-insertion order.
#[derive(Default)]
struct Channel {
    subscriptions: Vec<(String, Reaction)>,
}

impl Channel {
    fn position(&self, name: &str) -> Option<usize> {
        self.subscriptions.iter().position(|(n, _)| n == name)
    }

    fn replace_or_insert(&mut self, name: &str, reaction: Reaction) -> bool {
        if let Some(pos) = self.position(name) {
            self.subscriptions[pos].1 = reaction;
            true
        } else {
            self.subscriptions.push((name.to_string(), reaction));
            false
        }
    }

    /// Defensive copy for iteration: reactions added or removed while a
    /// publish is in flight do not affect the current fan-out.
    fn snapshot(&self) -> Vec<Reaction> {
        self.subscriptions
            .iter()
            .map(|(_, reaction)| Rc::clone(reaction))
            .collect()
    }
}

/// Synchronous publish/subscribe bus scoped by owner tags.
#[derive(Default)]
pub struct EventBus {
    channels: RefCell<HashMap<ChannelKey, Channel>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every subscriber of `(owner, event)`, in
    /// subscription insertion order, before returning.
    ///
    /// The channel is created lazily if absent; publishing with zero
    /// subscribers is a silent no-op. Reactions run against a snapshot of
    /// the subscription table, so a reaction that subscribes or unsubscribes
    /// mid-delivery never changes the in-flight fan-out.
    pub fn publish(&self, event: &str, payload: &Payload, owner: &str) {
        let snapshot = {
            let mut channels = self.channels.borrow_mut();
            channels
                .entry(ChannelKey::new(owner, event))
                .or_default()
                .snapshot()
        };

        if snapshot.is_empty() {
            trace!("publish '{event}' from '{owner}': no subscribers");
            return;
        }

        debug!(
            "publish '{event}' from '{owner}' to {} subscriber(s)",
            snapshot.len()
        );
        for reaction in snapshot {
            reaction(payload, owner);
        }
    }

    /// Register `reaction` under `name` on `(owner, event)`.
    ///
    /// Re-subscribing under an existing name replaces the reaction in place;
    /// the subscription keeps its original delivery position. This makes
    /// subscription idempotent by construction rather than erroring on
    /// re-subscribe.
    pub fn subscribe(
        &self,
        owner: &str,
        event: &str,
        name: &str,
        reaction: impl Fn(&Payload, &str) + 'static,
    ) {
        let mut channels = self.channels.borrow_mut();
        let channel = channels.entry(ChannelKey::new(owner, event)).or_default();
        let replaced = channel.replace_or_insert(name, Rc::new(reaction));
        if replaced {
            debug!("replaced subscription '{name}' on ({owner}, {event})");
        } else {
            trace!("added subscription '{name}' on ({owner}, {event})");
        }
    }

    /// Strict add-only registration: fails with [`Error::DuplicateSubscription`]
    /// if `name` is already present on the channel.
    pub fn add_subscription(
        &self,
        owner: &str,
        event: &str,
        name: &str,
        reaction: impl Fn(&Payload, &str) + 'static,
    ) -> Result<()> {
        let mut channels = self.channels.borrow_mut();
        let channel = channels.entry(ChannelKey::new(owner, event)).or_default();
        if channel.position(name).is_some() {
            return Err(Error::DuplicateSubscription {
                owner: owner.to_string(),
                event: event.to_string(),
                name: name.to_string(),
            });
        }
        channel.subscriptions.push((name.to_string(), Rc::new(reaction)));
        Ok(())
    }

    /// Remove the subscription `name` from `(owner, event)`.
    ///
    /// A channel that was never created is tolerated silently. A channel
    /// that exists but lacks `name` fails with
    /// [`Error::MissingSubscription`]: removing a name nobody registered is
    /// a wiring bug.
    pub fn unsubscribe(&self, owner: &str, event: &str, name: &str) -> Result<()> {
        let mut channels = self.channels.borrow_mut();
        let Some(channel) = channels.get_mut(&ChannelKey::new(owner, event)) else {
            trace!("unsubscribe '{name}' on ({owner}, {event}): channel never created");
            return Ok(());
        };
        match channel.position(name) {
            Some(pos) => {
                channel.subscriptions.remove(pos);
                debug!("removed subscription '{name}' on ({owner}, {event})");
                Ok(())
            }
            None => Err(Error::MissingSubscription {
                owner: owner.to_string(),
                event: event.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Names currently subscribed on `(owner, event)`, in delivery order.
    pub fn subscription_names(&self, owner: &str, event: &str) -> Vec<String> {
        self.channels
            .borrow()
            .get(&ChannelKey::new(owner, event))
            .map(|channel| {
                channel
                    .subscriptions
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn recorder() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish("save", &json!({"x": 1}), "Form");
        assert!(bus.subscription_names("Form", "save").is_empty());
    }

    #[test]
    fn publish_delivers_payload_and_owner_tag() {
        let bus = EventBus::new();
        let seen = recorder();
        let log = Rc::clone(&seen);
        bus.subscribe("Form", "save", "persist", move |payload, owner| {
            log.borrow_mut().push(format!("{owner}:{payload}"));
        });

        bus.publish("save", &json!({"id": 7}), "Form");
        assert_eq!(seen.borrow().as_slice(), [r#"Form:{"id":7}"#]);
    }

    #[test]
    fn resubscribe_replaces_instead_of_duplicating() {
        let bus = EventBus::new();
        let seen = recorder();

        let log = Rc::clone(&seen);
        bus.subscribe("Nav", "go", "jump", move |_, _| {
            log.borrow_mut().push("first".into());
        });
        let log = Rc::clone(&seen);
        bus.subscribe("Nav", "go", "jump", move |_, _| {
            log.borrow_mut().push("second".into());
        });

        bus.publish("go", &Payload::Null, "Nav");
        assert_eq!(seen.borrow().as_slice(), ["second"]);
        assert_eq!(bus.subscription_names("Nav", "go"), ["jump"]);
    }

    #[test]
    fn delivery_order_survives_replacement() {
        let bus = EventBus::new();
        let seen = recorder();

        for name in ["s1", "s2", "s3"] {
            let log = Rc::clone(&seen);
            bus.subscribe("Nav", "go", name, move |_, _| {
                log.borrow_mut().push(name.to_string());
            });
        }
        // Replacing s1 last must not move it to the end.
        let log = Rc::clone(&seen);
        bus.subscribe("Nav", "go", "s1", move |_, _| {
            log.borrow_mut().push("s1'".to_string());
        });

        bus.publish("go", &Payload::Null, "Nav");
        assert_eq!(seen.borrow().as_slice(), ["s1'", "s2", "s3"]);
    }

    #[test]
    fn add_subscription_rejects_duplicate_name() {
        let bus = EventBus::new();
        bus.add_subscription("Form", "edit", "track", |_, _| {}).unwrap();
        let err = bus.add_subscription("Form", "edit", "track", |_, _| {}).unwrap_err();
        assert!(matches!(err, Error::DuplicateSubscription { .. }));
    }

    #[test]
    fn unsubscribe_missing_name_fails_on_existing_channel() {
        let bus = EventBus::new();
        bus.subscribe("Form", "edit", "track", |_, _| {});
        let err = bus.unsubscribe("Form", "edit", "absent").unwrap_err();
        assert!(matches!(err, Error::MissingSubscription { .. }));
    }

    #[test]
    fn unsubscribe_on_uncreated_channel_is_noop() {
        let bus = EventBus::new();
        bus.unsubscribe("Form", "never", "anything").unwrap();
    }

    #[test]
    fn unsubscribe_removes_delivery() {
        let bus = EventBus::new();
        let seen = recorder();
        let log = Rc::clone(&seen);
        bus.subscribe("Form", "save", "persist", move |_, _| {
            log.borrow_mut().push("hit".into());
        });

        bus.unsubscribe("Form", "save", "persist").unwrap();
        bus.publish("save", &Payload::Null, "Form");
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn reaction_subscribing_mid_publish_is_not_delivered_same_pass() {
        let bus = Rc::new(EventBus::new());
        let seen = recorder();

        let log = Rc::clone(&seen);
        let inner_bus = Rc::clone(&bus);
        let inner_log = Rc::clone(&seen);
        bus.subscribe("Nav", "go", "outer", move |_, _| {
            log.borrow_mut().push("outer".into());
            let late_log = Rc::clone(&inner_log);
            inner_bus.subscribe("Nav", "go", "late", move |_, _| {
                late_log.borrow_mut().push("late".into());
            });
        });

        bus.publish("go", &Payload::Null, "Nav");
        assert_eq!(seen.borrow().as_slice(), ["outer"]);

        // The late subscriber is live on the next publish.
        bus.publish("go", &Payload::Null, "Nav");
        assert_eq!(seen.borrow().as_slice(), ["outer", "outer", "late"]);
    }

    #[test]
    fn channels_are_scoped_by_owner() {
        let bus = EventBus::new();
        let seen = recorder();
        let log = Rc::clone(&seen);
        bus.subscribe("Sidebar", "toggle", "collapse", move |_, _| {
            log.borrow_mut().push("sidebar".into());
        });

        // Same event name, different owner: separate channel.
        bus.publish("toggle", &Payload::Null, "Header");
        assert!(seen.borrow().is_empty());

        bus.publish("toggle", &Payload::Null, "Sidebar");
        assert_eq!(seen.borrow().as_slice(), ["sidebar"]);
    }
}
