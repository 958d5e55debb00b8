//! # Match Notifications
//!
//! A handful of in-process notifications raised once per occurrence for UI,
//! audio and progression consumers.
//!
//! ```text
//! ┌────────────┐  publish   ┌──────────┐   drain   ┌──────────────┐
//! │ Simulation │───────────>│ Notifier │──────────>│ subscriber N │
//! └────────────┘            └──────────┘           └──────────────┘
//! ```
//!
//! The [`Notifier`] belongs to the session: it is created with the match and
//! `close`d on teardown, which disconnects every subscriber. Nothing here is
//! process-global.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use skirmish_core::EntityId;
use skirmish_shared::Side;

use crate::ids::Slot;

/// Notifications raised by the simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// An avatar or NPC was killed.
    KillConfirmed {
        /// Slot of the killing participant, if a participant did it.
        killer: Option<Slot>,
        /// Entity that died.
        victim: EntityId,
    },
    /// The match timer ran out.
    GameEnded {
        /// Winning side.
        winner: Side,
    },
}

/// Session-scoped fan-out of [`Notification`]s.
#[derive(Debug, Default)]
pub struct Notifier {
    subscribers: Vec<Sender<Notification>>,
}

impl Notifier {
    /// A notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber. It sees notifications published from now on.
    pub fn subscribe(&mut self) -> NotificationReceiver {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        NotificationReceiver { receiver }
    }

    /// Delivers `notification` to every live subscriber. Dropped receivers
    /// are pruned.
    pub fn publish(&mut self, notification: &Notification) {
        self.subscribers
            .retain(|s| s.send(notification.clone()).is_ok());
    }

    /// Live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Disconnects every subscriber.
    pub fn close(&mut self) {
        self.subscribers.clear();
    }
}

/// Receiving end of a subscription.
#[derive(Clone, Debug)]
pub struct NotificationReceiver {
    receiver: Receiver<Notification>,
}

impl NotificationReceiver {
    /// Everything pending (non-blocking).
    #[must_use]
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }

    /// One pending notification, if any.
    #[must_use]
    pub fn try_recv(&self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending notifications.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// True once the notifier closed and everything was drained.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_empty()
            && matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }
}
