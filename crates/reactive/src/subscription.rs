//! Notification callbacks attached to a sensor.
//!
//! Subscribers are called in the order they subscribed. Ids are never reused,
//! so a stale id cannot remove a later subscriber.

use crate::sensor::Notification;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for sensor notifications.
pub type NotificationCallback = Box<dyn Fn(&Notification)>;

pub struct Subscribers {
    callbacks: Vec<(SubscriptionId, NotificationCallback)>,
    next_id: SubscriptionId,
}

impl Default for Subscribers {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscribers {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.callbacks.iter().position(|(sid, _)| *sid == id) {
            Some(position) => {
                self.callbacks.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn notify_all(&self, notification: &Notification) {
        for (_, callback) in &self.callbacks {
            callback(notification);
        }
    }
}
