/// file: src/notifications.rs
/// description: displayed notifications with a fixed display timeout
use crate::types::Notification;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Displayed {
    notification: Arc<Notification>,
    expires_at: Instant,
}

/// Insertion-ordered, so the front entry always expires first.
#[derive(Debug)]
pub struct NotificationBoard {
    display_timeout: Duration,
    entries: Vec<Displayed>,
}

impl Default for NotificationBoard {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_TIMEOUT)
    }
}

impl NotificationBoard {
    pub fn new(display_timeout: Duration) -> Self {
        Self {
            display_timeout,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, notification: Arc<Notification>, now: Instant) {
        self.entries.push(Displayed {
            notification,
            expires_at: now + self.display_timeout,
        });
    }

    /// Removes and returns everything due at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Arc<Notification>> {
        let due = self
            .entries
            .iter()
            .take_while(|entry| entry.expires_at <= now)
            .count();
        self.entries
            .drain(..due)
            .map(|entry| entry.notification)
            .collect()
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.entries.first().map(|entry| entry.expires_at)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().map(|entry| entry.notification.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
