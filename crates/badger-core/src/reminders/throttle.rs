//! Per-item notification cooldown.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Default cooldown between notifications for the same item.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 60;

/// In-process cooldown gate keyed by item id alone.
///
/// All sweeps share one keyspace: when the hourly and daily sweeps both
/// match the same work item inside one window, only the first send goes
/// out. The gate reduces notification volume; real races are handled by
/// the store's row constraints.
pub struct NotificationThrottle {
    cooldown: Duration,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NotificationThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cooldown_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    /// True iff the item has no recorded send, or its last send is at
    /// least one cooldown in the past.
    pub fn can_notify(&self, id: &str) -> bool {
        self.can_notify_at(id, Utc::now())
    }

    pub fn can_notify_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        let entries = self.entries.lock().unwrap();
        match entries.get(id) {
            Some(last) => now.signed_duration_since(*last) >= self.cooldown,
            None => true,
        }
    }

    /// Record a send. Call only after the notification actually went out,
    /// so a failed attempt does not consume the cooldown.
    pub fn record_notified(&self, id: &str) {
        self.record_notified_at(id, Utc::now());
    }

    pub fn record_notified_at(&self, id: &str, at: DateTime<Utc>) {
        self.entries.lock().unwrap().insert(id.to_string(), at);
    }

    /// Drop entries old enough that they no longer gate anything.
    /// Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(Utc::now())
    }

    pub fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, last| now.signed_duration_since(*last) < self.cooldown);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for NotificationThrottle {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_COOLDOWN_MINUTES))
    }
}
