//! Correlation tracking for pushes awaiting acknowledgment
//!
//! The tracker maps each live correlation id to the durable message it was pushed for. It is
//! the only shared mutable structure in the engine and is backed by a sharded `DashMap`, so
//! register/resolve/retire from many tasks never contend on a single lock. Each operation is
//! atomic on its own key; nothing spans multiple keys.
//!
//! Entries leave the tracker when an acknowledgment retires them, or through an explicit
//! [`CorrelationTracker::purge_older_than`] sweep. There is no background eviction.

use core::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};

use courier_core::{CorrelationId, CourierError, MessageId, Result, Timestamp, Username};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

// ----------------------------------------------------------------------------
// Correlation Entry
// ----------------------------------------------------------------------------

/// What a live correlation id points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationEntry {
    /// Durable message the push carried
    pub message_id: MessageId,
    /// Recipient the push went to
    pub recipient: Username,
    /// When the push was registered
    pub registered_at: Timestamp,
}

impl CorrelationEntry {
    pub fn new(message_id: MessageId, recipient: Username, registered_at: Timestamp) -> Self {
        Self {
            message_id,
            recipient,
            registered_at,
        }
    }
}

// ----------------------------------------------------------------------------
// Correlation Tracker
// ----------------------------------------------------------------------------

/// Concurrent map from correlation id to pending message
#[derive(Debug, Default)]
pub struct CorrelationTracker {
    entries: DashMap<CorrelationId, CorrelationEntry>,
    registered: AtomicU64,
    retired: AtomicU64,
    purged: AtomicU64,
}

impl CorrelationTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a push
    ///
    /// A correlation id that is already live is rejected with
    /// [`CourierError::DuplicateCorrelation`] and the existing entry is left untouched.
    pub fn register(&self, correlation_id: CorrelationId, entry: CorrelationEntry) -> Result<()> {
        match self.entries.entry(correlation_id) {
            Entry::Occupied(occupied) => Err(CourierError::DuplicateCorrelation {
                correlation_id: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                self.registered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Message a live correlation id maps to
    pub fn resolve(&self, correlation_id: &CorrelationId) -> Option<MessageId> {
        self.entries
            .get(correlation_id)
            .map(|entry| entry.message_id)
    }

    /// Full entry for a live correlation id
    pub fn get(&self, correlation_id: &CorrelationId) -> Option<CorrelationEntry> {
        self.entries
            .get(correlation_id)
            .map(|entry| entry.value().clone())
    }

    /// Stop tracking a correlation id; absent ids are a no-op
    pub fn retire(&self, correlation_id: &CorrelationId) -> Option<CorrelationEntry> {
        let removed = self.entries.remove(correlation_id).map(|(_, entry)| entry);
        if removed.is_some() {
            self.retired.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Whether a correlation id is live
    pub fn contains(&self, correlation_id: &CorrelationId) -> bool {
        self.entries.contains_key(correlation_id)
    }

    /// Drop entries registered more than `max_age` before `now`
    pub fn purge_older_than(&self, now: Timestamp, max_age: Duration) -> usize {
        let mut purged = 0usize;
        self.entries.retain(|_, entry| {
            let keep = now.duration_since(entry.registered_at) < max_age;
            if !keep {
                purged += 1;
            }
            keep
        });
        self.purged.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Live correlation ids currently pointing at `message_id`
    pub fn correlations_for(&self, message_id: MessageId) -> Vec<CorrelationId> {
        self.entries
            .iter()
            .filter(|entry| entry.message_id == message_id)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get tracker statistics
    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            live: self.entries.len() as u64,
            registered: self.registered.load(Ordering::Relaxed),
            retired: self.retired.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }
}

// ----------------------------------------------------------------------------
// Tracker Statistics
// ----------------------------------------------------------------------------

/// Counters describing tracker activity
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    /// Entries currently awaiting acknowledgment
    pub live: u64,
    /// Entries ever registered
    pub registered: u64,
    /// Entries retired by acknowledgment
    pub retired: u64,
    /// Entries dropped by purge sweeps
    pub purged: u64,
}

impl TrackerStats {
    /// Fraction of registered pushes that have been acknowledged (0.0 to 1.0)
    pub fn ack_rate(&self) -> f64 {
        if self.registered == 0 {
            0.0
        } else {
            self.retired as f64 / self.registered as f64
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
