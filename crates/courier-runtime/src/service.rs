//! Message service
//!
//! `MessageService` ties the correlation tracker to the external collaborators. Its
//! operations are spread over the sibling modules:
//!
//! - [`crate::dispatch`]: sending and pushing messages
//! - [`crate::ack`]: processing acknowledgments
//! - [`crate::replay`]: replaying unconfirmed messages on reconnect
//!
//! The service is cheap to clone; clones share the tracker and collaborators, so it can be
//! handed to as many tasks as there are inbound triggers.

use std::sync::Arc;

use courier_core::{
    CorrelationIdGenerator, DeliveryConfig, DeliveryEvent, DeliveryObserver, MessageStore,
    SessionRegistry, TimeSource, UserDirectory,
};

use crate::builder::ServiceBuilder;
use crate::tracker::{CorrelationTracker, TrackerStats};

// ----------------------------------------------------------------------------
// Message Service
// ----------------------------------------------------------------------------

/// At-least-once delivery engine
#[derive(Clone)]
pub struct MessageService {
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) sessions: Arc<dyn SessionRegistry>,
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) tracker: Arc<CorrelationTracker>,
    pub(crate) ids: Arc<dyn CorrelationIdGenerator>,
    pub(crate) observer: Arc<dyn DeliveryObserver>,
    pub(crate) time: Arc<dyn TimeSource>,
    pub(crate) config: DeliveryConfig,
}

impl MessageService {
    /// Start building a service over the given collaborators
    pub fn builder(
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionRegistry>,
        store: Arc<dyn MessageStore>,
    ) -> ServiceBuilder {
        ServiceBuilder::new(users, sessions, store)
    }

    /// Shared correlation tracker
    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        &self.tracker
    }

    /// Tracker counters
    pub fn tracker_stats(&self) -> TrackerStats {
        self.tracker.stats()
    }

    /// Active configuration
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Drop tracker entries older than the configured TTL
    ///
    /// Does nothing unless `stale_correlation_ttl_secs` is set. A purged message stays
    /// unconfirmed in storage and goes out again on the recipient's next reconnect.
    pub fn purge_stale_correlations(&self) -> usize {
        let Some(ttl) = self.config.stale_correlation_ttl() else {
            return 0;
        };

        let purged = self.tracker.purge_older_than(self.time.now(), ttl);
        if purged > 0 {
            self.emit(DeliveryEvent::Purged { count: purged });
        }
        purged
    }

    pub(crate) fn emit(&self, event: DeliveryEvent) {
        self.observer.on_event(&event);
    }
}

impl core::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MessageService")
            .field("tracked", &self.tracker.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
