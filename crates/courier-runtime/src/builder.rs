//! Service Builder API
//!
//! Constructor-based wiring for [`MessageService`]. The three collaborators are required;
//! everything else has a production default that tests can override.

use std::sync::Arc;

use courier_core::{
    CorrelationIdGenerator, DeliveryConfig, DeliveryObserver, MessageStore, RandomIdGenerator,
    Result, SessionRegistry, SystemTimeSource, TimeSource, TracingObserver, UserDirectory,
};

use crate::service::MessageService;
use crate::tracker::CorrelationTracker;

// ----------------------------------------------------------------------------
// Service Builder
// ----------------------------------------------------------------------------

/// Builder for [`MessageService`]
pub struct ServiceBuilder {
    users: Arc<dyn UserDirectory>,
    sessions: Arc<dyn SessionRegistry>,
    store: Arc<dyn MessageStore>,
    tracker: Option<Arc<CorrelationTracker>>,
    ids: Arc<dyn CorrelationIdGenerator>,
    observer: Arc<dyn DeliveryObserver>,
    time: Arc<dyn TimeSource>,
    config: DeliveryConfig,
}

impl ServiceBuilder {
    /// Create a new builder with random ids, tracing output and wall-clock time
    pub fn new(
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionRegistry>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            users,
            sessions,
            store,
            tracker: None,
            ids: Arc::new(RandomIdGenerator),
            observer: Arc::new(TracingObserver),
            time: Arc::new(SystemTimeSource),
            config: DeliveryConfig::default(),
        }
    }

    /// Set the delivery configuration
    pub fn with_config(mut self, config: DeliveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing tracker instead of creating a fresh one
    pub fn with_tracker(mut self, tracker: Arc<CorrelationTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Replace the correlation id generator
    pub fn with_id_generator(mut self, ids: Arc<dyn CorrelationIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the delivery observer
    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the time source
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Validate the configuration and build the service
    pub fn build(self) -> Result<MessageService> {
        self.config.validate()?;

        Ok(MessageService {
            users: self.users,
            sessions: self.sessions,
            store: self.store,
            tracker: self.tracker.unwrap_or_default(),
            ids: self.ids,
            observer: self.observer,
            time: self.time,
            config: self.config,
        })
    }
}
