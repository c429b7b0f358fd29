//! Test utilities for deterministic testing of the courier engine
//!
//! Wires a `MessageService` over the in-memory collaborators with a manual clock,
//! sequential correlation ids and an observer that records every delivery event.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use courier_core::{
    CorrelationId, CorrelationIdGenerator, DeliveryConfig, DeliveryEvent, DeliveryObserver,
    ManualTimeSource, SequentialIdGenerator,
};
use courier_runtime::memory::{InMemoryMessageStore, InMemorySessionRegistry, InMemoryUserDirectory};
use courier_runtime::MessageService;

// ----------------------------------------------------------------------------
// Recording Observer
// ----------------------------------------------------------------------------

/// Observer that keeps every event it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DeliveryEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events with the given name
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

impl DeliveryObserver for RecordingObserver {
    fn on_event(&self, event: &DeliveryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ----------------------------------------------------------------------------
// Fixed Id Generator
// ----------------------------------------------------------------------------

/// Generator that always returns the same token, to force collisions
#[derive(Debug)]
pub struct FixedIdGenerator(pub &'static str);

impl CorrelationIdGenerator for FixedIdGenerator {
    fn next_id(&self) -> CorrelationId {
        CorrelationId::from(self.0)
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

/// A service plus handles on everything behind it
pub struct Harness {
    pub service: MessageService,
    pub users: Arc<InMemoryUserDirectory>,
    pub sessions: Arc<InMemorySessionRegistry>,
    pub store: Arc<InMemoryMessageStore>,
    pub clock: ManualTimeSource,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    /// Harness with the testing configuration and sequential ids
    pub fn new() -> Self {
        Self::build(
            DeliveryConfig::testing(),
            Arc::new(SequentialIdGenerator::new("corr")),
        )
    }

    pub fn with_config(config: DeliveryConfig) -> Self {
        Self::build(config, Arc::new(SequentialIdGenerator::new("corr")))
    }

    pub fn with_ids(ids: Arc<dyn CorrelationIdGenerator>) -> Self {
        Self::build(DeliveryConfig::testing(), ids)
    }

    pub fn build(config: DeliveryConfig, ids: Arc<dyn CorrelationIdGenerator>) -> Self {
        let clock = ManualTimeSource::starting_at(1_700_000_000_000);
        let users = Arc::new(InMemoryUserDirectory::new());
        let sessions = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::with_time_source(Arc::new(clock.clone())));
        let observer = Arc::new(RecordingObserver::default());

        let service = MessageService::builder(users.clone(), sessions.clone(), store.clone())
            .with_config(config)
            .with_id_generator(ids)
            .with_observer(observer.clone())
            .with_time_source(Arc::new(clock.clone()))
            .build()
            .expect("test configuration is valid");

        Self {
            service,
            users,
            sessions,
            store,
            clock,
            observer,
        }
    }
}
