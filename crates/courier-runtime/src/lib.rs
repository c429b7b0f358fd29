//! Courier Runtime Engine
//!
//! This crate contains the at-least-once delivery engine built on `courier-core`:
//! - `CorrelationTracker`: concurrent map of pushes awaiting acknowledgment
//! - `MessageService`: dispatch, acknowledgment processing and reconnect replay
//! - `ServiceBuilder`: constructor-based wiring of collaborators
//! - `memory`: in-memory collaborators for tests and single-process use

pub mod ack;
pub mod builder;
pub mod dispatch;
pub mod memory;
pub mod replay;
pub mod service;
pub mod tracker;

pub use ack::AckOutcome;
pub use builder::ServiceBuilder;
pub use dispatch::{Dispatch, DispatchOutcome};
pub use replay::ReplaySummary;
pub use service::MessageService;
pub use tracker::{CorrelationEntry, CorrelationTracker, TrackerStats};

// Re-export core types for convenience
pub use courier_core::{
    AckEnvelope, CorrelationId, CourierError, DeliveryConfig, DeliveryEvent, DeliveryObserver,
    Message, MessageId, NewMessage, PushEnvelope, Result, User, Username,
};
