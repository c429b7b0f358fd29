//! Courier Core
//!
//! Stable API definitions for the courier at-least-once delivery engine: identifiers, the
//! durable message model, push/ack envelopes, configuration, the error type, and the traits
//! through which the engine reaches users, sessions, and storage.
//!
//! The engine itself (correlation tracking, dispatch, acknowledgment, replay) lives in
//! `courier-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod collaborators;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod ids;
pub mod message;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use collaborators::{MessageStore, Session, SessionRegistry, User, UserDirectory};
pub use config::DeliveryConfig;
pub use envelope::{AckEnvelope, PushEnvelope, PUSH_TYPE};
pub use errors::{CourierError, Result};
pub use events::{DeliveryEvent, DeliveryObserver, NoOpObserver, TracingObserver};
pub use ids::{CorrelationIdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use message::{Message, NewMessage};
pub use types::{
    CorrelationId, ManualTimeSource, MessageId, SystemTimeSource, TimeSource, Timestamp, Username,
};
