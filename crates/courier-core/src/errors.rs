//! Error types for the courier delivery engine
//!
//! A single `CourierError` covers everything the core can fail on. Outcomes that are part of
//! normal operation (an unknown recipient, an ack for a correlation id nobody is tracking) are
//! not errors and are reported through the outcome enums instead.

use crate::types::{CorrelationId, MessageId};

// ----------------------------------------------------------------------------
// Core Error
// ----------------------------------------------------------------------------

/// Core error types for the courier engine
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// A storage collaborator failed; surfaced unchanged to the caller
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// A correlation id resolved to a message the store no longer knows about
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: MessageId },

    /// Attempt to register a correlation id that is already live
    #[error("Correlation id already registered: {correlation_id}")]
    DuplicateCorrelation { correlation_id: CorrelationId },

    /// Message rejected before persistence
    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl CourierError {
    /// Create a storage error
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Create an invalid message error
    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether the error came from a storage collaborator
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::MessageNotFound { .. })
    }
}

/// Result alias used throughout the courier crates
pub type Result<T> = core::result::Result<T, CourierError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
