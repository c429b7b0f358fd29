//! Delivery events and observers
//!
//! Every notable step of the delivery cycle is reported as a [`DeliveryEvent`] to a
//! [`DeliveryObserver`]. The default observer turns them into `tracing` events; hosts that
//! want metrics plug in their own.

use crate::types::{CorrelationId, MessageId, Username};

// ----------------------------------------------------------------------------
// Delivery Events
// ----------------------------------------------------------------------------

/// Something the delivery engine did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// Message persisted, recipient offline
    Stored {
        recipient: Username,
        message_id: MessageId,
    },
    /// Message pushed to a live session
    Pushed {
        recipient: Username,
        message_id: MessageId,
        correlation_id: CorrelationId,
    },
    /// Send addressed to a user the directory does not know
    RecipientUnknown { recipient: Username },
    /// Acknowledgment marked a message confirmed
    Confirmed {
        message_id: MessageId,
        correlation_id: CorrelationId,
        title: String,
    },
    /// Acknowledgment for a message that was already confirmed
    DuplicateAck {
        message_id: MessageId,
        correlation_id: CorrelationId,
    },
    /// Acknowledgment for a correlation id nobody is tracking
    UnknownAck { correlation_id: CorrelationId },
    /// Reconnect replay finished
    Replayed { recipient: Username, count: usize },
    /// Stale tracker entries dropped by a purge sweep
    Purged { count: usize },
}

impl DeliveryEvent {
    /// Short machine-friendly name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::Pushed { .. } => "pushed",
            Self::RecipientUnknown { .. } => "recipient_unknown",
            Self::Confirmed { .. } => "confirmed",
            Self::DuplicateAck { .. } => "duplicate_ack",
            Self::UnknownAck { .. } => "unknown_ack",
            Self::Replayed { .. } => "replayed",
            Self::Purged { .. } => "purged",
        }
    }
}

// ----------------------------------------------------------------------------
// Observers
// ----------------------------------------------------------------------------

/// Hook receiving delivery events
pub trait DeliveryObserver: Send + Sync {
    fn on_event(&self, event: &DeliveryEvent);
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl DeliveryObserver for NoOpObserver {
    fn on_event(&self, _event: &DeliveryEvent) {}
}

/// Observer that emits structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DeliveryObserver for TracingObserver {
    fn on_event(&self, event: &DeliveryEvent) {
        match event {
            DeliveryEvent::Stored {
                recipient,
                message_id,
            } => {
                tracing::debug!(%recipient, %message_id, "Recipient offline, message stored");
            }
            DeliveryEvent::Pushed {
                recipient,
                message_id,
                correlation_id,
            } => {
                tracing::debug!(%recipient, %message_id, %correlation_id, "Message pushed");
            }
            DeliveryEvent::RecipientUnknown { recipient } => {
                tracing::info!(%recipient, "Send to unknown recipient");
            }
            DeliveryEvent::Confirmed {
                message_id,
                correlation_id,
                title,
            } => {
                tracing::info!(%message_id, %correlation_id, %title, "Message confirmed");
            }
            DeliveryEvent::DuplicateAck {
                message_id,
                correlation_id,
            } => {
                tracing::debug!(%message_id, %correlation_id, "Message already confirmed");
            }
            DeliveryEvent::UnknownAck { correlation_id } => {
                tracing::debug!(%correlation_id, "Acknowledgment for untracked correlation id");
            }
            DeliveryEvent::Replayed { recipient, count } => {
                tracing::info!(%recipient, count, "Replayed offline messages");
            }
            DeliveryEvent::Purged { count } => {
                tracing::warn!(count, "Purged stale correlation entries");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
