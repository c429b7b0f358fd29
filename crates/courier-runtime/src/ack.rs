//! Acknowledgment processing
//!
//! An acknowledgment names a correlation id. If the tracker still knows it, the message it
//! points at is marked confirmed in storage and only then is the tracker entry retired. A
//! failure between the two leaves a stale entry behind, never a lost confirmation.

use courier_core::{AckEnvelope, CorrelationId, CourierError, DeliveryEvent, MessageId, Result};

use crate::service::MessageService;

// ----------------------------------------------------------------------------
// Ack Outcome
// ----------------------------------------------------------------------------

/// Result of processing an acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The message was marked confirmed
    Confirmed { message_id: MessageId },
    /// The message was already confirmed; no write was made
    AlreadyConfirmed { message_id: MessageId },
    /// Nothing is tracked under this correlation id (already acknowledged or purged)
    Unknown,
}

impl AckOutcome {
    /// Whether this acknowledgment changed durable state
    pub fn confirmed_now(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

// ----------------------------------------------------------------------------
// Acknowledgment Processor
// ----------------------------------------------------------------------------

impl MessageService {
    /// Process an acknowledgment for `correlation_id`
    pub async fn confirm(&self, correlation_id: &CorrelationId) -> Result<AckOutcome> {
        let Some(message_id) = self.tracker.resolve(correlation_id) else {
            self.emit(DeliveryEvent::UnknownAck {
                correlation_id: correlation_id.clone(),
            });
            return Ok(AckOutcome::Unknown);
        };

        let mut message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or(CourierError::MessageNotFound { message_id })?;

        let outcome = if message.confirmed {
            self.emit(DeliveryEvent::DuplicateAck {
                message_id,
                correlation_id: correlation_id.clone(),
            });
            AckOutcome::AlreadyConfirmed { message_id }
        } else {
            message.confirmed = true;
            self.store.update_message(&message).await?;
            self.emit(DeliveryEvent::Confirmed {
                message_id,
                correlation_id: correlation_id.clone(),
                title: message.title,
            });
            AckOutcome::Confirmed { message_id }
        };

        self.tracker.retire(correlation_id);
        Ok(outcome)
    }

    /// Process an inbound acknowledgment envelope
    pub async fn handle_ack(&self, ack: &AckEnvelope) -> Result<AckOutcome> {
        self.confirm(&ack.id).await
    }
}
