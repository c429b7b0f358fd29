//! Durable message model
//!
//! `NewMessage` is what a sender hands in; `Message` is the stored row the message store
//! returns. Only the `confirmed` flag ever changes after a message is stored.

use serde::{Deserialize, Serialize};

use crate::config::DeliveryConfig;
use crate::types::{MessageId, Timestamp, Username};
use crate::{CourierError, Result};

// ----------------------------------------------------------------------------
// New Message
// ----------------------------------------------------------------------------

/// A message that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Recipient the message is addressed to
    pub recipient: Username,
    pub title: String,
    pub content: String,
}

impl NewMessage {
    pub fn new(
        recipient: impl Into<Username>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Check title and content against the configured limits
    pub fn validate(&self, config: &DeliveryConfig) -> Result<()> {
        let title_len = self.title.chars().count();
        if title_len > config.max_title_length {
            return Err(CourierError::invalid_message(format!(
                "title is {} characters (max {})",
                title_len, config.max_title_length
            )));
        }

        let content_len = self.content.chars().count();
        if content_len > config.max_content_length {
            return Err(CourierError::invalid_message(format!(
                "content is {} characters (max {})",
                content_len, config.max_content_length
            )));
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Stored Message
// ----------------------------------------------------------------------------

/// A message as held by durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier assigned by the store
    pub id: MessageId,
    pub recipient: Username,
    pub title: String,
    pub content: String,
    /// Set once an acknowledgment for this message has been processed
    pub confirmed: bool,
    /// Creation time; replay orders by `(created_at, id)`
    pub created_at: Timestamp,
}

impl Message {
    /// Materialize a stored row from a new message
    pub fn from_new(id: MessageId, message: NewMessage, created_at: Timestamp) -> Self {
        Self {
            id,
            recipient: message.recipient,
            title: message.title,
            content: message.content,
            confirmed: false,
            created_at,
        }
    }

    /// Key used to order offline messages oldest first
    pub fn replay_order(&self) -> (Timestamp, MessageId) {
        (self.created_at, self.id)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
