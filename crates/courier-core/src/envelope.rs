//! Push and acknowledgment envelopes
//!
//! A push envelope carries one message to a live connection, tagged with the correlation id
//! the recipient must echo back in its acknowledgment. The transport owns the actual wire
//! framing; the binary helpers here are a convenience encoding for transports that have none.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::types::CorrelationId;
use crate::{CourierError, Result};

/// Fixed `type` literal carried by every push
pub const PUSH_TYPE: &str = "set";

// ----------------------------------------------------------------------------
// Push Envelope
// ----------------------------------------------------------------------------

/// Envelope handed to a session for transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// Correlation id for this attempt
    pub id: CorrelationId,
    /// Always [`PUSH_TYPE`]
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
}

impl PushEnvelope {
    /// Create a new push envelope
    pub fn new(id: CorrelationId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            kind: PUSH_TYPE.to_string(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Build the push for a stored message
    pub fn for_message(id: CorrelationId, message: &Message) -> Self {
        Self::new(id, message.title.clone(), message.content.clone())
    }

    /// Serialize to binary format for transmission
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary format
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        let envelope: Self = bincode::deserialize(data)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Validate the envelope fields
    pub fn validate(&self) -> Result<()> {
        if self.kind != PUSH_TYPE {
            return Err(CourierError::invalid_message(format!(
                "push envelope type must be \"{}\", got \"{}\"",
                PUSH_TYPE, self.kind
            )));
        }
        if self.id.as_str().is_empty() {
            return Err(CourierError::invalid_message(
                "push envelope is missing its correlation id",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Acknowledgment Envelope
// ----------------------------------------------------------------------------

/// Inbound confirmation echoing the correlation id of a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEnvelope {
    pub id: CorrelationId,
}

impl AckEnvelope {
    pub fn new(id: CorrelationId) -> Self {
        Self { id }
    }

    /// Acknowledge a received push
    pub fn for_push(push: &PushEnvelope) -> Self {
        Self::new(push.id.clone())
    }

    /// Serialize to binary format for transmission
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary format
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
