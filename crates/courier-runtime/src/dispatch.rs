//! Delivery dispatch
//!
//! Decides, for one message, whether it can be pushed right now. A message is always durably
//! stored before any push is attempted; "accepted" means stored, independent of whether the
//! recipient was online.

use courier_core::{
    CorrelationId, DeliveryEvent, Message, MessageId, NewMessage, PushEnvelope, Result, Session,
    User, Username,
};

use crate::service::MessageService;
use crate::tracker::CorrelationEntry;

// ----------------------------------------------------------------------------
// Dispatch Types
// ----------------------------------------------------------------------------

/// Message handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not yet persisted; the dispatcher stores it once the recipient is known
    Fresh(NewMessage),
    /// Already in durable storage
    Stored(Message),
}

impl Dispatch {
    /// Recipient the message is addressed to
    pub fn recipient(&self) -> &Username {
        match self {
            Self::Fresh(message) => &message.recipient,
            Self::Stored(message) => &message.recipient,
        }
    }
}

/// Result of a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The directory does not know the recipient; nothing was stored
    RecipientUnknown,
    /// Stored, recipient offline; will go out on reconnect
    Stored { message_id: MessageId },
    /// Stored and pushed to the recipient's live session
    Pushed {
        message_id: MessageId,
        correlation_id: CorrelationId,
    },
}

impl DispatchOutcome {
    /// Whether the message is durably stored
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::RecipientUnknown)
    }

    /// Durable id, if the message was stored
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::RecipientUnknown => None,
            Self::Stored { message_id } | Self::Pushed { message_id, .. } => Some(*message_id),
        }
    }

    /// Correlation id, if a push went out
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Pushed { correlation_id, .. } => Some(correlation_id),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

impl MessageService {
    /// Send a new message
    ///
    /// Returns [`DispatchOutcome::RecipientUnknown`] without persisting anything when the
    /// recipient does not exist. Storage failures propagate as errors.
    pub async fn send_message(&self, message: NewMessage) -> Result<DispatchOutcome> {
        self.dispatch(Dispatch::Fresh(message)).await
    }

    /// Persist (if needed) and push a message to its recipient
    pub async fn dispatch(&self, message: Dispatch) -> Result<DispatchOutcome> {
        if let Dispatch::Fresh(ref fresh) = message {
            fresh.validate(&self.config)?;
        }

        let recipient = message.recipient().clone();
        let Some(user) = self.users.user_by_username(&recipient).await? else {
            self.emit(DeliveryEvent::RecipientUnknown { recipient });
            return Ok(DispatchOutcome::RecipientUnknown);
        };

        let (message_id, title, content) = match message {
            Dispatch::Fresh(fresh) => {
                let title = fresh.title.clone();
                let content = fresh.content.clone();
                let message_id = self.store.add_message(fresh).await?;
                (message_id, title, content)
            }
            Dispatch::Stored(stored) => (stored.id, stored.title, stored.content),
        };

        let Some(session) = self.sessions.session_for(&user).await? else {
            self.emit(DeliveryEvent::Stored {
                recipient: user.username,
                message_id,
            });
            return Ok(DispatchOutcome::Stored { message_id });
        };

        let correlation_id = self.push(session.as_ref(), &user, message_id, title, content)?;
        Ok(DispatchOutcome::Pushed {
            message_id,
            correlation_id,
        })
    }

    /// Register a fresh correlation id and hand the envelope to the session
    ///
    /// The tracker entry exists before the envelope leaves, so an ack can never outrun it.
    pub(crate) fn push(
        &self,
        session: &dyn Session,
        user: &User,
        message_id: MessageId,
        title: String,
        content: String,
    ) -> Result<CorrelationId> {
        let correlation_id = self.ids.next_id();
        let entry = CorrelationEntry::new(message_id, user.username.clone(), self.time.now());

        if let Err(err) = self.tracker.register(correlation_id.clone(), entry) {
            tracing::warn!(%message_id, %correlation_id, "Correlation id collision, push dropped");
            return Err(err);
        }

        session.send(PushEnvelope::new(correlation_id.clone(), title, content));

        self.emit(DeliveryEvent::Pushed {
            recipient: user.username.clone(),
            message_id,
            correlation_id: correlation_id.clone(),
        });
        Ok(correlation_id)
    }
}
