//! Reconnect replay
//!
//! When a recipient connects, every unconfirmed message addressed to them is pushed again,
//! oldest first, each under a brand-new correlation id. Replay is driven purely from durable
//! storage because in-memory tracking does not survive a restart.

use courier_core::{CorrelationId, DeliveryEvent, Message, Result, User, Username};

use crate::service::MessageService;

// ----------------------------------------------------------------------------
// Replay Summary
// ----------------------------------------------------------------------------

/// What a reconnect replay pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub recipient: Username,
    /// Correlation ids issued, in push order
    pub correlation_ids: Vec<CorrelationId>,
}

impl ReplaySummary {
    fn empty(recipient: Username) -> Self {
        Self {
            recipient,
            correlation_ids: Vec::new(),
        }
    }

    /// Number of messages pushed
    pub fn replayed(&self) -> usize {
        self.correlation_ids.len()
    }
}

// ----------------------------------------------------------------------------
// Replay
// ----------------------------------------------------------------------------

impl MessageService {
    /// Replay unconfirmed messages to a freshly connected recipient
    ///
    /// Returns an empty summary when the recipient has no live session by the time this runs.
    pub async fn on_recipient_connected(&self, user: &User) -> Result<ReplaySummary> {
        let Some(session) = self.sessions.session_for(user).await? else {
            tracing::debug!(recipient = %user.username, "No live session, replay skipped");
            return Ok(ReplaySummary::empty(user.username.clone()));
        };

        let mut pending: Vec<Message> = self
            .store
            .offline_messages(user)
            .await?
            .into_iter()
            .filter(|message| !message.confirmed)
            .collect();
        pending.sort_by_key(Message::replay_order);
        if let Some(limit) = self.config.replay_batch_limit {
            pending.truncate(limit);
        }

        let mut summary = ReplaySummary::empty(user.username.clone());
        for message in pending {
            let correlation_id =
                self.push(session.as_ref(), user, message.id, message.title, message.content)?;
            summary.correlation_ids.push(correlation_id);
        }

        self.emit(DeliveryEvent::Replayed {
            recipient: user.username.clone(),
            count: summary.replayed(),
        });
        Ok(summary)
    }
}
