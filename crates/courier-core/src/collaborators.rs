//! External collaborator interfaces
//!
//! The delivery engine never owns users, sessions, or storage. It reaches them through the
//! traits below, which the hosting service implements over its own directory, connection
//! table, and database.
//!
//! ## Contracts
//!
//! - `UserDirectory` answers whether a recipient exists.
//! - `SessionRegistry` reports the single live connection bound to a user, if any.
//! - `Session::send` is fire-and-forget; the engine never waits on the recipient.
//! - `MessageStore` is the only durable state. Implementations must make `update_message`
//!   a per-row read-modify-write and return offline messages oldest first.

use std::sync::Arc;

use crate::envelope::PushEnvelope;
use crate::message::{Message, NewMessage};
use crate::types::{MessageId, Username};
use crate::Result;

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

/// A known recipient
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub username: Username,
}

impl User {
    pub fn new(username: impl Into<Username>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// User directory lookup
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by name
    async fn user_by_username(&self, username: &Username) -> Result<Option<User>>;
}

// ----------------------------------------------------------------------------
// Sessions
// ----------------------------------------------------------------------------

/// A live connection to one recipient
pub trait Session: Send + Sync {
    /// Hand an envelope to the transport
    fn send(&self, envelope: PushEnvelope);
}

/// Lookup of the live session bound to a user
#[async_trait::async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Get the session bound to `user`, if one is live
    async fn session_for(&self, user: &User) -> Result<Option<Arc<dyn Session>>>;
}

// ----------------------------------------------------------------------------
// Durable Storage
// ----------------------------------------------------------------------------

/// Durable message storage
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message, returning the identifier the store assigned
    async fn add_message(&self, message: NewMessage) -> Result<MessageId>;

    /// Load a message by identifier
    async fn get_message(&self, id: MessageId) -> Result<Option<Message>>;

    /// Unconfirmed messages addressed to `user`, oldest first
    async fn offline_messages(&self, user: &User) -> Result<Vec<Message>>;

    /// Persist the mutable fields of `message`
    async fn update_message(&self, message: &Message) -> Result<()>;
}
