//! In-memory collaborators
//!
//! Reference implementations of the collaborator traits for tests, demos and single-process
//! deployments. Users and sessions live in `DashMap`s; the message store keeps rows in a
//! `BTreeMap` behind a `tokio` lock so every update is a per-row read-modify-write.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    CourierError, Message, MessageId, MessageStore, NewMessage, PushEnvelope, Result, Session,
    SessionRegistry, SystemTimeSource, TimeSource, User, UserDirectory, Username,
};
use dashmap::DashMap;
use tokio::sync::{mpsc, RwLock};

// ----------------------------------------------------------------------------
// User Directory
// ----------------------------------------------------------------------------

/// Directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<Username, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, returning the record
    pub fn register(&self, username: impl Into<Username>) -> User {
        let user = User::new(username);
        self.users.insert(user.username.clone(), user.clone());
        user
    }

    pub fn remove(&self, username: &Username) -> Option<User> {
        self.users.remove(username).map(|(_, user)| user)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn user_by_username(&self, username: &Username) -> Result<Option<User>> {
        Ok(self.users.get(username).map(|user| user.value().clone()))
    }
}

// ----------------------------------------------------------------------------
// Sessions
// ----------------------------------------------------------------------------

/// Session that forwards pushes into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSession {
    sender: mpsc::UnboundedSender<PushEnvelope>,
}

impl ChannelSession {
    /// Create a session and the receiving end the "client" reads from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PushEnvelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Session for ChannelSession {
    fn send(&self, envelope: PushEnvelope) {
        if let Err(err) = self.sender.send(envelope) {
            // Receiver gone; the message stays unconfirmed and replays on reconnect
            tracing::debug!(correlation_id = %err.0.id, "Session closed, push discarded");
        }
    }
}

/// Registry of live sessions keyed by username
#[derive(Default)]
pub struct InMemorySessionRegistry {
    sessions: DashMap<Username, Arc<dyn Session>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a session to a user, replacing any previous one
    pub fn bind(&self, user: &User, session: Arc<dyn Session>) {
        self.sessions.insert(user.username.clone(), session);
    }

    /// Bind a fresh [`ChannelSession`] and return its receiver
    pub fn connect(&self, user: &User) -> mpsc::UnboundedReceiver<PushEnvelope> {
        let (session, receiver) = ChannelSession::channel();
        self.bind(user, Arc::new(session));
        receiver
    }

    /// Unbind the user's session
    pub fn disconnect(&self, user: &User) -> bool {
        self.sessions.remove(&user.username).is_some()
    }

    pub fn is_online(&self, user: &User) -> bool {
        self.sessions.contains_key(&user.username)
    }
}

impl core::fmt::Debug for InMemorySessionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemorySessionRegistry")
            .field("online", &self.sessions.len())
            .finish()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn session_for(&self, user: &User) -> Result<Option<Arc<dyn Session>>> {
        Ok(self
            .sessions
            .get(&user.username)
            .map(|session| Arc::clone(session.value())))
    }
}

// ----------------------------------------------------------------------------
// Message Store
// ----------------------------------------------------------------------------

/// Message store held in process memory
pub struct InMemoryMessageStore {
    messages: RwLock<BTreeMap<MessageId, Message>>,
    next_id: AtomicU64,
    time: Arc<dyn TimeSource>,
    fail_writes: AtomicBool,
}

impl InMemoryMessageStore {
    /// Create a store stamping rows with wall-clock time
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource))
    }

    /// Create a store stamping rows from `time`
    pub fn with_time_source(time: Arc<dyn TimeSource>) -> Self {
        Self {
            messages: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            time,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail, to exercise error propagation
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every stored row in id order
    pub async fn all_messages(&self) -> Vec<Message> {
        self.messages.read().await.values().cloned().collect()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Number of rows with the confirmed flag set
    pub async fn confirmed_count(&self) -> usize {
        self.messages
            .read()
            .await
            .values()
            .filter(|message| message.confirmed)
            .count()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CourierError::storage("in-memory store is failing writes"));
        }
        Ok(())
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InMemoryMessageStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryMessageStore")
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn add_message(&self, message: NewMessage) -> Result<MessageId> {
        self.check_writable()?;

        let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = Message::from_new(id, message, self.time.now());
        self.messages.write().await.insert(id, stored);
        Ok(id)
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn offline_messages(&self, user: &User) -> Result<Vec<Message>> {
        let mut pending: Vec<Message> = self
            .messages
            .read()
            .await
            .values()
            .filter(|message| message.recipient == user.username && !message.confirmed)
            .cloned()
            .collect();
        pending.sort_by_key(Message::replay_order);
        Ok(pending)
    }

    async fn update_message(&self, message: &Message) -> Result<()> {
        self.check_writable()?;

        let mut messages = self.messages.write().await;
        let existing = messages
            .get_mut(&message.id)
            .ok_or(CourierError::MessageNotFound {
                message_id: message.id,
            })?;
        existing.confirmed = message.confirmed;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{CorrelationId, ManualTimeSource};

    #[tokio::test]
    async fn test_store_assigns_increasing_ids() {
        let store = InMemoryMessageStore::new();

        let first = store.add_message(NewMessage::new("alice", "a", "1")).await.unwrap();
        let second = store.add_message(NewMessage::new("alice", "b", "2")).await.unwrap();

        assert!(first < second);
        assert_eq!(store.message_count().await, 2);
    }

    #[tokio::test]
    async fn test_offline_messages_filters_and_orders() {
        let clock = ManualTimeSource::starting_at(1_000);
        let store = InMemoryMessageStore::with_time_source(Arc::new(clock.clone()));
        let alice = User::new("alice");

        let first = store.add_message(NewMessage::new("alice", "first", "")).await.unwrap();
        clock.advance(core::time::Duration::from_millis(5));
        store.add_message(NewMessage::new("bob", "other", "")).await.unwrap();
        let third = store.add_message(NewMessage::new("alice", "third", "")).await.unwrap();

        let mut confirmed = store.get_message(first).await.unwrap().unwrap();
        confirmed.confirmed = true;
        store.update_message(&confirmed).await.unwrap();

        let pending = store.offline_messages(&alice).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, third);
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = InMemoryMessageStore::new();
        store.set_fail_writes(true);

        let err = store
            .add_message(NewMessage::new("alice", "t", "c"))
            .await
            .unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = InMemoryMessageStore::new();
        let ghost = Message::from_new(
            MessageId::new(99),
            NewMessage::new("alice", "t", "c"),
            courier_core::Timestamp::new(0),
        );

        assert!(matches!(
            store.update_message(&ghost).await,
            Err(CourierError::MessageNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_session_registry_connect_disconnect() {
        let registry = InMemorySessionRegistry::new();
        let alice = User::new("alice");

        assert!(registry.session_for(&alice).await.unwrap().is_none());

        let mut receiver = registry.connect(&alice);
        let session = registry.session_for(&alice).await.unwrap().unwrap();
        session.send(PushEnvelope::new(CorrelationId::from("c1"), "t", "c"));
        assert_eq!(receiver.try_recv().unwrap().id, CorrelationId::from("c1"));

        assert!(registry.disconnect(&alice));
        assert!(!registry.is_online(&alice));
    }

    #[tokio::test]
    async fn test_closed_session_discards_silently() {
        let (session, receiver) = ChannelSession::channel();
        drop(receiver);

        session.send(PushEnvelope::new(CorrelationId::from("c1"), "t", "c"));
    }

    #[tokio::test]
    async fn test_user_directory() {
        let directory = InMemoryUserDirectory::new();
        directory.register("alice");

        let found = directory.user_by_username(&"alice".into()).await.unwrap();
        assert_eq!(found, Some(User::new("alice")));
        assert!(directory.user_by_username(&"bob".into()).await.unwrap().is_none());

        directory.remove(&"alice".into());
        assert!(directory.user_by_username(&"alice".into()).await.unwrap().is_none());
    }
}
