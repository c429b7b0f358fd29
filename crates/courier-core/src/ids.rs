//! Correlation id generation
//!
//! Production ids are 128-bit random UUIDv4 values rendered as 32 lowercase hex characters.
//! Tests swap in [`SequentialIdGenerator`] to get predictable tokens.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::types::CorrelationId;

/// Capability that mints fresh correlation ids
pub trait CorrelationIdGenerator: Send + Sync {
    /// Produce an id that is not live anywhere else
    fn next_id(&self) -> CorrelationId;
}

/// Random UUIDv4 tokens without dashes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl CorrelationIdGenerator for RandomIdGenerator {
    fn next_id(&self) -> CorrelationId {
        CorrelationId::new(Uuid::new_v4().simple().to_string())
    }
}

/// Deterministic `<prefix>-<n>` tokens, counting from 1
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("corr")
    }
}

impl CorrelationIdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> CorrelationId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        CorrelationId::new(format!("{}-{}", self.prefix, n))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
