//! Optional per-context registry of in-flight operations
//!
//! Some embedders keep a per-execution-context ledger of everything a
//! bridge has outstanding so teardown can sweep it in one pass. The
//! registry is keyed by an explicit [`ContextId`], never process-wide,
//! so contexts (and tests) stay isolated from each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use voxlink_protocol::RequestId;

use crate::pending::OperationKind;

static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier of one owning context (page, session, test).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate the next process-unique context id.
    pub fn next() -> Self {
        Self(CONTEXT_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// Sink a proxy reports its in-flight operations to.
pub trait OperationRegistry: Send + Sync {
    /// Record that `context` issued a round trip.
    fn append(&self, context: ContextId, kind: OperationKind, id: RequestId);

    /// Forget everything recorded for `context`.
    fn deactivate_all(&self, context: ContextId);
}

/// In-memory registry implementation, sufficient for tests and
/// single-process embedders.
#[derive(Default)]
pub struct InMemoryOperationRegistry {
    entries: Mutex<HashMap<ContextId, Vec<(OperationKind, RequestId)>>>,
}

impl InMemoryOperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations currently recorded for `context`.
    pub fn operations(&self, context: ContextId) -> Vec<(OperationKind, RequestId)> {
        self.entries
            .lock()
            .get(&context)
            .cloned()
            .unwrap_or_default()
    }
}

impl OperationRegistry for InMemoryOperationRegistry {
    fn append(&self, context: ContextId, kind: OperationKind, id: RequestId) {
        self.entries
            .lock()
            .entry(context)
            .or_default()
            .push((kind, id));
    }

    fn deactivate_all(&self, context: ContextId) {
        self.entries.lock().remove(&context);
    }
}
