//! In-flight operation bookkeeping
//!
//! Each asynchronous round trip is tracked by a one-shot token: at most
//! one token per kind may be outstanding, and a delivery consumes the
//! token only if its request id matches. Everything a completion does to
//! proxy state is gated on that consumption, which is what turns a
//! possibly-duplicated or stale transport delivery into an at-most-once
//! effect.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use voxlink_protocol::RequestId;

use crate::error::ProxyError;

/// The asynchronous round-trip kinds the proxy tracks. `Cancel` is
/// fire-and-forget and never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Speak,
    Pause,
    Resume,
}

#[derive(Debug)]
struct PendingOperation {
    id: RequestId,
    issued_at: Instant,
}

/// An expired operation reported by [`PendingSet::take_expired`].
#[derive(Debug)]
pub struct ExpiredOperation {
    pub kind: OperationKind,
    pub id: RequestId,
    pub waited: Duration,
}

/// The set of in-flight operations for one proxy.
#[derive(Default)]
pub struct PendingSet {
    entries: Mutex<HashMap<OperationKind, PendingOperation>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly issued round trip. Fails if one of the same kind is
    /// already awaiting its reply.
    pub fn register(
        &self,
        kind: OperationKind,
        id: RequestId,
        issued_at: Instant,
    ) -> Result<(), ProxyError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&kind) {
            return Err(ProxyError::InFlight { kind });
        }
        entries.insert(kind, PendingOperation { id, issued_at });
        Ok(())
    }

    /// Consume the token for `kind` if `id` matches the outstanding
    /// request. Returns `true` exactly once per registration; duplicate
    /// or stale deliveries return `false` and must leave state untouched.
    pub fn consume(&self, kind: OperationKind, id: RequestId) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(&kind) {
            Some(pending) if pending.id == id => {
                entries.remove(&kind);
                true
            }
            _ => false,
        }
    }

    /// Drop every outstanding token, returning what was cleared.
    pub fn clear(&self) -> Vec<(OperationKind, RequestId)> {
        self.entries
            .lock()
            .drain()
            .map(|(kind, pending)| (kind, pending.id))
            .collect()
    }

    /// Remove and return every token older than `timeout`.
    pub fn take_expired(&self, now: Instant, timeout: Duration) -> Vec<ExpiredOperation> {
        let mut entries = self.entries.lock();
        let expired: Vec<OperationKind> = entries
            .iter()
            .filter(|(_, pending)| now.duration_since(pending.issued_at) >= timeout)
            .map(|(kind, _)| *kind)
            .collect();
        expired
            .into_iter()
            .filter_map(|kind| {
                entries.remove(&kind).map(|pending| ExpiredOperation {
                    kind,
                    id: pending.id,
                    waited: now.duration_since(pending.issued_at),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
