//! Request-scoped storage for pipeline results.
//!
//! A front end that runs the pipeline and then serves views over the result
//! keeps each run here under its own [`SessionId`]. Sessions never share or
//! merge data; writing to an existing id replaces what was stored.
//!
//! ```rust,ignore
//! use complaint_processing::{Pipeline, SessionStore};
//!
//! let store = SessionStore::new();
//! let id = store.insert(pipeline.process(complaints, Some(reference))?);
//!
//! if let Some(session) = store.get(&id) {
//!     println!("{} alerts", session.result.duplication.alert_count());
//! }
//! ```

use crate::types::PipelineResult;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Identifier of one stored pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A stored pipeline result.
#[derive(Debug)]
pub struct ProcessingSession {
    pub result: PipelineResult,
    pub created_at: DateTime<Local>,
}

impl ProcessingSession {
    pub fn new(result: PipelineResult) -> Self {
        Self {
            result,
            created_at: Local::now(),
        }
    }
}

struct StoredSession {
    session: Arc<ProcessingSession>,
    /// Write order; the highest value is the latest session.
    sequence: u64,
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<SessionId, StoredSession>,
    next_sequence: u64,
}

impl StoreInner {
    fn put(&mut self, id: SessionId, result: PipelineResult) -> Option<Arc<ProcessingSession>> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let stored = StoredSession {
            session: Arc::new(ProcessingSession::new(result)),
            sequence,
        };
        self.sessions.insert(id, stored).map(|old| old.session)
    }
}

/// Thread-safe map from [`SessionId`] to pipeline results.
///
/// Readers get an `Arc` to the stored session, so a reader keeps a
/// consistent result even if the session is replaced or removed meanwhile.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<StoreInner>,
}

static_assertions::assert_impl_all!(SessionStore: Send, Sync);

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result under a fresh id.
    pub fn insert(&self, result: PipelineResult) -> SessionId {
        let id = SessionId::new();
        self.inner.write().put(id, result);
        debug!("Stored session {}", id);
        id
    }

    /// Store a result under `id`, returning what was stored there before.
    ///
    /// The last write wins; an unknown id is simply created.
    pub fn replace(&self, id: SessionId, result: PipelineResult) -> Option<Arc<ProcessingSession>> {
        let previous = self.inner.write().put(id, result);
        debug!(
            "{} session {}",
            if previous.is_some() { "Replaced" } else { "Stored" },
            id
        );
        previous
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<ProcessingSession>> {
        self.inner
            .read()
            .sessions
            .get(id)
            .map(|stored| Arc::clone(&stored.session))
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<ProcessingSession>> {
        self.inner
            .write()
            .sessions
            .remove(id)
            .map(|stored| stored.session)
    }

    /// The most recently written session.
    pub fn latest(&self) -> Option<(SessionId, Arc<ProcessingSession>)> {
        self.inner
            .read()
            .sessions
            .iter()
            .max_by_key(|(_, stored)| stored.sequence)
            .map(|(id, stored)| (*id, Arc::clone(&stored.session)))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.inner.read().sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().sessions.clear();
    }
}
