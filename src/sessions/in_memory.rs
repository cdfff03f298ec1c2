//! In-memory session store implementation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{SessionMemory, SharedTranscript, Transcript};

/// An in-memory session store backed by a mutex-protected hash map.
///
/// Lives for the process only; nothing is persisted. The map lock is held
/// for the whole lookup-or-insert, so concurrent callers asking for the same
/// identifier always receive the same transcript. Appends go through the
/// per-transcript lock, which serialises writers of one session without
/// contending with other sessions.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SharedTranscript>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMemory for InMemorySessionStore {
    fn get_or_create(&self, session_id: &str) -> SharedTranscript {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "creating session transcript");
                Arc::new(Mutex::new(Transcript::new()))
            })
            .clone()
    }

    fn clear(&self, session_id: &str) {
        let removed = self.sessions.lock().remove(session_id);
        if let Some(transcript) = removed {
            transcript.lock().clear();
            tracing::debug!(session_id, "cleared session transcript");
        }
    }

    fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
