//! Session memory: per-conversation transcripts keyed by session id.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemorySessionStore;
pub use traits::{
    Message, Role, SessionMemory, SharedTranscript, Transcript, DEFAULT_SESSION_ID,
};

use std::sync::Arc;

/// Create a default in-memory session store.
pub fn create_session_store() -> Arc<dyn SessionMemory> {
    Arc::new(InMemorySessionStore::new())
}
