//! Threads per-session conversation memory through an inner agent.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{AgentExecutor, AgentInput, AgentOutput};
use crate::sessions::{SessionMemory, DEFAULT_SESSION_ID};

/// Wraps an agent so each request sees the prior turns of its session, and
/// successful turns are recorded for the next one.
///
/// Failed invocations leave the transcript untouched.
pub struct AgentWithHistory {
    inner: Box<dyn AgentExecutor>,
    memory: Arc<dyn SessionMemory>,
    max_history_messages: usize,
}

impl AgentWithHistory {
    pub fn new(inner: Box<dyn AgentExecutor>, memory: Arc<dyn SessionMemory>) -> Self {
        Self {
            inner,
            memory,
            max_history_messages: usize::MAX,
        }
    }

    /// Cap how many prior messages are injected as context.
    pub fn with_max_history_messages(mut self, max: usize) -> Self {
        self.max_history_messages = max;
        self
    }

    pub fn memory(&self) -> &Arc<dyn SessionMemory> {
        &self.memory
    }
}

#[async_trait]
impl AgentExecutor for AgentWithHistory {
    async fn invoke(&self, input: &AgentInput) -> Result<AgentOutput> {
        let session_id = input.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID);
        let transcript = self.memory.get_or_create(session_id);

        let mut request = input.clone();
        request.session_id = Some(session_id.to_string());
        // Snapshot under the lock; it must not be held across the await.
        request.chat_history = transcript
            .lock()
            .recent(self.max_history_messages)
            .to_vec();
        request.chat_history.extend(input.chat_history.iter().cloned());

        tracing::debug!(
            session_id,
            history = request.chat_history.len(),
            "invoking agent with session history"
        );
        let output = self.inner.invoke(&request).await?;

        {
            let mut transcript = transcript.lock();
            transcript.add_user_message(input.input.clone());
            transcript.add_assistant_message(output.output.clone());
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
