//! The agent invocation contract shared by the chat loop and its backends.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sessions::Message;

/// Agent executor interface.
///
/// This is the top-level "brain" boundary: the chat loop hands it a request
/// and gets back an answer or an error, with no knowledge of how the answer
/// was produced.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Answer one user request.
    async fn invoke(&self, input: &AgentInput) -> Result<AgentOutput>;
    fn name(&self) -> &str;
}

/// One user request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInput {
    /// Latest user text.
    pub input: String,
    /// Conversation to thread the request through, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Prior turns injected as context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chat_history: Vec<Message>,
}

impl AgentInput {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub output: String,
    pub tool_calls_made: u32,
    pub model: Option<String>,
}

impl AgentOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }
}
