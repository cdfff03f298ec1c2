//! Tool-calling agent that answers questions by querying the database.

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::traits::{AgentExecutor, AgentInput, AgentOutput};
use crate::providers::{
    ChatMessage, ChatRequest, ConversationMessage, Provider, ToolCall, ToolResultMessage,
};
use crate::tools::{Tool, ToolSpec};

/// Output returned when the model keeps calling tools past the round limit.
pub const MAX_ITERATIONS_OUTPUT: &str = "Agent stopped due to max iterations.";

const DEFAULT_MAX_ITERATIONS: usize = 15;
const LOG_PREVIEW_CHARS: usize = 300;

/// Runs the model in a loop, executing its tool calls until it produces a
/// plain answer.
pub struct SqlAgent {
    provider: Box<dyn Provider>,
    tools: Vec<Box<dyn Tool>>,
    tool_specs: Vec<ToolSpec>,
    system_prompt: String,
    model: String,
    temperature: f64,
    max_iterations: usize,
}

impl SqlAgent {
    pub fn builder() -> SqlAgentBuilder {
        SqlAgentBuilder::default()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    fn initial_messages(&self, input: &AgentInput) -> Vec<ConversationMessage> {
        let mut messages = Vec::with_capacity(input.chat_history.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt).into());
        for turn in &input.chat_history {
            messages.push(
                ChatMessage {
                    role: turn.role.as_str().to_string(),
                    content: turn.content.clone(),
                }
                .into(),
            );
        }
        messages.push(ChatMessage::user(&input.input).into());
        messages
    }

    /// Execute one tool call. Every failure becomes text for the model.
    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name) else {
            return format!(
                "Error: {} is not a valid tool, try one of [{}].",
                call.name,
                self.tool_names().join(", ")
            );
        };

        let args: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => return format!("Error: invalid arguments for {}: {e}", call.name),
        };

        match tool.execute(args).await {
            Ok(result) if result.success => result.output,
            Ok(result) => format!("Error: {}", result.error.unwrap_or_default()),
            Err(e) => format!("Error: {e:#}"),
        }
    }
}

#[async_trait]
impl AgentExecutor for SqlAgent {
    async fn invoke(&self, input: &AgentInput) -> Result<AgentOutput> {
        let mut messages = self.initial_messages(input);
        let mut tool_calls_made = 0u32;

        for round in 1..=self.max_iterations {
            let response = self
                .provider
                .chat(
                    ChatRequest {
                        messages: &messages,
                        tools: Some(&self.tool_specs),
                    },
                    &self.model,
                    self.temperature,
                )
                .await?;

            if !response.has_tool_calls() {
                tracing::info!(round, tool_calls_made, "agent finished");
                return Ok(AgentOutput {
                    output: response.text.unwrap_or_default(),
                    tool_calls_made,
                    model: Some(self.model.clone()),
                });
            }

            messages.push(ConversationMessage::AssistantToolCalls {
                text: response.text.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            for call in &response.tool_calls {
                tracing::info!(round, tool = %call.name, args = %call.arguments, "invoking tool");
                let content = self.run_tool(call).await;
                tracing::info!(tool = %call.name, result = %preview(&content), "tool returned");
                tool_calls_made += 1;
                messages.push(ConversationMessage::ToolResult(ToolResultMessage {
                    tool_call_id: call.id.clone(),
                    content,
                }));
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "agent hit round limit");
        Ok(AgentOutput {
            output: MAX_ITERATIONS_OUTPUT.to_string(),
            tool_calls_made,
            model: Some(self.model.clone()),
        })
    }

    fn name(&self) -> &str {
        "sql_agent"
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= LOG_PREVIEW_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    format!("{truncated}...")
}

/// Builder for [`SqlAgent`].
#[derive(Default)]
pub struct SqlAgentBuilder {
    provider: Option<Box<dyn Provider>>,
    tools: Vec<Box<dyn Tool>>,
    system_prompt: Option<String>,
    model: Option<String>,
    temperature: f64,
    max_iterations: Option<usize>,
}

impl SqlAgentBuilder {
    pub fn provider(mut self, provider: Box<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: Vec<Box<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn build(self) -> Result<SqlAgent> {
        let Some(provider) = self.provider else {
            bail!("SqlAgent requires a provider");
        };
        let Some(model) = self.model else {
            bail!("SqlAgent requires a model");
        };
        let max_iterations = self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }

        let tool_specs = self.tools.iter().map(|t| t.spec()).collect();
        Ok(SqlAgent {
            provider,
            tools: self.tools,
            tool_specs,
            system_prompt: self.system_prompt.unwrap_or_default(),
            model,
            temperature: self.temperature,
            max_iterations,
        })
    }
}
