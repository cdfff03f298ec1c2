//! Generic OpenAI-compatible provider.
//! Speaks the `/chat/completions` format with native function calling, which
//! OpenAI and most hosted or local gateways accept.

use crate::providers::traits::{
    ChatRequest as ProviderChatRequest, ChatResponse as ProviderChatResponse,
    ConversationMessage, Provider, ToolCall as ProviderToolCall,
};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A provider that speaks the OpenAI-compatible chat completions API with
/// `Authorization: Bearer <key>` auth.
pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Build the full URL for chat completions, detecting if base_url already includes the path.
    fn chat_completions_url(&self) -> String {
        let has_full_endpoint = reqwest::Url::parse(&self.base_url)
            .map(|url| {
                url.path()
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            })
            .unwrap_or_else(|_| self.base_url.ends_with("/chat/completions"));

        if has_full_endpoint {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ApiFunctionSpec,
}

#[derive(Debug, Serialize)]
struct ApiFunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    function: Option<Function>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Function {
    name: Option<String>,
    arguments: Option<String>,
}

fn to_api_message(message: &ConversationMessage) -> Message {
    match message {
        ConversationMessage::Chat(chat) => Message {
            role: chat.role.clone(),
            content: Some(chat.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        ConversationMessage::AssistantToolCalls { text, tool_calls } => Message {
            role: "assistant".to_string(),
            content: text.clone(),
            tool_calls: Some(
                tool_calls
                    .iter()
                    .map(|call| ToolCall {
                        id: Some(call.id.clone()),
                        kind: Some("function".to_string()),
                        function: Some(Function {
                            name: Some(call.name.clone()),
                            arguments: Some(call.arguments.clone()),
                        }),
                    })
                    .collect(),
            ),
            tool_call_id: None,
        },
        ConversationMessage::ToolResult(result) => Message {
            role: "tool".to_string(),
            content: Some(result.content.clone()),
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id.clone()),
        },
    }
}

fn to_api_tool(spec: &ToolSpec) -> ApiTool {
    ApiTool {
        kind: "function",
        function: ApiFunctionSpec {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.parameters.clone(),
        },
    }
}

fn into_provider_response(message: ResponseMessage) -> ProviderChatResponse {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| {
            let function = tc.function?;
            let name = function.name?;
            let arguments = function
                .arguments
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "{}".to_string());
            Some(ProviderToolCall {
                id: tc
                    .id
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name,
                arguments,
            })
        })
        .collect();

    ProviderChatResponse {
        text: message.content.filter(|c| !c.is_empty()),
        tool_calls,
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn chat(
        &self,
        request: ProviderChatRequest<'_>,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<ProviderChatResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Set the OPENAI_API_KEY environment variable.",
                self.name
            )
        })?;

        let body = ChatRequest {
            model: model.to_string(),
            messages: request.messages.iter().map(to_api_message).collect(),
            temperature,
            tools: request
                .tools
                .filter(|tools| !tools.is_empty())
                .map(|tools| tools.iter().map(to_api_tool).collect()),
        };

        let url = self.chat_completions_url();
        tracing::debug!(provider = %self.name, %url, messages = body.messages.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error(&self.name, response).await);
        }

        let chat_response: ApiChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| into_provider_response(c.message))
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::{ChatMessage, ToolResultMessage};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_provider(url: &str, key: Option<&str>) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new("openai", url, key)
    }

    #[test]
    fn creates_with_key() {
        let p = make_provider("https://api.openai.com/v1", Some("sk-key"));
        assert_eq!(p.name, "openai");
        assert_eq!(p.base_url, "https://api.openai.com/v1");
        assert_eq!(p.api_key.as_deref(), Some("sk-key"));
    }

    #[test]
    fn strips_trailing_slash() {
        let p = make_provider("https://example.com/v1/", None);
        assert_eq!(p.base_url, "https://example.com/v1");
    }

    #[test]
    fn chat_completions_url_base_with_v1() {
        let p = make_provider("https://api.example.com/v1", None);
        assert_eq!(
            p.chat_completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn chat_completions_url_custom_full_endpoint() {
        let p = make_provider("https://my-api.example.com/api/v2/chat/completions", None);
        assert_eq!(
            p.chat_completions_url(),
            "https://my-api.example.com/api/v2/chat/completions"
        );
    }

    #[test]
    fn chat_completions_url_requires_exact_suffix_match() {
        let p = make_provider("https://my-api.example.com/v2/chat/completions-proxy", None);
        assert_eq!(
            p.chat_completions_url(),
            "https://my-api.example.com/v2/chat/completions-proxy/chat/completions"
        );
    }

    #[tokio::test]
    async fn chat_fails_without_key() {
        let p = make_provider("https://api.example.com", None);
        let messages = vec![ChatMessage::user("hello").into()];
        let result = p
            .chat(
                ProviderChatRequest {
                    messages: &messages,
                    tools: None,
                },
                "gpt-4o-mini",
                0.0,
            )
            .await;
        assert!(result.unwrap_err().to_string().contains("API key not set"));
    }

    #[test]
    fn tool_conversation_serializes_in_openai_shape() {
        let messages = vec![
            ConversationMessage::from(ChatMessage::system("be brief")),
            ChatMessage::user("how many rows?").into(),
            ConversationMessage::AssistantToolCalls {
                text: None,
                tool_calls: vec![ProviderToolCall {
                    id: "call_1".into(),
                    name: "sql_db_query".into(),
                    arguments: r#"{"query":"SELECT 1"}"#.into(),
                }],
            },
            ConversationMessage::ToolResult(ToolResultMessage {
                tool_call_id: "call_1".into(),
                content: "1".into(),
            }),
        ];
        let api: Vec<Message> = messages.iter().map(to_api_message).collect();
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json[0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(json[2]["role"], "assistant");
        assert!(json[2].get("content").is_none());
        assert_eq!(json[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(json[2]["tool_calls"][0]["type"], "function");
        assert_eq!(json[2]["tool_calls"][0]["function"]["name"], "sql_db_query");
        assert_eq!(
            json[3],
            json!({"role": "tool", "content": "1", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn response_with_tool_calls_deserializes() {
        let raw = r#"{"content":null,"tool_calls":[{"id":"call_9","type":"function","function":{"name":"sql_db_list_tables","arguments":""}}]}"#;
        let message: ResponseMessage = serde_json::from_str(raw).unwrap();
        let response = into_provider_response(message);

        assert!(response.text.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_9");
        assert_eq!(response.tool_calls[0].arguments, "{}");
    }

    #[test]
    fn tool_call_without_id_gets_generated_one() {
        let raw = r#"{"tool_calls":[{"function":{"name":"sql_db_query","arguments":"{}"}}]}"#;
        let message: ResponseMessage = serde_json::from_str(raw).unwrap();
        let response = into_provider_response(message);
        assert!(response.tool_calls[0].id.starts_with("call_"));
    }

    #[test]
    fn response_empty_choices() {
        let json = r#"{"choices":[]}"#;
        let resp: ApiChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices.is_empty());
    }

    #[tokio::test]
    async fn chat_posts_tools_and_parses_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "tools": [{"type": "function", "function": {"name": "sql_db_list_tables"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "There are 3 tables."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let p = make_provider(&format!("{}/v1", server.uri()), Some("sk-test"));
        let messages = vec![ChatMessage::user("tables?").into()];
        let tools = vec![ToolSpec {
            name: "sql_db_list_tables".into(),
            description: "List tables".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let response = p
            .chat(
                ProviderChatRequest {
                    messages: &messages,
                    tools: Some(&tools),
                },
                "gpt-4o-mini",
                0.0,
            )
            .await
            .unwrap();

        assert_eq!(response.text.as_deref(), Some("There are 3 tables."));
        assert!(!response.has_tool_calls());
    }

    #[tokio::test]
    async fn chat_error_status_is_sanitized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("invalid key sk-abcdef123456 supplied"),
            )
            .mount(&server)
            .await;

        let p = make_provider(&server.uri(), Some("sk-abcdef123456"));
        let messages = vec![ChatMessage::user("hi").into()];
        let err = p
            .chat(
                ProviderChatRequest {
                    messages: &messages,
                    tools: None,
                },
                "gpt-4o-mini",
                0.0,
            )
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("openai API error (401"));
        assert!(err.contains("[REDACTED]"));
        assert!(!err.contains("sk-abcdef123456"));
    }
}
