//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/chat/completions` with
//! tool calling (OpenRouter, vLLM, Ollama, ...).

use async_trait::async_trait;
use clerk_core::error::ProviderError;
use clerk_core::message::{ContentBlock, Message, MessageBody, ToolCall};
use clerk_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Convert our transcript to the chat-completions message format.
    ///
    /// User and system content keeps its typed parts; assistant and tool
    /// content is flattened to text.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match &m.body {
                MessageBody::System { content } => ApiMessage {
                    role: "system".into(),
                    content: Some(ApiContent::Parts(Self::to_api_parts(content))),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageBody::User { content } => ApiMessage {
                    role: "user".into(),
                    content: Some(ApiContent::Parts(Self::to_api_parts(content))),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageBody::Assistant { content, tool_calls } => ApiMessage {
                    role: "assistant".into(),
                    content: content.as_ref().map(|_| ApiContent::Text(m.text())),
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls.iter().map(ApiToolCall::from).collect())
                    },
                    tool_call_id: None,
                },
                MessageBody::Tool { tool_call_id, .. } => ApiMessage {
                    role: "tool".into(),
                    content: Some(ApiContent::Text(m.text())),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.clone()),
                },
            })
            .collect()
    }

    fn to_api_parts(blocks: &[ContentBlock]) -> Vec<ApiContentPart> {
        blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => ApiContentPart {
                    r#type: "text".into(),
                    text: text.clone(),
                },
            })
            .collect()
    }

    /// Convert tool definitions to the chat-completions `tools` format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["parallel_tool_calls"] = serde_json::json!(request.parallel_tool_calls);
        }

        body
    }

    fn parse_completion(api_response: ApiResponse) -> Result<Completion, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from)
            .unwrap_or(FinishReason::Stop);

        Ok(Completion {
            finish_reason,
            message: AssistantReply {
                content: choice.message.content,
                tool_calls,
            },
            model: api_response.model,
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        if let Some(last) = request.messages.last() {
            info!(provider = %self.name, role = %last.role(), "Sending message to completion service: {}", last.text());
        }
        debug!(provider = %self.name, model = %request.model, messages = request.messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::parse_completion(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

#[derive(Debug, Serialize)]
struct ApiContentPart {
    r#type: String,
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default)]
    r#type: String,
    function: ApiFunction,
}

impl From<&ToolCall> for ApiToolCall {
    fn from(tc: &ToolCall) -> Self {
        Self {
            id: tc.id.clone(),
            r#type: "function".into(),
            function: ApiFunction {
                name: tc.name.clone(),
                arguments: tc.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clerk_core::message::ConversationId;

    fn conv() -> ConversationId {
        ConversationId::from("c1")
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("local", "http://localhost:11434/v1/", "x");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn user_content_keeps_parts() {
        let messages = vec![
            Message::system(conv(), "You are helpful"),
            Message::user(
                conv(),
                "m1",
                vec![ContentBlock::text("Show me"), ContentBlock::text("order 37077")],
            ),
        ];
        let api = OpenAiCompatProvider::to_api_messages(&messages);
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[1]["content"][1]["type"], "text");
        assert_eq!(json[1]["content"][1]["text"], "order 37077");
    }

    #[test]
    fn assistant_tool_calls_and_null_content() {
        let msg = Message::assistant(
            conv(),
            None,
            vec![ToolCall {
                id: "call_1".into(),
                name: "get_orders_by_customer_id".into(),
                arguments: r#"{"customer_id":"37077"}"#.into(),
            }],
        );
        let json = serde_json::to_value(OpenAiCompatProvider::to_api_messages(&[msg])).unwrap();
        assert!(json[0]["content"].is_null());
        assert_eq!(json[0]["tool_calls"][0]["type"], "function");
        assert_eq!(json[0]["tool_calls"][0]["function"]["name"], "get_orders_by_customer_id");
    }

    #[test]
    fn tool_response_is_text_with_call_id() {
        let msg = Message::tool_result(conv(), "call_1", r#"{"response":[]}"#);
        let json = serde_json::to_value(OpenAiCompatProvider::to_api_messages(&[msg])).unwrap();
        assert_eq!(json[0]["role"], "tool");
        assert_eq!(json[0]["tool_call_id"], "call_1");
        assert_eq!(json[0]["content"], r#"{"response":[]}"#);
    }

    #[test]
    fn request_body_enables_parallel_tool_calls() {
        let request = CompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![Message::system(conv(), "rules")],
            tools: vec![ToolDefinition {
                name: "get_all_orders_data".into(),
                description: "Get all orders data.".into(),
                parameters: None,
            }],
            parallel_tool_calls: true,
            temperature: None,
        };
        let body = OpenAiCompatProvider::request_body(&request);
        assert_eq!(body["parallel_tool_calls"], true);
        assert_eq!(body["tools"][0]["function"]["name"], "get_all_orders_data");
        assert!(body["tools"][0]["function"].get("parameters").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn parse_tool_call_completion() {
        let raw = r#"{
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "search_products", "arguments": "{\"query\":\"BOYA BYM1\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let completion = OpenAiCompatProvider::parse_completion(parsed).unwrap();
        assert_eq!(completion.finish_reason, FinishReason::ToolCalls);
        assert!(completion.message.content.is_none());
        assert_eq!(completion.message.tool_calls[0].id, "call_abc");
        assert_eq!(completion.message.tool_calls[0].name, "search_products");
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_stop_completion() {
        let raw = r#"{
            "model": "gpt-4o",
            "choices": [{"finish_reason": "stop", "message": {"role": "assistant", "content": "Here are the results"}}]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let completion = OpenAiCompatProvider::parse_completion(parsed).unwrap();
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.message.content.as_deref(), Some("Here are the results"));
        assert!(completion.message.tool_calls.is_empty());
    }

    #[test]
    fn empty_choices_is_invalid() {
        let parsed: ApiResponse =
            serde_json::from_str(r#"{"model": "gpt-4o", "choices": []}"#).unwrap();
        let err = OpenAiCompatProvider::parse_completion(parsed).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
