//! Anthropic Messages evaluator
//!
//! Secondary model-backed evaluator. Same instructions and tools as the
//! OpenAI one, spoken in `tool_use` / `tool_result` content blocks.

use super::prompt::{self, FINAL_RESULT_TOOL};
use super::{
    build_http_client, offered_tools, parse_assessment, parse_assessment_value, send_error,
    tool_failure_text, Evaluator, MAX_MODEL_ROUNDS,
};
use crate::accounts::AccountLookup;
use crate::config::ProviderConfig;
use crate::error::SupportError;
use crate::models::{SupportAssessment, SupportQuery};
use crate::tools::{create_default_registry, ToolContext, ToolRegistry, ToolSpec};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicEvaluator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    label: String,
    timeout: Duration,
    tools: ToolRegistry,
}

impl AnthropicEvaluator {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            label: config.label(),
            timeout,
            tools: create_default_registry(),
        })
    }

    async fn create_message(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Anthropic request failed: {}", e);
                send_error("Anthropic", e, self.timeout)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Anthropic error response: {}", body);
            return Err(SupportError::ProviderStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<MessagesResponse>().await.map_err(|e| {
            if e.is_timeout() {
                SupportError::Timeout(self.timeout)
            } else {
                SupportError::MalformedOutput(format!("Anthropic response parse error: {}", e))
            }
        })
    }
}

#[async_trait]
impl Evaluator for AnthropicEvaluator {
    fn name(&self) -> &str {
        &self.label
    }

    async fn evaluate(
        &self,
        query: &SupportQuery,
        accounts: &dyn AccountLookup,
    ) -> Result<SupportAssessment> {
        let customer_name = accounts
            .resolve_name(query.customer_id, &query.customer_name)
            .await?;

        let ctx = ToolContext {
            accounts,
            customer_id: query.customer_id,
            include_pending: query.include_pending,
        };

        let system = prompt::build_instructions(&customer_name);
        let tools: Vec<AnthropicTool> = offered_tools(&self.tools)
            .into_iter()
            .map(AnthropicTool::from)
            .collect();

        let mut messages = vec![Message {
            role: "user".to_string(),
            content: vec![ContentBlock::Text {
                text: query.question.clone(),
            }],
        }];

        for round in 1..=MAX_MODEL_ROUNDS {
            let request = MessagesRequest {
                model: &self.model,
                max_tokens: MAX_TOKENS,
                system: &system,
                messages: &messages,
                tools: &tools,
                tool_choice: json!({ "type": "any" }),
            };

            info!(model = %self.model, round, "Calling Anthropic");
            let response = self.create_message(&request).await?;

            let content: Vec<ContentBlock> = response
                .content
                .into_iter()
                .filter(|block| !matches!(block, ContentBlock::Other))
                .collect();

            let tool_uses: Vec<(String, String, Value)> = content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            if tool_uses.is_empty() {
                let text: String = content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                if text.trim().is_empty() {
                    return Err(SupportError::MalformedOutput(format!(
                        "Anthropic reply had neither text nor tool use (stop_reason={:?})",
                        response.stop_reason
                    )));
                }
                return parse_assessment(&text);
            }

            if let Some((_, _, input)) = tool_uses.iter().find(|(_, name, _)| name == FINAL_RESULT_TOOL) {
                return parse_assessment_value(input.clone());
            }

            messages.push(Message {
                role: "assistant".to_string(),
                content,
            });

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in tool_uses {
                let (output, is_error) = match self.tools.call(&name, &ctx, &input).await {
                    Ok(output) => (output, false),
                    Err(e) => (tool_failure_text(&e).ok_or(e)?, true),
                };

                debug!(tool = %name, "Returning tool output to Anthropic");
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output,
                    is_error,
                });
            }

            messages.push(Message {
                role: "user".to_string(),
                content: results,
            });
        }

        Err(SupportError::ToolLoopExceeded(MAX_MODEL_ROUNDS))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    tools: &'a [AnthropicTool],
    tool_choice: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

impl From<ToolSpec> for AnthropicTool {
    fn from(spec: ToolSpec) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            input_schema: spec.parameters,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn test_content_block_round_trip() {
        let raw = r#"{"content":[
            {"type":"text","text":"Let me check."},
            {"type":"tool_use","id":"toolu_1","name":"customer_balance","input":{"include_pending":false}},
            {"type":"thinking","thinking":"..."}
        ],"stop_reason":"tool_use"}"#;

        let response: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.content.len(), 3);
        assert!(matches!(response.content[2], ContentBlock::Other));
        match &response.content[1] {
            ContentBlock::ToolUse { name, input, .. } => {
                assert_eq!(name, "customer_balance");
                assert_eq!(input["include_pending"], false);
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_tool_result_serialization() {
        let ok = serde_json::to_value(ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "$100.00".to_string(),
            is_error: false,
        })
        .unwrap();
        assert_eq!(ok["type"], "tool_result");
        assert!(ok.get("is_error").is_none());

        let tool = AnthropicTool::from(prompt::final_result_spec());
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["input_schema"]["properties"]["risk"]["type"], "integer");
    }

    #[test]
    fn test_label_from_config() {
        let config = ProviderConfig {
            model: "claude-3-haiku-20240307".to_string(),
            ..ProviderConfig::with_defaults(ProviderKind::Anthropic, "sk-ant-test")
        };
        let evaluator = AnthropicEvaluator::new(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(evaluator.name(), "anthropic:claude-3-haiku-20240307");
        assert_eq!(evaluator.base_url, DEFAULT_ANTHROPIC_BASE_URL);
    }
}
