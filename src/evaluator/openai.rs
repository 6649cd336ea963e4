//! OpenAI Chat Completions evaluator
//!
//! Primary model-backed evaluator. Offers the balance tool and the
//! `final_result` output tool, and loops until the model calls the latter.

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
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiEvaluator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    label: String,
    timeout: Duration,
    tools: ToolRegistry,
}

impl OpenAiEvaluator {
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

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                send_error("OpenAI", e, self.timeout)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "OpenAI error response: {}", body);
            return Err(SupportError::ProviderStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            if e.is_timeout() {
                SupportError::Timeout(self.timeout)
            } else {
                SupportError::MalformedOutput(format!("OpenAI response parse error: {}", e))
            }
        })
    }
}

#[async_trait]
impl Evaluator for OpenAiEvaluator {
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

        let tools: Vec<FunctionTool> = offered_tools(&self.tools)
            .into_iter()
            .map(FunctionTool::from)
            .collect();

        let mut messages = vec![
            ChatMessage::system(prompt::build_instructions(&customer_name)),
            ChatMessage::user(query.question.clone()),
        ];

        for round in 1..=MAX_MODEL_ROUNDS {
            let request = ChatRequest {
                model: &self.model,
                messages: &messages,
                tools: &tools,
                tool_choice: "required",
                temperature: 0.2,
            };

            info!(model = %self.model, round, "Calling OpenAI");
            let response = self.complete(&request).await?;

            let message = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| SupportError::MalformedOutput("OpenAI returned no choices".into()))?
                .message;

            let calls = message.tool_calls.unwrap_or_default();

            if calls.is_empty() {
                let content = message.content.ok_or_else(|| {
                    SupportError::MalformedOutput("OpenAI reply had neither text nor tool calls".into())
                })?;
                return parse_assessment(&content);
            }

            if let Some(final_call) = calls.iter().find(|c| c.function.name == FINAL_RESULT_TOOL) {
                let args: Value = serde_json::from_str(&final_call.function.arguments)
                    .map_err(|e| SupportError::MalformedOutput(format!("final_result arguments: {}", e)))?;
                return parse_assessment_value(args);
            }

            messages.push(ChatMessage::assistant_calls(calls.clone()));

            for call in calls {
                let args: Value = if call.function.arguments.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        SupportError::MalformedOutput(format!(
                            "{} arguments: {}",
                            call.function.name, e
                        ))
                    })?
                };

                let output = match self.tools.call(&call.function.name, &ctx, &args).await {
                    Ok(output) => output,
                    Err(e) => tool_failure_text(&e).ok_or(e)?,
                };

                debug!(tool = %call.function.name, "Returning tool output to OpenAI");
                messages.push(ChatMessage::tool(call.id, output));
            }
        }

        Err(SupportError::ToolLoopExceeded(MAX_MODEL_ROUNDS))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: &'a [FunctionTool],
    tool_choice: &'a str,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn system(content: String) -> Self {
        Self::text("system", content)
    }

    fn user(content: String) -> Self {
        Self::text("user", content)
    }

    fn text(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn assistant_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    fn tool(call_id: String, output: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(output),
            tool_calls: None,
            tool_call_id: Some(call_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct FunctionTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolSpec,
}

impl From<ToolSpec> for FunctionTool {
    fn from(spec: ToolSpec) -> Self {
        Self {
            kind: "function",
            function: spec,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
