//! Evaluator trait and implementations
//!
//! An evaluator turns a support query into a risk assessment. Model-backed
//! evaluators may fail; the keyword evaluator never does.

use crate::accounts::AccountLookup;
use crate::classifier::RiskClassifier;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::SupportError;
use crate::models::{SupportAssessment, SupportQuery};
use crate::tools::ToolSpec;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub mod anthropic;
pub mod openai;
pub mod prompt;

pub use anthropic::AnthropicEvaluator;
pub use openai::OpenAiEvaluator;

/// Upper bound on model round trips (tool calls included) per attempt
pub const MAX_MODEL_ROUNDS: usize = 5;

/// Trait for risk assessment (LLM or rules)
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Label such as `openai:gpt-4o`
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        query: &SupportQuery,
        accounts: &dyn AccountLookup,
    ) -> Result<SupportAssessment>;
}

/// Keyword evaluator, always available
pub struct KeywordEvaluator;

impl KeywordEvaluator {
    pub const NAME: &'static str = "keyword-fallback";

    /// Infallible form used as the last link of the failover chain
    pub fn assess(&self, query: &SupportQuery) -> SupportAssessment {
        RiskClassifier::classify(&query.question, &query.customer_name)
    }
}

#[async_trait]
impl Evaluator for KeywordEvaluator {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        query: &SupportQuery,
        _accounts: &dyn AccountLookup,
    ) -> Result<SupportAssessment> {
        Ok(self.assess(query))
    }
}

/// Build the evaluator for a configured provider
pub fn build_evaluator(provider: &ProviderConfig, timeout: Duration) -> Result<Arc<dyn Evaluator>> {
    let evaluator: Arc<dyn Evaluator> = match provider.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiEvaluator::new(provider, timeout)?),
        ProviderKind::Anthropic => Arc::new(AnthropicEvaluator::new(provider, timeout)?),
    };
    Ok(evaluator)
}

/// Connection-pooled client with a hard per-request timeout
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Map a transport failure, keeping timeouts distinguishable
pub(crate) fn send_error(provider: &str, error: reqwest::Error, timeout: Duration) -> SupportError {
    if error.is_timeout() {
        SupportError::Timeout(timeout)
    } else {
        SupportError::ProviderError(format!("{} request failed: {}", provider, error))
    }
}

/// Registry tools plus the `final_result` output tool
pub(crate) fn offered_tools(registry: &crate::tools::ToolRegistry) -> Vec<ToolSpec> {
    let mut specs = registry.specs();
    specs.push(prompt::final_result_spec());
    specs
}

/// Parse an assessment from model text, tolerating a ```json fence
pub fn parse_assessment(response: &str) -> Result<SupportAssessment> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        SupportError::MalformedOutput(format!(
            "Failed to parse assessment: {} | raw={}",
            e, response
        ))
    })
}

/// Parse an assessment from tool-call arguments
pub fn parse_assessment_value(value: serde_json::Value) -> Result<SupportAssessment> {
    serde_json::from_value(value.clone()).map_err(|e| {
        SupportError::MalformedOutput(format!(
            "Failed to parse assessment: {} | raw={}",
            e, value
        ))
    })
}

/// Tool failures the model can recover from are reported back to it as text
pub(crate) fn tool_failure_text(error: &SupportError) -> Option<String> {
    match error {
        SupportError::ToolError(_) | SupportError::ToolNotFound(_) => {
            Some(format!("error: {}", error))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::DemoAccounts;
    use crate::models::RiskCategory;

    #[tokio::test]
    async fn test_keyword_evaluator_never_fails() {
        let evaluator = KeywordEvaluator;
        let query = SupportQuery::new("I lost my credit card", "John");
        let result = evaluator.evaluate(&query, &DemoAccounts::new()).await.unwrap();
        assert_eq!(result.risk, 9);
        assert_eq!(evaluator.name(), "keyword-fallback");
    }

    #[test]
    fn test_parse_fenced_output() {
        let raw = "```json\n{\"support_advice\":\"Hi John\",\"block_card\":false,\"risk\":1,\
                   \"risk_explanation\":\"Routine\",\"risk_category\":\"routine\",\
                   \"risk_signals\":[]}\n```";
        let parsed = parse_assessment(raw).unwrap();
        assert_eq!(parsed.advice, "Hi John");
        assert_eq!(parsed.risk_category, RiskCategory::Routine);
    }

    #[test]
    fn test_parse_rejects_bad_output() {
        let err = parse_assessment("I cannot help with that").unwrap_err();
        assert!(matches!(err, SupportError::MalformedOutput(_)));

        let negative = serde_json::json!({
            "support_advice": "x", "block_card": false, "risk": -1,
            "risk_explanation": "x", "risk_category": "routine"
        });
        assert!(parse_assessment_value(negative).is_err());
    }

    #[test]
    fn test_tool_failure_text() {
        assert!(tool_failure_text(&SupportError::ToolNotFound("x".into())).is_some());
        assert!(tool_failure_text(&SupportError::Timeout(Duration::from_secs(1))).is_none());
    }
}
