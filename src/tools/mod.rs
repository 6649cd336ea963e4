//! Tool trait and registry
//!
//! Tools are read-only capabilities the model may call before answering.
//! Each call goes through the registry so it is logged in one place.

use crate::accounts::AccountLookup;
use crate::error::SupportError;
use crate::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Per-request data a tool runs against
pub struct ToolContext<'a> {
    pub accounts: &'a dyn AccountLookup,
    pub customer_id: i64,
    /// Used when the model leaves `include_pending` out
    pub include_pending: bool,
}

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;
    async fn execute(&self, ctx: &ToolContext<'_>, args: &Value) -> Result<String>;
}

/// Provider-neutral tool declaration
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Run a tool by name
    pub async fn call(&self, name: &str, ctx: &ToolContext<'_>, args: &Value) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| SupportError::ToolNotFound(name.to_string()))?;

        let output = tool.execute(ctx, args).await?;

        info!(
            tool = name,
            customer_id = ctx.customer_id,
            "Tool call completed"
        );

        Ok(output)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `customer_balance`: current balance as a currency string
pub struct BalanceTool;

#[async_trait::async_trait]
impl Tool for BalanceTool {
    fn name(&self) -> &'static str {
        "customer_balance"
    }

    fn description(&self) -> &'static str {
        "Returns the customer's current account balance as a formatted string."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "include_pending": {
                    "type": "boolean",
                    "description": "Whether to include pending transactions in the balance"
                }
            },
            "required": ["include_pending"]
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, args: &Value) -> Result<String> {
        let include_pending = match args {
            Value::Null => ctx.include_pending,
            Value::Object(map) => match map.get("include_pending") {
                None | Some(Value::Null) => ctx.include_pending,
                Some(Value::Bool(flag)) => *flag,
                Some(other) => {
                    return Err(SupportError::ToolError(format!(
                        "include_pending must be a boolean, got {}",
                        other
                    )))
                }
            },
            other => {
                return Err(SupportError::ToolError(format!(
                    "customer_balance arguments must be an object, got {}",
                    other
                )))
            }
        };

        let balance = ctx
            .accounts
            .resolve_balance(ctx.customer_id, include_pending)
            .await?;

        Ok(balance.to_string())
    }
}

/// Create the registry offered to every model-backed evaluator
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(BalanceTool));
    registry
}
