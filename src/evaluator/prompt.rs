//! Instructions and output schema shared by the model-backed evaluators

use crate::tools::ToolSpec;
use serde_json::{json, Value};

/// Name of the pseudo-tool the model calls to hand back its answer.
pub const FINAL_RESULT_TOOL: &str = "final_result";

const INSTRUCTIONS: &str = r#"You are a support agent for a bank. Return concise, actionable advice, and a calibrated risk score from 0-10:
0-2 routine inquiries; 3-5 concerning issues; 6-8 urgent security matters; 9-10 critical threats like fraud or theft.

Rules:
- If loss, theft, fraud or suspicious activity is indicated, set block_card=true.
- Provide a one sentence explanation of why you assigned the risk level.
- Risk categories: 'routine' (0-2), 'concerning' (3-5), 'urgent' (6-8), 'critical' (9-10).
- Identify specific risk signals/keywords from the query that contributed to your risk assessment (e.g. 'lost', 'stolen', 'unauthorized', 'fraud', 'suspicious').
- Use the customer's name if known.
- Call customer_balance when the customer asks about their balance; never invent a figure.
- Always finish by calling final_result with your assessment."#;

/// Full system instructions for one request
pub fn build_instructions(customer_name: &str) -> String {
    format!(
        "{}\n\nThe customer's name is '{}'",
        INSTRUCTIONS,
        customer_name.replace('\'', "\\'")
    )
}

/// JSON schema of the assessment the model must produce
pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "support_advice": {
                "type": "string",
                "description": "Advice returned to the customer"
            },
            "block_card": {
                "type": "boolean",
                "description": "Whether to block their card"
            },
            "risk": {
                "type": "integer",
                "minimum": 0,
                "maximum": 10,
                "description": "Risk level 0-10 (inclusive)"
            },
            "risk_explanation": {
                "type": "string",
                "description": "1 sentence explanation of why this risk level was assigned"
            },
            "risk_category": {
                "type": "string",
                "enum": ["routine", "concerning", "urgent", "critical"],
                "description": "Risk category matching the risk band"
            },
            "risk_signals": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Signals/keywords found"
            }
        },
        "required": [
            "support_advice",
            "block_card",
            "risk",
            "risk_explanation",
            "risk_category",
            "risk_signals"
        ]
    })
}

/// Declaration of the `final_result` pseudo-tool
pub fn final_result_spec() -> ToolSpec {
    ToolSpec {
        name: FINAL_RESULT_TOOL.to_string(),
        description: "The final response which ends this conversation".to_string(),
        parameters: output_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_carry_policy_and_name() {
        let text = build_instructions("John");
        assert!(text.contains("9-10 critical"));
        let directive = text
            .lines()
            .find(|line| line.contains("block_card=true"))
            .unwrap();
        for threat in ["loss", "theft", "fraud", "suspicious activity"] {
            assert!(directive.contains(threat), "missing {}", threat);
        }
        assert!(text.ends_with("The customer's name is 'John'"));
    }

    #[test]
    fn test_name_quoting() {
        let text = build_instructions("O'Brien");
        assert!(text.ends_with("The customer's name is 'O\\'Brien'"));
    }

    #[test]
    fn test_schema_bounds() {
        let schema = output_schema();
        assert_eq!(schema["properties"]["risk"]["maximum"], 10);
        assert_eq!(schema["required"].as_array().unwrap().len(), 6);
        assert_eq!(final_result_spec().name, FINAL_RESULT_TOOL);
    }
}
