//! Keyword Risk Classifier
//!
//! Deterministic rendition of the support risk policy. Used when no model is
//! configured or every model attempt failed, so it must never fail itself.
//!
//! Rules are checked in order and the first match wins:
//! - Theft: lost / stolen / missing card  → critical (9), block card
//! - Fraud: fraud / suspicious / unauthorized → urgent (8), block card
//! - Balance: balance / account            → routine (1)
//! - Anything else                         → routine (2)

use crate::accounts::BALANCE_WITH_PENDING;
use crate::models::{RiskCategory, SupportAssessment};

/// Keyword lists, checked in rule order
const THEFT_KEYWORDS: &[&str] = &["lost", "stolen", "missing"];
const FRAUD_KEYWORDS: &[&str] = &["fraud", "suspicious", "unauthorized"];
const BALANCE_KEYWORDS: &[&str] = &["balance", "account"];

/// Signals reported for each rule, independent of which keyword matched.
const THEFT_SIGNALS: &[&str] = &["lost", "stolen"];
const FRAUD_SIGNALS: &[&str] = &["fraud", "suspicious"];
const BALANCE_SIGNALS: &[&str] = &["balance inquiry"];

/// Which policy rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRule {
    Theft,
    Fraud,
    Balance,
    General,
}

impl RiskRule {
    pub fn risk(&self) -> u8 {
        match self {
            RiskRule::Theft => 9,
            RiskRule::Fraud => 8,
            RiskRule::Balance => 1,
            RiskRule::General => 2,
        }
    }

    pub fn blocks_card(&self) -> bool {
        matches!(self, RiskRule::Theft | RiskRule::Fraud)
    }

    fn signals(&self) -> Vec<String> {
        let signals: &[&str] = match self {
            RiskRule::Theft => THEFT_SIGNALS,
            RiskRule::Fraud => FRAUD_SIGNALS,
            RiskRule::Balance => BALANCE_SIGNALS,
            RiskRule::General => &[],
        };
        signals.iter().map(|s| s.to_string()).collect()
    }
}

/// Keyword risk classifier
pub struct RiskClassifier;

impl RiskClassifier {
    /// Pick the policy rule for a question (case-insensitive substring match)
    pub fn match_rule(question: &str) -> RiskRule {
        let question = question.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|kw| question.contains(kw));

        if has_any(THEFT_KEYWORDS) {
            RiskRule::Theft
        } else if has_any(FRAUD_KEYWORDS) {
            RiskRule::Fraud
        } else if has_any(BALANCE_KEYWORDS) {
            RiskRule::Balance
        } else {
            RiskRule::General
        }
    }

    /// Assess a question for the named customer
    pub fn classify(question: &str, customer_name: &str) -> SupportAssessment {
        let rule = Self::match_rule(question);
        let risk = rule.risk();

        let (advice, explanation) = match rule {
            RiskRule::Theft => (
                format!(
                    "I'm sorry to hear about your card, {}. We are blocking it right away to \
                     prevent unauthorized use, and a replacement card will arrive in 2-3 \
                     business days.",
                    customer_name
                ),
                "The query reports a lost or stolen card, which is a critical security threat."
                    .to_string(),
            ),
            RiskRule::Fraud => (
                format!(
                    "Thank you for reporting this, {}. We have temporarily blocked your card \
                     and opened a fraud investigation. Our fraud team will call you back \
                     within 24 hours.",
                    customer_name
                ),
                "The query describes possible fraud or unauthorized activity that needs \
                 urgent review."
                    .to_string(),
            ),
            RiskRule::Balance => (
                format!(
                    "Hello {}, your current account balance, including pending transactions, \
                     is {}.",
                    customer_name, BALANCE_WITH_PENDING
                ),
                "This is a routine balance inquiry with no security concerns.".to_string(),
            ),
            RiskRule::General => (
                format!(
                    "Thank you for contacting us, {}. Could you share a little more detail \
                     about what you need so we can help?",
                    customer_name
                ),
                "No risk indicators were found in the query.".to_string(),
            ),
        };

        SupportAssessment {
            advice,
            block_card: rule.blocks_card(),
            risk,
            risk_explanation: explanation,
            risk_category: RiskCategory::from_risk(risk),
            risk_signals: rule.signals(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theft_questions() {
        let cases = vec![
            "I lost my credit card",
            "My card was STOLEN from my wallet",
            "my debit card is missing",
        ];

        for c in cases {
            let result = RiskClassifier::classify(c, "John");
            assert_eq!(result.risk, 9, "{}", c);
            assert!(result.block_card);
            assert_eq!(result.risk_category, RiskCategory::Critical);
            assert_eq!(result.risk_signals, vec!["lost", "stolen"]);
        }
    }

    #[test]
    fn test_fraud_questions() {
        let cases = vec![
            "I think this is fraud",
            "There is Suspicious activity",
            "unauthorized charges on my account",
        ];

        for c in cases {
            let result = RiskClassifier::classify(c, "Bob");
            assert_eq!(result.risk, 8, "{}", c);
            assert!(result.block_card);
            assert_eq!(result.risk_category, RiskCategory::Urgent);
            assert_eq!(result.risk_signals, vec!["fraud", "suspicious"]);
        }
    }

    #[test]
    fn test_balance_questions() {
        let result = RiskClassifier::classify("What is my balance?", "Alice");
        assert_eq!(result.risk, 1);
        assert!(!result.block_card);
        assert_eq!(result.risk_category, RiskCategory::Routine);
        assert!(result.advice.contains("$123.45"));
        assert!(result.advice.contains("Alice"));

        let result = RiskClassifier::classify("update my ACCOUNT details", "Alice");
        assert_eq!(result.risk, 1);
        assert_eq!(result.risk_signals, vec!["balance inquiry"]);
    }

    #[test]
    fn test_default_case() {
        let result = RiskClassifier::classify("Can you help me?", "Eve");
        assert_eq!(result.risk, 2);
        assert!(!result.block_card);
        assert_eq!(result.risk_category, RiskCategory::Routine);
        assert!(result.risk_signals.is_empty());
        assert!(!result.advice.is_empty());
    }

    #[test]
    fn test_rule_precedence() {
        // keyword order in the text does not matter
        assert_eq!(
            RiskClassifier::match_rule("fraud on my account, and my card is lost"),
            RiskRule::Theft
        );
        assert_eq!(
            RiskClassifier::match_rule("balance looks suspicious"),
            RiskRule::Fraud
        );
        assert_eq!(
            RiskClassifier::match_rule("account balance"),
            RiskRule::Balance
        );
    }

    #[test]
    fn test_edge_cases() {
        let empty = RiskClassifier::classify("", "");
        assert_eq!(empty.risk, 2);
        assert!(!empty.advice.is_empty());
        assert!(!empty.risk_explanation.is_empty());

        // substring match: "missing" inside a longer word still counts
        assert_eq!(RiskClassifier::match_rule("dismissingly"), RiskRule::Theft);
    }
}
