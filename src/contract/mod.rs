//! Output contract checks for model-produced assessments
//!
//! Rules-based verification before an assessment leaves an evaluator.
//! Deterministic enforcement.

use crate::error::SupportError;
use crate::models::{RiskCategory, SupportAssessment, MAX_RISK};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, warn};

/// How strictly model output is held to the risk policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractMode {
    /// Only schema violations reject; the rest is taken as the model gave it
    Trust,
    /// Schema violations reject; the category is recomputed from the score
    #[default]
    Repair,
    /// Any failed check other than an advisory one rejects
    Strict,
}

impl FromStr for ContractMode {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trust" => Ok(ContractMode::Trust),
            "repair" => Ok(ContractMode::Repair),
            "strict" => Ok(ContractMode::Strict),
            other => Err(SupportError::ConfigError(format!(
                "unknown contract mode '{}' (expected trust, repair or strict)",
                other
            ))),
        }
    }
}

/// What a failed check means
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Advisory,
    Repairable,
    Violation,
}

/// Trait for contract rules
pub trait ContractRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Severity if this rule fails
    fn severity(&self) -> Severity;

    fn check(&self, assessment: &SupportAssessment) -> CheckResult;
}

pub struct CheckResult {
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone)]
pub struct ContractFinding {
    pub rule_name: &'static str,
    pub severity: Severity,
    pub details: String,
}

/// Verifier that enforces the output contract
pub struct ContractVerifier {
    rules: Vec<Box<dyn ContractRule>>,
    mode: ContractMode,
}

impl ContractVerifier {
    pub fn new(mode: ContractMode) -> Self {
        Self {
            rules: Vec::new(),
            mode,
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ContractRule>) {
        self.rules.push(rule);
    }

    /// Run every rule and collect the failures
    pub fn findings(&self, assessment: &SupportAssessment) -> Vec<ContractFinding> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let result = rule.check(assessment);
                (!result.passed).then(|| ContractFinding {
                    rule_name: rule.name(),
                    severity: rule.severity(),
                    details: result.details,
                })
            })
            .collect()
    }

    /// Accept, repair or reject an assessment according to the mode
    pub fn enforce(&self, mut assessment: SupportAssessment) -> Result<SupportAssessment> {
        let findings = self.findings(&assessment);

        let rejecting: Vec<String> = findings
            .iter()
            .filter(|f| match self.mode {
                ContractMode::Strict => f.severity >= Severity::Repairable,
                _ => f.severity == Severity::Violation,
            })
            .map(|f| format!("{}: {}", f.rule_name, f.details))
            .collect();

        if !rejecting.is_empty() {
            return Err(SupportError::ContractViolation(rejecting.join("; ")));
        }

        for finding in &findings {
            warn!(
                rule = finding.rule_name,
                severity = ?finding.severity,
                "Contract check failed: {}",
                finding.details
            );
        }

        if self.mode == ContractMode::Repair {
            let banded = RiskCategory::from_risk(assessment.risk);
            if assessment.risk_category != banded {
                info!(
                    risk = assessment.risk,
                    from = %assessment.risk_category,
                    to = %banded,
                    "Repaired risk category"
                );
                assessment.risk_category = banded;
            }
        }

        Ok(assessment)
    }
}

impl Default for ContractVerifier {
    fn default() -> Self {
        create_default_verifier(ContractMode::default())
    }
}

//
// ========== Contract Rules ==========
//

/// Rule: risk is on the 0–10 scale
pub struct RiskInRangeRule;

impl ContractRule for RiskInRangeRule {
    fn name(&self) -> &'static str {
        "risk_in_range"
    }

    fn severity(&self) -> Severity {
        Severity::Violation
    }

    fn check(&self, assessment: &SupportAssessment) -> CheckResult {
        CheckResult {
            passed: assessment.risk <= MAX_RISK,
            details: format!("risk {} (allowed 0-{})", assessment.risk, MAX_RISK),
        }
    }
}

/// Rule: advice is not blank
pub struct AdvicePresentRule;

impl ContractRule for AdvicePresentRule {
    fn name(&self) -> &'static str {
        "advice_present"
    }

    fn severity(&self) -> Severity {
        Severity::Violation
    }

    fn check(&self, assessment: &SupportAssessment) -> CheckResult {
        CheckResult {
            passed: !assessment.advice.trim().is_empty(),
            details: "advice is empty".to_string(),
        }
    }
}

/// Rule: risk explanation is not blank
pub struct ExplanationPresentRule;

impl ContractRule for ExplanationPresentRule {
    fn name(&self) -> &'static str {
        "explanation_present"
    }

    fn severity(&self) -> Severity {
        Severity::Violation
    }

    fn check(&self, assessment: &SupportAssessment) -> CheckResult {
        CheckResult {
            passed: !assessment.risk_explanation.trim().is_empty(),
            details: "risk_explanation is empty".to_string(),
        }
    }
}

/// Rule: category agrees with the score band
pub struct CategoryMatchesBandRule;

impl ContractRule for CategoryMatchesBandRule {
    fn name(&self) -> &'static str {
        "category_matches_band"
    }

    fn severity(&self) -> Severity {
        Severity::Repairable
    }

    fn check(&self, assessment: &SupportAssessment) -> CheckResult {
        let expected = RiskCategory::from_risk(assessment.risk);
        CheckResult {
            passed: assessment.risk_category == expected,
            details: format!(
                "risk {} is {} but category is {}",
                assessment.risk, expected, assessment.risk_category
            ),
        }
    }
}

const THREAT_MARKERS: &[&str] = &["lost", "stolen", "theft", "fraud", "suspicious", "unauthorized"];

/// Rule: theft or fraud signals come with a blocked card
pub struct BlockCardOnThreatRule;

impl ContractRule for BlockCardOnThreatRule {
    fn name(&self) -> &'static str {
        "block_card_on_threat"
    }

    fn severity(&self) -> Severity {
        Severity::Advisory
    }

    fn check(&self, assessment: &SupportAssessment) -> CheckResult {
        let threat = assessment.risk_signals.iter().find(|signal| {
            let signal = signal.to_lowercase();
            THREAT_MARKERS.iter().any(|m| signal.contains(m))
        });

        CheckResult {
            passed: assessment.block_card || threat.is_none(),
            details: format!(
                "signal '{}' present but card not blocked",
                threat.map(String::as_str).unwrap_or_default()
            ),
        }
    }
}

/// Verifier with every contract rule, in order
pub fn create_default_verifier(mode: ContractMode) -> ContractVerifier {
    let mut verifier = ContractVerifier::new(mode);
    verifier.add_rule(Box::new(RiskInRangeRule));
    verifier.add_rule(Box::new(AdvicePresentRule));
    verifier.add_rule(Box::new(ExplanationPresentRule));
    verifier.add_rule(Box::new(CategoryMatchesBandRule));
    verifier.add_rule(Box::new(BlockCardOnThreatRule));
    verifier
}
