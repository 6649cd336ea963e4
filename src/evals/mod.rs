//! Scenario evaluation for the support chain
//!
//! A fixed table of customer questions with the outcome the risk policy
//! expects, a deterministic scorer, and two targets to run it against: the
//! in-process chain or a deployed `/support` endpoint.

use crate::agent::Orchestrator;
use crate::api::SERVED_BY_HEADER;
use crate::error::SupportError;
use crate::models::{RiskCategory, SupportAssessment, SupportQuery};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One question and the policy outcome expected for it
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub question: &'static str,
    pub customer_name: &'static str,
    pub block_card: bool,
    /// Inclusive
    pub risk_range: (u8, u8),
    pub category: RiskCategory,
    pub signals: &'static [&'static str],
}

impl Scenario {
    pub fn query(&self) -> SupportQuery {
        SupportQuery::new(self.question, self.customer_name)
    }
}

pub const SCENARIOS: &[Scenario] = &[
    // Card must be blocked
    Scenario {
        name: "lost_card",
        question: "I lost my credit card",
        customer_name: "John Doe",
        block_card: true,
        risk_range: (8, 10),
        category: RiskCategory::Critical,
        signals: &["lost"],
    },
    Scenario {
        name: "stolen_card",
        question: "My card was stolen from my wallet",
        customer_name: "Jane Smith",
        block_card: true,
        risk_range: (9, 10),
        category: RiskCategory::Critical,
        signals: &["stolen"],
    },
    Scenario {
        name: "unauthorized_transactions",
        question: "I see charges on my account that I didn't make",
        customer_name: "Bob Wilson",
        block_card: true,
        risk_range: (7, 9),
        category: RiskCategory::Urgent,
        signals: &["unauthorized", "charges"],
    },
    Scenario {
        name: "fraud_suspicion",
        question: "I think someone is using my card fraudulently",
        customer_name: "Alice Brown",
        block_card: true,
        risk_range: (8, 10),
        category: RiskCategory::Critical,
        signals: &["fraud", "fraudulently"],
    },
    // Routine
    Scenario {
        name: "balance_inquiry",
        question: "What is my current account balance?",
        customer_name: "Mary Johnson",
        block_card: false,
        risk_range: (0, 2),
        category: RiskCategory::Routine,
        signals: &[],
    },
    Scenario {
        name: "transaction_history",
        question: "Can you show me my recent transactions?",
        customer_name: "David Lee",
        block_card: false,
        risk_range: (0, 2),
        category: RiskCategory::Routine,
        signals: &[],
    },
    Scenario {
        name: "account_info",
        question: "I need to update my contact information",
        customer_name: "Sarah Davis",
        block_card: false,
        risk_range: (0, 3),
        category: RiskCategory::Routine,
        signals: &[],
    },
    // Concerning, card stays active
    Scenario {
        name: "forgotten_transaction",
        question: "I don't remember making this purchase, but it might be mine",
        customer_name: "Mike Chen",
        block_card: false,
        risk_range: (3, 6),
        category: RiskCategory::Concerning,
        signals: &["don't remember"],
    },
    Scenario {
        name: "suspicious_activity",
        question: "I noticed some unusual activity on my account but I'm not sure",
        customer_name: "Lisa Rodriguez",
        block_card: false,
        risk_range: (4, 7),
        category: RiskCategory::Concerning,
        signals: &["unusual", "suspicious"],
    },
];

pub fn find_scenario(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

//
// ========== Scoring ==========
//

/// Checks `score` produces per answered case
pub const CHECKS_PER_CASE: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub check: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    fn new(check: &'static str, passed: bool, detail: String) -> Self {
        Self {
            check,
            passed,
            detail,
        }
    }
}

/// Models phrase signals freely, so either side containing the other counts
fn signal_matches(expected: &str, actual: &str) -> bool {
    let expected = expected.to_lowercase();
    let actual = actual.to_lowercase();
    !actual.is_empty() && (actual.contains(&expected) || expected.contains(&actual))
}

/// Score an assessment against a scenario
pub fn score(scenario: &Scenario, assessment: &SupportAssessment) -> Vec<CheckOutcome> {
    let (low, high) = scenario.risk_range;

    let missing: Vec<&str> = scenario
        .signals
        .iter()
        .copied()
        .filter(|expected| {
            !assessment
                .risk_signals
                .iter()
                .any(|actual| signal_matches(expected, actual))
        })
        .collect();

    vec![
        CheckOutcome::new(
            "block_card",
            assessment.block_card == scenario.block_card,
            format!("expected {}, got {}", scenario.block_card, assessment.block_card),
        ),
        CheckOutcome::new(
            "risk_in_range",
            (low..=high).contains(&assessment.risk),
            format!("expected {}-{}, got {}", low, high, assessment.risk),
        ),
        CheckOutcome::new(
            "category",
            assessment.risk_category == scenario.category,
            format!("expected {}, got {}", scenario.category, assessment.risk_category),
        ),
        CheckOutcome::new(
            "signals",
            missing.is_empty(),
            if missing.is_empty() {
                format!("got {:?}", assessment.risk_signals)
            } else {
                format!("missing {:?} in {:?}", missing, assessment.risk_signals)
            },
        ),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub scenario: &'static str,
    pub served_by: Option<String>,
    pub assessment: Option<SupportAssessment>,
    pub error: Option<String>,
    pub checks: Vec<CheckOutcome>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.check)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub target: String,
    pub cases: Vec<CaseReport>,
}

impl EvalReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn total(&self) -> usize {
        self.cases.len()
    }

    /// Share of individual checks passed, errored cases counting as all failed
    pub fn check_pass_rate(&self) -> f64 {
        let (passed, total) = self.cases.iter().fold((0usize, 0usize), |(p, t), case| {
            if case.error.is_some() {
                (p, t + CHECKS_PER_CASE)
            } else {
                (p + case.checks.iter().filter(|c| c.passed).count(), t + case.checks.len())
            }
        });
        if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64
        }
    }
}

//
// ========== Targets ==========
//

/// Something that answers support queries
#[async_trait]
pub trait EvalTarget: Send + Sync {
    fn describe(&self) -> String;

    /// The assessment and the name of whatever produced it
    async fn run(&self, query: &SupportQuery) -> Result<(SupportAssessment, String)>;
}

/// The chain running in this process
pub struct LocalTarget {
    orchestrator: Arc<Orchestrator>,
}

impl LocalTarget {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl EvalTarget for LocalTarget {
    fn describe(&self) -> String {
        let chain = self.orchestrator.describe();
        format!(
            "local (primary={}, fallback={})",
            chain.primary_llm.as_deref().unwrap_or("none"),
            chain.fallback_llm.as_deref().unwrap_or("none")
        )
    }

    async fn run(&self, query: &SupportQuery) -> Result<(SupportAssessment, String)> {
        let outcome = self.orchestrator.assess(query).await;
        Ok((outcome.assessment, outcome.served_by))
    }
}

/// A deployed service, reached over `POST /support`
pub struct RemoteTarget {
    client: Client,
    base_url: String,
}

impl RemoteTarget {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EvalTarget for RemoteTarget {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn run(&self, query: &SupportQuery) -> Result<(SupportAssessment, String)> {
        let url = format!("{}/support", self.base_url);
        let response = self.client.post(&url).json(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SupportError::ProviderStatus {
                status: status.as_u16(),
                body,
            });
        }

        let served_by = response
            .headers()
            .get(SERVED_BY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("remote")
            .to_string();

        let assessment = response
            .json::<SupportAssessment>()
            .await
            .map_err(|e| SupportError::MalformedOutput(format!("support response: {}", e)))?;

        Ok((assessment, served_by))
    }
}

/// Run scenarios one after another and score each answer
pub async fn run_scenarios(target: &dyn EvalTarget, scenarios: &[Scenario]) -> EvalReport {
    let mut cases = Vec::with_capacity(scenarios.len());

    for scenario in scenarios {
        let case = match target.run(&scenario.query()).await {
            Ok((assessment, served_by)) => CaseReport {
                scenario: scenario.name,
                served_by: Some(served_by),
                checks: score(scenario, &assessment),
                assessment: Some(assessment),
                error: None,
            },
            Err(e) => {
                warn!(scenario = scenario.name, "Scenario errored: {}", e);
                CaseReport {
                    scenario: scenario.name,
                    served_by: None,
                    assessment: None,
                    error: Some(e.to_string()),
                    checks: Vec::new(),
                }
            }
        };

        info!(
            scenario = case.scenario,
            passed = case.passed(),
            served_by = ?case.served_by,
            "Scenario scored"
        );
        cases.push(case);
    }

    EvalReport {
        target: target.describe(),
        cases,
    }
}
