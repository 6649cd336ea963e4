//! Integration tests for the evaluator failover chain

use async_trait::async_trait;
use bank_support_agent::accounts::{AccountLookup, DemoAccounts};
use bank_support_agent::agent::Orchestrator;
use bank_support_agent::contract::{create_default_verifier, ContractMode};
use bank_support_agent::error::SupportError;
use bank_support_agent::evaluator::Evaluator;
use bank_support_agent::{Result, RiskCategory, SupportAssessment, SupportQuery};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Behaviour {
    Answer(SupportAssessment),
    Fail,
    Hang,
}

struct ScriptedEvaluator {
    name: &'static str,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    fn name(&self) -> &str {
        self.name
    }

    async fn evaluate(
        &self,
        _query: &SupportQuery,
        _accounts: &dyn AccountLookup,
    ) -> Result<SupportAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Answer(assessment) => Ok(assessment.clone()),
            Behaviour::Fail => Err(SupportError::ProviderStatus {
                status: 503,
                body: "overloaded".to_string(),
            }),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(SupportError::ProviderError("unreachable".to_string()))
            }
        }
    }
}

fn model_answer(risk: u8, category: RiskCategory) -> SupportAssessment {
    SupportAssessment {
        advice: "Hello John, we are looking into it.".to_string(),
        block_card: risk >= 6,
        risk,
        risk_explanation: "Model judgement.".to_string(),
        risk_category: category,
        risk_signals: vec!["model".to_string()],
    }
}

fn orchestrator(
    primary: Option<Arc<ScriptedEvaluator>>,
    secondary: Option<Arc<ScriptedEvaluator>>,
    mode: ContractMode,
) -> Orchestrator {
    Orchestrator::new(
        primary.map(|e| e as Arc<dyn Evaluator>),
        secondary.map(|e| e as Arc<dyn Evaluator>),
        create_default_verifier(mode),
        Arc::new(DemoAccounts::new()),
        Duration::from_millis(100),
    )
}

fn lost_card() -> SupportQuery {
    SupportQuery::new("I lost my credit card", "John")
}

#[tokio::test]
async fn test_primary_success_skips_the_rest() {
    let primary = ScriptedEvaluator::new("primary", Behaviour::Answer(model_answer(7, RiskCategory::Urgent)));
    let secondary = ScriptedEvaluator::new("secondary", Behaviour::Fail);

    let chain = orchestrator(Some(primary.clone()), Some(secondary.clone()), ContractMode::Repair);
    let outcome = chain.assess(&lost_card()).await;

    assert_eq!(outcome.served_by, "primary");
    assert_eq!(outcome.assessment.risk, 7);
    assert!(outcome.failures.is_empty());
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);
}

#[tokio::test]
async fn test_timeout_falls_through_to_secondary() {
    let primary = ScriptedEvaluator::new("primary", Behaviour::Hang);
    let secondary = ScriptedEvaluator::new("secondary", Behaviour::Answer(model_answer(9, RiskCategory::Critical)));

    let chain = orchestrator(Some(primary.clone()), Some(secondary.clone()), ContractMode::Repair);
    let outcome = chain.assess(&lost_card()).await;

    assert_eq!(outcome.served_by, "secondary");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].evaluator, "primary");
    assert!(matches!(outcome.failures[0].error, SupportError::Timeout(_)));
    assert_eq!(secondary.calls(), 1);
}

#[tokio::test]
async fn test_both_providers_fail_then_keyword_rules() {
    let primary = ScriptedEvaluator::new("primary", Behaviour::Hang);
    let secondary = ScriptedEvaluator::new("secondary", Behaviour::Fail);

    let chain = orchestrator(Some(primary.clone()), Some(secondary.clone()), ContractMode::Repair);
    let outcome = chain.assess(&lost_card()).await;

    assert!(outcome.used_fallback());
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
    assert_eq!(outcome.assessment.risk, 9);
    assert!(outcome.assessment.block_card);
    assert_eq!(outcome.assessment.risk_category, RiskCategory::Critical);
}

#[tokio::test]
async fn test_contract_violation_moves_on() {
    let primary = ScriptedEvaluator::new("primary", Behaviour::Answer(model_answer(12, RiskCategory::Critical)));
    let secondary = ScriptedEvaluator::new("secondary", Behaviour::Answer(model_answer(1, RiskCategory::Routine)));

    let chain = orchestrator(Some(primary), Some(secondary), ContractMode::Trust);
    let outcome = chain.assess(&SupportQuery::new("What is my balance?", "Alice")).await;

    assert_eq!(outcome.served_by, "secondary");
    assert!(matches!(
        outcome.failures[0].error,
        SupportError::ContractViolation(_)
    ));
}

#[tokio::test]
async fn test_category_repaired_or_rejected_by_mode() {
    let mismatched = || model_answer(9, RiskCategory::Concerning);

    let repair = orchestrator(
        Some(ScriptedEvaluator::new("primary", Behaviour::Answer(mismatched()))),
        None,
        ContractMode::Repair,
    );
    let outcome = repair.assess(&lost_card()).await;
    assert_eq!(outcome.served_by, "primary");
    assert_eq!(outcome.assessment.risk_category, RiskCategory::Critical);

    let strict = orchestrator(
        Some(ScriptedEvaluator::new("primary", Behaviour::Answer(mismatched()))),
        None,
        ContractMode::Strict,
    );
    let outcome = strict.assess(&lost_card()).await;
    assert!(outcome.used_fallback());
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let secondary = ScriptedEvaluator::new("secondary", Behaviour::Fail);
    let chain = Arc::new(orchestrator(None, Some(secondary.clone()), ContractMode::Repair));

    let questions = ["I lost my card", "fraud alert", "balance please", "hello"];
    let mut handles = Vec::new();
    for question in questions {
        let chain = chain.clone();
        handles.push(tokio::spawn(async move {
            chain.assess(&SupportQuery::new(question, "Sam")).await
        }));
    }

    let mut risks = Vec::new();
    for handle in handles {
        risks.push(handle.await.unwrap().assessment.risk);
    }

    assert_eq!(risks, vec![9, 8, 1, 2]);
    assert_eq!(secondary.calls(), questions.len());
}

#[tokio::test]
async fn test_secondary_alone_serves_under_its_role() {
    let secondary = ScriptedEvaluator::new(
        "secondary",
        Behaviour::Answer(model_answer(1, RiskCategory::Routine)),
    );
    let chain = orchestrator(None, Some(secondary.clone()), ContractMode::Repair);

    let outcome = chain.assess(&SupportQuery::new("What is my balance?", "Alice")).await;
    assert_eq!(outcome.served_by, "secondary");
    assert_eq!(secondary.calls(), 1);

    let info = chain.describe();
    assert!(info.ai_enabled);
    assert_eq!(info.primary_llm, None);
    assert_eq!(info.fallback_llm.as_deref(), Some("secondary"));
}
