//! Failover orchestrator - runs the evaluator chain
//!
//! PRIMARY LLM → SECONDARY LLM → KEYWORD FALLBACK → DONE
//!
//! Attempts are strictly sequential and each provider is tried at most once
//! per request. The keyword fallback cannot fail, so `assess` always returns
//! a usable assessment.

use crate::accounts::AccountLookup;
use crate::config::{AppConfig, ProviderConfig};
use crate::contract::{create_default_verifier, ContractVerifier};
use crate::error::SupportError;
use crate::evaluator::{build_evaluator, Evaluator, KeywordEvaluator};
use crate::models::{SupportAssessment, SupportQuery};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A failed evaluator attempt, kept for logging and the response envelope
#[derive(Debug)]
pub struct AttemptFailure {
    pub evaluator: String,
    pub error: SupportError,
}

/// Outcome of one request through the chain
#[derive(Debug)]
pub struct Assessment {
    pub assessment: SupportAssessment,
    pub served_by: String,
    pub failures: Vec<AttemptFailure>,
    pub elapsed_ms: u64,
}

impl Assessment {
    pub fn used_fallback(&self) -> bool {
        self.served_by == KeywordEvaluator::NAME
    }
}

/// What the chain looks like, for `/health`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChainInfo {
    pub ai_enabled: bool,
    pub primary_llm: Option<String>,
    pub fallback_llm: Option<String>,
}

pub struct Orchestrator {
    primary: Option<Arc<dyn Evaluator>>,
    secondary: Option<Arc<dyn Evaluator>>,
    fallback: KeywordEvaluator,
    verifier: ContractVerifier,
    accounts: Arc<dyn AccountLookup>,
    attempt_timeout: Duration,
}

impl Orchestrator {
    /// Primary then secondary are tried before the keyword fallback. Either
    /// slot may be empty.
    pub fn new(
        primary: Option<Arc<dyn Evaluator>>,
        secondary: Option<Arc<dyn Evaluator>>,
        verifier: ContractVerifier,
        accounts: Arc<dyn AccountLookup>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback: KeywordEvaluator,
            verifier,
            accounts,
            attempt_timeout,
        }
    }

    /// Chain with the keyword fallback only
    pub fn fallback_only(accounts: Arc<dyn AccountLookup>) -> Self {
        Self::new(
            None,
            None,
            ContractVerifier::default(),
            accounts,
            Duration::from_secs(crate::config::DEFAULT_LLM_TIMEOUT_SECS),
        )
    }

    /// Primary then secondary, whichever have credentials
    pub fn from_config(config: &AppConfig, accounts: Arc<dyn AccountLookup>) -> Result<Self> {
        let build = |provider: &Option<ProviderConfig>, role: &str| -> Result<Option<Arc<dyn Evaluator>>> {
            provider
                .as_ref()
                .map(|provider| -> Result<Arc<dyn Evaluator>> {
                    let evaluator = build_evaluator(provider, config.llm_timeout)?;
                    info!(evaluator = evaluator.name(), role, "Evaluator configured");
                    Ok(evaluator)
                })
                .transpose()
        };

        let primary = build(&config.primary, "primary")?;
        let secondary = build(&config.secondary, "secondary")?;

        if primary.is_none() && secondary.is_none() {
            warn!("No LLM credentials configured, serving keyword assessments only");
        }

        Ok(Self::new(
            primary,
            secondary,
            create_default_verifier(config.contract_mode),
            accounts,
            config.llm_timeout,
        ))
    }

    /// Configured evaluators, each reported under its own role
    pub fn describe(&self) -> ChainInfo {
        let label = |slot: &Option<Arc<dyn Evaluator>>| slot.as_ref().map(|e| e.name().to_string());

        ChainInfo {
            ai_enabled: self.primary.is_some() || self.secondary.is_some(),
            primary_llm: label(&self.primary),
            fallback_llm: label(&self.secondary),
        }
    }

    fn evaluators(&self) -> impl Iterator<Item = &Arc<dyn Evaluator>> {
        self.primary.iter().chain(self.secondary.iter())
    }

    /// Run the chain for one query. Never fails.
    #[tracing::instrument(
        name = "assess",
        skip_all,
        fields(request_id = %uuid::Uuid::new_v4(), customer_id = query.customer_id)
    )]
    pub async fn assess(&self, query: &SupportQuery) -> Assessment {
        let started = Instant::now();
        let mut failures = Vec::new();

        for (attempt, evaluator) in self.evaluators().enumerate() {
            let attempt_started = Instant::now();

            match self.attempt(evaluator.as_ref(), query).await {
                Ok(assessment) => {
                    info!(
                        evaluator = evaluator.name(),
                        attempt = attempt + 1,
                        risk = assessment.risk,
                        elapsed_ms = attempt_started.elapsed().as_millis() as u64,
                        "Assessment produced"
                    );
                    return Assessment {
                        assessment,
                        served_by: evaluator.name().to_string(),
                        failures,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    };
                }
                Err(error) => {
                    warn!(
                        evaluator = evaluator.name(),
                        attempt = attempt + 1,
                        elapsed_ms = attempt_started.elapsed().as_millis() as u64,
                        "Evaluator failed, moving on: {}",
                        error
                    );
                    failures.push(AttemptFailure {
                        evaluator: evaluator.name().to_string(),
                        error,
                    });
                }
            }
        }

        let assessment = self.fallback.assess(query);
        info!(
            evaluator = KeywordEvaluator::NAME,
            failed_attempts = failures.len(),
            risk = assessment.risk,
            "Assessment produced by keyword fallback"
        );

        Assessment {
            assessment,
            served_by: KeywordEvaluator::NAME.to_string(),
            failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// One bounded evaluator call followed by the contract check
    async fn attempt(
        &self,
        evaluator: &dyn Evaluator,
        query: &SupportQuery,
    ) -> Result<SupportAssessment> {
        let assessment = tokio::time::timeout(
            self.attempt_timeout,
            evaluator.evaluate(query, self.accounts.as_ref()),
        )
        .await
        .map_err(|_| SupportError::Timeout(self.attempt_timeout))??;

        self.verifier.enforce(assessment)
    }
}
