//! Core data models for the support service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CUSTOMER_ID: i64 = 123;

/// Highest risk score an assessment may carry.
pub const MAX_RISK: u8 = 10;

//
// ================= Query =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportQuery {
    pub question: String,
    pub customer_name: String,
    #[serde(default = "default_customer_id")]
    pub customer_id: i64,
    #[serde(default = "default_include_pending")]
    pub include_pending: bool,
}

fn default_customer_id() -> i64 {
    DEFAULT_CUSTOMER_ID
}

fn default_include_pending() -> bool {
    true
}

impl SupportQuery {
    pub fn new(question: impl Into<String>, customer_name: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            customer_name: customer_name.into(),
            customer_id: DEFAULT_CUSTOMER_ID,
            include_pending: true,
        }
    }
}

//
// ================= Risk =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    #[serde(alias = "Routine", alias = "ROUTINE")]
    Routine,
    #[serde(alias = "Concerning", alias = "CONCERNING")]
    Concerning,
    #[serde(alias = "Urgent", alias = "URGENT")]
    Urgent,
    #[serde(alias = "Critical", alias = "CRITICAL")]
    Critical,
}

impl RiskCategory {
    /// Band a risk score. Scores above the scale saturate to `Critical`.
    pub fn from_risk(risk: u8) -> Self {
        match risk {
            0..=2 => RiskCategory::Routine,
            3..=5 => RiskCategory::Concerning,
            6..=8 => RiskCategory::Urgent,
            _ => RiskCategory::Critical,
        }
    }

    /// Inclusive score range for the band.
    pub fn band(&self) -> (u8, u8) {
        match self {
            RiskCategory::Routine => (0, 2),
            RiskCategory::Concerning => (3, 5),
            RiskCategory::Urgent => (6, 8),
            RiskCategory::Critical => (9, 10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Routine => "routine",
            RiskCategory::Concerning => "concerning",
            RiskCategory::Urgent => "urgent",
            RiskCategory::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Assessment =================
//

/// Structured answer every evaluator must produce.
///
/// The advice field goes over the wire as `support_advice`; model output may
/// use either that or `advice`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportAssessment {
    #[serde(rename = "support_advice", alias = "advice")]
    pub advice: String,
    pub block_card: bool,
    pub risk: u8,
    pub risk_explanation: String,
    pub risk_category: RiskCategory,
    #[serde(default)]
    pub risk_signals: Vec<String>,
}

//
// ================= Money =================
//

/// Fixed-point currency amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

//
// ================= Health =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub ai_enabled: bool,
    pub primary_llm: Option<String>,
    pub fallback_llm: Option<String>,
    pub timestamp: DateTime<Utc>,
}
