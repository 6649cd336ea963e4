//! Bank Support Agent
//!
//! A support service that:
//! - Accepts a customer question over HTTP
//! - Asks an LLM for a structured risk assessment (balance tool available)
//! - Falls back to a second LLM, then to deterministic keyword rules
//! - Always answers with the same assessment contract
//!
//! CHAIN:
//! QUERY → PRIMARY LLM → SECONDARY LLM → KEYWORD RULES → CONTRACT → RESPONSE

pub mod accounts;
pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod contract;
pub mod error;
pub mod evals;
pub mod evaluator;
pub mod models;
pub mod telemetry;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::{RiskClassifier, RiskRule};
