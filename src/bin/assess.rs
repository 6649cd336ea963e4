use bank_support_agent::{
    accounts::DemoAccounts, agent::Orchestrator, config::AppConfig, models::SupportQuery,
    telemetry, DEFAULT_CUSTOMER_ID,
};
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: assess \"<question>\" [customer_name] [customer_id]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    telemetry::init(&config.telemetry);

    let mut args = std::env::args().skip(1);
    let question = args.next().ok_or(USAGE)?;
    let customer_name = args.next().unwrap_or_else(|| "John".to_string());
    let customer_id = match args.next() {
        Some(raw) => raw.parse::<i64>()?,
        None => DEFAULT_CUSTOMER_ID,
    };

    let query = SupportQuery {
        question,
        customer_name,
        customer_id,
        include_pending: true,
    };

    let orchestrator = Orchestrator::from_config(&config, Arc::new(DemoAccounts::new()))?;

    info!(question = %query.question, "Running assessment");
    let outcome = orchestrator.assess(&query).await;

    for failure in &outcome.failures {
        eprintln!("{} failed: {}", failure.evaluator, failure.error);
    }

    println!("\n=== ASSESSMENT ({}, {} ms) ===", outcome.served_by, outcome.elapsed_ms);
    println!("{}", serde_json::to_string_pretty(&outcome.assessment)?);

    Ok(())
}
