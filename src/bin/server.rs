use bank_support_agent::{
    accounts::DemoAccounts, agent::Orchestrator, api::start_server, config::AppConfig, telemetry,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (.env included)
    let config = AppConfig::from_env()?;

    // Initialize tracing
    telemetry::init(&config.telemetry);

    info!("Bank Support API Server");
    info!("Port: {}", config.port);
    info!("LLM timeout: {:?}", config.llm_timeout);
    info!("Contract mode: {:?}", config.contract_mode);

    // Create orchestrator
    let orchestrator = Arc::new(Orchestrator::from_config(
        &config,
        Arc::new(DemoAccounts::new()),
    )?);

    let chain = orchestrator.describe();
    info!(
        ai_enabled = chain.ai_enabled,
        primary = ?chain.primary_llm,
        fallback = ?chain.fallback_llm,
        "Orchestrator initialized"
    );

    // Start API server
    start_server(orchestrator, config.port, &config.cors_origins).await?;

    Ok(())
}
