use bank_support_agent::{
    accounts::DemoAccounts,
    agent::Orchestrator,
    config::AppConfig,
    evals::{find_scenario, run_scenarios, EvalReport, EvalTarget, LocalTarget, RemoteTarget, SCENARIOS},
    telemetry,
};
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: evals [--url <base_url>] [--scenario <name>]... [--json] [--list]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    telemetry::init(&config.telemetry);

    let mut url = None;
    let mut selected = Vec::new();
    let mut json = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--url" => url = Some(args.next().ok_or(USAGE)?),
            "--scenario" => {
                let name = args.next().ok_or(USAGE)?;
                let scenario =
                    find_scenario(&name).ok_or_else(|| format!("unknown scenario '{}'", name))?;
                selected.push(*scenario);
            }
            "--json" => json = true,
            "--list" => {
                for scenario in SCENARIOS {
                    println!("{:<26} {}", scenario.name, scenario.question);
                }
                return Ok(());
            }
            _ => return Err(USAGE.into()),
        }
    }

    let scenarios = if selected.is_empty() {
        SCENARIOS.to_vec()
    } else {
        selected
    };

    let target: Box<dyn EvalTarget> = match url {
        Some(url) => Box::new(RemoteTarget::new(&url, config.llm_timeout)?),
        None => Box::new(LocalTarget::new(Arc::new(Orchestrator::from_config(
            &config,
            Arc::new(DemoAccounts::new()),
        )?))),
    };

    info!(eval_target = %target.describe(), cases = scenarios.len(), "Running evaluation");
    let report = run_scenarios(target.as_ref(), &scenarios).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.passed() < report.total() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &EvalReport) {
    println!("\n=== EVALUATION: {} ===", report.target);

    for case in &report.cases {
        let mark = if case.passed() { "PASS" } else { "FAIL" };
        println!("\n[{}] {}", mark, case.scenario);

        if let Some(error) = &case.error {
            println!("    error: {}", error);
            continue;
        }
        if let Some(served_by) = &case.served_by {
            println!("    served by: {}", served_by);
        }
        for check in &case.checks {
            let mark = if check.passed { "ok" } else { "x " };
            println!("    {} {:<14} {}", mark, check.check, check.detail);
        }
    }

    println!(
        "\n{}/{} scenarios passed, {:.0}% of checks",
        report.passed(),
        report.total(),
        report.check_pass_rate() * 100.0
    );
}
