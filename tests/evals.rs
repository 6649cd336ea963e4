//! Scenario evaluation against a served router and a failing deployment

use bank_support_agent::accounts::DemoAccounts;
use bank_support_agent::agent::Orchestrator;
use bank_support_agent::api::create_router;
use bank_support_agent::evals::{
    find_scenario, run_scenarios, LocalTarget, RemoteTarget, SCENARIOS,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn keyword_chain() -> Arc<Orchestrator> {
    Arc::new(Orchestrator::fallback_only(Arc::new(DemoAccounts::new())))
}

async fn serve_keyword_chain() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(keyword_chain(), &[]);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_remote_run_matches_local_run() {
    let base_url = serve_keyword_chain().await;
    let remote = RemoteTarget::new(&base_url, Duration::from_secs(5)).unwrap();
    let local = LocalTarget::new(keyword_chain());

    let remote_report = run_scenarios(&remote, SCENARIOS).await;
    let local_report = run_scenarios(&local, SCENARIOS).await;

    assert_eq!(remote_report.target, base_url.trim_end_matches('/'));
    assert_eq!(remote_report.total(), SCENARIOS.len());
    assert_eq!(remote_report.passed(), local_report.passed());

    for (remote_case, local_case) in remote_report.cases.iter().zip(&local_report.cases) {
        assert_eq!(remote_case.scenario, local_case.scenario);
        assert!(remote_case.error.is_none(), "{:?}", remote_case.error);
        assert_eq!(remote_case.served_by.as_deref(), Some("keyword-fallback"));
        assert_eq!(remote_case.assessment, local_case.assessment);
        assert_eq!(remote_case.failed_checks(), local_case.failed_checks());
    }
}

#[tokio::test]
async fn test_failing_deployment_is_reported_per_case() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/support"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(2)
        .mount(&server)
        .await;

    let remote = RemoteTarget::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let scenarios = [
        *find_scenario("lost_card").unwrap(),
        *find_scenario("balance_inquiry").unwrap(),
    ];
    let report = run_scenarios(&remote, &scenarios).await;

    assert_eq!(report.passed(), 0);
    assert_eq!(report.check_pass_rate(), 0.0);
    for case in &report.cases {
        assert!(!case.passed());
        assert!(case.error.as_deref().unwrap().contains("502"));
        assert!(case.assessment.is_none());
    }
}
