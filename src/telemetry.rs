//! Tracing subscriber setup
//!
//! Plain logs by default. With an observability token configured, span
//! lifecycles are emitted as JSON lines tagged with the service name.

use crate::config::TelemetrySettings;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Install the global subscriber. Safe to call more than once.
pub fn init(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = if settings.enabled() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    if installed.is_ok() {
        tracing::info!(
            service = %settings.service_name,
            spans = settings.enabled(),
            "Telemetry initialized"
        );
    }
}
