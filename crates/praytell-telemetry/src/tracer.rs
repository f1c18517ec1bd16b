//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use praytell_core::ObservabilityConfig;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Keeps the tracer provider alive for the life of the process
static TRACER_PROVIDER: OnceLock<TracerProvider> = OnceLock::new();

/// Initialize logging and OpenTelemetry tracing.
///
/// This sets up:
/// - A tracer provider whose spans carry the service name
/// - An `EnvFilter` from `RUST_LOG`, else `log_filter`, else `info`
/// - Human-readable or JSON log lines
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let tracer_provider = TracerProvider::builder().build();

    let service_name = config
        .service_name
        .clone()
        .unwrap_or_else(|| crate::attributes::SYSTEM_NAME.to_string());
    let tracer = tracer_provider.tracer(service_name);

    let _ = TRACER_PROVIDER.set(tracer_provider);

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_deref().unwrap_or("info")));

    let json_layer = config.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
    });
    let text_layer = (!config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(json_layer)
        .with(text_layer)
        .with(filter)
        .try_init()
}
