mod config;

use anyhow::Result;
use config::{LogFormat, ObservabilityConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global tracing subscriber for `component`.
///
/// Verbosity follows `RUST_LOG` and defaults to `info`.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ` is reflected in the offset.
    let (pretty_layer, json_layer) = match config.log_format {
        LogFormat::Pretty => (
            Some(tracing_subscriber::fmt::layer().with_timer(ChronoLocal::rfc_3339())),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_timer(ChronoLocal::rfc_3339()),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(pretty_layer)
        .with(json_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    info!(
        service = %config.service_context.service_name,
        environment = %config.service_context.environment,
        component = %config.service_context.component,
        "Tracing initialised"
    );

    Ok(())
}
