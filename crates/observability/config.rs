use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) log_format: LogFormat,
    /// Collected while parsing and logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(component: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let component = component.trim().to_string();
        let mut warnings = Vec::new();

        let service_name = lookup("SERVICE_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = lookup("STAGE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let log_format = match lookup("LOG_FORMAT") {
            None => LogFormat::Pretty,
            Some(raw) => parse_log_format(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "LOG_FORMAT is invalid (value: {raw}); defaulting to pretty"
                ));
                LogFormat::Pretty
            }),
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            log_format,
            warnings,
        }
    }
}

fn parse_log_format(input: &str) -> Option<LogFormat> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "pretty" | "text" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}
