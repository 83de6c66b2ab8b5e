use anyhow::{Context, Result, bail};
use std::str::FromStr;

use super::config_model::{BackendServer, Database, DotEnvyConfig};

const DEFAULT_BODY_LIMIT_MB: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 4_000;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let backend_server = BackendServer {
        port: required(&lookup, "SERVER_PORT")?,
        body_limit: optional(&lookup, "SERVER_BODY_LIMIT", DEFAULT_BODY_LIMIT_MB)?,
        timeout: optional(&lookup, "SERVER_TIMEOUT", DEFAULT_TIMEOUT_SECS)?,
    };

    let database = Database {
        url: required(&lookup, "DATABASE_URL")?,
        max_connections: optional(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        query_timeout_ms: optional(&lookup, "DATABASE_QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS)?,
    };

    if database.max_connections == 0 {
        bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
    }
    if database.query_timeout_ms == 0 {
        bail!("DATABASE_QUERY_TIMEOUT_MS must be greater than 0");
    }

    Ok(DotEnvyConfig {
        backend_server,
        database,
    })
}

fn required<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{key} is missing"))?;
    raw.trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(pairs: &[(&str, &str)]) -> Result<DotEnvyConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_env_uses_defaults() {
        let config = load_with(&[
            ("SERVER_PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost:5432/subscriptions"),
        ])
        .unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.backend_server.body_limit, DEFAULT_BODY_LIMIT_MB);
        assert_eq!(config.backend_server.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.database.query_timeout().as_millis(), 4_000);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load_with(&[
            ("SERVER_PORT", "9000"),
            ("SERVER_BODY_LIMIT", "2"),
            ("SERVER_TIMEOUT", "30"),
            ("DATABASE_URL", "postgres://db/subs"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("DATABASE_QUERY_TIMEOUT_MS", " 1500 "),
        ])
        .unwrap();

        assert_eq!(config.backend_server.port, 9000);
        assert_eq!(config.backend_server.body_limit, 2);
        assert_eq!(config.backend_server.timeout, 30);
        assert_eq!(config.database.url, "postgres://db/subs");
        assert_eq!(config.database.max_connections, 25);
        assert_eq!(config.database.query_timeout_ms, 1500);
    }

    #[test]
    fn missing_required_value_names_the_variable() {
        let err = load_with(&[("SERVER_PORT", "8080")]).unwrap_err();
        assert_eq!(err.to_string(), "DATABASE_URL is missing");
    }

    #[test]
    fn unparsable_value_names_the_variable() {
        let err = load_with(&[
            ("SERVER_PORT", "eighty"),
            ("DATABASE_URL", "postgres://db/subs"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "SERVER_PORT is invalid");
    }

    #[test]
    fn zero_query_timeout_is_rejected() {
        let err = load_with(&[
            ("SERVER_PORT", "8080"),
            ("DATABASE_URL", "postgres://db/subs"),
            ("DATABASE_QUERY_TIMEOUT_MS", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_QUERY_TIMEOUT_MS"));
    }
}
