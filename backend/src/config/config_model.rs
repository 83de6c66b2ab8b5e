use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_ms: u64,
}

impl Database {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
