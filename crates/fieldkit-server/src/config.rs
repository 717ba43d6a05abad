//! Server configuration, read from `FIELDKIT_*` environment variables.

use std::env;

use fieldkit_db::DbConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: String,
    pub db: DbConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            db: DbConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_str("FIELDKIT_BIND_ADDR", &defaults.bind_addr),
            db: DbConfig {
                url: env_str("FIELDKIT_DB_URL", &defaults.db.url),
                namespace: env_str("FIELDKIT_DB_NAMESPACE", &defaults.db.namespace),
                database: env_str("FIELDKIT_DB_DATABASE", &defaults.db.database),
                username: env_str("FIELDKIT_DB_USERNAME", &defaults.db.username),
                password: env_str("FIELDKIT_DB_PASSWORD", &defaults.db.password),
            },
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
