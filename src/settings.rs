//! Runtime settings from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use crate::routes::DEFAULT_BODY_LIMIT;

/// Where rows are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    Postgres { url: String, max_connections: u32 },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_addr: String,
    pub storage: StorageConfig,
    pub admin_tokens: Vec<String>,
    pub body_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    ///
    /// - `DATABASE_URL`: PostgreSQL URL; selects the postgres store by default.
    /// - `STORAGE`: `postgres` | `memory`, overrides the default choice.
    /// - `BIND_ADDR`: listen address, default `0.0.0.0:3000`.
    /// - `ADMIN_TOKENS`: comma-separated bearer tokens granting admin.
    /// - `DB_MAX_CONNECTIONS`: pool size, default 5.
    /// - `BODY_LIMIT_BYTES`: request body cap, default 1 MiB.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL");
        let storage = match get("STORAGE").map(|s| s.to_lowercase()).as_deref() {
            Some("memory") => StorageConfig::Memory,
            Some("postgres") | Some("pg") => postgres(database_url.ok_or(ConfigError::Missing("DATABASE_URL"))?, &get)?,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE",
                    value: other.to_string(),
                    reason: "expected postgres or memory".into(),
                })
            }
            None => match database_url {
                Some(url) => postgres(url, &get)?,
                None => StorageConfig::Memory,
            },
        };

        let admin_tokens = get("ADMIN_TOKENS")
            .map(|v| {
                v.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Settings {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            storage,
            admin_tokens,
            body_limit: parse_or("BODY_LIMIT_BYTES", get("BODY_LIMIT_BYTES"), DEFAULT_BODY_LIMIT)?,
        })
    }
}

fn postgres(url: String, get: &impl Fn(&str) -> Option<String>) -> Result<StorageConfig, ConfigError> {
    Ok(StorageConfig::Postgres {
        url,
        max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5)?,
    })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: v.clone(),
            reason: e.to_string(),
        }),
    }
}
