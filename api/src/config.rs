use std::time::Duration;

use oilwatch_core::entity::DEFAULT_HISTORY_WINDOW;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryBackend {
    Memory,
    Postgres,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Server configuration loaded from environment variables.
///
/// | Env Var                  | Default   |
/// |--------------------------|-----------|
/// | `HOST`                   | `0.0.0.0` |
/// | `PORT`                   | `3000`    |
/// | `HISTORY_BACKEND`        | `memory`  |
/// | `DATABASE_URL`           | required for `postgres` |
/// | `REASONING_URL`          | unset (fallback only) |
/// | `REASONING_API_KEY`      | unset     |
/// | `REASONING_TIMEOUT_SECS` | `10`      |
/// | `ESTIMATOR_COMMAND`      | required  |
/// | `ESTIMATOR_TIMEOUT_SECS` | `30`      |
/// | `HISTORY_WINDOW`         | `60`      |
/// | `SEED_SNAPSHOT`          | unset     |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: HistoryBackend,
    pub database_url: Option<String>,
    pub reasoning_url: Option<String>,
    pub reasoning_api_key: Option<String>,
    pub reasoning_timeout: Duration,
    /// Program and arguments, whitespace separated
    pub estimator_command: Vec<String>,
    pub estimator_timeout: Duration,
    pub history_window: usize,
    pub seed_snapshot: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match var("HISTORY_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("memory") => HistoryBackend::Memory,
            Some("postgres") => HistoryBackend::Postgres,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "HISTORY_BACKEND",
                    value: other.to_string(),
                    reason: "expected 'memory' or 'postgres'",
                });
            }
        };

        let database_url = var("DATABASE_URL");
        if backend == HistoryBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let estimator_command: Vec<String> = var("ESTIMATOR_COMMAND")
            .ok_or(ConfigError::Missing("ESTIMATOR_COMMAND"))?
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let history_window = parse_number("HISTORY_WINDOW", var("HISTORY_WINDOW"), DEFAULT_HISTORY_WINDOW as u64)?;
        if history_window == 0 {
            return Err(ConfigError::Invalid {
                name: "HISTORY_WINDOW",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_number("PORT", var("PORT"), 3000)?
                .try_into()
                .map_err(|_| ConfigError::Invalid {
                    name: "PORT",
                    value: var("PORT").unwrap_or_default(),
                    reason: "must fit in u16",
                })?,
            backend,
            database_url,
            reasoning_url: var("REASONING_URL"),
            reasoning_api_key: var("REASONING_API_KEY"),
            reasoning_timeout: Duration::from_secs(parse_number(
                "REASONING_TIMEOUT_SECS",
                var("REASONING_TIMEOUT_SECS"),
                10,
            )?),
            estimator_command,
            estimator_timeout: Duration::from_secs(parse_number(
                "ESTIMATOR_TIMEOUT_SECS",
                var("ESTIMATOR_TIMEOUT_SECS"),
                30,
            )?),
            history_window: history_window as usize,
            seed_snapshot: var("SEED_SNAPSHOT"),
        })
    }
}

fn parse_number(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            reason: "expected a non-negative integer",
        }),
    }
}
