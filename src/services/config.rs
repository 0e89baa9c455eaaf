use crate::constants::{env as env_keys, network};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid backend URL '{value}': {reason}")]
    InvalidApiUrl { value: String, reason: String },
    #[error("invalid listening port '{value}'")]
    InvalidPort { value: String },
    #[error("invalid request timeout '{value}'")]
    InvalidTimeout { value: String },
}

impl ConfigError {
    pub fn hint(&self) -> String {
        match self {
            ConfigError::InvalidApiUrl { .. } => format!(
                "Set {} to an absolute http(s) URL such as {}",
                env_keys::API_URL,
                network::DEFAULT_API_URL
            ),
            ConfigError::InvalidPort { .. } => {
                format!("Set {} to an integer between 1 and 65535", env_keys::MCP_PORT)
            }
            ConfigError::InvalidTimeout { .. } => format!(
                "Set {} to a positive number of milliseconds (max {})",
                env_keys::HTTP_TIMEOUT_MS,
                network::MAX_TIMEOUT_MS
            ),
        }
    }
}

/// Process configuration. Everything comes from the environment, optionally
/// overridden by command-line flags; nothing is persisted.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: Url,
    pub port: u16,
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var(env_keys::API_URL).ok();
        let port = std::env::var(env_keys::MCP_PORT).ok();
        let timeout = std::env::var(env_keys::HTTP_TIMEOUT_MS).ok();
        Self::from_values(api_url.as_deref(), port.as_deref(), timeout.as_deref())
    }

    pub fn from_values(
        api_url: Option<&str>,
        port: Option<&str>,
        timeout_ms: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let api_url = parse_api_url(
            api_url
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(network::DEFAULT_API_URL),
        )?;
        let port = match port.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_port(raw)?,
            None => network::DEFAULT_MCP_PORT,
        };
        let request_timeout = match timeout_ms.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_timeout(raw)?),
            None => None,
        };
        Ok(Self {
            api_url,
            port,
            request_timeout,
        })
    }

    pub fn with_api_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(raw)?;
        Ok(self)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

pub fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|err| ConfigError::InvalidApiUrl {
        value: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidApiUrl {
            value: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidApiUrl {
            value: trimmed.to_string(),
            reason: "query and fragment are not allowed".to_string(),
        });
    }
    Ok(url)
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort {
            value: raw.to_string(),
        }),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 && ms <= network::MAX_TIMEOUT_MS => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
        }),
    }
}
