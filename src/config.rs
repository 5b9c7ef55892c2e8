//! Client configuration from the environment

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8001";
pub const DEFAULT_GREETING: &str = "Hi there, I am your new research agent. How can I help you?";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid RESEARCH_CHAT_SERVER {url:?}: {reason}")]
    InvalidServer { url: String, reason: String },
    #[error("Invalid RESEARCH_CHAT_CONNECT_TIMEOUT_SECS {0:?}: expected whole seconds")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the chat backend
    pub server: Url,
    /// First assistant message of a new conversation; empty for none
    pub greeting: String,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = lookup("RESEARCH_CHAT_SERVER").unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let server = parse_server(&server)?;

        let greeting =
            lookup("RESEARCH_CHAT_GREETING").unwrap_or_else(|| DEFAULT_GREETING.to_string());

        let connect_timeout = match lookup("RESEARCH_CHAT_CONNECT_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?,
            None => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        Ok(Self {
            server,
            greeting,
            connect_timeout: Duration::from_secs(connect_timeout),
        })
    }
}

fn parse_server(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidServer {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    Ok(url)
}
