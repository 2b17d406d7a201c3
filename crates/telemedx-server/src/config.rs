//! Server configuration loaded from environment variables.
//!
//! The LiveKit credentials have no defaults: when one is missing the
//! server still starts, and the token endpoints answer 500 naming the
//! missing variable.

use std::net::SocketAddr;

use telemedx_shared::constants::{DEFAULT_AGENT_NAME, DEFAULT_HTTP_PORT, TOKEN_TTL_SECS};

#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`, or `PORT` to bind `0.0.0.0:<PORT>`
    /// Default: `0.0.0.0:3001`
    pub http_addr: SocketAddr,

    /// Signaling server URL handed to clients.
    /// Env: `LIVEKIT_URL`
    pub livekit_url: Option<String>,

    /// Env: `LIVEKIT_API_KEY`
    pub api_key: Option<String>,

    /// Env: `LIVEKIT_API_SECRET`
    pub api_secret: Option<String>,

    /// Lifetime of minted tokens in seconds.
    /// Env: `TOKEN_TTL_SECS`
    /// Default: 900
    pub token_ttl_secs: i64,

    /// Agent dispatched when a request names none.
    /// Env: `DEFAULT_AGENT_NAME`
    /// Default: `medical-assistant`
    pub default_agent_name: String,
}

// Keeps the API secret out of `?config` logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("livekit_url", &self.livekit_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("default_agent_name", &self.default_agent_name)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            livekit_url: None,
            api_key: None,
            api_secret: None,
            token_ttl_secs: TOKEN_TTL_SECS,
            default_agent_name: DEFAULT_AGENT_NAME.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.http_addr.set_port(port),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, using default"),
            }
        }

        // An explicit address wins over PORT.
        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        config.livekit_url = std::env::var("LIVEKIT_URL").ok();
        config.api_key = std::env::var("LIVEKIT_API_KEY").ok();
        config.api_secret = std::env::var("LIVEKIT_API_SECRET").ok();

        if let Ok(val) = std::env::var("TOKEN_TTL_SECS") {
            match val.parse::<i64>() {
                Ok(secs) if secs > 0 => config.token_ttl_secs = secs,
                _ => tracing::warn!(value = %val, "Invalid TOKEN_TTL_SECS, using default"),
            }
        }

        if let Ok(name) = std::env::var("DEFAULT_AGENT_NAME") {
            if !name.is_empty() {
                config.default_agent_name = name;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr.port(), 3001);
        assert_eq!(config.token_ttl_secs, 900);
        assert!(config.api_secret.is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ServerConfig {
            api_secret: Some("hunter2".into()),
            ..ServerConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
