//! Client configuration loaded from environment variables.
//!
//! The variable names match the web build (`VITE_*`) so one `.env` file
//! drives both front ends. Every setting has a local-development default.

use std::time::Duration;

use telemedx_media::PoseConfig;
use telemedx_shared::constants::{
    DEFAULT_AGENT_NAME, DEFAULT_API_URL, DEFAULT_LIVEKIT_URL, DEMO_CONNECT_DELAY_MS,
    DEMO_ECHO_DELAY_MS,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    /// Env: `VITE_API_URL`
    /// Default: `http://localhost:3001`
    pub api_url: String,

    /// Signaling server used when connection details carry no URL.
    /// Env: `VITE_LIVEKIT_URL`
    /// Default: `ws://localhost:7880`
    pub livekit_url: String,

    /// Agent dispatched into rooms created for this client.
    /// Env: `AGENT_NAME`
    pub agent_name: String,

    /// How long demo mode pretends to connect.
    /// Env: `DEMO_CONNECT_DELAY_MS`
    pub demo_connect_delay: Duration,

    /// Delay before the demo assistant echoes a chat message.
    /// Env: `DEMO_ECHO_DELAY_MS`
    pub demo_echo_delay: Duration,

    pub pose: PoseConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            livekit_url: DEFAULT_LIVEKIT_URL.to_string(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            demo_connect_delay: Duration::from_millis(DEMO_CONNECT_DELAY_MS),
            demo_echo_delay: Duration::from_millis(DEMO_ECHO_DELAY_MS),
            pose: PoseConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("VITE_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Ok(url) = std::env::var("VITE_LIVEKIT_URL") {
            if !url.trim().is_empty() {
                config.livekit_url = url.trim().to_string();
            }
        }

        if let Ok(name) = std::env::var("AGENT_NAME") {
            if !name.is_empty() {
                config.agent_name = name;
            }
        }

        if let Some(delay) = duration_ms_var("DEMO_CONNECT_DELAY_MS") {
            config.demo_connect_delay = delay;
        }

        if let Some(delay) = duration_ms_var("DEMO_ECHO_DELAY_MS") {
            config.demo_echo_delay = delay;
        }

        config
    }
}

fn duration_ms_var(name: &str) -> Option<Duration> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(var = name, value = %value, "Invalid millisecond value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.livekit_url, "ws://localhost:7880");
        assert_eq!(config.agent_name, "medical-assistant");
        assert_eq!(config.demo_connect_delay, Duration::from_millis(1500));
        assert_eq!(config.demo_echo_delay, Duration::from_millis(1000));
    }
}
