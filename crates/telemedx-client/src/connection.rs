//! Connection-details fetching and caching.
//!
//! Details are fetched from the backend's `/api/connection-details`
//! endpoint and reused until the embedded token is within a minute of
//! expiry. The cache lock is held across a refresh, so concurrent callers
//! wait for the one in-flight request instead of issuing their own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use telemedx_shared::constants::CONNECTION_DETAILS_PATH;
use telemedx_shared::token;
use telemedx_shared::{ConnectionDetails, ConnectionDetailsRequest};

use crate::config::ClientConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned HTTP {0}")]
    Status(u16),

    #[error("Invalid connection details: {0}")]
    Decode(String),
}

/// Anything that can hand out current connection details.
#[async_trait]
pub trait DetailsSource: Send + Sync {
    async fn existing_or_refresh(&self) -> Result<Arc<ConnectionDetails>, FetchError>;
}

pub struct ConnectionDetailsFetcher {
    http: reqwest::Client,
    endpoint: String,
    agent_name: String,
    cached: Mutex<Option<Arc<ConnectionDetails>>>,
}

impl ConnectionDetailsFetcher {
    pub fn new(api_url: &str, agent_name: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!(
                "{}{}",
                api_url.trim_end_matches('/'),
                CONNECTION_DETAILS_PATH
            ),
            agent_name: agent_name.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.api_url, config.agent_name.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Cached details, if any. May be expired.
    pub async fn current(&self) -> Option<Arc<ConnectionDetails>> {
        self.cached.lock().await.clone()
    }

    /// Drop the cache and fetch new details.
    pub async fn refresh(&self) -> Result<Arc<ConnectionDetails>, FetchError> {
        let mut cached = self.cached.lock().await;
        *cached = None;
        let details = self.fetch().await?;
        *cached = Some(details.clone());
        Ok(details)
    }

    /// Cached details while their token is fresh, new ones otherwise.
    pub async fn existing_or_refresh(&self) -> Result<Arc<ConnectionDetails>, FetchError> {
        let mut cached = self.cached.lock().await;

        if let Some(details) = cached.as_ref() {
            if !token::is_expired(Some(details.participant_token.as_str()), Utc::now()) {
                debug!(room = %details.room_name, "Reusing cached connection details");
                return Ok(details.clone());
            }
            debug!(room = %details.room_name, "Cached connection details expired");
        }

        *cached = None;
        let details = self.fetch().await?;
        *cached = Some(details.clone());
        Ok(details)
    }

    async fn fetch(&self) -> Result<Arc<ConnectionDetails>, FetchError> {
        let body = ConnectionDetailsRequest::for_agent(self.agent_name.clone());

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %self.endpoint, error = %e, "Connection details request failed");
                FetchError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(endpoint = %self.endpoint, status = status.as_u16(), "Connection details rejected");
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let details: ConnectionDetails = serde_json::from_slice(&bytes).map_err(|e| {
            error!(error = %e, "Connection details response has the wrong shape");
            FetchError::Decode(e.to_string())
        })?;

        info!(
            room = %details.room_name,
            server = %details.server_url,
            "Fetched connection details"
        );
        Ok(Arc::new(details))
    }
}

#[async_trait]
impl DetailsSource for ConnectionDetailsFetcher {
    async fn existing_or_refresh(&self) -> Result<Arc<ConnectionDetails>, FetchError> {
        ConnectionDetailsFetcher::existing_or_refresh(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    #[derive(Clone, Copy)]
    enum TokenKind {
        /// `exp` this many seconds from now.
        ExpiresIn(i64),
        NoExpiry,
        Garbage,
        ServerError,
    }

    fn make_token(kind: TokenKind) -> String {
        let payload = match kind {
            TokenKind::ExpiresIn(secs) => {
                serde_json::json!({ "sub": "user", "exp": Utc::now().timestamp() + secs })
            }
            _ => serde_json::json!({ "sub": "user" }),
        };
        match kind {
            TokenKind::Garbage => "definitely-not-a-jwt".to_string(),
            _ => format!("hdr.{}.sig", URL_SAFE_NO_PAD.encode(payload.to_string())),
        }
    }

    struct TestBackend {
        url: String,
        hits: Arc<AtomicUsize>,
        last_body: Arc<std::sync::Mutex<Option<serde_json::Value>>>,
    }

    async fn spawn_backend(kind: TokenKind) -> TestBackend {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_body = Arc::new(std::sync::Mutex::new(None));

        let counter = hits.clone();
        let seen = last_body.clone();
        let app = Router::new().route(
            CONNECTION_DETAILS_PATH,
            post(move |Json(body): Json<serde_json::Value>| {
                let counter = counter.clone();
                let seen = seen.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    *seen.lock().unwrap() = Some(body);
                    if let TokenKind::ServerError = kind {
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                    Ok(Json(ConnectionDetails {
                        server_url: "ws://localhost:7880".into(),
                        participant_token: make_token(kind),
                        room_name: format!("voice_assistant_room_{n}"),
                        participant_name: "user".into(),
                    }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestBackend {
            url: format!("http://{addr}"),
            hits,
            last_body,
        }
    }

    #[tokio::test]
    async fn test_fresh_details_are_cached() {
        let backend = spawn_backend(TokenKind::ExpiresIn(600)).await;
        let fetcher = ConnectionDetailsFetcher::new(&backend.url, "medical-assistant");

        let first = fetcher.existing_or_refresh().await.unwrap();
        let second = fetcher.existing_or_refresh().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_inside_buffer_is_refetched() {
        let backend = spawn_backend(TokenKind::ExpiresIn(30)).await;
        let fetcher = ConnectionDetailsFetcher::new(&backend.url, "medical-assistant");

        let first = fetcher.existing_or_refresh().await.unwrap();
        let second = fetcher.existing_or_refresh().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.room_name, second.room_name);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tokens_without_expiry_are_refetched() {
        for kind in [TokenKind::NoExpiry, TokenKind::Garbage] {
            let backend = spawn_backend(kind).await;
            let fetcher = ConnectionDetailsFetcher::new(&backend.url, "medical-assistant");

            fetcher.existing_or_refresh().await.unwrap();
            fetcher.existing_or_refresh().await.unwrap();
            assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test]
    async fn test_request_names_agent() {
        let backend = spawn_backend(TokenKind::ExpiresIn(600)).await;
        let fetcher = ConnectionDetailsFetcher::new(&format!("{}/", backend.url), "triage-bot");
        assert_eq!(
            fetcher.endpoint(),
            format!("{}/api/connection-details", backend.url)
        );

        fetcher.refresh().await.unwrap();

        let body = backend.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["room_config"]["agents"][0]["agent_name"], "triage-bot");
    }

    #[tokio::test]
    async fn test_refresh_always_fetches() {
        let backend = spawn_backend(TokenKind::ExpiresIn(600)).await;
        let fetcher = ConnectionDetailsFetcher::new(&backend.url, "medical-assistant");

        let first = fetcher.refresh().await.unwrap();
        let second = fetcher.refresh().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &fetcher.current().await.unwrap()));
        assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_returned() {
        let backend = spawn_backend(TokenKind::ServerError).await;
        let fetcher = ConnectionDetailsFetcher::new(&backend.url, "medical-assistant");

        let err = fetcher.existing_or_refresh().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
        assert!(fetcher.current().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let fetcher = ConnectionDetailsFetcher::new("http://127.0.0.1:9", "medical-assistant");
        let err = fetcher.existing_or_refresh().await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }
}
