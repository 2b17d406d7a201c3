use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum::extract::State;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use telemedx_shared::constants::{AGENT_TOKEN_PATH, CONNECTION_DETAILS_PATH};
use telemedx_shared::{ConnectionDetails, ConnectionDetailsRequest};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::token::{Grantee, TokenMinter};

const PARTICIPANT_NAME: &str = "user";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(CONNECTION_DETAILS_PATH, post(connection_details))
        .route(AGENT_TOKEN_PATH, post(agent_token))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentTokenRequest {
    room_name: String,
    participant_name: String,
}

#[derive(Serialize)]
struct AgentTokenResponse {
    token: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Credentials checked in the order clients expect to see them reported.
fn credentials(config: &ServerConfig) -> Result<(&str, TokenMinter), ServerError> {
    let url = config
        .livekit_url
        .as_deref()
        .ok_or(ServerError::MissingSetting("LIVEKIT_URL"))?;
    let key = config
        .api_key
        .as_deref()
        .ok_or(ServerError::MissingSetting("LIVEKIT_API_KEY"))?;
    let secret = config
        .api_secret
        .as_deref()
        .ok_or(ServerError::MissingSetting("LIVEKIT_API_SECRET"))?;
    Ok((url, TokenMinter::new(key, secret, config.token_ttl_secs)))
}

async fn connection_details(
    State(state): State<AppState>,
    body: Option<Json<ConnectionDetailsRequest>>,
) -> Result<Response, ServerError> {
    let (server_url, minter) = credentials(&state.config)?;

    let request = body.map(|Json(req)| req).unwrap_or_default();
    let agent_name = request
        .requested_agent()
        .unwrap_or(state.config.default_agent_name.as_str());

    let (identity, room_name) = {
        let mut rng = rand::thread_rng();
        (
            format!("voice_assistant_user_{}", rng.gen_range(0..10_000)),
            format!("voice_assistant_room_{}", rng.gen_range(0..10_000)),
        )
    };

    let participant_token = minter.mint(
        &Grantee {
            identity: &identity,
            name: PARTICIPANT_NAME,
            room: &room_name,
            agent_name: Some(agent_name),
        },
        Utc::now(),
    )?;

    info!(room = %room_name, agent = %agent_name, "Issued connection details");

    let details = ConnectionDetails {
        server_url: server_url.to_string(),
        participant_token,
        room_name,
        participant_name: PARTICIPANT_NAME.to_string(),
    };

    Ok((
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(details),
    )
        .into_response())
}

async fn agent_token(
    State(state): State<AppState>,
    Json(request): Json<AgentTokenRequest>,
) -> Result<Json<AgentTokenResponse>, ServerError> {
    let (_, minter) = credentials(&state.config)?;

    let room = request.room_name.trim();
    let name = request.participant_name.trim();
    if room.is_empty() || name.is_empty() {
        return Err(ServerError::BadRequest(
            "roomName and participantName are required".into(),
        ));
    }

    let token = minter.mint(
        &Grantee {
            identity: name,
            name,
            room,
            agent_name: None,
        },
        Utc::now(),
    )?;

    info!(room = %room, participant = %name, "Issued room token");
    Ok(Json(AgentTokenResponse { token }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use telemedx_shared::token::decode_unverified;

    fn state(configured: bool) -> AppState {
        let mut config = ServerConfig::default();
        if configured {
            config.livekit_url = Some("wss://rooms.example.test".into());
            config.api_key = Some("APIkey".into());
            config.api_secret = Some("secret".into());
        }
        AppState {
            config: Arc::new(config),
        }
    }

    fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = build_router(state(false))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_connection_details_issued() {
        let request = post_json(
            CONNECTION_DETAILS_PATH,
            serde_json::to_value(ConnectionDetailsRequest::for_agent("triage-bot")).unwrap(),
        );
        let response = build_router(state(true)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );

        let details: ConnectionDetails =
            serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(details.server_url, "wss://rooms.example.test");
        assert_eq!(details.participant_name, "user");
        assert!(details.room_name.starts_with("voice_assistant_room_"));

        let claims = decode_unverified(&details.participant_token).unwrap();
        assert_eq!(claims["iss"], "APIkey");
        assert_eq!(claims["video"]["room"], details.room_name.as_str());
        assert_eq!(claims["video"]["canPublishData"], true);
        assert_eq!(claims["roomConfig"]["agents"][0]["agentName"], "triage-bot");
        assert!(claims["sub"]
            .as_str()
            .unwrap()
            .starts_with("voice_assistant_user_"));
    }

    #[tokio::test]
    async fn test_empty_body_uses_default_agent() {
        let response = build_router(state(true))
            .oneshot(post_json(CONNECTION_DETAILS_PATH, serde_json::json!({})))
            .await
            .unwrap();
        let details: ConnectionDetails =
            serde_json::from_value(json_body(response).await).unwrap();
        let claims = decode_unverified(&details.participant_token).unwrap();
        assert_eq!(
            claims["roomConfig"]["agents"][0]["agentName"],
            "medical-assistant"
        );
    }

    #[tokio::test]
    async fn test_configured_default_agent_fills_empty_request() {
        let mut config = ServerConfig::default();
        config.livekit_url = Some("wss://rooms.example.test".into());
        config.api_key = Some("APIkey".into());
        config.api_secret = Some("secret".into());
        config.default_agent_name = "cardio-assistant".into();
        let app = build_router(AppState {
            config: Arc::new(config),
        });

        for body in [
            serde_json::json!({}),
            serde_json::json!({ "room_config": {} }),
            serde_json::json!({ "room_config": { "agents": [] } }),
            serde_json::json!({ "room_config": { "agents": [{ "agent_name": "" }] } }),
        ] {
            let response = app
                .clone()
                .oneshot(post_json(CONNECTION_DETAILS_PATH, body))
                .await
                .unwrap();
            let details: ConnectionDetails =
                serde_json::from_value(json_body(response).await).unwrap();
            let claims = decode_unverified(&details.participant_token).unwrap();
            assert_eq!(
                claims["roomConfig"]["agents"][0]["agentName"],
                "cardio-assistant"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_named() {
        let response = build_router(state(false))
            .oneshot(post_json(CONNECTION_DETAILS_PATH, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "LIVEKIT_URL is not defined");

        let mut partial = ServerConfig::default();
        partial.livekit_url = Some("wss://rooms.example.test".into());
        partial.api_key = Some("APIkey".into());
        let response = build_router(AppState {
            config: Arc::new(partial),
        })
        .oneshot(post_json(CONNECTION_DETAILS_PATH, serde_json::json!({})))
        .await
        .unwrap();
        assert_eq!(
            json_body(response).await["error"],
            "LIVEKIT_API_SECRET is not defined"
        );
    }

    #[tokio::test]
    async fn test_agent_token() {
        let response = build_router(state(true))
            .oneshot(post_json(
                AGENT_TOKEN_PATH,
                serde_json::json!({ "roomName": "cardio-7", "participantName": "Dr Lee" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let claims = decode_unverified(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims["video"]["room"], "cardio-7");
        assert_eq!(claims["name"], "Dr Lee");
        assert!(claims.get("roomConfig").is_none());
    }

    #[tokio::test]
    async fn test_agent_token_requires_fields() {
        let response = build_router(state(true))
            .oneshot(post_json(
                AGENT_TOKEN_PATH,
                serde_json::json!({ "roomName": " ", "participantName": "Dr Lee" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
