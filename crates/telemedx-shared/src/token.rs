//! Access token claims and client-side expiry checks.
//!
//! The token service signs these claims; clients never verify the
//! signature; they only peek at `exp` to decide whether a cached token is
//! still worth presenting.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_EXPIRY_BUFFER_MS;
use crate::error::TokenError;

/// Room permissions carried in the `video` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_publish_data: bool,
    pub can_subscribe: bool,
}

impl VideoGrant {
    /// Full participant rights in one room.
    pub fn participant(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            room_join: true,
            can_publish: true,
            can_publish_data: true,
            can_subscribe: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentClaim {
    pub agent_name: String,
}

/// Room configuration embedded in the token so the server dispatches an
/// agent when the room is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfigClaim {
    pub agents: Vec<AgentClaim>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// API key the token was signed with.
    pub iss: String,
    /// Participant identity.
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_config: Option<RoomConfigClaim>,
}

/// Decode the payload segment of a JWT without checking its signature.
pub fn decode_unverified(token: &str) -> Result<serde_json::Value, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let trimmed = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD.decode(payload))
        .map_err(|_| TokenError::Base64)?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))
}

/// `exp` values past this many milliseconds either side of the epoch are
/// treated as missing.
const MAX_EXPIRY_MILLIS: f64 = 8.64e15;

/// Expiry instant of a token in unix milliseconds.
pub fn expiry_millis(token: &str) -> Result<i64, TokenError> {
    let payload = decode_unverified(token)?;
    let exp = payload
        .get("exp")
        .and_then(serde_json::Value::as_f64)
        .map(|exp| exp * 1000.0)
        .filter(|ms| ms.is_finite() && ms.abs() < MAX_EXPIRY_MILLIS)
        .ok_or(TokenError::MissingExpiry)?;
    Ok(exp as i64)
}

/// Whether a token should be replaced before use.
///
/// Anything that cannot be decoded counts as expired, and a token is
/// retired one minute before its real expiry.
pub fn is_expired(token: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return true;
    };

    match expiry_millis(token) {
        Ok(exp_ms) => exp_ms.saturating_sub(TOKEN_EXPIRY_BUFFER_MS) <= now.timestamp_millis(),
        Err(_) => true,
    }
}
