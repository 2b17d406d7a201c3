use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AGENT_NAME, DEFAULT_PARTICIPANT_NAME};

// Platform role. The video room itself only distinguishes doctor/patient, but
// the route surface is role-prefixed for all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Nurse,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "nurse" => Some(Role::Nurse),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn dashboard_route(&self) -> String {
        format!("/{}/dashboard", self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who joins which room, fixed for the lifetime of a call page.
///
/// Built once from the `/video-call` query string. There are no setters:
/// a different room or identity means a new descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    room_name: String,
    participant_name: String,
    participant_role: Role,
}

impl SessionDescriptor {
    pub fn new(
        room_name: impl Into<String>,
        participant_name: impl Into<String>,
        participant_role: Role,
    ) -> Self {
        Self {
            room_name: room_name.into(),
            participant_name: participant_name.into(),
            participant_role,
        }
    }

    /// Parse `room`, `name` and `role` from a query string (with or without
    /// the leading `?`).
    ///
    /// Missing values fall back to `consultation-<unix millis>`, `User` and
    /// `patient`. An unrecognised role is treated as `patient`.
    pub fn from_query(query: &str, now: DateTime<Utc>) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut room = None;
        let mut name = None;
        let mut role = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "room" => room = Some(value.into_owned()),
                "name" => name = Some(value.into_owned()),
                "role" => role = Role::parse(&value),
                _ => {}
            }
        }

        Self {
            room_name: room
                .unwrap_or_else(|| format!("consultation-{}", now.timestamp_millis())),
            participant_name: name.unwrap_or_else(|| DEFAULT_PARTICIPANT_NAME.to_string()),
            participant_role: role.unwrap_or(Role::Patient),
        }
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn participant_name(&self) -> &str {
        &self.participant_name
    }

    pub fn participant_role(&self) -> Role {
        self.participant_role
    }

    /// Pose analysis is offered to the examining doctor only.
    pub fn pose_detection_enabled(&self) -> bool {
        self.participant_role == Role::Doctor
    }
}

/// Token/URL bundle needed to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server_url: String,
    pub participant_token: String,
    pub room_name: String,
    pub participant_name: String,
}

/// Body of `POST /api/connection-details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetailsRequest {
    #[serde(default)]
    pub room_config: Option<RoomConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    #[serde(default)]
    pub agents: Vec<AgentDispatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDispatch {
    #[serde(default)]
    pub agent_name: Option<String>,
}

impl ConnectionDetailsRequest {
    pub fn for_agent(agent_name: impl Into<String>) -> Self {
        Self {
            room_config: Some(RoomConfig {
                agents: vec![AgentDispatch {
                    agent_name: Some(agent_name.into()),
                }],
            }),
        }
    }

    /// First non-empty requested agent, if any.
    pub fn requested_agent(&self) -> Option<&str> {
        self.room_config
            .as_ref()
            .and_then(|cfg| cfg.agents.first())
            .and_then(|agent| agent.agent_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// First requested agent, or the default medical assistant.
    pub fn agent_name(&self) -> &str {
        self.requested_agent().unwrap_or(DEFAULT_AGENT_NAME)
    }
}

/// A chat line shown in the call side panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
}

impl ConnectionQuality {
    /// Map a provider quality label. `unknown` counts as good.
    pub fn from_provider(label: &str) -> Self {
        match label {
            "excellent" => ConnectionQuality::Excellent,
            "good" | "unknown" => ConnectionQuality::Good,
            _ => ConnectionQuality::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionQuality::Excellent => "excellent",
            ConnectionQuality::Good => "good",
            ConnectionQuality::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub identity: String,
    pub name: String,
    pub role: Role,
    pub is_speaking: bool,
    pub is_camera_enabled: bool,
    pub is_microphone_enabled: bool,
    pub is_screen_sharing: bool,
    pub connection_quality: ConnectionQuality,
}

impl ParticipantInfo {
    /// Role as the room sees it: a participant is a doctor when its metadata
    /// says so, a patient otherwise.
    pub fn role_from_metadata(metadata: Option<&str>) -> Role {
        match metadata {
            Some(meta) if meta.contains("doctor") => Role::Doctor,
            _ => Role::Patient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    #[test]
    fn test_descriptor_from_full_query() {
        let d = SessionDescriptor::from_query("?room=cardio-7&name=Dr%20Lee&role=doctor", at());
        assert_eq!(d.room_name(), "cardio-7");
        assert_eq!(d.participant_name(), "Dr Lee");
        assert_eq!(d.participant_role(), Role::Doctor);
        assert!(d.pose_detection_enabled());
    }

    #[test]
    fn test_descriptor_defaults() {
        let d = SessionDescriptor::from_query("", at());
        assert_eq!(d.room_name(), "consultation-1700000000123");
        assert_eq!(d.participant_name(), "User");
        assert_eq!(d.participant_role(), Role::Patient);
        assert!(!d.pose_detection_enabled());
    }

    #[test]
    fn test_descriptor_unknown_role_is_patient() {
        let d = SessionDescriptor::from_query("role=surgeon&room=r1", at());
        assert_eq!(d.participant_role(), Role::Patient);
        assert_eq!(d.room_name(), "r1");
    }

    #[test]
    fn test_request_agent_name() {
        let req = ConnectionDetailsRequest::for_agent("triage-bot");
        assert_eq!(req.agent_name(), "triage-bot");

        let empty: ConnectionDetailsRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.agent_name(), DEFAULT_AGENT_NAME);
    }

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(ConnectionDetailsRequest::for_agent("medical-assistant"))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "room_config": { "agents": [{ "agent_name": "medical-assistant" }] } })
        );
    }

    #[test]
    fn test_connection_details_camel_case() {
        let details: ConnectionDetails = serde_json::from_value(serde_json::json!({
            "serverUrl": "ws://localhost:7880",
            "participantToken": "a.b.c",
            "roomName": "room",
            "participantName": "user",
        }))
        .unwrap();
        assert_eq!(details.server_url, "ws://localhost:7880");
        assert_eq!(details.participant_token, "a.b.c");
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(ConnectionQuality::from_provider("excellent"), ConnectionQuality::Excellent);
        assert_eq!(ConnectionQuality::from_provider("unknown"), ConnectionQuality::Good);
        assert_eq!(ConnectionQuality::from_provider("lost"), ConnectionQuality::Poor);
    }

    #[test]
    fn test_role_from_metadata() {
        assert_eq!(ParticipantInfo::role_from_metadata(Some("doctor")), Role::Doctor);
        assert_eq!(ParticipantInfo::role_from_metadata(None), Role::Patient);
    }
}
