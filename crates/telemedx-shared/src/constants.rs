/// Application name
pub const APP_NAME: &str = "TeleMedX";

/// Agent dispatched into a room when the request names none
pub const DEFAULT_AGENT_NAME: &str = "medical-assistant";

/// Participant name used when the call page gets no `name` parameter
pub const DEFAULT_PARTICIPANT_NAME: &str = "User";

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Default signaling server URL
pub const DEFAULT_LIVEKIT_URL: &str = "ws://localhost:7880";

/// Default HTTP port of the token service
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Connection-details endpoint path
pub const CONNECTION_DETAILS_PATH: &str = "/api/connection-details";

/// Direct token endpoint path
pub const AGENT_TOKEN_PATH: &str = "/api/agent/token";

/// A token is considered expired this long before its `exp` claim
pub const TOKEN_EXPIRY_BUFFER_MS: i64 = 60_000;

/// Access token lifetime issued by the token service (15 minutes)
pub const TOKEN_TTL_SECS: i64 = 15 * 60;

/// Invite links stay valid for 24 hours
pub const INVITE_VALIDITY_MS: i64 = 24 * 60 * 60 * 1000;

/// Simulated connect delay in demo mode
pub const DEMO_CONNECT_DELAY_MS: u64 = 1500;

/// Delay before the demo assistant echoes a chat message
pub const DEMO_ECHO_DELAY_MS: u64 = 1000;

/// Sender name of demo-mode echo messages
pub const DEMO_ASSISTANT_NAME: &str = "Demo Assistant";
