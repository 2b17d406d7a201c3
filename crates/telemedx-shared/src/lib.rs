//! Types shared by the TeleMedX client, media layer and token service.

pub mod constants;
pub mod error;
pub mod invite;
pub mod protocol;
pub mod records;
pub mod routes;
pub mod token;
pub mod types;

pub use error::{RecordError, SharedError, TokenError};
pub use types::{
    ChatMessage, ConnectionDetails, ConnectionDetailsRequest, ConnectionQuality,
    ParticipantInfo, Role, SessionDescriptor,
};
