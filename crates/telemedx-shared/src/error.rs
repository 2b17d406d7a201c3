use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Invite error: {0}")]
    Invite(#[from] crate::invite::InviteError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is not a three-part JWT")]
    Malformed,

    #[error("Token payload is not valid base64")]
    Base64,

    #[error("Token payload is not valid JSON: {0}")]
    Json(String),

    #[error("Token has no numeric exp claim")]
    MissingExpiry,
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation failed: {}", .0.join(", "))]
    Invalid(Vec<String>),
}
