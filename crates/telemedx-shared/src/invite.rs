use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::INVITE_VALIDITY_MS;
use crate::types::Role;

/// Registration invite: `base64("email:role:unix_millis")`.
///
/// Unsigned; it only pre-fills the registration form and is checked for
/// age and consistency with the link's own query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteToken {
    pub email: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
}

/// What a valid invite pre-fills on the registration page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteInfo {
    pub email: String,
    pub role: Role,
}

impl InviteToken {
    pub fn issue(email: impl Into<String>, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            role,
            issued_at: now,
        }
    }

    pub fn encode(&self) -> String {
        let raw = format!(
            "{}:{}:{}",
            self.email,
            self.role,
            self.issued_at.timestamp_millis()
        );
        STANDARD.encode(raw)
    }

    pub fn decode(code: &str) -> Result<Self, InviteError> {
        let bytes = STANDARD
            .decode(code.trim())
            .map_err(|_| InviteError::Base64Decode)?;
        let raw = String::from_utf8(bytes).map_err(|_| InviteError::InvalidFormat)?;

        // Email may not contain ':' but split from the right to be safe.
        let mut parts = raw.rsplitn(3, ':');
        let (Some(ts), Some(role), Some(email)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(InviteError::InvalidFormat);
        };

        let millis: i64 = ts.parse().map_err(|_| InviteError::InvalidFormat)?;
        let issued_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or(InviteError::InvalidFormat)?;
        let role = Role::parse(role).ok_or(InviteError::InvalidFormat)?;

        Ok(Self {
            email: email.to_string(),
            role,
            issued_at,
        })
    }

    /// Check a code against the `email` and `role` query parameters that
    /// travelled with it.
    pub fn verify(
        code: &str,
        email: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<InviteInfo, InviteError> {
        let token = Self::decode(code)?;

        let age_ms = now.timestamp_millis() - token.issued_at.timestamp_millis();
        if age_ms >= INVITE_VALIDITY_MS {
            return Err(InviteError::Expired);
        }

        if token.email != email || token.role.as_str() != role {
            return Err(InviteError::Mismatch);
        }

        Ok(InviteInfo {
            email: token.email,
            role: token.role,
        })
    }

    /// Registration link carrying this invite, e.g.
    /// `https://app.example/register?invite=..&email=..&role=doctor`.
    pub fn register_link(&self, base_url: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("invite", &self.encode())
            .append_pair("email", &self.email)
            .append_pair("role", self.role.as_str())
            .finish();
        format!("{}/register?{}", base_url.trim_end_matches('/'), query)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("Invalid invite format")]
    InvalidFormat,

    #[error("Invite has expired")]
    Expired,

    #[error("Invite does not match the link parameters")]
    Mismatch,

    #[error("Base64 decode error")]
    Base64Decode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_invite_accepted_within_a_day() {
        let issued = Utc::now() - Duration::hours(23);
        let token = InviteToken::issue("nurse@clinic.org", Role::Nurse, issued);

        let info = InviteToken::verify(&token.encode(), "nurse@clinic.org", "nurse", Utc::now())
            .expect("fresh invite should verify");
        assert_eq!(info.role, Role::Nurse);
        assert_eq!(info.email, "nurse@clinic.org");
    }

    #[test]
    fn test_invite_expired_after_a_day() {
        let issued = Utc::now() - Duration::hours(25);
        let token = InviteToken::issue("a@b.c", Role::Doctor, issued);
        assert_eq!(
            InviteToken::verify(&token.encode(), "a@b.c", "doctor", Utc::now()),
            Err(InviteError::Expired)
        );
    }

    #[test]
    fn test_invite_mismatched_role_rejected() {
        let token = InviteToken::issue("a@b.c", Role::Patient, Utc::now());
        assert_eq!(
            InviteToken::verify(&token.encode(), "a@b.c", "admin", Utc::now()),
            Err(InviteError::Mismatch)
        );
        assert_eq!(
            InviteToken::verify(&token.encode(), "a@b.c", "Patient", Utc::now()),
            Err(InviteError::Mismatch)
        );
    }

    #[test]
    fn test_invite_garbage_rejected() {
        assert_eq!(InviteToken::decode("!!!"), Err(InviteError::Base64Decode));
        let no_ts = STANDARD.encode("a@b.c:doctor");
        assert_eq!(InviteToken::decode(&no_ts), Err(InviteError::InvalidFormat));
    }

    #[test]
    fn test_register_link_is_encoded() {
        let token = InviteToken::issue("dr+x@clinic.org", Role::Doctor, Utc::now());
        let link = token.register_link("https://telemedx.app/");
        assert!(link.starts_with("https://telemedx.app/register?invite="));
        assert!(link.contains("email=dr%2Bx%40clinic.org"));
        assert!(link.ends_with("&role=doctor"));
    }
}
