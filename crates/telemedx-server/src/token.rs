//! LiveKit-compatible access token minting.
//!
//! Tokens are HS256 JWTs signed with the API secret, issued by the API key,
//! carrying a participant video grant for exactly one room.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use telemedx_shared::token::{AccessClaims, AgentClaim, RoomConfigClaim, VideoGrant};

pub struct TokenMinter {
    api_key: String,
    encoding_key: EncodingKey,
    header: Header,
    ttl: Duration,
}

/// Who the token is for.
pub struct Grantee<'a> {
    pub identity: &'a str,
    pub name: &'a str,
    pub room: &'a str,
    /// Agent the room should dispatch when it is created.
    pub agent_name: Option<&'a str>,
}

impl TokenMinter {
    pub fn new(api_key: &str, api_secret: &str, ttl_secs: i64) -> Self {
        Self {
            api_key: api_key.to_string(),
            encoding_key: EncodingKey::from_secret(api_secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn claims(&self, grantee: &Grantee<'_>, now: DateTime<Utc>) -> AccessClaims {
        AccessClaims {
            iss: self.api_key.clone(),
            sub: grantee.identity.to_string(),
            name: grantee.name.to_string(),
            nbf: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            video: VideoGrant::participant(grantee.room),
            metadata: None,
            room_config: grantee.agent_name.map(|agent| RoomConfigClaim {
                agents: vec![AgentClaim {
                    agent_name: agent.to_string(),
                }],
            }),
        }
    }

    pub fn mint(
        &self,
        grantee: &Grantee<'_>,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&self.header, &self.claims(grantee, now), &self.encoding_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const GRANTEE: Grantee<'static> = Grantee {
        identity: "voice_assistant_user_42",
        name: "user",
        room: "voice_assistant_room_7",
        agent_name: Some("medical-assistant"),
    };

    #[test]
    fn test_minted_token_verifies_with_secret() {
        let minter = TokenMinter::new("APIkey", "secret", 900);
        let token = minter.mint(&GRANTEE, Utc::now()).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["APIkey"]);
        let data = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap();

        let claims = data.claims;
        assert_eq!(claims.sub, "voice_assistant_user_42");
        assert_eq!(claims.exp - claims.nbf, 900);
        assert_eq!(claims.video, VideoGrant::participant("voice_assistant_room_7"));
        assert_eq!(
            claims.room_config.unwrap().agents[0].agent_name,
            "medical-assistant"
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenMinter::new("APIkey", "secret", 900)
            .mint(&GRANTEE, Utc::now())
            .unwrap();
        let res = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_client_side_expiry_matches_ttl() {
        let now = Utc::now();
        let token = TokenMinter::new("k", "s", 900).mint(&GRANTEE, now).unwrap();
        assert!(!telemedx_shared::token::is_expired(Some(token.as_str()), now));
        assert!(telemedx_shared::token::is_expired(
            Some(token.as_str()),
            now + Duration::seconds(850)
        ));
    }
}
