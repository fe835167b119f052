//! HS256 session tokens

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::models::ClientAccount;

/// Session lifetime
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims carried by a client session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Client record id
    pub sub: String,
    pub name: String,
    pub client_number: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the session secret
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secret: Vec<u8>,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Raw secret, shared with download link signing
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Issue a session for `account`, valid for [`SESSION_TTL_SECS`]
    pub fn issue(&self, account: &ClientAccount) -> Result<String, SessionError> {
        self.issue_at(account, Utc::now())
    }

    pub fn issue_at(
        &self,
        account: &ClientAccount,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: account.id.clone(),
            name: account.name.clone(),
            client_number: account.client_number.clone(),
            email: account.email.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + SESSION_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected session token: {}", e);
                SessionError::Invalid
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account() -> ClientAccount {
        serde_json::from_value(serde_json::json!({
            "e365_clientid": "c1",
            "e365_name": "Jane Doe",
            "e365_email": "jane@example.com",
            "e365_clientnumber": "CLJD123456"
        }))
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = SessionKeys::new("test-secret");
        let token = keys.issue(&account()).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "c1");
        assert_eq!(claims.client_number, "CLJD123456");
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = SessionKeys::new("one").issue(&account()).unwrap();
        assert!(matches!(
            SessionKeys::new("two").verify(&token),
            Err(SessionError::Invalid)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = SessionKeys::new("test-secret");
        let token = keys
            .issue_at(&account(), Utc::now() - Duration::hours(25))
            .unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = SessionKeys::new("test-secret");
        assert!(keys.verify("not.a.token").is_err());
    }
}
