use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::state::AppState;
use crate::store::{Provider, Role, User};

/// Session tokens are valid for exactly this long after issuance. There is no
/// revocation list; verification is a pure function of token and secret.
const SESSION_TTL_DAYS: i64 = 7;

/// Identity claims embedded in a session token. They reflect the user record
/// as it existed at issuance; the auth gate does not re-check the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub provider: Provider,
    pub iat: usize,
    pub exp: usize,
}

/// HS256 signing material derived once from the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt.secret)
    }
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User) -> anyhow::Result<String> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    /// Issuance with an injected clock so expiry is testable.
    pub(crate) fn issue_at(&self, user: &User, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + Duration::days(SESSION_TTL_DAYS);
        let claims = Claims {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            provider: user.provider,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "session token issued");
        Ok(token)
    }

    /// Returns the embedded claims only if the signature and expiry check
    /// out. Structural corruption, a bad signature, and expiry all collapse
    /// into `None`; nothing in a rejected token is trusted.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let validation = Validation::default();
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                debug!(error = %err, "session token rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "user_42".into(),
            email: Some("ada@example.com".into()),
            name: Some("Ada".into()),
            avatar: None,
            password_hash: Some("$argon2id$fake".into()),
            role: Role::User,
            provider: Provider::Email,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let keys = SessionKeys::new("dev-secret");
        let token = keys.issue(&test_user()).expect("issue");
        let claims = keys.verify(&token).expect("fresh token verifies");
        assert_eq!(claims.id, "user_42");
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.provider, Provider::Email);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn expired_token_is_invalid() {
        let keys = SessionKeys::new("dev-secret");
        // Issued 8 days ago, so the 7-day expiry passed a day ago.
        let past = OffsetDateTime::now_utc() - Duration::days(8);
        let token = keys.issue_at(&test_user(), past).expect("issue");
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let keys = SessionKeys::new("dev-secret");
        let token = keys.issue(&test_user()).expect("issue");

        let (rest, signature) = token.rsplit_once('.').expect("three segments");
        let mut sig: Vec<u8> = signature.bytes().collect();
        sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{rest}.{}", String::from_utf8(sig).unwrap());

        assert!(keys.verify(&tampered).is_none());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = SessionKeys::new("secret-a")
            .issue(&test_user())
            .expect("issue");
        assert!(SessionKeys::new("secret-b").verify(&token).is_none());
    }

    #[test]
    fn garbage_is_invalid() {
        let keys = SessionKeys::new("dev-secret");
        assert!(keys.verify("garbage").is_none());
        assert!(keys.verify("").is_none());
        assert!(keys.verify("a.b.c").is_none());
    }
}
