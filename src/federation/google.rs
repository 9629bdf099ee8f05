use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::{FederationError, IdentityProvider, NormalizedIdentity};
use crate::store::Provider;

const CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// Verifies Google ID tokens offline against Google's published JWKS,
/// constrained to the configured OAuth client id. No userinfo round trip.
pub struct GoogleProvider {
    http: reqwest::Client,
    client_id: String,
    certs_url: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

/// Claims of a verified Google ID token.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleProvider {
    pub fn new(http: reqwest::Client, client_id: String) -> Self {
        Self {
            http,
            client_id,
            certs_url: CERTS_URL.to_string(),
        }
    }

    async fn fetch_jwks(&self) -> Result<Jwks, FederationError> {
        let jwks = self
            .http
            .get(&self.certs_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("fetch signing keys")
            .map_err(|source| FederationError::Upstream {
                provider: "google",
                source,
            })?
            .json::<Jwks>()
            .await
            .context("parse signing keys")
            .map_err(|source| FederationError::Upstream {
                provider: "google",
                source,
            })?;
        Ok(jwks)
    }

    fn rejected(reason: impl ToString) -> FederationError {
        FederationError::Rejected {
            provider: "google",
            reason: reason.to_string(),
        }
    }
}

pub(crate) fn identity_from_claims(claims: GoogleClaims) -> NormalizedIdentity {
    NormalizedIdentity {
        id: format!("google_{}", claims.sub),
        provider: Provider::Google,
        email: claims.email,
        name: claims.name,
        avatar: claims.picture,
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn exchange_token(&self, token: &str) -> Result<NormalizedIdentity, FederationError> {
        let header = decode_header(token).map_err(Self::rejected)?;
        let kid = header
            .kid
            .ok_or_else(|| Self::rejected("token header has no key id"))?;

        let jwks = self.fetch_jwks().await?;
        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.kid == kid)
            .ok_or_else(|| Self::rejected(format!("unknown signing key id {kid}")))?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(Self::rejected)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&ISSUERS);

        let data = decode::<GoogleClaims>(token, &key, &validation).map_err(Self::rejected)?;
        Ok(identity_from_claims(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_subject_qualified() {
        let identity = identity_from_claims(GoogleClaims {
            sub: "12345".into(),
            email: Some("ada@example.com".into()),
            name: Some("Ada Lovelace".into()),
            picture: Some("https://lh3.example/pic".into()),
        });
        assert_eq!(identity.id, "google_12345");
        assert_eq!(identity.provider, Provider::Google);
        assert_eq!(identity.avatar.as_deref(), Some("https://lh3.example/pic"));
    }
}
