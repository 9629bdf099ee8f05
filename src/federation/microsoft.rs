use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{FederationError, IdentityProvider, NormalizedIdentity};
use crate::store::Provider;

const ME_URL: &str = "https://graph.microsoft.com/v1.0/me";

/// Resolves an opaque Microsoft Graph access token through the `/me` endpoint.
pub struct MicrosoftProvider {
    http: reqwest::Client,
    me_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphUser {
    pub id: String,
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl MicrosoftProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            me_url: ME_URL.to_string(),
        }
    }
}

pub(crate) fn identity_from_user(user: GraphUser) -> NormalizedIdentity {
    NormalizedIdentity {
        id: format!("microsoft_{}", user.id),
        provider: Provider::Microsoft,
        // `mail` is unset for accounts without a mailbox; the UPN is usually
        // an address-shaped identifier.
        email: user.mail.or(user.user_principal_name),
        name: user.display_name,
        avatar: None,
    }
}

#[async_trait]
impl IdentityProvider for MicrosoftProvider {
    fn name(&self) -> &'static str {
        "microsoft"
    }

    async fn exchange_token(&self, token: &str) -> Result<NormalizedIdentity, FederationError> {
        let response = self
            .http
            .get(&self.me_url)
            .bearer_auth(token)
            .send()
            .await
            .context("request to graph me endpoint")
            .map_err(|source| FederationError::Upstream {
                provider: "microsoft",
                source,
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FederationError::Rejected {
                    provider: "microsoft",
                    reason: format!("me endpoint returned {}", response.status()),
                });
            }
            status if !status.is_success() => {
                return Err(FederationError::Upstream {
                    provider: "microsoft",
                    source: anyhow::anyhow!("me endpoint returned {status}"),
                });
            }
            _ => {}
        }

        let user = response
            .json::<GraphUser>()
            .await
            .context("parse graph me response")
            .map_err(|source| FederationError::Upstream {
                provider: "microsoft",
                source,
            })?;
        Ok(identity_from_user(user))
    }
}
