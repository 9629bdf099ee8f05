use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{FederationError, IdentityProvider, NormalizedIdentity};
use crate::store::Provider;

const USER_URL: &str = "https://api.github.com/user";

/// Treats the presented value as an opaque access token and asks GitHub who
/// it belongs to. Transport is the trust boundary; the response JSON is
/// trusted as-is.
pub struct GithubProvider {
    http: reqwest::Client,
    user_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl GithubProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            user_url: USER_URL.to_string(),
        }
    }
}

pub(crate) fn identity_from_user(user: GithubUser) -> NormalizedIdentity {
    NormalizedIdentity {
        id: format!("github_{}", user.id),
        provider: Provider::Github,
        email: user.email,
        // GitHub's display name is optional; fall back to the login handle.
        name: user.name.or(Some(user.login)),
        avatar: user.avatar_url,
    }
}

#[async_trait]
impl IdentityProvider for GithubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn exchange_token(&self, token: &str) -> Result<NormalizedIdentity, FederationError> {
        let response = self
            .http
            .get(&self.user_url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .context("request to github user endpoint")
            .map_err(|source| FederationError::Upstream {
                provider: "github",
                source,
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FederationError::Rejected {
                    provider: "github",
                    reason: format!("user endpoint returned {}", response.status()),
                });
            }
            status if !status.is_success() => {
                return Err(FederationError::Upstream {
                    provider: "github",
                    source: anyhow::anyhow!("user endpoint returned {status}"),
                });
            }
            _ => {}
        }

        let user = response
            .json::<GithubUser>()
            .await
            .context("parse github user response")
            .map_err(|source| FederationError::Upstream {
                provider: "github",
                source,
            })?;
        Ok(identity_from_user(user))
    }
}
