use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::OAuthConfig;
use crate::store::Provider;

mod github;
mod google;
mod microsoft;

pub use github::GithubProvider;
pub use google::GoogleProvider;
pub use microsoft::MicrosoftProvider;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("donesuite/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FederationError {
    /// No provider registered under this name. Client-facing (400).
    #[error("unsupported provider \"{0}\"")]
    Unsupported(String),
    /// The provider refused the presented token.
    #[error("{provider} rejected the token: {reason}")]
    Rejected {
        provider: &'static str,
        reason: String,
    },
    /// Transport failure or unexpected upstream response.
    #[error("{provider} call failed: {source}")]
    Upstream {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Identity vouched for by a third-party provider, normalized so the auth
/// layer can upsert by the provider-qualified `id` (`{provider}_{subject}`).
#[derive(Debug, Clone)]
pub struct NormalizedIdentity {
    pub id: String,
    pub provider: Provider,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// One upstream identity protocol. Implementations own their HTTP and crypto
/// quirks; callers only see the normalized identity or a `FederationError`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn exchange_token(&self, token: &str) -> Result<NormalizedIdentity, FederationError>;
}

/// Lookup over the registered identity providers.
pub struct FederationClient {
    providers: HashMap<&'static str, Arc<dyn IdentityProvider>>,
}

impl FederationClient {
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn IdentityProvider>>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.name(), p)).collect(),
        }
    }

    /// Build the provider set from configuration. GitHub and Microsoft only
    /// need an HTTP client; Google needs a client id to pin the token
    /// audience, so it is registered only when one is configured.
    pub fn from_config(oauth: &OAuthConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        let mut providers: Vec<Arc<dyn IdentityProvider>> = vec![
            Arc::new(GithubProvider::new(http.clone())),
            Arc::new(MicrosoftProvider::new(http.clone())),
        ];
        if let Some(client_id) = &oauth.google_client_id {
            providers.push(Arc::new(GoogleProvider::new(http, client_id.clone())));
        }

        let client = Self::new(providers);
        info!(providers = ?client.provider_names(), "identity providers registered");
        Ok(client)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub async fn exchange(
        &self,
        provider: &str,
        token: &str,
    ) -> Result<NormalizedIdentity, FederationError> {
        let p = self
            .providers
            .get(provider)
            .ok_or_else(|| FederationError::Unsupported(provider.to_string()))?;
        p.exchange_token(token).await
    }
}
