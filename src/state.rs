use std::sync::Arc;

use crate::config::AppConfig;
use crate::federation::FederationClient;
use crate::store::{DynamoStore, MemoryStore, Store};

/// Shared, read-only request context. Everything here is constructed once at
/// startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub federation: Arc<FederationClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(DynamoStore::connect(config.table_prefix()).await) as Arc<dyn Store>;
        let federation = Arc::new(FederationClient::from_config(&config.oauth)?);
        Ok(Self {
            config,
            store,
            federation,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn Store>,
        federation: Arc<FederationClient>,
    ) -> Self {
        Self {
            config,
            store,
            federation,
        }
    }

    /// In-memory state for tests and local experiments: no AWS, no upstream
    /// identity providers.
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, OAuthConfig};

        let config = Arc::new(AppConfig {
            stage: "test".into(),
            cors_origin: "*".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
            },
            oauth: OAuthConfig::default(),
        });
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
            federation: Arc::new(FederationClient::new(vec![])),
        }
    }
}
