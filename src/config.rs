use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// OAuth credentials per identity provider. A missing client id means the
/// provider is simply not offered for login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfig {
    pub google_client_id: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub microsoft_client_id: Option<String>,
    pub microsoft_client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Deployment stage, used to namespace store table names.
    pub stage: String,
    pub cors_origin: String,
    pub jwt: JwtConfig,
    pub oauth: OAuthConfig,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
        };
        let oauth = OAuthConfig {
            google_client_id: env_opt("GOOGLE_CLIENT_ID"),
            github_client_id: env_opt("GITHUB_CLIENT_ID"),
            github_client_secret: env_opt("GITHUB_CLIENT_SECRET"),
            microsoft_client_id: env_opt("MICROSOFT_CLIENT_ID"),
            microsoft_client_secret: env_opt("MICROSOFT_CLIENT_SECRET"),
        };
        Ok(Self {
            stage: env_opt("STAGE").unwrap_or_else(|| "dev".into()),
            cors_origin: env_opt("CORS_ORIGIN").unwrap_or_else(|| "*".into()),
            jwt,
            oauth,
        })
    }

    /// Tables are named `donesuite-{stage}-{kind}`.
    pub fn table_prefix(&self) -> String {
        format!("donesuite-{}", self.stage)
    }
}
