use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, OAuthRequest, PublicUser, RegisterRequest},
        password,
        session::SessionKeys,
    },
    error::ApiError,
    state::AppState,
    store::{Provider, Role, User},
};

const MIN_PASSWORD_LEN: usize = 6;

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn auth_response(keys: &SessionKeys, user: &User) -> Result<AuthResponse, ApiError> {
    let token = keys.issue(user)?;
    Ok(AuthResponse {
        user: PublicUser::from(user),
        token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (name, email, password) = match (
        non_empty(payload.name),
        non_empty(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) {
        (Some(name), Some(email), Some(password)) => (name, email.to_lowercase(), password),
        _ => {
            return Err(ApiError::Validation(
                "Name, email, and password are required".into(),
            ))
        }
    };

    if password.len() < MIN_PASSWORD_LEN {
        warn!("registration with too-short password");
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    if state.store.find_password_user(&email).await?.is_some() {
        warn!(email = %email, "registration for already-registered email");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = password::hash_password(&password)?;
    let user = User {
        id: format!("user_{}", Uuid::new_v4().simple()),
        email: Some(email),
        name: Some(name),
        avatar: None,
        password_hash: Some(hash),
        role: Role::User,
        provider: Provider::Email,
        created_at: OffsetDateTime::now_utc(),
    };
    let user = state.store.create_user(user).await?.into_user();

    let keys = SessionKeys::from_ref(&state);
    let response = auth_response(&keys, &user)?;
    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (email, password) = match (
        non_empty(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) {
        (Some(email), Some(password)) => (email.to_lowercase(), password),
        _ => {
            return Err(ApiError::Validation(
                "Email and password are required".into(),
            ))
        }
    };

    // Unknown email and wrong password produce the same rejection so a caller
    // cannot enumerate registered addresses.
    let user = match state.store.find_password_user(&email).await? {
        Some(user)
            if user
                .password_hash
                .as_deref()
                .is_some_and(|hash| password::verify_password(&password, hash)) =>
        {
            user
        }
        _ => {
            warn!(email = %email, "login rejected");
            return Err(ApiError::Authentication("Invalid email or password".into()));
        }
    };

    let keys = SessionKeys::from_ref(&state);
    let response = auth_response(&keys, &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn oauth(
    State(state): State<AppState>,
    Json(payload): Json<OAuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (provider, token) = match (non_empty(payload.provider), payload.token) {
        (Some(provider), Some(token)) if !token.is_empty() => (provider, token),
        _ => {
            return Err(ApiError::Validation(
                "Provider and token are required".into(),
            ))
        }
    };

    let identity = state.federation.exchange(&provider, &token).await?;

    // First login creates the record; later logins reuse it verbatim. Profile
    // changes at the provider are not mirrored after creation.
    let user = match state.store.get_user(&identity.id).await? {
        Some(existing) => existing,
        None => {
            let candidate = User {
                id: identity.id.clone(),
                email: identity.email,
                name: identity.name,
                avatar: identity.avatar,
                password_hash: None,
                role: Role::User,
                provider: identity.provider,
                created_at: OffsetDateTime::now_utc(),
            };
            state.store.create_user(candidate).await?.into_user()
        }
    };

    let keys = SessionKeys::from_ref(&state);
    let response = auth_response(&keys, &user)?;
    info!(user_id = %user.id, provider = %user.provider, "federated login");
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, JwtConfig, OAuthConfig};
    use crate::federation::{
        FederationClient, FederationError, IdentityProvider, NormalizedIdentity,
    };
    use crate::store::{MemoryStore, Store};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubGoogle {
        subject: &'static str,
    }

    #[async_trait]
    impl IdentityProvider for StubGoogle {
        fn name(&self) -> &'static str {
            "google"
        }
        async fn exchange_token(
            &self,
            _token: &str,
        ) -> Result<NormalizedIdentity, FederationError> {
            Ok(NormalizedIdentity {
                id: format!("google_{}", self.subject),
                provider: Provider::Google,
                email: Some("ada@example.com".into()),
                name: Some("Ada".into()),
                avatar: Some("https://lh3.example/pic".into()),
            })
        }
    }

    fn test_state(federation: FederationClient) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(AppConfig {
            stage: "test".into(),
            cors_origin: "*".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
            },
            oauth: OAuthConfig::default(),
        });
        let state = AppState::from_parts(
            config,
            store.clone() as Arc<dyn Store>,
            Arc::new(federation),
        );
        (state, store)
    }

    fn register_body(name: &str, email: &str, password: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        })
    }

    fn login_body(email: &str, password: &str) -> Json<LoginRequest> {
        Json(LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        })
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let (state, _) = test_state(FederationClient::new(vec![]));

        let (status, Json(registered)) = register(
            State(state.clone()),
            register_body("Ada", "ada@example.com", "secret1"),
        )
        .await
        .expect("register succeeds");
        assert_eq!(status, StatusCode::CREATED);

        let keys = SessionKeys::from_ref(&state);
        let claims = keys.verify(&registered.token).expect("token verifies");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.provider, Provider::Email);

        let Json(logged_in) = login(
            State(state.clone()),
            login_body("ada@example.com", "secret1"),
        )
        .await
        .expect("login succeeds");
        let login_claims = keys.verify(&logged_in.token).expect("token verifies");
        assert_eq!(login_claims.id, claims.id);
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn register_rejects_short_password_without_creating_user() {
        let (state, store) = test_state(FederationClient::new(vec![]));
        let err = register(
            State(state),
            register_body("Ada", "ada@example.com", "short"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let (state, _) = test_state(FederationClient::new(vec![]));
        let err = register(
            State(state),
            Json(RegisterRequest {
                name: None,
                email: Some("ada@example.com".into()),
                password: Some("secret1".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_one_record() {
        let (state, store) = test_state(FederationClient::new(vec![]));
        register(
            State(state.clone()),
            register_body("Ada", "ada@example.com", "secret1"),
        )
        .await
        .expect("first registration");

        let err = register(
            State(state),
            register_body("Ada Again", "ada@example.com", "other-secret"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (state, _) = test_state(FederationClient::new(vec![]));
        register(
            State(state.clone()),
            register_body("Ada", "ada@example.com", "secret1"),
        )
        .await
        .expect("register");

        let wrong_password = login(
            State(state.clone()),
            login_body("ada@example.com", "wrong-password"),
        )
        .await
        .unwrap_err();
        let unknown_email = login(State(state), login_body("nobody@example.com", "secret1"))
            .await
            .unwrap_err();

        match (&wrong_password, &unknown_email) {
            (ApiError::Authentication(a), ApiError::Authentication(b)) => assert_eq!(a, b),
            other => panic!("expected authentication errors, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_rejects_missing_fields() {
        let (state, _) = test_state(FederationClient::new(vec![]));
        let err = login(
            State(state),
            Json(LoginRequest {
                email: Some("ada@example.com".into()),
                password: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn oauth_login_is_idempotent_per_subject() {
        let providers: Vec<Arc<dyn IdentityProvider>> =
            vec![Arc::new(StubGoogle { subject: "12345" })];
        let (state, store) = test_state(FederationClient::new(providers));

        let body = || {
            Json(OAuthRequest {
                provider: Some("google".into()),
                token: Some("provider-token".into()),
            })
        };

        let Json(first) = oauth(State(state.clone()), body()).await.expect("first login");
        assert_eq!(first.user.id, "google_12345");
        assert_eq!(store.user_count(), 1);

        let Json(second) = oauth(State(state), body()).await.expect("repeat login");
        assert_eq!(second.user.id, "google_12345");
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn oauth_reuses_stored_profile_verbatim() {
        let providers: Vec<Arc<dyn IdentityProvider>> =
            vec![Arc::new(StubGoogle { subject: "12345" })];
        let (state, store) = test_state(FederationClient::new(providers));

        // Pre-existing record with a stale display name.
        let stored = User {
            id: "google_12345".into(),
            email: Some("ada@example.com".into()),
            name: Some("Old Name".into()),
            avatar: None,
            password_hash: None,
            role: Role::Admin,
            provider: Provider::Google,
            created_at: OffsetDateTime::now_utc(),
        };
        store.create_user(stored).await.unwrap();

        let Json(response) = oauth(
            State(state),
            Json(OAuthRequest {
                provider: Some("google".into()),
                token: Some("provider-token".into()),
            }),
        )
        .await
        .expect("login");
        assert_eq!(response.user.name.as_deref(), Some("Old Name"));
        assert_eq!(response.user.role, Role::Admin);
    }

    #[tokio::test]
    async fn oauth_rejects_unsupported_provider() {
        let (state, _) = test_state(FederationClient::new(vec![]));
        let err = oauth(
            State(state),
            Json(OAuthRequest {
                provider: Some("gitlab".into()),
                token: Some("tok".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Federation(FederationError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn oauth_rejects_missing_fields() {
        let (state, _) = test_state(FederationClient::new(vec![]));
        let err = oauth(
            State(state),
            Json(OAuthRequest {
                provider: Some("google".into()),
                token: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
