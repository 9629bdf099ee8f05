use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::session::{Claims, SessionKeys};
use crate::error::ApiError;

/// Bearer-token gate for the data endpoints. Verifies the session token and
/// hands the handler the embedded claims; no store lookup happens here, so a
/// valid token is trusted for its whole validity window.
///
/// Missing header, wrong scheme and invalid token are rejected with one
/// uniform 401.
#[derive(Debug)]
pub struct AuthUser(pub Claims);

const REJECTION: &str = "Authentication required";

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Authentication(REJECTION.into()))?;

        match keys.verify(token) {
            Some(claims) => Ok(AuthUser(claims)),
            None => {
                warn!("request carried an invalid or expired session token");
                Err(ApiError::Authentication(REJECTION.into()))
            }
        }
    }
}
