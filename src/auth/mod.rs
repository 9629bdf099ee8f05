use axum::{routing::post, Router};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub(crate) mod extractors;
pub(crate) mod password;
pub(crate) mod session;

pub use extractors::AuthUser;
pub use session::SessionKeys;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/oauth", post(handlers::oauth))
}
