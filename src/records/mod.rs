use axum::{routing::get, Router};

use crate::state::AppState;

pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/:kind", get(handlers::list).post(handlers::create))
}
