use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError, state::AppState, store::RecordKind};

fn kind_from_path(segment: &str) -> Result<RecordKind, ApiError> {
    RecordKind::from_path(segment).ok_or(ApiError::NotFound)
}

#[instrument(skip(state, _claims))]
pub async fn list(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(kind): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let kind = kind_from_path(&kind)?;
    let items = state.store.list_records(kind).await?;
    Ok(Json(items))
}

#[instrument(skip(state, claims, payload))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(kind): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let kind = kind_from_path(&kind)?;
    let mut record = match payload {
        Value::Object(map) => map,
        _ => return Err(ApiError::Validation("Expected a JSON object".into())),
    };

    // Server-assigned fields win over anything the client sent.
    let id = format!("{}_{}", kind.as_str(), Uuid::new_v4().simple());
    let created_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format timestamp")?;
    record.insert("id".into(), json!(id.clone()));
    record.insert("createdBy".into(), json!(claims.id));
    record.insert("createdAt".into(), json!(created_at));

    let record = Value::Object(record);
    state.store.put_record(kind, record.clone()).await?;
    info!(record_id = %id, kind = kind.as_str(), "record created");
    Ok((StatusCode::CREATED, Json(record)))
}
