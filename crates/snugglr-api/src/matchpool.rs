use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use serde_json::json;

use snugglr_db::fmt_timestamp;
use snugglr_types::api::{Claims, JoinPoolRequest};

use crate::error::ApiError;
use crate::AppState;

/// Join (or re-join) the match pool. One entry per user: a re-join
/// overwrites mood and description and always pushes the expiry out to a
/// full day from now, even with an unchanged mood.
pub async fn join_pool(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinPoolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mood = req.mood.trim();
    if mood.is_empty() {
        return Err(ApiError::InvalidInput("Mood is required".into()));
    }

    let now = Utc::now();
    state.db.upsert_pool_entry(
        &claims.sub.to_string(),
        &claims.institution.to_string(),
        mood,
        req.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
        &fmt_timestamp(now + Duration::days(1)),
        &fmt_timestamp(now),
    )?;

    Ok(Json(json!({ "success": true, "message": "Joined match pool" })))
}

/// Leaving when not in the pool is a no-op, not an error.
pub async fn leave_pool(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_pool_entry(&claims.sub.to_string())?;

    Ok(Json(json!({ "success": true, "message": "Left match pool" })))
}
