use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use snugglr_db::fmt_timestamp;
use snugglr_types::api::{
    AddCommentRequest, ApiSuccess, Claims, CommentResponse, ConfessionPage,
    CreateConfessionRequest, LikeResult, PageQuery, UserProfile,
};
use snugglr_types::models::{Confession, LikeTarget};

use crate::error::ApiError;
use crate::project::{comment_from_row, confession_from_row};
use crate::{AppState, AppStateInner};

pub async fn create_confession(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConfessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::InvalidInput("Confession text required".into()));
    }

    // Author and institution come from the token, never from the request
    // body, so a caller can't post into another institution's feed.
    let id = Uuid::new_v4();
    let now = Utc::now();
    state.db.insert_confession(
        &id.to_string(),
        &claims.sub.to_string(),
        &claims.institution.to_string(),
        text,
        &fmt_timestamp(now),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(Confession {
            id,
            author_id: claims.sub,
            institution_id: claims.institution,
            body: text.to_string(),
            likes_count: 0,
            created_at: now,
        })),
    ))
}

pub async fn get_confessions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.max(1).min(200);
    let offset = (page - 1).saturating_mul(limit);
    let institution = claims.institution.to_string();

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let (rows, total) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_confessions(&institution, limit, offset)?;
        let total = db.db.count_confessions(&institution)?;
        Ok::<_, anyhow::Error>((rows, total))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))??;

    Ok(Json(ApiSuccess::new(ConfessionPage {
        confessions: rows.into_iter().map(confession_from_row).collect(),
        current_page: page,
        total_pages: total.div_ceil(limit as u64) as u32,
        total_confessions: total,
    })))
}

pub async fn like_confession(
    State(state): State<AppState>,
    Path(confession_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Institution scoping happens here, not in the ledger: a confession in
    // another institution is simply not found.
    state
        .db
        .get_confession(&confession_id.to_string(), &claims.institution.to_string())?
        .ok_or_else(|| ApiError::NotFound("Confession not found".into()))?;

    let liked = toggle(
        &state,
        &claims,
        &confession_id.to_string(),
        LikeTarget::Confession,
    )?;

    Ok(Json(ApiSuccess::new(LikeResult { liked })))
}

pub async fn like_comment(
    State(state): State<AppState>,
    Path((confession_id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let _ = confession_id; // target is resolved by comment id alone

    if !state.db.comment_exists(&comment_id.to_string())? {
        return Err(ApiError::NotFound("Comment not found".into()));
    }

    let liked = toggle(&state, &claims, &comment_id.to_string(), LikeTarget::Comment)?;

    Ok(Json(ApiSuccess::new(LikeResult { liked })))
}

fn toggle(
    state: &AppStateInner,
    claims: &Claims,
    target_id: &str,
    target: LikeTarget,
) -> Result<bool, ApiError> {
    let liked = state.db.toggle_like(
        &Uuid::new_v4().to_string(),
        &claims.sub.to_string(),
        target_id,
        target,
        &fmt_timestamp(Utc::now()),
    )?;
    Ok(liked)
}

pub async fn comment_on_confession(
    State(state): State<AppState>,
    Path(confession_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    add_comment(state, claims, confession_id, None, req).await
}

pub async fn reply_to_comment(
    State(state): State<AppState>,
    Path((confession_id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    add_comment(state, claims, confession_id, Some(comment_id), req).await
}

async fn add_comment(
    state: AppState,
    claims: Claims,
    confession_id: Uuid,
    parent_comment_id: Option<Uuid>,
    req: AddCommentRequest,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::InvalidInput("Comment text required".into()));
    }

    state
        .db
        .get_confession(&confession_id.to_string(), &claims.institution.to_string())?
        .ok_or_else(|| ApiError::NotFound("Confession not found".into()))?;

    // A reply's parent must exist under this same confession; a parent
    // from another confession looks absent on purpose.
    if let Some(parent) = parent_comment_id {
        if !state
            .db
            .comment_exists_in(&parent.to_string(), &confession_id.to_string())?
        {
            return Err(ApiError::NotFound("Comment not found".into()));
        }
    }

    let author = state
        .db
        .get_user(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow!("no profile row for principal {}", claims.sub)))?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    state.db.insert_comment(
        &id.to_string(),
        &confession_id.to_string(),
        &author.id,
        text,
        parent_comment_id.map(|p| p.to_string()).as_deref(),
        &fmt_timestamp(now),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(CommentResponse {
            id,
            confession_id,
            author: UserProfile {
                id: claims.sub,
                username: author.username,
                display_name: author.display_name,
                avatar_url: author.avatar_url,
            },
            text: text.to_string(),
            parent_comment_id,
            likes_count: 0,
            created_at: now,
        })),
    ))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(confession_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .get_confession(&confession_id.to_string(), &claims.institution.to_string())?
        .ok_or_else(|| ApiError::NotFound("Confession not found".into()))?;

    // Flat, oldest-first; clients shape the reply tree themselves.
    let db = state.clone();
    let cid = confession_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_comments(&cid))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))??;

    let comments: Vec<_> = rows.into_iter().map(comment_from_row).collect();
    Ok(Json(ApiSuccess::new(comments)))
}
