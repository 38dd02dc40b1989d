use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use snugglr_db::fmt_timestamp;
use snugglr_types::api::{ApiSuccess, Claims, CreateGroupChatRequest, CreatePersonalChatRequest};
use snugglr_types::pair::canonical_pair;

use crate::error::ApiError;
use crate::project::chat_from_row;
use crate::AppState;

/// Resolve (or create) the one personal chat between the caller and
/// another user. Argument order never matters: the pair is canonicalized
/// before it touches storage, and the uniqueness constraint makes sure a
/// creation race leaves exactly one row — the loser silently gets the
/// winner's chat back.
pub async fn create_personal_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePersonalChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.user_id == claims.sub {
        return Err(ApiError::InvalidInput(
            "Cannot start a chat with yourself".into(),
        ));
    }

    state
        .db
        .get_user(&req.user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let (low, high) = canonical_pair(claims.sub, req.user_id);

    let (row, created) = state.db.get_or_create_personal_chat(
        &Uuid::new_v4().to_string(),
        &claims.institution.to_string(),
        &low.to_string(),
        &high.to_string(),
        &fmt_timestamp(Utc::now()),
    )?;

    let members = state.db.get_chat_members(&row.id)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(ApiSuccess::new(chat_from_row(row, members)))))
}

pub async fn create_group_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group_name = req.group_name.trim();
    if group_name.is_empty() {
        return Err(ApiError::InvalidInput("Group name required".into()));
    }
    if req.users.len() < 2 {
        return Err(ApiError::InvalidInput(
            "Group chats need at least two members".into(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    if !req.users.iter().all(|u| seen.insert(u)) {
        return Err(ApiError::InvalidInput(
            "Duplicate members in group chat".into(),
        ));
    }

    let users: Vec<String> = req.users.iter().map(|u| u.to_string()).collect();
    for user_id in &users {
        state
            .db
            .get_user(user_id)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    }

    let id = Uuid::new_v4();
    state.db.create_group_chat(
        &id.to_string(),
        &claims.institution.to_string(),
        group_name,
        &users,
        &fmt_timestamp(Utc::now()),
    )?;

    let row = state
        .db
        .get_chat(&id.to_string(), &claims.institution.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("group chat {} vanished after insert", id)))?;
    let members = state.db.get_chat_members(&row.id)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(chat_from_row(row, members))),
    ))
}
