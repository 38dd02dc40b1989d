use std::collections::HashMap;

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
use snugglr_db::models::ChatRow;
use snugglr_types::api::{
    ApiSuccess, Claims, MessagePage, MessagePagination, MessageResponse, PageQuery,
    SendMessageRequest, UserProfile,
};
use snugglr_types::models::MessageKind;

use crate::error::ApiError;
use crate::project::{message_from_row, parse_uuid};
use crate::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::InvalidInput("Message text is required".into()));
    }

    let (_chat, members) = load_chat(&state, chat_id, &claims)?;
    if !members.contains(&claims.sub.to_string()) {
        return Err(ApiError::Forbidden(
            "You are not allowed to send messages in this chat".into(),
        ));
    }

    let sender = state
        .db
        .get_user(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow!("no profile row for principal {}", claims.sub)))?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    state.db.insert_message(
        &id.to_string(),
        &chat_id.to_string(),
        &sender.id,
        text,
        &fmt_timestamp(now),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(MessageResponse {
            id,
            chat_id,
            sender: UserProfile {
                id: claims.sub,
                username: sender.username,
                display_name: sender.display_name,
                avatar_url: sender.avatar_url,
            },
            text: Some(text.to_string()),
            kind: MessageKind::Text,
            read_by: vec![],
            created_at: now,
        })),
    ))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (chat, members) = load_chat(&state, chat_id, &claims)?;
    if !members.contains(&claims.sub.to_string()) {
        return Err(ApiError::Forbidden(
            "You are not a participant of this chat".into(),
        ));
    }

    let page = query.page.max(1);
    let limit = query.limit.max(1).min(200);
    let offset = (page - 1).saturating_mul(limit);

    // Run all blocking DB queries off the async runtime
    let db = state.clone();
    let cid = chat_id.to_string();
    let (rows, read_rows, total) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_messages(&cid, limit, offset)?;
        let message_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let read_rows = db.db.get_reads_for_messages(&message_ids)?;
        let total = db.db.count_messages(&cid)?;
        Ok::<_, anyhow::Error>((rows, read_rows, total))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))??;

    // Group readBy sets by message id (cheap in-memory work)
    let mut read_map: HashMap<String, Vec<Uuid>> = HashMap::new();
    for r in &read_rows {
        read_map
            .entry(r.message_id.clone())
            .or_default()
            .push(parse_uuid(&r.user_id, "message_reads user_id"));
    }

    let messages: Vec<MessageResponse> = rows
        .into_iter()
        .map(|row| {
            let read_by = read_map.remove(&row.id).unwrap_or_default();
            message_from_row(row, read_by)
        })
        .collect();

    Ok(Json(ApiSuccess::new(MessagePage {
        messages,
        pagination: MessagePagination {
            page,
            limit,
            total_messages: total,
            total_pages: total.div_ceil(limit as u64) as u32,
        },
        revealed: chat.revealed,
    })))
}

/// Institution-scoped chat fetch plus member list. Chats in another
/// institution are indistinguishable from absent ones.
fn load_chat(
    state: &AppState,
    chat_id: Uuid,
    claims: &Claims,
) -> Result<(ChatRow, Vec<String>), ApiError> {
    let chat = state
        .db
        .get_chat(&chat_id.to_string(), &claims.institution.to_string())?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))?;
    let members = state.db.get_chat_members(&chat.id)?;
    Ok((chat, members))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use snugglr_db::Database;
    use snugglr_types::models::Role;
    use snugglr_types::pair::canonical_pair;

    fn state() -> AppState {
        Arc::new(crate::AppStateInner {
            db: Database::open_in_memory().unwrap(),
        })
    }

    fn claims_for(user: Uuid, institution: Uuid) -> Claims {
        Claims {
            sub: user,
            institution,
            role: Role::User,
            exp: usize::MAX,
        }
    }

    fn seed_user(state: &AppState, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .upsert_user(&id.to_string(), name, name, None)
            .unwrap();
        id
    }

    fn seed_personal_chat(state: &AppState, institution: Uuid, a: Uuid, b: Uuid) -> Uuid {
        let (low, high) = canonical_pair(a, b);
        let (row, _) = state
            .db
            .get_or_create_personal_chat(
                &Uuid::new_v4().to_string(),
                &institution.to_string(),
                &low.to_string(),
                &high.to_string(),
                &fmt_timestamp(Utc::now()),
            )
            .unwrap();
        row.id.parse().unwrap()
    }

    #[tokio::test]
    async fn non_participants_cannot_send() {
        let state = state();
        let inst = Uuid::new_v4();
        let a = seed_user(&state, "a");
        let b = seed_user(&state, "b");
        let outsider = seed_user(&state, "outsider");
        let chat_id = seed_personal_chat(&state, inst, a, b);

        let err = send_message(
            State(state.clone()),
            Path(chat_id),
            Extension(claims_for(outsider, inst)),
            Json(SendMessageRequest { text: "hi".into() }),
        )
        .await
        .err()
        .expect("outsider send must be rejected");
        assert!(matches!(err, ApiError::Forbidden(_)));

        // The chat's log is unchanged
        assert_eq!(state.db.count_messages(&chat_id.to_string()).unwrap(), 0);

        // A participant's send lands
        let resp = send_message(
            State(state.clone()),
            Path(chat_id),
            Extension(claims_for(a, inst)),
            Json(SendMessageRequest { text: "hi".into() }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(state.db.count_messages(&chat_id.to_string()).unwrap(), 1);
    }

    #[tokio::test]
    async fn non_participants_cannot_read() {
        let state = state();
        let inst = Uuid::new_v4();
        let a = seed_user(&state, "a");
        let b = seed_user(&state, "b");
        let outsider = seed_user(&state, "outsider");
        let chat_id = seed_personal_chat(&state, inst, a, b);

        let err = get_messages(
            State(state.clone()),
            Path(chat_id),
            Query(PageQuery { page: 1, limit: 20 }),
            Extension(claims_for(outsider, inst)),
        )
        .await
        .err()
        .expect("outsider read must be rejected");
        assert!(matches!(err, ApiError::Forbidden(_)));

        // From another institution the chat does not exist at all
        let err = get_messages(
            State(state.clone()),
            Path(chat_id),
            Query(PageQuery { page: 1, limit: 20 }),
            Extension(claims_for(a, Uuid::new_v4())),
        )
        .await
        .err()
        .expect("cross-institution read must be rejected");
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
