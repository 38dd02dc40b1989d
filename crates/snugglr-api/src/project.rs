//! Row-to-response projection. SQLite hands back text ids and timestamps;
//! corrupt values are logged and defaulted rather than failing the whole
//! page, matching how the read paths degrade elsewhere.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use snugglr_db::models::{ChatRow, CommentRow, ConfessionRow, MessageRow};
use snugglr_types::api::{ChatResponse, CommentResponse, MessageResponse, UserProfile};
use snugglr_types::models::{ChatKind, Confession, MessageKind};

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(raw: &str, what: &str) -> DateTime<Utc> {
    snugglr_db::parse_timestamp(raw).unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on {}: {}", raw, what, e);
        DateTime::default()
    })
}

pub(crate) fn confession_from_row(row: ConfessionRow) -> Confession {
    Confession {
        id: parse_uuid(&row.id, "confession id"),
        author_id: parse_uuid(&row.author_id, "confession author_id"),
        institution_id: parse_uuid(&row.institution_id, "confession institution_id"),
        body: row.body,
        likes_count: row.likes_count.max(0) as u64,
        created_at: parse_ts(&row.created_at, "confession"),
    }
}

pub(crate) fn comment_from_row(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_uuid(&row.id, "comment id"),
        confession_id: parse_uuid(&row.confession_id, "comment confession_id"),
        author: UserProfile {
            id: parse_uuid(&row.author_id, "comment author_id"),
            username: row.author_username,
            display_name: row.author_display_name,
            avatar_url: row.author_avatar_url,
        },
        text: row.body,
        parent_comment_id: row
            .parent_comment_id
            .as_deref()
            .map(|p| parse_uuid(p, "comment parent_comment_id")),
        likes_count: row.likes_count.max(0) as u64,
        created_at: parse_ts(&row.created_at, "comment"),
    }
}

pub(crate) fn message_from_row(row: MessageRow, read_by: Vec<Uuid>) -> MessageResponse {
    let kind = match row.kind.as_str() {
        "system" => MessageKind::System,
        _ => MessageKind::Text,
    };

    MessageResponse {
        id: parse_uuid(&row.id, "message id"),
        chat_id: parse_uuid(&row.chat_id, "message chat_id"),
        sender: UserProfile {
            id: parse_uuid(&row.sender_id, "message sender_id"),
            username: row.sender_username,
            display_name: row.sender_display_name,
            avatar_url: row.sender_avatar_url,
        },
        text: row.body,
        kind,
        read_by,
        created_at: parse_ts(&row.created_at, "message"),
    }
}

pub(crate) fn chat_from_row(row: ChatRow, members: Vec<String>) -> ChatResponse {
    let kind = match row.kind.as_str() {
        "group" => ChatKind::Group,
        _ => ChatKind::Personal,
    };

    ChatResponse {
        id: parse_uuid(&row.id, "chat id"),
        institution_id: parse_uuid(&row.institution_id, "chat institution_id"),
        kind,
        group_name: row.group_name,
        users: members
            .iter()
            .map(|m| parse_uuid(m, "chat member id"))
            .collect(),
        revealed: row.revealed,
        created_at: parse_ts(&row.created_at, "chat"),
    }
}
