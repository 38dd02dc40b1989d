use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatKind, Confession, MessageKind, Role};

// -- JWT Claims --

/// Resolved principal attached to every request. Canonical definition lives
/// here so the REST middleware and any future consumers share one shape.
/// Tokens are issued by the account service; this backend only validates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub institution: Uuid,
    pub role: Role,
    pub exp: usize,
}

// -- Response envelope --

/// Every successful response is `{"success": true, "data": ...}`; failures
/// carry `{"success": false, "message": ...}` and come from the API error
/// type.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Display-safe user projection attached to comments and messages. The
/// account system owns the profile data; we only join against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

// -- Confessions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConfessionRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfessionPage {
    pub confessions: Vec<Confession>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_confessions: u64,
}

#[derive(Debug, Serialize)]
pub struct LikeResult {
    pub liked: bool,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub author: UserProfile,
    pub text: String,
    pub parent_comment_id: Option<Uuid>,
    pub likes_count: u64,
    pub created_at: DateTime<Utc>,
}

// -- Chats --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct CreatePersonalChatRequest {
    /// The other participant; the caller is taken from the token.
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct CreateGroupChatRequest {
    pub users: Vec<Uuid>,
    pub group_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: Uuid,
    pub institution_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub group_name: Option<String>,
    pub users: Vec<Uuid>,
    pub revealed: bool,
    pub created_at: DateTime<Utc>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender: UserProfile,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub read_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePagination {
    pub page: u32,
    pub limit: u32,
    pub total_messages: u64,
    pub total_pages: u32,
}

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    pub pagination: MessagePagination,
    pub revealed: bool,
}

// -- Match pool --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinPoolRequest {
    pub mood: String,
    pub description: Option<String>,
}

// -- Shared query params --

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}
