/// Database row types — these map directly to SQLite rows.
/// Distinct from the snugglr-types API models to keep the DB layer
/// independent. Ids and timestamps stay as text here; parsing into
/// `Uuid`/`DateTime` happens at the API boundary.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub struct ConfessionRow {
    pub id: String,
    pub author_id: String,
    pub institution_id: String,
    pub body: String,
    pub likes_count: i64,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub confession_id: String,
    pub author_id: String,
    pub author_username: String,
    pub author_display_name: String,
    pub author_avatar_url: Option<String>,
    pub body: String,
    pub parent_comment_id: Option<String>,
    pub likes_count: i64,
    pub created_at: String,
}

pub struct ChatRow {
    pub id: String,
    pub institution_id: String,
    pub kind: String,
    pub group_name: Option<String>,
    pub revealed: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_display_name: String,
    pub sender_avatar_url: Option<String>,
    pub body: Option<String>,
    pub kind: String,
    pub created_at: String,
}

pub struct ReadRow {
    pub message_id: String,
    pub user_id: String,
}

pub struct PoolEntryRow {
    pub user_id: String,
    pub institution_id: String,
    pub mood: String,
    pub description: Option<String>,
    pub expires_at: String,
    pub created_at: String,
}
