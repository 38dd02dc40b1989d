use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role carried in the JWT. Issuance lives in the account service;
/// this backend only reads it for the admin gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

/// What a like points at. Stored as a discriminant column next to an opaque
/// target id, so one ledger covers confessions and comments alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTarget {
    Confession,
    Comment,
}

impl LikeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeTarget::Confession => "confession",
            LikeTarget::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Personal,
    Group,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Personal => "personal",
            ChatKind::Group => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confession {
    pub id: Uuid,
    pub author_id: Uuid,
    pub institution_id: Uuid,
    pub body: String,
    pub likes_count: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn confession_serializes_camel_case() {
        let confession = Confession {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            body: "test".into(),
            likes_count: 3,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&confession).unwrap();
        assert_eq!(json["likesCount"], 3);
        assert!(json.get("authorId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("likes_count").is_none());
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(LikeTarget::Confession).unwrap(), "confession");
        assert_eq!(serde_json::to_value(ChatKind::Personal).unwrap(), "personal");
        assert_eq!(serde_json::to_value(MessageKind::System).unwrap(), "system");
        assert_eq!(serde_json::to_value(Role::Superadmin).unwrap(), "superadmin");
    }
}
