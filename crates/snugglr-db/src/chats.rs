use crate::models::{ChatRow, MessageRow, ReadRow};
use crate::{Database, OptionalExt};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

impl Database {
    // -- Chats --

    /// Resolve the one personal chat for a canonical user pair, creating it
    /// if absent. `user_low`/`user_high` must already be canonically
    /// ordered. The UNIQUE(institution_id, pair_key) constraint is the
    /// arbiter under concurrency: a lost insert race just means someone
    /// else created the row first, so we fetch and return the survivor.
    /// Returns the chat plus whether this call created it.
    pub fn get_or_create_personal_chat(
        &self,
        id: &str,
        institution_id: &str,
        user_low: &str,
        user_high: &str,
        created_at: &str,
    ) -> Result<(ChatRow, bool)> {
        let pair_key = format!("{user_low}:{user_high}");

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO chats (id, institution_id, kind, pair_key, revealed, created_at)
                 VALUES (?1, ?2, 'personal', ?3, 0, ?4)",
                rusqlite::params![id, institution_id, pair_key, created_at],
            )?;

            if inserted > 0 {
                tx.execute(
                    "INSERT INTO chat_members (chat_id, user_id, position) VALUES (?1, ?2, 0), (?1, ?3, 1)",
                    rusqlite::params![id, user_low, user_high],
                )?;
            }

            let row = query_chat_by_pair(&tx, institution_id, &pair_key)?
                .ok_or_else(|| anyhow!("personal chat vanished for pair {}", pair_key))?;

            tx.commit()?;
            Ok((row, inserted > 0))
        })
    }

    pub fn create_group_chat(
        &self,
        id: &str,
        institution_id: &str,
        group_name: &str,
        users: &[String],
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO chats (id, institution_id, kind, group_name, revealed, created_at)
                 VALUES (?1, ?2, 'group', ?3, 0, ?4)",
                rusqlite::params![id, institution_id, group_name, created_at],
            )?;

            for (position, user_id) in users.iter().enumerate() {
                tx.execute(
                    "INSERT INTO chat_members (chat_id, user_id, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![id, user_id, position as i64],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    /// Institution-scoped chat lookup; cross-tenant chats are invisible.
    pub fn get_chat(&self, id: &str, institution_id: &str) -> Result<Option<ChatRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, institution_id, kind, group_name, revealed, created_at
                 FROM chats WHERE id = ?1 AND institution_id = ?2",
                [id, institution_id],
                map_chat_row,
            )
            .optional()
        })
    }

    /// Member ids in stored order (canonical order for personal chats).
    pub fn get_chat_members(&self, chat_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM chat_members WHERE chat_id = ?1 ORDER BY position ASC",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    /// Reveal hook for the matching workflow: flips whether participant
    /// identities are shown to each other.
    pub fn set_revealed(&self, chat_id: &str, revealed: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chats SET revealed = ?2 WHERE id = ?1",
                rusqlite::params![chat_id, revealed],
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        chat_id: &str,
        sender_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender_id, body, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'text', ?5)",
                rusqlite::params![id, chat_id, sender_id, body, created_at],
            )?;
            Ok(())
        })
    }

    /// One page of a chat's log, latest first. Sender fields are joined in
    /// for the display projection (eliminates N+1).
    pub fn list_messages(&self, chat_id: &str, limit: u32, offset: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.chat_id, m.sender_id, u.username, u.display_name, u.avatar_url,
                        m.body, m.kind, m.created_at
                 FROM messages m
                 JOIN users u ON m.sender_id = u.id
                 WHERE m.chat_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![chat_id, limit, offset], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_username: row.get(3)?,
                        sender_display_name: row.get(4)?,
                        sender_avatar_url: row.get(5)?,
                        body: row.get(6)?,
                        kind: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_messages(&self, chat_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
                [chat_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Batch-fetch the readBy sets for a page of message IDs.
    pub fn get_reads_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReadRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT message_id, user_id FROM message_reads WHERE message_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReadRow {
                        message_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_chat_by_pair(
    conn: &Connection,
    institution_id: &str,
    pair_key: &str,
) -> Result<Option<ChatRow>> {
    conn.query_row(
        "SELECT id, institution_id, kind, group_name, revealed, created_at
         FROM chats WHERE institution_id = ?1 AND pair_key = ?2",
        [institution_id, pair_key],
        map_chat_row,
    )
    .optional()
}

fn map_chat_row(row: &rusqlite::Row<'_>) -> std::result::Result<ChatRow, rusqlite::Error> {
    Ok(ChatRow {
        id: row.get(0)?,
        institution_id: row.get(1)?,
        kind: row.get(2)?,
        group_name: row.get(3)?,
        revealed: row.get(4)?,
        created_at: row.get(5)?,
    })
}
