use crate::models::UserRow;
use crate::{Database, OptionalExt};
use anyhow::Result;

impl Database {
    /// Projection sync hook: the account service pushes display-safe
    /// profile fields here. Existing rows are overwritten in place.
    pub fn upsert_user(
        &self,
        id: &str,
        username: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, display_name, avatar_url) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     username = excluded.username,
                     display_name = excluded.display_name,
                     avatar_url = excluded.avatar_url",
                rusqlite::params![id, username, display_name, avatar_url],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, display_name, avatar_url FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                        avatar_url: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }
}
