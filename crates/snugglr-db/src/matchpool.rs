use crate::models::PoolEntryRow;
use crate::{Database, OptionalExt};
use anyhow::Result;

impl Database {
    /// Join (or re-join) the match pool. Keyed on user_id: a second join
    /// overwrites mood, description and expiry in place, so a user never
    /// holds more than one entry. The original created_at survives
    /// re-joins.
    pub fn upsert_pool_entry(
        &self,
        user_id: &str,
        institution_id: &str,
        mood: &str,
        description: Option<&str>,
        expires_at: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO match_pool (user_id, institution_id, mood, description, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id) DO UPDATE SET
                     institution_id = excluded.institution_id,
                     mood = excluded.mood,
                     description = excluded.description,
                     expires_at = excluded.expires_at",
                rusqlite::params![user_id, institution_id, mood, description, expires_at, created_at],
            )?;
            Ok(())
        })
    }

    /// Idempotent: deleting an absent entry is a no-op.
    pub fn delete_pool_entry(&self, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM match_pool WHERE user_id = ?1", [user_id])?;
            Ok(())
        })
    }

    /// Expiry is passive: rows past expires_at are simply filtered out
    /// here; an external maintenance job may reap them.
    pub fn get_active_pool_entry(&self, user_id: &str, now: &str) -> Result<Option<PoolEntryRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, institution_id, mood, description, expires_at, created_at
                 FROM match_pool WHERE user_id = ?1 AND expires_at > ?2",
                [user_id, now],
                |row| {
                    Ok(PoolEntryRow {
                        user_id: row.get(0)?,
                        institution_id: row.get(1)?,
                        mood: row.get(2)?,
                        description: row.get(3)?,
                        expires_at: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::fmt_timestamp;
    use crate::test_support::{db, now, seed_user};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn rejoin_replaces_the_entry_in_place() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let u = seed_user(&d, "u");
        let expires = fmt_timestamp(Utc::now() + Duration::days(1));

        d.upsert_pool_entry(&u, &inst, "happy", None, &expires, &now())
            .unwrap();
        d.upsert_pool_entry(&u, &inst, "sad", Some("desc"), &expires, &now())
            .unwrap();

        let entry = d.get_active_pool_entry(&u, &now()).unwrap().unwrap();
        assert_eq!(entry.mood, "sad");
        assert_eq!(entry.description.as_deref(), Some("desc"));

        let total: u64 = d
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM match_pool", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn expired_entries_are_invisible() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let u = seed_user(&d, "u");
        let expired = fmt_timestamp(Utc::now() - Duration::hours(1));

        d.upsert_pool_entry(&u, &inst, "lonely", None, &expired, &now())
            .unwrap();
        assert!(d.get_active_pool_entry(&u, &now()).unwrap().is_none());

        // Re-joining refreshes the expiry and revives the entry
        let fresh = fmt_timestamp(Utc::now() + Duration::days(1));
        d.upsert_pool_entry(&u, &inst, "lonely", None, &fresh, &now())
            .unwrap();
        assert!(d.get_active_pool_entry(&u, &now()).unwrap().is_some());
    }

    #[test]
    fn leave_is_idempotent() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let u = seed_user(&d, "u");

        // Absent entry: not an error
        d.delete_pool_entry(&u).unwrap();

        let expires = fmt_timestamp(Utc::now() + Duration::days(1));
        d.upsert_pool_entry(&u, &inst, "happy", None, &expires, &now())
            .unwrap();
        d.delete_pool_entry(&u).unwrap();
        d.delete_pool_entry(&u).unwrap();
        assert!(d.get_active_pool_entry(&u, &now()).unwrap().is_none());
    }
}
