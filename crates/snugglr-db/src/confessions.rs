use crate::models::{CommentRow, ConfessionRow};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Connection;
use snugglr_types::models::LikeTarget;

impl Database {
    // -- Confessions --

    pub fn insert_confession(
        &self,
        id: &str,
        author_id: &str,
        institution_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO confessions (id, author_id, institution_id, body, likes_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![id, author_id, institution_id, body, created_at],
            )?;
            Ok(())
        })
    }

    /// Institution-scoped lookup. A confession outside the caller's
    /// institution comes back as None, same as one that doesn't exist.
    pub fn get_confession(&self, id: &str, institution_id: &str) -> Result<Option<ConfessionRow>> {
        self.with_conn(|conn| query_confession(conn, id, institution_id))
    }

    /// One page of the institution's feed, newest first.
    pub fn list_confessions(
        &self,
        institution_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ConfessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, institution_id, body, likes_count, created_at
                 FROM confessions
                 WHERE institution_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![institution_id, limit, offset], |row| {
                    Ok(ConfessionRow {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        institution_id: row.get(2)?,
                        body: row.get(3)?,
                        likes_count: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_confessions(&self, institution_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM confessions WHERE institution_id = ?1",
                [institution_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        confession_id: &str,
        author_id: &str,
        body: &str,
        parent_comment_id: Option<&str>,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, confession_id, author_id, body, parent_comment_id, likes_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![id, confession_id, author_id, body, parent_comment_id, created_at],
            )?;
            Ok(())
        })
    }

    pub fn comment_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row("SELECT id FROM comments WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Reply scoping check: the parent must live under the same confession.
    /// A parent from a different confession is as good as absent.
    pub fn comment_exists_in(&self, id: &str, confession_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM comments WHERE id = ?1 AND confession_id = ?2",
                    [id, confession_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// All comments for a confession, oldest first, flat. Tree shaping is
    /// the client's job. Author fields are joined in to avoid N+1 lookups.
    pub fn list_comments(&self, confession_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.confession_id, c.author_id, u.username, u.display_name, u.avatar_url,
                        c.body, c.parent_comment_id, c.likes_count, c.created_at
                 FROM comments c
                 JOIN users u ON c.author_id = u.id
                 WHERE c.confession_id = ?1
                 ORDER BY c.created_at ASC, c.rowid ASC",
            )?;

            let rows = stmt
                .query_map([confession_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        confession_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        author_display_name: row.get(4)?,
                        author_avatar_url: row.get(5)?,
                        body: row.get(6)?,
                        parent_comment_id: row.get(7)?,
                        likes_count: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Likes --

    /// Toggle a like: removes if present, inserts if not, keeping the
    /// target's cached likes_count in lockstep. Runs as one transaction so
    /// the like row and the counter can never drift apart; the composite
    /// UNIQUE on (user_id, target_id, target_kind) absorbs duplicate
    /// inserts. Returns true when the like now exists.
    pub fn toggle_like(
        &self,
        id: &str,
        user_id: &str,
        target_id: &str,
        target: LikeTarget,
        created_at: &str,
    ) -> Result<bool> {
        let counter_table = match target {
            LikeTarget::Confession => "confessions",
            LikeTarget::Comment => "comments",
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let deleted = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND target_id = ?2 AND target_kind = ?3",
                rusqlite::params![user_id, target_id, target.as_str()],
            )?;

            let liked = if deleted > 0 {
                tx.execute(
                    &format!("UPDATE {counter_table} SET likes_count = likes_count - 1 WHERE id = ?1"),
                    [target_id],
                )?;
                false
            } else {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO likes (id, user_id, target_id, target_kind, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![id, user_id, target_id, target.as_str(), created_at],
                )?;
                if inserted > 0 {
                    tx.execute(
                        &format!("UPDATE {counter_table} SET likes_count = likes_count + 1 WHERE id = ?1"),
                        [target_id],
                    )?;
                }
                inserted > 0
            };

            tx.commit()?;
            Ok(liked)
        })
    }

    pub fn count_likes(&self, target_id: &str, target: LikeTarget) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE target_id = ?1 AND target_kind = ?2",
                [target_id, target.as_str()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn query_confession(
    conn: &Connection,
    id: &str,
    institution_id: &str,
) -> Result<Option<ConfessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, author_id, institution_id, body, likes_count, created_at
         FROM confessions WHERE id = ?1 AND institution_id = ?2",
    )?;

    let row = stmt
        .query_row([id, institution_id], |row| {
            Ok(ConfessionRow {
                id: row.get(0)?,
                author_id: row.get(1)?,
                institution_id: row.get(2)?,
                body: row.get(3)?,
                likes_count: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, now, seed_user};
    use uuid::Uuid;

    fn seed_confession(d: &Database, author: &str, institution: &str, body: &str) -> String {
        let id = Uuid::new_v4().to_string();
        d.insert_confession(&id, author, institution, body, &now())
            .unwrap();
        id
    }

    #[test]
    fn like_toggle_involution() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let alice = seed_user(&d, "alice");
        let bob = seed_user(&d, "bob");
        let conf = seed_confession(&d, &alice, &inst, "test");

        assert_eq!(d.get_confession(&conf, &inst).unwrap().unwrap().likes_count, 0);

        let liked = d
            .toggle_like(&Uuid::new_v4().to_string(), &bob, &conf, LikeTarget::Confession, &now())
            .unwrap();
        assert!(liked);
        assert_eq!(d.get_confession(&conf, &inst).unwrap().unwrap().likes_count, 1);

        let liked = d
            .toggle_like(&Uuid::new_v4().to_string(), &bob, &conf, LikeTarget::Confession, &now())
            .unwrap();
        assert!(!liked);
        assert_eq!(d.get_confession(&conf, &inst).unwrap().unwrap().likes_count, 0);
        assert_eq!(d.count_likes(&conf, LikeTarget::Confession).unwrap(), 0);
    }

    #[test]
    fn counter_matches_live_like_rows() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let author = seed_user(&d, "author");
        let conf = seed_confession(&d, &author, &inst, "popular");

        let users: Vec<String> = (0..5)
            .map(|i| seed_user(&d, &format!("user{i}")))
            .collect();

        for u in &users {
            d.toggle_like(&Uuid::new_v4().to_string(), u, &conf, LikeTarget::Confession, &now())
                .unwrap();
        }
        // Two of them un-like again
        for u in &users[..2] {
            d.toggle_like(&Uuid::new_v4().to_string(), u, &conf, LikeTarget::Confession, &now())
                .unwrap();
        }

        let row = d.get_confession(&conf, &inst).unwrap().unwrap();
        assert_eq!(row.likes_count, 3);
        assert_eq!(
            d.count_likes(&conf, LikeTarget::Confession).unwrap(),
            row.likes_count as u64
        );
    }

    #[test]
    fn comment_likes_use_their_own_counter() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let alice = seed_user(&d, "alice");
        let conf = seed_confession(&d, &alice, &inst, "text");
        let comment_id = Uuid::new_v4().to_string();
        d.insert_comment(&comment_id, &conf, &alice, "nice", None, &now())
            .unwrap();

        let liked = d
            .toggle_like(&Uuid::new_v4().to_string(), &alice, &comment_id, LikeTarget::Comment, &now())
            .unwrap();
        assert!(liked);

        let comments = d.list_comments(&conf).unwrap();
        assert_eq!(comments[0].likes_count, 1);
        // The confession's counter is untouched
        assert_eq!(d.get_confession(&conf, &inst).unwrap().unwrap().likes_count, 0);
    }

    #[test]
    fn feed_is_newest_first_and_institution_scoped() {
        let d = db();
        let inst_x = Uuid::new_v4().to_string();
        let inst_y = Uuid::new_v4().to_string();
        let alice = seed_user(&d, "alice");

        let first = seed_confession(&d, &alice, &inst_x, "first");
        let second = seed_confession(&d, &alice, &inst_x, "second");
        seed_confession(&d, &alice, &inst_y, "elsewhere");

        let feed = d.list_confessions(&inst_x, 20, 0).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, second);
        assert_eq!(feed[1].id, first);

        // Cross-institution fetch behaves like absence
        assert!(d.get_confession(&first, &inst_y).unwrap().is_none());
        assert_eq!(d.count_confessions(&inst_y).unwrap(), 1);
    }

    #[test]
    fn page_beyond_end_is_empty_not_an_error() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let alice = seed_user(&d, "alice");
        for i in 0..5 {
            seed_confession(&d, &alice, &inst, &format!("c{i}"));
        }

        // page=1000, limit=20 -> offset 19980
        let items = d.list_confessions(&inst, 20, 19980).unwrap();
        assert!(items.is_empty());
        assert_eq!(d.count_confessions(&inst).unwrap(), 5);
    }

    #[test]
    fn comments_are_oldest_first_and_flat() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let alice = seed_user(&d, "alice");
        let bob = seed_user(&d, "bob");
        let conf = seed_confession(&d, &alice, &inst, "thread me");

        let top = Uuid::new_v4().to_string();
        d.insert_comment(&top, &conf, &bob, "top-level", None, &now())
            .unwrap();
        let reply = Uuid::new_v4().to_string();
        d.insert_comment(&reply, &conf, &alice, "a reply", Some(&top), &now())
            .unwrap();

        let comments = d.list_comments(&conf).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, top);
        assert_eq!(comments[0].parent_comment_id, None);
        assert_eq!(comments[1].parent_comment_id, Some(top.clone()));
        assert_eq!(comments[1].author_username, "alice");
    }

    #[test]
    fn reply_parent_must_share_the_confession() {
        let d = db();
        let inst = Uuid::new_v4().to_string();
        let alice = seed_user(&d, "alice");
        let conf_a = seed_confession(&d, &alice, &inst, "a");
        let conf_b = seed_confession(&d, &alice, &inst, "b");

        let parent = Uuid::new_v4().to_string();
        d.insert_comment(&parent, &conf_a, &alice, "on a", None, &now())
            .unwrap();

        assert!(d.comment_exists_in(&parent, &conf_a).unwrap());
        assert!(!d.comment_exists_in(&parent, &conf_b).unwrap());
        assert!(d.comment_exists(&parent).unwrap());
    }
}
