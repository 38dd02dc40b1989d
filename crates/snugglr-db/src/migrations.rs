use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Profile projection source. Rows are written by the account
        -- service; this backend only reads them for display.
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            display_name    TEXT NOT NULL,
            avatar_url      TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS confessions (
            id              TEXT PRIMARY KEY,
            author_id       TEXT NOT NULL REFERENCES users(id),
            institution_id  TEXT NOT NULL,
            body            TEXT NOT NULL,
            likes_count     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_confessions_institution
            ON confessions(institution_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id                  TEXT PRIMARY KEY,
            confession_id       TEXT NOT NULL REFERENCES confessions(id),
            author_id           TEXT NOT NULL REFERENCES users(id),
            body                TEXT NOT NULL,
            parent_comment_id   TEXT REFERENCES comments(id),
            likes_count         INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_confession
            ON comments(confession_id, created_at);

        -- One like per (user, target, kind); the constraint is the source
        -- of truth for toggle state.
        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            target_id   TEXT NOT NULL,
            target_kind TEXT NOT NULL CHECK (target_kind IN ('confession', 'comment')),
            created_at  TEXT NOT NULL,
            UNIQUE(user_id, target_id, target_kind)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_target
            ON likes(target_id, target_kind);

        -- pair_key is '<low>:<high>' for personal chats and NULL for
        -- groups; SQLite UNIQUE ignores NULLs, so only personal chats are
        -- deduplicated per institution.
        CREATE TABLE IF NOT EXISTS chats (
            id              TEXT PRIMARY KEY,
            institution_id  TEXT NOT NULL,
            kind            TEXT NOT NULL CHECK (kind IN ('personal', 'group')),
            group_name      TEXT,
            pair_key        TEXT,
            revealed        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            UNIQUE(institution_id, pair_key)
        );

        CREATE TABLE IF NOT EXISTS chat_members (
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            position    INTEGER NOT NULL,
            PRIMARY KEY (chat_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            sender_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT,
            kind        TEXT NOT NULL DEFAULT 'text' CHECK (kind IN ('text', 'system')),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at DESC);

        -- readBy set; written by the read-receipt flow, surfaced read-only
        -- with message pages.
        CREATE TABLE IF NOT EXISTS message_reads (
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (message_id, user_id)
        );

        -- One pool entry per user; re-joins overwrite in place.
        CREATE TABLE IF NOT EXISTS match_pool (
            user_id         TEXT PRIMARY KEY REFERENCES users(id),
            institution_id  TEXT NOT NULL,
            mood            TEXT NOT NULL,
            description     TEXT,
            expires_at      TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
