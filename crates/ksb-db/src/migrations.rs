use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, messages, intel links)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                username     TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password     TEXT NOT NULL,
                code_name    TEXT NOT NULL,
                rank         TEXT NOT NULL DEFAULT 'Operatör',
                status       TEXT NOT NULL DEFAULT 'Çevrimiçi',
                avatar_url   TEXT,
                is_verified  INTEGER NOT NULL DEFAULT 0,
                is_admin     INTEGER NOT NULL DEFAULT 0,
                is_banned    INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            -- parent_id has no foreign key: a parent may be deleted while
            -- its replies stay.
            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id       INTEGER NOT NULL REFERENCES users(id),
                receiver_id     INTEGER REFERENCES users(id),
                parent_id       INTEGER,
                content         TEXT,
                media_kind      TEXT CHECK (media_kind IN ('image', 'video', 'audio')),
                media_url       TEXT,
                operation_note  TEXT,
                created_at      TEXT NOT NULL,
                CHECK ((media_kind IS NULL) = (media_url IS NULL)),
                CHECK (content IS NOT NULL OR media_kind IS NOT NULL)
            );

            CREATE INDEX idx_messages_created ON messages(created_at, id);
            CREATE INDEX idx_messages_pair ON messages(author_id, receiver_id);

            CREATE TABLE intel_links (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                code      TEXT NOT NULL,
                label     TEXT NOT NULL,
                url       TEXT NOT NULL,
                category  TEXT NOT NULL DEFAULT 'general'
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (friendships)");
        conn.execute_batch(
            "
            CREATE TABLE friendships (
                user_id     INTEGER NOT NULL REFERENCES users(id),
                friend_id   INTEGER NOT NULL REFERENCES users(id),
                status      TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'accepted')),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (user_id, friend_id),
                CHECK (user_id <> friend_id)
            );

            CREATE INDEX idx_friendships_friend ON friendships(friend_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
