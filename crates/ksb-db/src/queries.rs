use crate::Database;
use crate::models::{FriendshipRow, IntelLinkRow, MessageRow, UserRow};
use anyhow::Result;
use ksb_types::NewMessage;
use rusqlite::{Connection, Row, params, params_from_iter};

const USER_COLUMNS: &str = "id, username, password, code_name, rank, status, avatar_url, \
                            is_verified, is_admin, is_banned, created_at";

const MESSAGE_COLUMNS: &str = "id, author_id, receiver_id, parent_id, content, media_kind, \
                               media_url, operation_note, created_at";

const FRIENDSHIP_COLUMNS: &str = "user_id, friend_id, status, created_at";

impl Database {
    // -- Users --

    /// Returns `None` when the username (case-insensitive) is already taken.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        code_name: &str,
        is_admin: bool,
    ) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO users (username, password, code_name, is_admin, is_verified)
                     VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(username) DO NOTHING
                     RETURNING {USER_COLUMNS}"
                ),
                params![username, password_hash, code_name, is_admin],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Batch-fetch users for a set of IDs. Unknown IDs are skipped.
    pub fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<UserRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY code_name, id"))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply a partial profile update. `None` leaves a field untouched.
    pub fn update_profile(
        &self,
        id: i64,
        code_name: Option<&str>,
        rank: Option<&str>,
        status: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE users SET
                        code_name  = COALESCE(?2, code_name),
                        rank       = COALESCE(?3, rank),
                        status     = COALESCE(?4, status),
                        avatar_url = COALESCE(?5, avatar_url)
                     WHERE id = ?1
                     RETURNING {USER_COLUMNS}"
                ),
                params![id, code_name, rank, status, avatar_url],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn set_banned(&self, id: i64, banned: bool) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!("UPDATE users SET is_banned = ?2 WHERE id = ?1 RETURNING {USER_COLUMNS}"),
                params![id, banned],
                user_from_row,
            )
            .optional()
        })
    }

    // -- Messages --

    /// Append a message. The id comes from AUTOINCREMENT and the timestamp is
    /// clamped to the newest stored one, both inside a single statement, so
    /// `created_at` never decreases along the id sequence.
    pub fn append_message(&self, msg: &NewMessage) -> Result<MessageRow> {
        let media_kind = msg.media().map(|m| m.kind.as_str());
        let media_url = msg.media().map(|m| m.url.as_str());

        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO messages
                        (author_id, receiver_id, parent_id, content, media_kind, media_url,
                         operation_note, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                        MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                            COALESCE((SELECT MAX(created_at) FROM messages), '')))
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                params![
                    msg.author_id(),
                    msg.receiver_id(),
                    msg.parent_id(),
                    msg.content(),
                    media_kind,
                    media_url,
                    msg.operation_note(),
                ],
                message_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                [id],
                message_from_row,
            )
            .optional()
        })
    }

    /// Batch-fetch messages for a set of IDs. Missing IDs are skipped.
    pub fn get_messages_by_ids(&self, ids: &[i64]) -> Result<Vec<MessageRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every message, oldest first, ties broken by id.
    pub fn list_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt
                .query_map([], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replace the content of a message. Returns `None` if it does not exist.
    pub fn edit_message_content(&self, id: i64, content: Option<&str>) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!("UPDATE messages SET content = ?2 WHERE id = ?1 RETURNING {MESSAGE_COLUMNS}"),
                params![id, content],
                message_from_row,
            )
            .optional()
        })
    }

    /// Hard delete. Returns false if the message was already gone.
    pub fn remove_message(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Friends --

    /// Record a pending request from `user_id` to `friend_id`. Returns `None`
    /// when a relation already exists in either direction.
    pub fn insert_friend_request(&self, user_id: i64, friend_id: i64) -> Result<Option<FriendshipRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO friendships (user_id, friend_id)
                     SELECT ?1, ?2
                     WHERE NOT EXISTS (
                        SELECT 1 FROM friendships
                        WHERE (user_id = ?1 AND friend_id = ?2)
                           OR (user_id = ?2 AND friend_id = ?1))
                     RETURNING {FRIENDSHIP_COLUMNS}"
                ),
                params![user_id, friend_id],
                friendship_from_row,
            )
            .optional()
        })
    }

    /// Accept a pending request that `requester_id` sent to `user_id`.
    pub fn accept_friend_request(&self, user_id: i64, requester_id: i64) -> Result<Option<FriendshipRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE friendships SET status = 'accepted'
                     WHERE user_id = ?1 AND friend_id = ?2 AND status = 'pending'
                     RETURNING {FRIENDSHIP_COLUMNS}"
                ),
                params![requester_id, user_id],
                friendship_from_row,
            )
            .optional()
        })
    }

    /// Remove a relation in either direction, pending or accepted.
    pub fn remove_friendship(&self, a: i64, b: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
                params![a, b],
            )?;
            Ok(n > 0)
        })
    }

    pub fn list_friendships(&self, user_id: i64) -> Result<Vec<FriendshipRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
                 WHERE user_id = ?1 OR friend_id = ?1
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt
                .query_map([user_id], friendship_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn are_friends(&self, a: i64, b: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM friendships
                     WHERE status = 'accepted'
                       AND ((user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1))",
                    params![a, b],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Intel --

    pub fn list_intel_links(&self) -> Result<Vec<IntelLinkRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, code, label, url, category FROM intel_links ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(IntelLinkRow {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        label: row.get(2)?,
                        url: row.get(3)?,
                        category: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )
    .optional()
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        code_name: row.get(3)?,
        rank: row.get(4)?,
        status: row.get(5)?,
        avatar_url: row.get(6)?,
        is_verified: row.get(7)?,
        is_admin: row.get(8)?,
        is_banned: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        receiver_id: row.get(2)?,
        parent_id: row.get(3)?,
        content: row.get(4)?,
        media_kind: row.get(5)?,
        media_url: row.get(6)?,
        operation_note: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn friendship_from_row(row: &Row<'_>) -> rusqlite::Result<FriendshipRow> {
    Ok(FriendshipRow {
        user_id: row.get(0)?,
        friend_id: row.get(1)?,
        status: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
