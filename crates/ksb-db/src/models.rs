//! Database row types. These map directly to SQLite rows and stay
//! independent of the ksb-types API models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub code_name: String,
    pub rank: String,
    pub status: String,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub is_admin: bool,
    pub is_banned: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: i64,
    pub author_id: i64,
    pub receiver_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub content: Option<String>,
    pub media_kind: Option<String>,
    pub media_url: Option<String>,
    pub operation_note: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct FriendshipRow {
    /// The user who sent the request.
    pub user_id: i64,
    pub friend_id: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct IntelLinkRow {
    pub id: i64,
    pub code: String,
    pub label: String,
    pub url: String,
    pub category: String,
}
