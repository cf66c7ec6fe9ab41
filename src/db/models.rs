use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::blog::{Page, PageMeta};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub user_id: i64,
    pub user: User,
    pub comments_count: i64,
    /// Only present on the detail view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub post_id: i64,
    pub user_id: i64,
    pub user: User,
    pub created_at: DateTime<Utc>,
}

// --- Payloads ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Accepted for compatibility; the post in the URL always wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

// --- Envelopes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope<T> {
    pub post: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEnvelope<T> {
    pub comment: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
    pub meta: PageMeta,
}

impl From<Page<Post>> for PostsResponse {
    fn from(page: Page<Post>) -> Self {
        Self {
            posts: page.items,
            meta: page.meta,
        }
    }
}

impl From<PostsResponse> for Page<Post> {
    fn from(response: PostsResponse) -> Self {
        Page {
            items: response.posts,
            meta: response.meta,
        }
    }
}

impl From<Page<Comment>> for CommentsResponse {
    fn from(page: Page<Comment>) -> Self {
        Self {
            comments: page.items,
            meta: page.meta,
        }
    }
}

impl From<CommentsResponse> for Page<Comment> {
    fn from(response: CommentsResponse) -> Self {
        Page {
            items: response.comments,
            meta: response.meta,
        }
    }
}

// --- Row helpers ---

const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read a `datetime('now')` column as UTC.
pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DB_TIME_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a user from four consecutive columns: id, name, email, created_at.
pub(crate) fn user_at(row: &Row<'_>, start: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(start)?,
        name: row.get(start + 1)?,
        email: row.get(start + 2)?,
        created_at: timestamp(row, start + 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_comment_accepts_missing_fields() {
        let comment: NewComment = serde_json::from_str(r#"{"body": "hi"}"#).unwrap();
        assert_eq!(comment.body, "hi");
        assert_eq!(comment.user_id, None);
    }

    #[test]
    fn post_changes_skip_absent_fields() {
        let changes = PostChanges {
            title: Some("New".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({"title": "New"})
        );
    }

    #[test]
    fn timestamp_reads_sqlite_format() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let dt = conn
            .query_row("SELECT '2025-01-15 12:00:00'", [], |row| timestamp(row, 0))
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-15T12:00:00+00:00");
    }
}
