use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::blog::validation::validate_comment;
use crate::blog::{Page, PageWindow};
use crate::db::models::{timestamp, user_at, Comment, NewComment};
use crate::db::{posts, users};
use crate::error::{AppError, AppResult};

const SELECT_COMMENT: &str = "SELECT c.id, c.body, c.post_id, c.user_id, c.created_at,
            u.id, u.name, u.email, u.created_at
     FROM comments c
     JOIN users u ON u.id = c.user_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        body: row.get(1)?,
        post_id: row.get(2)?,
        user_id: row.get(3)?,
        created_at: timestamp(row, 4)?,
        user: user_at(row, 5)?,
    })
}

pub fn count_for_post(conn: &Connection, post_id: i64) -> AppResult<u64> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(total.max(0) as u64)
}

pub fn all_for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COMMENT} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.id ASC"
    ))?;
    let comments = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Oldest first within the post. Unknown posts are `NotFound`.
pub fn page(
    conn: &Connection,
    post_id: i64,
    page_size: u32,
    requested_page: i64,
) -> AppResult<Page<Comment>> {
    if !posts::exists(conn, post_id)? {
        return Err(AppError::NotFound);
    }
    let window = PageWindow::compute(count_for_post(conn, post_id)?, page_size, requested_page);

    let mut stmt = conn.prepare(&format!(
        "{SELECT_COMMENT} WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.id ASC LIMIT ?2 OFFSET ?3"
    ))?;
    let items = stmt
        .query_map(
            params![post_id, window.limit(), window.offset() as i64],
            comment_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        meta: window.meta(),
    })
}

pub fn find(conn: &Connection, id: i64) -> AppResult<Comment> {
    conn.query_row(
        &format!("{SELECT_COMMENT} WHERE c.id = ?1"),
        params![id],
        comment_from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

pub fn create(conn: &Connection, post_id: i64, new_comment: &NewComment) -> AppResult<Comment> {
    let body = new_comment.body.trim();
    let author_exists = users::exists(conn, new_comment.user_id)?;
    let post_exists = posts::exists(conn, post_id)?;

    validate_comment(body, author_exists, post_exists).into_result()?;
    let user_id = new_comment
        .user_id
        .ok_or_else(|| AppError::Internal("validated comment lost its author".into()))?;

    conn.execute(
        "INSERT INTO comments (body, post_id, user_id) VALUES (?1, ?2, ?3)",
        params![body, post_id, user_id],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(comment_id = id, post_id, "Created comment");
    find(conn, id)
}

/// Deletes a comment only when it belongs to `post_id`.
pub fn delete(conn: &Connection, post_id: i64, comment_id: i64) -> AppResult<()> {
    let rows = conn.execute(
        "DELETE FROM comments WHERE id = ?1 AND post_id = ?2",
        params![comment_id, post_id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(comment_id, post_id, "Deleted comment");
    Ok(())
}
