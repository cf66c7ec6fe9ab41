use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::blog::validation::validate_post;
use crate::blog::{Page, PageWindow};
use crate::db::comments;
use crate::db::models::{timestamp, user_at, NewPost, Post, PostChanges};
use crate::db::users;
use crate::error::{AppError, AppResult};

const SELECT_POST: &str = "SELECT p.id, p.title, p.body, p.user_id, p.created_at, p.updated_at,
            u.id, u.name, u.email, u.created_at,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count
     FROM posts p
     JOIN users u ON u.id = p.user_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        user_id: row.get(3)?,
        created_at: timestamp(row, 4)?,
        updated_at: timestamp(row, 5)?,
        user: user_at(row, 6)?,
        comments_count: row.get(10)?,
        comments: None,
    })
}

pub fn count(conn: &Connection) -> AppResult<u64> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
    Ok(total.max(0) as u64)
}

/// Newest first. The requested page is clamped into range.
pub fn page(conn: &Connection, page_size: u32, requested_page: i64) -> AppResult<Page<Post>> {
    let window = PageWindow::compute(count(conn)?, page_size, requested_page);

    let mut stmt = conn.prepare(&format!(
        "{SELECT_POST} ORDER BY p.created_at DESC, p.id DESC LIMIT ?1 OFFSET ?2"
    ))?;
    let items = stmt
        .query_map(
            params![window.limit(), window.offset() as i64],
            post_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        meta: window.meta(),
    })
}

pub fn exists(conn: &Connection, id: i64) -> AppResult<bool> {
    let found: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn find(conn: &Connection, id: i64) -> AppResult<Post> {
    conn.query_row(
        &format!("{SELECT_POST} WHERE p.id = ?1"),
        params![id],
        post_from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// Post plus every comment (oldest first), each with its author.
pub fn find_with_comments(conn: &Connection, id: i64) -> AppResult<Post> {
    let mut post = find(conn, id)?;
    post.comments = Some(comments::all_for_post(conn, id)?);
    Ok(post)
}

pub fn create(conn: &Connection, new_post: &NewPost) -> AppResult<Post> {
    let title = new_post.title.trim();
    let body = new_post.body.trim();
    let author_exists = users::exists(conn, new_post.user_id)?;

    validate_post(title, body, author_exists).into_result()?;
    let user_id = new_post
        .user_id
        .ok_or_else(|| AppError::Internal("validated post lost its author".into()))?;

    conn.execute(
        "INSERT INTO posts (title, body, user_id) VALUES (?1, ?2, ?3)",
        params![title, body, user_id],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(post_id = id, user_id, "Created post");
    find(conn, id)
}

pub fn update(conn: &Connection, id: i64, changes: &PostChanges) -> AppResult<Post> {
    let current = find(conn, id)?;

    let title = changes
        .title
        .as_deref()
        .unwrap_or(&current.title)
        .trim()
        .to_string();
    let body = changes
        .body
        .as_deref()
        .unwrap_or(&current.body)
        .trim()
        .to_string();
    let user_id = changes.user_id.unwrap_or(current.user_id);

    validate_post(&title, &body, users::exists(conn, Some(user_id))?).into_result()?;

    conn.execute(
        "UPDATE posts SET title = ?1, body = ?2, user_id = ?3, updated_at = datetime('now')
         WHERE id = ?4",
        params![title, body, user_id, id],
    )?;
    tracing::info!(post_id = id, "Updated post");
    find(conn, id)
}

/// Deletes the post; its comments go with it.
pub fn delete(conn: &Connection, id: i64) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(post_id = id, "Deleted post");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewComment, NewUser};
    use crate::db::test_pool;

    fn author(conn: &Connection) -> i64 {
        users::create(
            conn,
            &NewUser {
                name: "Ann".into(),
                email: "ann@example.com".into(),
            },
        )
        .unwrap()
        .id
    }

    fn post(conn: &Connection, user_id: i64, title: &str) -> Post {
        create(
            conn,
            &NewPost {
                title: title.into(),
                body: "Body".into(),
                user_id: Some(user_id),
            },
        )
        .unwrap()
    }

    #[test]
    fn create_post_without_title_is_rejected_and_not_stored() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = author(&conn);

        let err = create(
            &conn,
            &NewPost {
                title: "".into(),
                body: "Body".into(),
                user_id: Some(user_id),
            },
        )
        .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert!(errors.full_messages()[0].to_lowercase().contains("title"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(count(&conn).unwrap(), 0);
    }

    #[test]
    fn create_post_requires_existing_author() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let err = create(
            &conn,
            &NewPost {
                title: "T".into(),
                body: "B".into(),
                user_id: Some(77),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(e) if e.get("user_id").is_some()));
    }

    #[test]
    fn page_orders_newest_first_and_clamps() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = author(&conn);
        for i in 1..=23 {
            post(&conn, user_id, &format!("Post {i}"));
        }

        let first = page(&conn, 10, 1).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].title, "Post 23");
        assert_eq!(first.meta.total_pages, 3);
        assert_eq!(first.meta.total_count, 23);

        let clamped = page(&conn, 10, 5).unwrap();
        assert_eq!(clamped.meta.current_page, 3);
        assert_eq!(clamped.items.len(), 3);
        assert_eq!(clamped.items[2].title, "Post 1");
    }

    #[test]
    fn empty_page_reports_single_page() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let empty = page(&conn, 10, 3).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.meta.current_page, 1);
        assert_eq!(empty.meta.total_pages, 1);
    }

    #[test]
    fn update_keeps_absent_fields() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = author(&conn);
        let original = post(&conn, user_id, "Before");

        let updated = update(
            &conn,
            original.id,
            &PostChanges {
                title: Some("After".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.title, "After");
        assert_eq!(updated.body, original.body);

        let err = update(
            &conn,
            original.id,
            &PostChanges {
                body: Some("   ".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(matches!(update(&conn, 999, &PostChanges::default()), Err(AppError::NotFound)));
    }

    #[test]
    fn delete_post_cascades_to_comments() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = author(&conn);
        let target = post(&conn, user_id, "Doomed");
        comments::create(
            &conn,
            target.id,
            &NewComment {
                body: "bye".into(),
                user_id: Some(user_id),
                post_id: None,
            },
        )
        .unwrap();

        delete(&conn, target.id).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(delete(&conn, target.id), Err(AppError::NotFound)));
    }

    #[test]
    fn author_with_posts_cannot_be_deleted() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = author(&conn);
        post(&conn, user_id, "Keep me");

        assert!(matches!(users::delete(&conn, user_id), Err(AppError::Conflict(_))));

        // The schema refuses it too, even when the check is bypassed
        let raw = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id]);
        assert!(raw.is_err());
    }

    #[test]
    fn find_with_comments_includes_authors() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user_id = author(&conn);
        let target = post(&conn, user_id, "Chatty");
        comments::create(
            &conn,
            target.id,
            &NewComment {
                body: "first".into(),
                user_id: Some(user_id),
                post_id: None,
            },
        )
        .unwrap();

        let detail = find_with_comments(&conn, target.id).unwrap();
        let comments = detail.comments.unwrap();
        assert_eq!(detail.comments_count, 1);
        assert_eq!(comments[0].user.name, "Ann");
    }
}
