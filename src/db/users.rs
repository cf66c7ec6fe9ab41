use rusqlite::{params, Connection, OptionalExtension};

use crate::blog::validation::validate_user;
use crate::blog::ValidationErrors;
use crate::db::models::{user_at, NewUser, User};
use crate::error::{AppError, AppResult};

const SELECT_USER: &str = "SELECT id, name, email, created_at FROM users";

pub fn list(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY name ASC, id ASC"))?;
    let users = stmt
        .query_map([], |row| user_at(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn find(conn: &Connection, id: i64) -> AppResult<User> {
    conn.query_row(
        &format!("{SELECT_USER} WHERE id = ?1"),
        params![id],
        |row| user_at(row, 0),
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

pub fn exists(conn: &Connection, id: Option<i64>) -> AppResult<bool> {
    let Some(id) = id else {
        return Ok(false);
    };
    let found: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(found)
}

fn email_taken(conn: &Connection, email: &str) -> AppResult<bool> {
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1 COLLATE NOCASE",
        params![email],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn create(conn: &Connection, new_user: &NewUser) -> AppResult<User> {
    let name = new_user.name.trim();
    let email = new_user.email.trim();

    validate_user(name, email, email_taken(conn, email)?).into_result()?;

    let id = insert(conn, name, email)?;
    tracing::info!(user_id = id, "Created user");
    find(conn, id)
}

/// A concurrent create can pass the `email_taken` check and still lose on
/// the unique index; that loser gets the same field error.
fn insert(conn: &Connection, name: &str, email: &str) -> AppResult<i64> {
    match conn.execute(
        "INSERT INTO users (name, email) VALUES (?1, ?2)",
        params![name, email],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let mut errors = ValidationErrors::new();
            errors.add("email", "Email has already been taken");
            Err(errors.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a user who owns no posts or comments. Authors of existing content
/// are refused rather than orphaning or cascading their content.
pub fn delete(conn: &Connection, id: i64) -> AppResult<()> {
    let owned: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM posts WHERE user_id = ?1)
              + (SELECT COUNT(*) FROM comments WHERE user_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if owned > 0 {
        return Err(AppError::Conflict(format!(
            "User {id} still authors {owned} posts or comments"
        )));
    }

    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
