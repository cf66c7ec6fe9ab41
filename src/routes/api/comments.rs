use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::db::models::{Comment, CommentEnvelope, CommentsResponse, NewComment};
use crate::db::{comments, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::PageParam;
use crate::routes::api::json_body;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{post_id}/comments", get(index).post(create))
        .route("/posts/{post_id}/comments/{id}", delete(destroy))
}

async fn index(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    PageParam(page): PageParam,
) -> AppResult<Json<CommentsResponse>> {
    let conn = state.db.get()?;
    let page = comments::page(&conn, post_id, state.config.pagination.api_per_page, page)?;
    Ok(Json(page.into()))
}

async fn create(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    payload: Result<Json<CommentEnvelope<NewComment>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let CommentEnvelope { comment } = json_body(payload)?;
    let conn = state.db.get()?;
    if !posts::exists(&conn, post_id)? {
        return Err(AppError::NotFound);
    }
    let created = comments::create(&conn, post_id, &comment)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn destroy(
    State(state): State<AppState>,
    Path((post_id, id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    comments::delete(&conn, post_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
