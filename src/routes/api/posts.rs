use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::{NewPost, Post, PostChanges, PostEnvelope, PostsResponse};
use crate::db::posts;
use crate::error::AppResult;
use crate::extractors::PageParam;
use crate::routes::api::json_body;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(index).post(create))
        .route(
            "/posts/{id}",
            get(show).put(update).patch(update).delete(destroy),
        )
}

async fn index(
    State(state): State<AppState>,
    PageParam(page): PageParam,
) -> AppResult<Json<PostsResponse>> {
    let conn = state.db.get()?;
    let page = posts::page(&conn, state.config.pagination.api_per_page, page)?;
    Ok(Json(page.into()))
}

async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    Ok(Json(posts::find_with_comments(&conn, id)?))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<PostEnvelope<NewPost>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let PostEnvelope { post } = json_body(payload)?;
    let conn = state.db.get()?;
    let created = posts::create(&conn, &post)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PostEnvelope<PostChanges>>, JsonRejection>,
) -> AppResult<Json<Post>> {
    let PostEnvelope { post } = json_body(payload)?;
    let conn = state.db.get()?;
    Ok(Json(posts::update(&conn, id, &post)?))
}

async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    posts::delete(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}
