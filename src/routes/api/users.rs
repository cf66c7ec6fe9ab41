use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::{NewUser, User, UserEnvelope};
use crate::db::users;
use crate::error::AppResult;
use crate::routes::api::json_body;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index).post(create))
        .route("/users/{id}", get(show))
}

async fn index(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list(&conn)?))
}

async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    Ok(Json(users::find(&conn, id)?))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<UserEnvelope<NewUser>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    let UserEnvelope { user } = json_body(payload)?;
    let conn = state.db.get()?;
    let created = users::create(&conn, &user)?;
    Ok((StatusCode::CREATED, Json(created)))
}
