pub mod comments;
pub mod posts;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// JSON API, mounted under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(posts::router())
        .merge(comments::router())
        .merge(users::router())
        .layer(CorsLayer::permissive())
}

/// Unwrap a JSON body, turning malformed input into a 400 with a JSON error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
