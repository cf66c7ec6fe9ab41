pub mod api;
pub mod assets;
pub mod home;
pub mod posts;
pub mod users;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application: HTML views at the root, JSON API under `/api/v1`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .merge(posts::router())
        .merge(users::router())
        .nest("/api/v1", api::router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
