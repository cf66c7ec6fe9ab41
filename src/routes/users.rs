use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::NewUser;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{Flash, IncomingFlash};
use crate::routes::home::{redirect_with, render};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/user_form.html")]
pub struct UserFormTemplate {
    pub flash: Option<Flash>,
    pub name: String,
    pub email: String,
    pub errors: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct UserForm {
    pub name: String,
    pub email: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/new", get(new_user))
        .route("/users", post(create))
}

async fn new_user(IncomingFlash(flash): IncomingFlash) -> Response {
    let flash_shown = flash.is_some();
    render(
        StatusCode::OK,
        flash_shown,
        UserFormTemplate {
            flash,
            name: String::new(),
            email: String::new(),
            errors: Vec::new(),
        },
    )
}

async fn create(State(state): State<AppState>, Form(form): Form<UserForm>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let result = users::create(
        &conn,
        &NewUser {
            name: form.name.clone(),
            email: form.email.clone(),
        },
    );

    match result {
        Ok(user) => Ok(redirect_with(
            "/posts",
            Flash::notice(format!(
                "Account created successfully! You can now comment on posts using your name: {}",
                user.name
            )),
        )),
        Err(AppError::Validation(errors)) => Ok(render(
            StatusCode::UNPROCESSABLE_ENTITY,
            false,
            UserFormTemplate {
                flash: None,
                name: form.name,
                email: form.email,
                errors: errors.full_messages(),
            },
        )),
        Err(e) => Err(e),
    }
}
