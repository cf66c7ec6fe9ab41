use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::error::{AppError, AppResult};
use crate::extractors::Flash;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "pages/not_found.html")]
pub struct NotFoundTemplate {
    pub flash: Option<Flash>,
}

/// Render a page, consuming the incoming flash cookie if one was shown.
pub fn render<T: Template>(status: StatusCode, flash_shown: bool, template: T) -> Response {
    if flash_shown {
        (
            status,
            [(header::SET_COOKIE, Flash::clear_cookie())],
            Html(template),
        )
            .into_response()
    } else {
        (status, Html(template)).into_response()
    }
}

/// 303 redirect that leaves a flash for the next page.
pub fn redirect_with(to: &str, flash: Flash) -> Response {
    (
        [(header::SET_COOKIE, flash.set_cookie())],
        Redirect::to(to),
    )
        .into_response()
}

/// Turn a `NotFound` from an HTML handler into the not-found page.
pub fn or_not_found(result: AppResult<Response>) -> AppResult<Response> {
    match result {
        Err(AppError::NotFound) => Ok(render(
            StatusCode::NOT_FOUND,
            false,
            NotFoundTemplate { flash: None },
        )),
        other => other,
    }
}

pub async fn index() -> Redirect {
    Redirect::to("/posts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_with_sets_flash_cookie() {
        let response = redirect_with("/posts", Flash::notice("Saved"));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("scribe_flash=notice=Saved"));
    }

    #[test]
    fn or_not_found_renders_404_page() {
        let response = or_not_found(Err(AppError::NotFound)).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn or_not_found_passes_other_errors_through() {
        let result = or_not_found(Err(AppError::Internal("boom".into())));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
