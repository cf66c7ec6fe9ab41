use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::blog::Navigation;
use crate::db::models::{Comment, NewComment, NewPost, Post, PostChanges, User};
use crate::db::{comments, posts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{Flash, IncomingFlash, PageParam};
use crate::routes::home::{or_not_found, redirect_with, render};
use crate::state::AppState;

const EXCERPT_CHARS: usize = 150;

// --- View structs ---

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub excerpt: String,
    pub body: String,
    pub created_at: String,
    pub comments_count: i64,
}

impl From<Post> for PostRow {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            excerpt: excerpt(&post.body),
            author: post.user.name,
            title: post.title,
            body: post.body,
            created_at: format_relative_time(&post.created_at),
            comments_count: post.comments_count,
        }
    }
}

pub struct CommentRow {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

impl From<Comment> for CommentRow {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            author: comment.user.name,
            body: comment.body,
            created_at: format_relative_time(&comment.created_at),
        }
    }
}

pub struct PageLink {
    pub number: u32,
    pub current: bool,
}

pub struct UserOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

fn page_links(nav: &Navigation) -> Vec<PageLink> {
    nav.pages()
        .into_iter()
        .map(|number| PageLink {
            number,
            current: number == nav.current,
        })
        .collect()
}

fn user_options(users: Vec<User>, selected: Option<i64>) -> Vec<UserOption> {
    users
        .into_iter()
        .map(|user| UserOption {
            selected: Some(user.id) == selected,
            id: user.id,
            name: user.name,
        })
        .collect()
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/posts_index.html")]
pub struct PostsIndexTemplate {
    pub flash: Option<Flash>,
    pub posts: Vec<PostRow>,
    pub total_count: u64,
    pub nav: Navigation,
    pub page_links: Vec<PageLink>,
    pub base_path: String,
}

#[derive(Template)]
#[template(path = "pages/post_show.html")]
pub struct PostShowTemplate {
    pub flash: Option<Flash>,
    pub post: PostRow,
    pub comments: Vec<CommentRow>,
    pub users: Vec<UserOption>,
    pub nav: Navigation,
    pub page_links: Vec<PageLink>,
    pub base_path: String,
}

#[derive(Template)]
#[template(path = "pages/post_form.html")]
pub struct PostFormTemplate {
    pub flash: Option<Flash>,
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub action: String,
    pub cancel_href: String,
    pub title: String,
    pub body: String,
    pub users: Vec<UserOption>,
    pub errors: Vec<String>,
}

// --- Forms ---

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub body: String,
    pub user_id: String,
}

impl PostForm {
    fn user_id(&self) -> Option<i64> {
        self.user_id.trim().parse().ok()
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CommentForm {
    pub body: String,
    pub user_id: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(index).post(create))
        .route("/posts/new", get(new_post))
        .route("/posts/{id}", get(show).post(update))
        .route("/posts/{id}/edit", get(edit))
        .route("/posts/{id}/delete", post(destroy))
        .route("/posts/{id}/comments", post(create_comment))
        .route("/posts/{id}/comments/{comment_id}/delete", post(destroy_comment))
}

// --- Handlers ---

async fn index(
    State(state): State<AppState>,
    PageParam(page): PageParam,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    let page = {
        let conn = state.db.get()?;
        posts::page(&conn, state.config.pagination.html_per_page, page)?
    };
    let nav = page.meta.navigation();

    let template = PostsIndexTemplate {
        total_count: page.meta.total_count,
        posts: page.items.into_iter().map(PostRow::from).collect(),
        page_links: page_links(&nav),
        nav,
        base_path: "/posts".to_string(),
        flash: flash.clone(),
    };
    Ok(render(StatusCode::OK, flash.is_some(), template))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    PageParam(page): PageParam,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    or_not_found(show_page(&state, id, page, flash))
}

fn show_page(state: &AppState, id: i64, page: i64, flash: Option<Flash>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = posts::find(&conn, id)?;
    let comment_page = comments::page(&conn, id, state.config.pagination.html_per_page, page)?;
    let users = users::list(&conn)?;

    let nav = comment_page.meta.navigation();
    let flash_shown = flash.is_some();
    let template = PostShowTemplate {
        post: post.into(),
        comments: comment_page.items.into_iter().map(CommentRow::from).collect(),
        users: user_options(users, None),
        page_links: page_links(&nav),
        nav,
        base_path: format!("/posts/{id}"),
        flash,
    };
    Ok(render(StatusCode::OK, flash_shown, template))
}

async fn new_post(
    State(state): State<AppState>,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let flash_shown = flash.is_some();
    let template = post_form(&conn, None, &PostForm::default(), Vec::new(), flash)?;
    Ok(render(StatusCode::OK, flash_shown, template))
}

async fn create(State(state): State<AppState>, Form(form): Form<PostForm>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let result = posts::create(
        &conn,
        &NewPost {
            title: form.title.clone(),
            body: form.body.clone(),
            user_id: form.user_id(),
        },
    );

    match result {
        Ok(post) => Ok(redirect_with(
            &format!("/posts/{}", post.id),
            Flash::notice("Post was successfully created."),
        )),
        Err(AppError::Validation(errors)) => {
            let template = post_form(&conn, None, &form, errors.full_messages(), None)?;
            Ok(render(StatusCode::UNPROCESSABLE_ENTITY, false, template))
        }
        Err(e) => Err(e),
    }
}

async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    or_not_found(edit_page(&state, id, flash))
}

fn edit_page(state: &AppState, id: i64, flash: Option<Flash>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = posts::find(&conn, id)?;
    let form = PostForm {
        title: post.title,
        body: post.body,
        user_id: post.user_id.to_string(),
    };
    let flash_shown = flash.is_some();
    let template = post_form(&conn, Some(id), &form, Vec::new(), flash)?;
    Ok(render(StatusCode::OK, flash_shown, template))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    or_not_found(update_post(&state, id, form))
}

fn update_post(state: &AppState, id: i64, form: PostForm) -> AppResult<Response> {
    let conn = state.db.get()?;
    let result = posts::update(
        &conn,
        id,
        &PostChanges {
            title: Some(form.title.clone()),
            body: Some(form.body.clone()),
            // Unknown id 0 makes validation report a missing author
            user_id: Some(form.user_id().unwrap_or(0)),
        },
    );

    match result {
        Ok(post) => Ok(redirect_with(
            &format!("/posts/{}", post.id),
            Flash::notice("Post was successfully updated."),
        )),
        Err(AppError::Validation(errors)) => {
            let template = post_form(&conn, Some(id), &form, errors.full_messages(), None)?;
            Ok(render(StatusCode::UNPROCESSABLE_ENTITY, false, template))
        }
        Err(e) => Err(e),
    }
}

async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Response> {
    let conn = state.db.get()?;
    or_not_found(posts::delete(&conn, id).map(|()| {
        redirect_with("/posts", Flash::notice("Post was successfully destroyed."))
    }))
}

async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    or_not_found(add_comment(&state, post_id, form))
}

fn add_comment(state: &AppState, post_id: i64, form: CommentForm) -> AppResult<Response> {
    let conn = state.db.get()?;
    if !posts::exists(&conn, post_id)? {
        return Err(AppError::NotFound);
    }
    let back = format!("/posts/{post_id}");
    let result = comments::create(
        &conn,
        post_id,
        &NewComment {
            body: form.body,
            user_id: form.user_id.trim().parse().ok(),
            post_id: None,
        },
    );

    match result {
        Ok(_) => Ok(redirect_with(
            &back,
            Flash::notice("Comment was successfully created."),
        )),
        Err(AppError::Validation(errors)) => Ok(redirect_with(
            &back,
            Flash::alert(format!("Failed to create comment: {errors}")),
        )),
        Err(e) => Err(e),
    }
}

async fn destroy_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    or_not_found(comments::delete(&conn, post_id, comment_id).map(|()| {
        redirect_with(
            &format!("/posts/{post_id}"),
            Flash::notice("Comment was successfully destroyed."),
        )
    }))
}

fn post_form(
    conn: &Connection,
    id: Option<i64>,
    form: &PostForm,
    errors: Vec<String>,
    flash: Option<Flash>,
) -> AppResult<PostFormTemplate> {
    let users = user_options(users::list(conn)?, form.user_id());
    let template = match id {
        Some(id) => PostFormTemplate {
            flash,
            heading: "Edit Post",
            submit_label: "Update Post",
            action: format!("/posts/{id}"),
            cancel_href: format!("/posts/{id}"),
            title: form.title.clone(),
            body: form.body.clone(),
            users,
            errors,
        },
        None => PostFormTemplate {
            flash,
            heading: "New Post",
            submit_label: "Create Post",
            action: "/posts".to_string(),
            cancel_href: "/posts".to_string(),
            title: form.title.clone(),
            body: form.body.clone(),
            users,
            errors,
        },
    };
    Ok(template)
}

// --- Formatting ---

fn excerpt(body: &str) -> String {
    if body.chars().count() > EXCERPT_CHARS {
        let cut: String = body.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}

pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn format_relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(3))), "3h ago");
        assert_eq!(format_relative_time(&(now - Duration::days(2))), "2d ago");
    }

    #[test]
    fn format_relative_time_old_date() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(format_relative_time(&dt), "Jan 15, 2025");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(200);
        let short = excerpt(&long);
        assert_eq!(short.chars().count(), EXCERPT_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn page_links_mark_current() {
        let links = page_links(&Navigation::new(2, 3));
        let current: Vec<u32> = links.iter().filter(|l| l.current).map(|l| l.number).collect();
        assert_eq!(current, vec![2]);
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn post_form_parses_author() {
        let form = PostForm {
            user_id: " 7 ".into(),
            ..Default::default()
        };
        assert_eq!(form.user_id(), Some(7));
        assert_eq!(PostForm::default().user_id(), None);
    }
}
