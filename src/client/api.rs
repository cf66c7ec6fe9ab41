//! HTTP client for the `/api/v1` JSON surface. Request bodies are wrapped
//! in a resource envelope, responses come back bare.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{ClientError, Result};
use super::ClientConfig;
use crate::blog::{map_messages_to_fields, Page, PageMeta, ValidationErrors};
use crate::db::models::{
    Comment, CommentEnvelope, NewComment, NewPost, NewUser, Post, PostChanges, PostEnvelope,
    User, UserEnvelope,
};

const POST_FIELDS: &[&str] = &["title", "body", "user_id"];
const COMMENT_FIELDS: &[&str] = &["body", "user_id", "post_id"];
const USER_FIELDS: &[&str] = &["name", "email"];

/// Paginated collections the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Posts,
    Comments,
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Posts => "posts",
            ResourceKind::Comments => "comments",
        }
    }
}

/// Collection body; the item key is `posts` or `comments` depending on the resource.
#[derive(Deserialize)]
struct Listing<T> {
    #[serde(alias = "posts", alias = "comments")]
    items: Vec<T>,
    meta: PageMeta,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    details: Option<ValidationErrors>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch one page of a collection. Comments need the owning post as scope.
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        scope: Option<i64>,
        page: u32,
    ) -> Result<Page<T>> {
        let path = match (kind, scope) {
            (ResourceKind::Posts, _) => "/posts".to_string(),
            (ResourceKind::Comments, Some(post_id)) => format!("/posts/{post_id}/comments"),
            (ResourceKind::Comments, None) => return Err(ClientError::MissingScope),
        };
        let request = self.http.get(self.url(&path)).query(&[("page", page.max(1))]);
        let listing: Listing<T> = send(request, &[]).await?;
        Ok(Page {
            items: listing.items,
            meta: listing.meta,
        })
    }

    pub async fn list_posts(&self, page: u32) -> Result<Page<Post>> {
        self.list_page(ResourceKind::Posts, None, page).await
    }

    /// Single post with its comments embedded.
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        let request = self.http.get(self.url(&format!("/posts/{id}")));
        send(request, &[]).await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let request = self
            .http
            .post(self.url("/posts"))
            .json(&PostEnvelope { post });
        send(request, POST_FIELDS).await
    }

    pub async fn update_post(&self, id: i64, changes: &PostChanges) -> Result<Post> {
        let request = self
            .http
            .patch(self.url(&format!("/posts/{id}")))
            .json(&PostEnvelope { post: changes });
        send(request, POST_FIELDS).await
    }

    pub async fn delete_post(&self, id: i64) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/posts/{id}")));
        send_empty(request).await
    }

    pub async fn list_comments(&self, post_id: i64, page: u32) -> Result<Page<Comment>> {
        self.list_page(ResourceKind::Comments, Some(post_id), page)
            .await
    }

    pub async fn create_comment(&self, post_id: i64, comment: &NewComment) -> Result<Comment> {
        let request = self
            .http
            .post(self.url(&format!("/posts/{post_id}/comments")))
            .json(&CommentEnvelope { comment });
        send(request, COMMENT_FIELDS).await
    }

    pub async fn delete_comment(&self, post_id: i64, comment_id: i64) -> Result<()> {
        let request = self
            .http
            .delete(self.url(&format!("/posts/{post_id}/comments/{comment_id}")));
        send_empty(request).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let request = self.http.get(self.url("/users"));
        send(request, &[]).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        let request = self
            .http
            .post(self.url("/users"))
            .json(&UserEnvelope { user });
        send(request, USER_FIELDS).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder, fields: &[&str]) -> Result<T> {
    let response = request.send().await?;
    if response.status().is_success() {
        return Ok(response.json().await?);
    }
    Err(error_from(response, fields).await)
}

async fn send_empty(request: RequestBuilder) -> Result<()> {
    let response = request.send().await?;
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_from(response, &[]).await)
}

async fn error_from(response: Response, fields: &[&str]) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    classify(status, &text, fields)
}

/// Map a non-success response to a client error. Validation bodies without
/// structured `details` fall back to matching messages against `fields`.
fn classify(status: StatusCode, body: &str, fields: &[&str]) -> ClientError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound,
        StatusCode::UNPROCESSABLE_ENTITY => {
            let errors = match parsed.details {
                Some(details) if !details.is_empty() => details,
                _ => map_messages_to_fields(&parsed.errors, fields),
            };
            ClientError::Validation(errors)
        }
        _ => {
            let message = parsed
                .error
                .or_else(|| parsed.errors.first().cloned())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            ClientError::Server {
                status: status.as_u16(),
                message,
            }
        }
    }
}
