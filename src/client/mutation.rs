//! Create, update and delete requests with their follow-up effects:
//! cache invalidation, success and failure notices, delete confirmation.

use std::sync::Arc;

use thiserror::Error;

use super::api::ApiClient;
use super::cache::{QueryCache, Scope};
use super::error::ClientError;
use super::flash::FlashBoard;
use crate::blog::ValidationErrors;
use crate::db::models::{Comment, NewComment, NewPost, NewUser, Post, PostChanges, User};

/// Asked before any destructive request is sent.
pub trait ConfirmationGate: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> ConfirmationGate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreatePost(NewPost),
    UpdatePost { id: i64, changes: PostChanges },
    DeletePost { id: i64 },
    CreateComment { post_id: i64, comment: NewComment },
    DeleteComment { post_id: i64, comment_id: i64 },
    CreateUser(NewUser),
}

impl Mutation {
    pub fn confirmation_prompt(&self) -> Option<&'static str> {
        match self {
            Mutation::DeletePost { .. } => Some("Are you sure you want to delete this post?"),
            Mutation::DeleteComment { .. } => {
                Some("Are you sure you want to delete this comment?")
            }
            _ => None,
        }
    }

    /// Cached views that can no longer be trusted once this succeeds.
    pub fn affected_scopes(&self) -> Vec<Scope> {
        match self {
            Mutation::CreatePost(_) => vec![Scope::Posts],
            Mutation::UpdatePost { id, .. } => vec![Scope::Posts, Scope::Post(*id)],
            Mutation::DeletePost { id } => {
                vec![Scope::Posts, Scope::Post(*id), Scope::Comments(*id)]
            }
            // Post rows show a comment count.
            Mutation::CreateComment { post_id, .. } | Mutation::DeleteComment { post_id, .. } => {
                vec![Scope::Comments(*post_id), Scope::Post(*post_id), Scope::Posts]
            }
            Mutation::CreateUser(_) => vec![Scope::Users],
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Mutation::CreatePost(_) => "Post created successfully",
            Mutation::UpdatePost { .. } => "Post updated successfully",
            Mutation::DeletePost { .. } => "Post deleted successfully",
            Mutation::CreateComment { .. } => "Comment added successfully",
            Mutation::DeleteComment { .. } => "Comment deleted successfully",
            Mutation::CreateUser(_) => "User created successfully",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Mutation::CreatePost(_) => "Failed to create post",
            Mutation::UpdatePost { .. } => "Failed to update post",
            Mutation::DeletePost { .. } => "Failed to delete post",
            Mutation::CreateComment { .. } => "Failed to add comment",
            Mutation::DeleteComment { .. } => "Failed to delete comment",
            Mutation::CreateUser(_) => "Failed to create user",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Post(Post),
    Comment(Comment),
    User(User),
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Resource),
    /// The gate declined; nothing was sent.
    Cancelled,
}

#[derive(Error, Debug)]
pub enum MutationError {
    /// Field errors for the form to display.
    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Failed(ClientError),
}

impl MutationError {
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            MutationError::Invalid(errors) => Some(errors),
            MutationError::Failed(_) => None,
        }
    }
}

pub struct MutationCoordinator {
    client: ApiClient,
    cache: QueryCache,
    flash: FlashBoard,
    gate: Arc<dyn ConfirmationGate>,
}

impl MutationCoordinator {
    pub fn new(
        client: ApiClient,
        cache: QueryCache,
        flash: FlashBoard,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            client,
            cache,
            flash,
            gate,
        }
    }

    pub async fn submit(&self, mutation: Mutation) -> Result<Outcome, MutationError> {
        if let Some(prompt) = mutation.confirmation_prompt() {
            if !self.gate.confirm(prompt) {
                tracing::debug!(?mutation, "Mutation cancelled at confirmation");
                return Ok(Outcome::Cancelled);
            }
        }

        match self.send(&mutation).await {
            Ok(resource) => {
                for scope in mutation.affected_scopes() {
                    self.cache.invalidate(scope);
                }
                self.flash.success(mutation.success_message());
                Ok(Outcome::Applied(resource))
            }
            Err(ClientError::Validation(errors)) => Err(MutationError::Invalid(errors)),
            Err(e) => {
                tracing::warn!(?mutation, "Mutation failed: {}", e);
                self.flash.error(mutation.failure_message());
                Err(MutationError::Failed(e))
            }
        }
    }

    async fn send(&self, mutation: &Mutation) -> Result<Resource, ClientError> {
        let resource = match mutation {
            Mutation::CreatePost(post) => Resource::Post(self.client.create_post(post).await?),
            Mutation::UpdatePost { id, changes } => {
                Resource::Post(self.client.update_post(*id, changes).await?)
            }
            Mutation::DeletePost { id } => {
                self.client.delete_post(*id).await?;
                Resource::Deleted
            }
            Mutation::CreateComment { post_id, comment } => {
                Resource::Comment(self.client.create_comment(*post_id, comment).await?)
            }
            Mutation::DeleteComment {
                post_id,
                comment_id,
            } => {
                self.client.delete_comment(*post_id, *comment_id).await?;
                Resource::Deleted
            }
            Mutation::CreateUser(user) => Resource::User(self.client.create_user(user).await?),
        };
        Ok(resource)
    }
}
