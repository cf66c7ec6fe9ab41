//! Cache-aware loading of paginated collections and post details.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::api::{ApiClient, ResourceKind};
use super::cache::{CacheKey, QueryCache, Scope};
use super::error::{ClientError, Result};
use crate::blog::Page;
use crate::db::models::{Comment, Post, User};

/// Items that can be listed page by page.
pub trait Listable: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;
}

impl Listable for Post {
    const KIND: ResourceKind = ResourceKind::Posts;
}

impl Listable for Comment {
    const KIND: ResourceKind = ResourceKind::Comments;
}

/// Whether a read may be answered from the query cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve a fresh cached entry if one exists.
    Cached,
    /// Always ask the server, then refresh the cache.
    Reload,
}

/// Where a list presenter gets its pages from.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    fn scope(&self) -> Scope;

    async fn fetch_page(&self, page: u32, freshness: Freshness) -> Result<Page<T>>;
}

#[derive(Clone)]
pub struct Fetcher {
    client: ApiClient,
    cache: QueryCache,
}

impl Fetcher {
    pub fn new(client: ApiClient, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Load one page of `T`, from the cache when a fresh entry exists.
    pub async fn fetch<T: Listable>(&self, scope_id: Option<i64>, page: u32) -> Result<Page<T>> {
        self.fetch_with::<T>(scope_id, page, Freshness::Cached).await
    }

    pub async fn fetch_with<T: Listable>(
        &self,
        scope_id: Option<i64>,
        page: u32,
        freshness: Freshness,
    ) -> Result<Page<T>> {
        let scope = scope_for(T::KIND, scope_id)?;
        let key = CacheKey::new(scope, page.max(1));
        if freshness == Freshness::Cached {
            if let Some(hit) = self.cache.get::<Page<T>>(&key).await {
                return Ok(hit);
            }
        }

        let epoch = self.cache.epoch(scope);
        let fetched: Page<T> = self.client.list_page(T::KIND, scope_id, page).await?;
        // Store under the page the server resolved to as well, so a clamped
        // request and a direct one share an entry.
        self.cache.insert(key, &fetched, epoch).await;
        let resolved = CacheKey::new(scope, fetched.meta.current_page);
        if resolved != key {
            self.cache.insert(resolved, &fetched, epoch).await;
        }
        Ok(fetched)
    }

    /// Post with embedded comments.
    pub async fn post(&self, id: i64) -> Result<Post> {
        let key = CacheKey::new(Scope::Post(id), 0);
        if let Some(hit) = self.cache.get::<Post>(&key).await {
            return Ok(hit);
        }
        let epoch = self.cache.epoch(Scope::Post(id));
        let post = self.client.get_post(id).await?;
        self.cache.insert(key, &post, epoch).await;
        Ok(post)
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        let key = CacheKey::new(Scope::Users, 0);
        if let Some(hit) = self.cache.get::<Vec<User>>(&key).await {
            return Ok(hit);
        }
        let epoch = self.cache.epoch(Scope::Users);
        let users = self.client.list_users().await?;
        self.cache.insert(key, &users, epoch).await;
        Ok(users)
    }

    pub fn posts(self: &Arc<Self>) -> Collection<Post> {
        Collection::new(Arc::clone(self), None)
    }

    pub fn comments(self: &Arc<Self>, post_id: i64) -> Collection<Comment> {
        Collection::new(Arc::clone(self), Some(post_id))
    }
}

fn scope_for(kind: ResourceKind, scope_id: Option<i64>) -> Result<Scope> {
    match (kind, scope_id) {
        (ResourceKind::Posts, _) => Ok(Scope::Posts),
        (ResourceKind::Comments, Some(post_id)) => Ok(Scope::Comments(post_id)),
        (ResourceKind::Comments, None) => Err(ClientError::MissingScope),
    }
}

/// A [`PageSource`] bound to one collection.
pub struct Collection<T> {
    fetcher: Arc<Fetcher>,
    scope_id: Option<i64>,
    _item: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    fn new(fetcher: Arc<Fetcher>, scope_id: Option<i64>) -> Self {
        Self {
            fetcher,
            scope_id,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Listable> PageSource<T> for Collection<T> {
    fn scope(&self) -> Scope {
        match self.scope_id {
            Some(post_id) if T::KIND == ResourceKind::Comments => Scope::Comments(post_id),
            _ => Scope::Posts,
        }
    }

    async fn fetch_page(&self, page: u32, freshness: Freshness) -> Result<Page<T>> {
        self.fetcher
            .fetch_with::<T>(self.scope_id, page, freshness)
            .await
    }
}
