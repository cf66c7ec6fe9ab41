//! Client core for the JSON API: typed requests, a shared query cache,
//! paginated list presenters, mutations and transient notices.

pub mod api;
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod flash;
pub mod mutation;
pub mod presenter;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

pub use api::{ApiClient, ResourceKind};
pub use cache::{CacheKey, QueryCache, Scope};
pub use error::ClientError;
pub use fetcher::{Collection, Fetcher, Freshness, Listable, PageSource};
pub use flash::{FlashBoard, FlashLevel, FlashMessage};
pub use mutation::{
    ConfirmationGate, Mutation, MutationCoordinator, MutationError, Outcome, Resource,
};
pub use presenter::{ListController, ListPresenter, Phase, Ticket};

use crate::db::models::{Comment, Post};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub flash_ttl_secs: u64,
    /// How long a cached page may be served before it is fetched again.
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/v1".to_string(),
            timeout_secs: 30,
            flash_ttl_secs: 5,
            cache_ttl_secs: cache::DEFAULT_CACHE_TTL_SECS,
            cache_capacity: cache::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Everything a frontend needs, wired to one cache and one flash board.
pub struct Frontend {
    pub fetcher: Arc<Fetcher>,
    pub mutations: MutationCoordinator,
    pub flash: FlashBoard,
}

impl Frontend {
    pub fn new(config: &ClientConfig, gate: Arc<dyn ConfirmationGate>) -> error::Result<Self> {
        let client = ApiClient::new(config)?;
        let cache = QueryCache::with_settings(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        );
        let flash = FlashBoard::new(Duration::from_secs(config.flash_ttl_secs));
        let mutations =
            MutationCoordinator::new(client.clone(), cache.clone(), flash.clone(), gate);
        Ok(Self {
            fetcher: Arc::new(Fetcher::new(client, cache)),
            mutations,
            flash,
        })
    }

    pub fn cache(&self) -> &QueryCache {
        self.fetcher.cache()
    }

    pub fn posts(&self) -> ListController<Post> {
        ListController::new(Arc::new(self.fetcher.posts()), self.cache().clone())
            .with_flash(self.flash.clone())
    }

    pub fn comments(&self, post_id: i64) -> ListController<Comment> {
        ListController::new(Arc::new(self.fetcher.comments(post_id)), self.cache().clone())
            .with_flash(self.flash.clone())
    }
}
