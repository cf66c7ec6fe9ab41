//! Paginated list state: loading, populated, empty or failed.
//!
//! Each page request takes a [`Ticket`]. Only the most recent ticket may
//! apply its result, so a slow response for an old page can never overwrite
//! the page the user navigated to last.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::cache::{QueryCache, Scope};
use super::error::ClientError;
use super::fetcher::{Freshness, PageSource};
use super::flash::FlashBoard;
use crate::blog::{Navigation, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Populated,
    Empty,
    Error,
}

/// Handle for one in-flight page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    pub page: u32,
    epoch: u64,
}

#[derive(Debug)]
pub struct ListPresenter<T> {
    scope: Scope,
    phase: Phase,
    requested_page: u32,
    seq: u64,
    /// Last page that loaded successfully. Kept through later failures.
    content: Option<Page<T>>,
    loaded_epoch: Option<u64>,
    notice: Option<String>,
}

impl<T> ListPresenter<T> {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            phase: Phase::Loading,
            requested_page: 1,
            seq: 0,
            content: None,
            loaded_epoch: None,
            notice: None,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn requested_page(&self) -> u32 {
        self.requested_page
    }

    /// Rows to draw. During loading or after a failure this is the previous
    /// page, if one ever loaded.
    pub fn page(&self) -> Option<&Page<T>> {
        self.content.as_ref()
    }

    pub fn items(&self) -> &[T] {
        self.content.as_ref().map_or(&[][..], |page| page.items.as_slice())
    }

    /// User-visible failure text for the error phase.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn navigation(&self) -> Navigation {
        match &self.content {
            Some(page) => page.meta.navigation(),
            None => Navigation::new(1, 1),
        }
    }

    /// Start loading `page`. Any ticket issued earlier becomes stale.
    pub fn begin(&mut self, page: u32, epoch: u64) -> Ticket {
        self.seq += 1;
        self.requested_page = page.max(1);
        self.phase = Phase::Loading;
        Ticket {
            seq: self.seq,
            page: self.requested_page,
            epoch,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.seq == self.seq
    }

    /// Apply a finished request. Returns `false` if the ticket was stale and
    /// the result was dropped.
    pub fn complete(&mut self, ticket: Ticket, result: Result<Page<T>, ClientError>) -> bool {
        if !self.is_current(&ticket) {
            tracing::debug!(
                scope = ?self.scope,
                page = ticket.page,
                "Discarding stale page response"
            );
            return false;
        }

        match result {
            Ok(page) => {
                self.phase = if page.is_empty() {
                    Phase::Empty
                } else {
                    Phase::Populated
                };
                // The server may have clamped an out-of-range request.
                self.requested_page = page.meta.current_page;
                self.content = Some(page);
                self.loaded_epoch = Some(ticket.epoch);
                self.notice = None;
            }
            Err(e) => {
                tracing::warn!(scope = ?self.scope, page = ticket.page, "Page fetch failed: {}", e);
                self.phase = Phase::Error;
                self.notice = Some(self.failure_message());
            }
        }
        true
    }

    pub fn failure_message(&self) -> String {
        format!("Failed to fetch {}", self.scope.label())
    }

    /// True when a mutation invalidated the scope after the visible page loaded.
    pub fn needs_refresh(&self, cache: &QueryCache) -> bool {
        match self.loaded_epoch {
            Some(epoch) => cache.epoch(self.scope) != epoch,
            None => false,
        }
    }

    fn target(&self, pick: impl FnOnce(&Navigation) -> Option<u32>) -> Option<u32> {
        if self.content.is_none() {
            return None;
        }
        pick(&self.navigation())
    }

    pub fn first_target(&self) -> Option<u32> {
        self.target(|nav| nav.first)
    }

    pub fn previous_target(&self) -> Option<u32> {
        self.target(|nav| nav.previous)
    }

    pub fn next_target(&self) -> Option<u32> {
        self.target(|nav| nav.next)
    }

    pub fn last_target(&self) -> Option<u32> {
        self.target(|nav| nav.last)
    }
}

/// Drives a [`ListPresenter`] against a [`PageSource`].
///
/// The presenter lock is released while a request is in flight, so several
/// navigations may overlap and the ticket check settles which one wins.
pub struct ListController<T> {
    presenter: Arc<Mutex<ListPresenter<T>>>,
    source: Arc<dyn PageSource<T>>,
    cache: QueryCache,
    flash: Option<FlashBoard>,
}

impl<T> Clone for ListController<T> {
    fn clone(&self) -> Self {
        Self {
            presenter: Arc::clone(&self.presenter),
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
            flash: self.flash.clone(),
        }
    }
}

impl<T: Send + 'static> ListController<T> {
    pub fn new(source: Arc<dyn PageSource<T>>, cache: QueryCache) -> Self {
        let presenter = ListPresenter::new(source.scope());
        Self {
            presenter: Arc::new(Mutex::new(presenter)),
            source,
            cache,
            flash: None,
        }
    }

    /// Post failure notices to `flash` as well as keeping them on the presenter.
    pub fn with_flash(mut self, flash: FlashBoard) -> Self {
        self.flash = Some(flash);
        self
    }

    /// Read the presenter state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&ListPresenter<T>) -> R) -> R {
        let presenter = self.presenter.lock().await;
        f(&*presenter)
    }

    /// Load the first page from the server.
    pub async fn mount(&self) -> bool {
        self.load(1, Freshness::Reload).await
    }

    /// Load `page`. Returns whether this request's result was applied.
    pub async fn go_to(&self, page: u32) -> bool {
        self.load(page, Freshness::Cached).await
    }

    async fn load(&self, page: u32, freshness: Freshness) -> bool {
        let ticket = {
            let mut presenter = self.presenter.lock().await;
            let epoch = self.cache.epoch(presenter.scope());
            presenter.begin(page, epoch)
        };

        let result = self.source.fetch_page(ticket.page, freshness).await;
        let failed = result.is_err();

        let mut presenter = self.presenter.lock().await;
        let applied = presenter.complete(ticket, result);
        if applied && failed {
            if let Some(flash) = &self.flash {
                flash.error(presenter.failure_message());
            }
        }
        applied
    }

    pub async fn first(&self) -> Option<bool> {
        let target = self.inspect(|p| p.first_target()).await?;
        Some(self.go_to(target).await)
    }

    pub async fn previous(&self) -> Option<bool> {
        let target = self.inspect(|p| p.previous_target()).await?;
        Some(self.go_to(target).await)
    }

    pub async fn next(&self) -> Option<bool> {
        let target = self.inspect(|p| p.next_target()).await?;
        Some(self.go_to(target).await)
    }

    pub async fn last(&self) -> Option<bool> {
        let target = self.inspect(|p| p.last_target()).await?;
        Some(self.go_to(target).await)
    }

    /// Reload the current page, skipping any cached copy.
    pub async fn refresh(&self) -> bool {
        let page = self.inspect(|p| p.requested_page()).await;
        self.load(page, Freshness::Reload).await
    }

    /// Reload only if a mutation invalidated this list since it loaded.
    pub async fn refresh_if_stale(&self) -> Option<bool> {
        let stale = self.inspect(|p| p.needs_refresh(&self.cache)).await;
        if !stale {
            return None;
        }
        Some(self.refresh().await)
    }
}
