//! Transient notices shown after mutations and failed fetches.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub id: Uuid,
    pub level: FlashLevel,
    pub text: String,
    pub expires_at: Instant,
}

/// Ordered list of live notices. Each one disappears after the board's TTL
/// or when removed by hand.
#[derive(Clone)]
pub struct FlashBoard {
    messages: Arc<Mutex<Vec<FlashMessage>>>,
    ttl: Duration,
}

impl FlashBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FlashMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, level: FlashLevel, text: impl Into<String>) -> Uuid {
        let id = Uuid::now_v7();
        let expires_at = Instant::now() + self.ttl;
        self.lock().push(FlashMessage {
            id,
            level,
            text: text.into(),
            expires_at,
        });

        // Outside a runtime the message still expires through `messages()`.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let board = self.clone();
            handle.spawn(async move {
                tokio::time::sleep_until(expires_at).await;
                board.remove(id);
            });
        }
        id
    }

    pub fn success(&self, text: impl Into<String>) -> Uuid {
        self.push(FlashLevel::Success, text)
    }

    pub fn error(&self, text: impl Into<String>) -> Uuid {
        self.push(FlashLevel::Error, text)
    }

    pub fn warning(&self, text: impl Into<String>) -> Uuid {
        self.push(FlashLevel::Warning, text)
    }

    pub fn info(&self, text: impl Into<String>) -> Uuid {
        self.push(FlashLevel::Info, text)
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let mut messages = self.lock();
        let before = messages.len();
        messages.retain(|m| m.id != id);
        messages.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Live messages, oldest first.
    pub fn messages(&self) -> Vec<FlashMessage> {
        let now = Instant::now();
        let mut messages = self.lock();
        messages.retain(|m| m.expires_at > now);
        messages.clone()
    }
}
