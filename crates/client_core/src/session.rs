//! Session state: the current authentication token, restored from and
//! written through to a durable store.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Durable backing store for the session token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_token(&self) -> Result<Option<String>>;
    async fn save_token(&self, token: &str) -> Result<()>;
    async fn clear_token(&self) -> Result<()>;
}

/// In-memory store for tests and sessions that should not outlive the
/// process.
#[derive(Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_token(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear_token(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for storage::SessionDb {
    async fn load_token(&self) -> Result<Option<String>> {
        storage::SessionDb::load_token(self).await
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        storage::SessionDb::save_token(self, token).await
    }

    async fn clear_token(&self) -> Result<()> {
        storage::SessionDb::clear_token(self).await
    }
}

/// Holds the current token, if any. Purely advisory on the client side: it
/// gates the mutation workflow and decorates write requests, while the
/// remote service stays the actual authority.
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    token: RwLock<Option<String>>,
}

impl SessionContext {
    /// Builds the context, restoring a previously persisted token.
    pub async fn initialize(store: Arc<dyn SessionStore>) -> Result<Arc<Self>> {
        let token = store.load_token().await?;
        if token.is_some() {
            info!("session: restored persisted token");
        }
        Ok(Arc::new(Self {
            store,
            token: RwLock::new(token),
        }))
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn set_token(&self, token: String) -> Result<()> {
        self.store.save_token(&token).await?;
        *self.token.write().await = Some(token);
        info!("session: token updated");
        Ok(())
    }

    pub async fn clear_token(&self) -> Result<()> {
        self.store.clear_token().await?;
        *self.token.write().await = None;
        info!("session: token cleared");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
