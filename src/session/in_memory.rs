use crate::error::Result;
use crate::traits::session::{SessionData, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory session store
///
/// Sessions live in a map behind an async `RwLock`. Suitable for a single
/// process: everything is lost on restart and nothing is shared between
/// instances.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                None => return Ok(None),
                Some(session) if !session.is_expired() => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it while we're here
        self.sessions.write().await.remove(session_id);
        Ok(None)
    }

    async fn save(&self, session_id: &str, data: SessionData) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), data);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_load_save() {
        let store = InMemorySessionStore::new();
        let mut data = SessionData::new(Duration::from_secs(3600));
        data.set("remote_addr".to_string(), "127.0.0.1:5000".to_string());

        store.save("s-1", data).await.unwrap();

        let loaded = store.load("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.get("remote_addr"), Some(&"127.0.0.1:5000".to_string()));
        assert!(store.load("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemorySessionStore::new();
        store
            .save("s-1", SessionData::new(Duration::from_secs(3600)))
            .await
            .unwrap();
        store.delete("s-1").await.unwrap();

        assert!(store.load("s-1").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped_on_load() {
        let store = InMemorySessionStore::new();
        store
            .save("s-1", SessionData::new(Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.load("s-1").await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = InMemorySessionStore::new();
        store
            .save("expired", SessionData::new(Duration::from_millis(10)))
            .await
            .unwrap();
        store
            .save("valid", SessionData::new(Duration::from_secs(3600)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert!(store.load("expired").await.unwrap().is_none());
        assert!(store.load("valid").await.unwrap().is_some());
    }
}
