use crate::error::{AppError, Result};
use crate::traits::session::SessionData;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Session key for the one-shot informational message
pub const FLASH_KEY: &str = "flash";
/// Session key for the one-shot warning message
pub const WARNING_KEY: &str = "warning";
/// Session key for the one-shot error message
pub const ERROR_KEY: &str = "error";

#[derive(Debug)]
struct SessionState {
    id: String,
    data: SessionData,
    modified: bool,
    is_new: bool,
}

/// Request-scoped session handle
///
/// Clones share the same state. The session layer loads the state before the
/// handler runs and persists it afterwards when it was modified.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

/// One-shot messages popped from the session for a single render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashMessages {
    pub flash: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl FlashMessages {
    pub fn is_empty(&self) -> bool {
        self.flash.is_none() && self.warning.is_none() && self.error.is_none()
    }
}

impl Session {
    /// A new, empty session with a fresh random id
    pub fn new(ttl: Duration) -> Self {
        Self::from_state(SessionState {
            id: uuid::Uuid::new_v4().to_string(),
            data: SessionData::new(ttl),
            modified: false,
            is_new: true,
        })
    }

    /// Wrap state loaded from a store
    pub fn from_store(id: impl Into<String>, data: SessionData) -> Self {
        Self::from_state(SessionState {
            id: id.into(),
            data,
            modified: false,
            is_new: false,
        })
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> String {
        self.lock().id.clone()
    }

    /// True until the state has been persisted once
    pub fn is_new(&self) -> bool {
        self.lock().is_new
    }

    /// True if any write happened during this request
    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    pub fn exists(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.lock().data.get(key).cloned()
    }

    pub fn put_string(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut state = self.lock();
        state.data.set(key.into(), value.into());
        state.modified = true;
    }

    /// Get a value and remove it in one step
    pub fn pop_string(&self, key: &str) -> Option<String> {
        let mut state = self.lock();
        let value = state.data.remove(key);
        if value.is_some() {
            state.modified = true;
        }
        value
    }

    pub fn remove(&self, key: &str) {
        self.pop_string(key);
    }

    /// Store any serializable value as JSON
    pub fn put<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let key = key.into();
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Session(format!("Failed to encode {}: {}", key, e)))?;
        self.put_string(key, json);
        Ok(())
    }

    /// Read a JSON value back; `Ok(None)` when the key is absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_string(key)
            .map(|json| decode(key, &json))
            .transpose()
    }

    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.pop_string(key)
            .map(|json| decode(key, &json))
            .transpose()
    }

    /// Get-then-clear the three one-shot message slots
    pub fn pop_flash_messages(&self) -> FlashMessages {
        FlashMessages {
            flash: self.pop_string(FLASH_KEY),
            warning: self.pop_string(WARNING_KEY),
            error: self.pop_string(ERROR_KEY),
        }
    }

    /// Snapshot for persistence: `(id, data, modified, is_new)`
    pub(crate) fn snapshot(&self) -> (String, SessionData, bool, bool) {
        let state = self.lock();
        (
            state.id.clone(),
            state.data.clone(),
            state.modified,
            state.is_new,
        )
    }

    pub(crate) fn mark_saved(&self) {
        let mut state = self.lock();
        state.modified = false;
        state.is_new = false;
    }

    pub(crate) fn ttl_remaining(&self) -> Duration {
        self.lock().data.remaining()
    }
}

fn decode<T: DeserializeOwned>(key: &str, json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| AppError::Session(format!("Failed to decode {}: {}", key, e)))
}
