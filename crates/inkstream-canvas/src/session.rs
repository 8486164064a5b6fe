//! Whiteboard sessions
//!
//! A session is a named whiteboard instance with one owner and many
//! viewer/drawer participants, joined by a short human-entered code. The
//! owner binding is immutable; only the owner may delete the session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A whiteboard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,

    /// Wallet of the owning streamer; immutable for the session's lifetime
    pub owner: String,

    /// Short human-entered join code
    pub join_code: String,

    /// Whether the session currently accepts actions
    pub active: bool,

    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new active session.
    #[must_use]
    pub fn new(owner: impl Into<String>, join_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            join_code: join_code.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Validate a join code before any lookup or RPC.
///
/// Codes are 4-12 ASCII alphanumerics. Malformed codes are a synchronous
/// validation fault with no retry.
pub fn validate_join_code(code: &str) -> Result<()> {
    let trimmed = code.trim();
    if !(4..=12).contains(&trimmed.len()) || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidJoinCode(code.to_string()));
    }
    Ok(())
}

/// In-memory session registry used by the relay.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    codes: Arc<RwLock<HashMap<String, Uuid>>>,
}

impl SessionManager {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            codes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a session for `owner` with the given join code.
    pub async fn create(&self, owner: impl Into<String>, join_code: &str) -> Result<Session> {
        validate_join_code(join_code)?;
        let code = join_code.trim().to_ascii_lowercase();

        let mut codes = self.codes.write().await;
        if codes.contains_key(&code) {
            return Err(Error::InvalidJoinCode(format!("code already in use: {code}")));
        }

        let session = Session::new(owner, &code);
        codes.insert(code, session.id);
        self.sessions.write().await.insert(session.id, session.clone());
        Ok(session)
    }

    /// Get a session by id.
    pub async fn get(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Look up an active session by join code.
    pub async fn find_by_code(&self, join_code: &str) -> Result<Session> {
        validate_join_code(join_code)?;
        let code = join_code.trim().to_ascii_lowercase();
        let id = {
            let codes = self.codes.read().await;
            codes.get(&code).copied()
        };
        match id {
            Some(id) => self
                .get(id)
                .await
                .filter(|s| s.active)
                .ok_or(Error::UnknownJoinCode(code)),
            None => Err(Error::UnknownJoinCode(code)),
        }
    }

    /// Mark a session active or inactive. Owner-only.
    pub async fn set_active(&self, session_id: Uuid, caller: &str, active: bool) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        if session.owner != caller {
            return Err(Error::PermissionDenied(format!(
                "{caller} does not own session {session_id}"
            )));
        }
        session.active = active;
        Ok(())
    }

    /// Delete a session. Owner-only; the owner binding is immutable so this
    /// is the only destructive operation.
    pub async fn delete(&self, session_id: Uuid, caller: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        if session.owner != caller {
            return Err(Error::PermissionDenied(format!(
                "{caller} does not own session {session_id}"
            )));
        }
        let session = sessions
            .remove(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        self.codes.write().await.remove(&session.join_code);
        Ok(session)
    }

    /// Number of registered sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_code_validation() {
        assert!(validate_join_code("abcd").is_ok());
        assert!(validate_join_code("stream42").is_ok());
        assert!(validate_join_code(" abcd ").is_ok());

        assert!(validate_join_code("abc").is_err());
        assert!(validate_join_code("waytoolongforacode").is_err());
        assert!(validate_join_code("bad code!").is_err());
        assert!(validate_join_code("").is_err());
    }

    #[tokio::test]
    async fn test_create_and_find_by_code() {
        let manager = SessionManager::new();
        let session = manager.create("owner1", "Board7").await.unwrap();

        // lookup is case-insensitive
        let found = manager.find_by_code("board7").await.unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.owner, "owner1");
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let manager = SessionManager::new();
        manager.create("owner1", "board7").await.unwrap();
        assert!(manager.create("owner2", "board7").await.is_err());
    }

    #[tokio::test]
    async fn test_inactive_session_not_joinable() {
        let manager = SessionManager::new();
        let session = manager.create("owner1", "board7").await.unwrap();
        manager.set_active(session.id, "owner1", false).await.unwrap();

        assert!(matches!(
            manager.find_by_code("board7").await,
            Err(Error::UnknownJoinCode(_))
        ));
    }

    #[tokio::test]
    async fn test_only_owner_deletes() {
        let manager = SessionManager::new();
        let session = manager.create("owner1", "board7").await.unwrap();

        assert!(matches!(
            manager.delete(session.id, "intruder").await,
            Err(Error::PermissionDenied(_))
        ));

        manager.delete(session.id, "owner1").await.unwrap();
        assert_eq!(manager.count().await, 0);
        // code is released for reuse
        assert!(manager.create("owner2", "board7").await.is_ok());
    }
}
