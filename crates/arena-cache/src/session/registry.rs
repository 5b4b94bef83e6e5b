//! Session registry
//!
//! Tracks session↔user mapping in the shared store: a hash per session, a
//! set of session ids per user, and a global active set for reconciliation
//! sweeps. Stateless — any instance can register or deregister any session.

use crate::keys;
use crate::presence::SessionRecord;
use crate::store::{PresenceStore, StoreResult};
use arena_core::{SessionId, UserId};
use chrono::Utc;
use std::sync::Arc;

/// Metadata recorded when a session is registered
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    /// Server process that owns the connection
    pub instance_id: String,
}

impl SessionMetadata {
    /// Metadata for a connection accepted by the given instance
    pub fn for_instance(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
        }
    }
}

/// Session registry over the shared store
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn PresenceStore>,
    session_ttl: u64,
}

impl SessionRegistry {
    /// Create a registry writing sessions with the given TTL (seconds)
    pub fn new(store: Arc<dyn PresenceStore>, session_ttl: u64) -> Self {
        Self { store, session_ttl }
    }

    /// Register a session for a user.
    ///
    /// Idempotent: re-registering an existing session overwrites its
    /// metadata and refreshes its TTL.
    pub async fn register(
        &self,
        user_id: UserId,
        session_id: &SessionId,
        metadata: SessionMetadata,
    ) -> StoreResult<()> {
        let record = SessionRecord::new(session_id.clone(), user_id, metadata.instance_id);

        let session_key = keys::session(session_id);
        self.store
            .hash_set_all(&session_key, &record.to_fields())
            .await?;
        self.store.expire(&session_key, self.session_ttl).await?;

        let sessions_key = keys::user_sessions(user_id);
        self.store.set_add(&sessions_key, session_id.as_str()).await?;
        self.store.expire(&sessions_key, self.session_ttl).await?;

        self.store
            .set_add(keys::ACTIVE_SESSIONS, &keys::active_member(user_id, session_id))
            .await?;

        tracing::debug!(
            user_id = %user_id,
            session_id = %session_id,
            "Session registered"
        );

        Ok(())
    }

    /// Deregister a session and return the user's remaining session count.
    ///
    /// Idempotent: deregistering a missing or already-expired session is a
    /// no-op that still reports the remaining count. The caller decides
    /// whether a zero count warrants a presence downgrade.
    pub async fn deregister(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<u64> {
        let sessions_key = keys::user_sessions(user_id);

        self.store
            .set_remove(&sessions_key, session_id.as_str())
            .await?;
        self.store.delete(&keys::session(session_id)).await?;
        self.store
            .set_remove(keys::ACTIVE_SESSIONS, &keys::active_member(user_id, session_id))
            .await?;

        let remaining = self.store.set_size(&sessions_key).await?;

        tracing::debug!(
            user_id = %user_id,
            session_id = %session_id,
            remaining = remaining,
            "Session deregistered"
        );

        Ok(remaining)
    }

    /// Number of live sessions for a user (set cardinality only)
    pub async fn session_count(&self, user_id: UserId) -> StoreResult<u64> {
        self.store.set_size(&keys::user_sessions(user_id)).await
    }

    /// Fetch the user's session records.
    ///
    /// Set members whose hash has expired are pruned from the session set
    /// (and the global active set) as a side effect of the read.
    pub async fn list_sessions(&self, user_id: UserId) -> StoreResult<Vec<SessionRecord>> {
        let sessions_key = keys::user_sessions(user_id);
        let members = self.store.set_members(&sessions_key).await?;

        let mut records = Vec::with_capacity(members.len());
        for member in members {
            let session_id = SessionId::new(member.as_str());
            let fields = self.store.hash_get_all(&keys::session(&session_id)).await?;

            match SessionRecord::from_fields(session_id.clone(), &fields) {
                Some(record) => records.push(record),
                None => {
                    self.store.set_remove(&sessions_key, &member).await?;
                    self.store
                        .set_remove(
                            keys::ACTIVE_SESSIONS,
                            &keys::active_member(user_id, &session_id),
                        )
                        .await?;
                    tracing::debug!(
                        user_id = %user_id,
                        session_id = %session_id,
                        "Pruned expired session from set"
                    );
                }
            }
        }

        Ok(records)
    }

    /// Record activity on a session: bump `last_active` and refresh TTLs.
    ///
    /// Returns false if the session hash no longer exists.
    pub async fn touch(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<bool> {
        let session_key = keys::session(session_id);
        if !self.store.exists(&session_key).await? {
            return Ok(false);
        }

        let now = Utc::now().timestamp();
        self.store
            .hash_set(&session_key, "last_active", &now.to_string())
            .await?;
        self.store.expire(&session_key, self.session_ttl).await?;
        self.store
            .expire(&keys::user_sessions(user_id), self.session_ttl)
            .await?;

        Ok(true)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(MemoryStore::new()), 86_400)
    }

    #[tokio::test]
    async fn test_register_and_count() {
        let registry = registry();
        let user_id = UserId::random();
        let s1 = SessionId::generate();
        let s2 = SessionId::generate();

        registry
            .register(user_id, &s1, SessionMetadata::for_instance("gw-1"))
            .await
            .unwrap();
        registry
            .register(user_id, &s2, SessionMetadata::for_instance("gw-2"))
            .await
            .unwrap();

        assert_eq!(registry.session_count(user_id).await.unwrap(), 2);

        let sessions = registry.list_sessions(user_id).await.unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = registry();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        registry
            .register(user_id, &session_id, SessionMetadata::for_instance("gw-1"))
            .await
            .unwrap();
        registry
            .register(user_id, &session_id, SessionMetadata::for_instance("gw-2"))
            .await
            .unwrap();

        assert_eq!(registry.session_count(user_id).await.unwrap(), 1);

        let sessions = registry.list_sessions(user_id).await.unwrap();
        assert_eq!(sessions[0].instance_id, "gw-2");
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent() {
        let registry = registry();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        registry
            .register(user_id, &session_id, SessionMetadata::default())
            .await
            .unwrap();

        assert_eq!(registry.deregister(user_id, &session_id).await.unwrap(), 0);
        // Second deregister of the same session is a safe no-op
        assert_eq!(registry.deregister(user_id, &session_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_matches_list_after_any_sequence() {
        let registry = registry();
        let user_id = UserId::random();
        let s1 = SessionId::generate();
        let s2 = SessionId::generate();
        let s3 = SessionId::generate();

        for sid in [&s1, &s2, &s3] {
            registry
                .register(user_id, sid, SessionMetadata::default())
                .await
                .unwrap();
        }
        registry.deregister(user_id, &s2).await.unwrap();
        registry
            .register(user_id, &s2, SessionMetadata::default())
            .await
            .unwrap();
        registry.deregister(user_id, &s1).await.unwrap();

        let count = registry.session_count(user_id).await.unwrap();
        let listed = registry.list_sessions(user_id).await.unwrap();
        assert_eq!(count, listed.len() as u64);
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_list_prunes_expired_hashes() {
        let store = Arc::new(MemoryStore::new());
        let registry = SessionRegistry::new(store.clone(), 86_400);
        let user_id = UserId::random();
        let live = SessionId::generate();
        let dead = SessionId::generate();

        registry
            .register(user_id, &live, SessionMetadata::default())
            .await
            .unwrap();
        registry
            .register(user_id, &dead, SessionMetadata::default())
            .await
            .unwrap();

        // Simulate TTL expiry of one session hash; the set still holds it
        store.delete(&keys::session(&dead)).await.unwrap();
        assert_eq!(registry.session_count(user_id).await.unwrap(), 2);

        let sessions = registry.list_sessions(user_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, live);

        // The read healed the set
        assert_eq!(registry.session_count(user_id).await.unwrap(), 1);
        assert!(!store
            .set_contains(keys::ACTIVE_SESSIONS, &keys::active_member(user_id, &dead))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_touch_updates_last_active() {
        let registry = registry();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        registry
            .register(user_id, &session_id, SessionMetadata::default())
            .await
            .unwrap();
        assert!(registry.touch(user_id, &session_id).await.unwrap());

        let missing = SessionId::generate();
        assert!(!registry.touch(user_id, &missing).await.unwrap());
    }
}
