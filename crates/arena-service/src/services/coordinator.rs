//! Presence coordinator
//!
//! The state machine at the center of the presence system: status writes,
//! online-set membership rules, self-healing reads, and the canonical
//! liveness predicate. Stateless — every instance runs one against the same
//! store and they converge without coordination.

use arena_cache::{keys, PresenceRecord, PresenceStore, SessionMetadata, SessionRegistry};
use arena_common::PresenceConfig;
use arena_core::{ChannelId, PresenceStatus, SessionId, UserId, UserStatusRepository};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{ServiceError, ServiceResult};

/// Result of a status write.
///
/// Presence is advisory, not transactional: failures are reported here, not
/// raised, so a broken store degrades presence accuracy without breaking the
/// connection that asked.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub success: bool,
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub previous_status: PresenceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusUpdate {
    fn failed(
        user_id: UserId,
        status: PresenceStatus,
        session_id: Option<SessionId>,
        error: String,
    ) -> Self {
        Self {
            success: false,
            user_id,
            status,
            previous_status: PresenceStatus::Offline,
            session_id,
            timestamp: Utc::now().timestamp(),
            error: Some(error),
        }
    }
}

/// A user's presence as seen by a read
#[derive(Debug, Clone, Serialize)]
pub struct PresenceView {
    pub user_id: UserId,
    pub status: PresenceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    pub session_count: u64,
    /// Set when this read repaired a stale record
    pub corrected: bool,
}

impl PresenceView {
    fn offline(user_id: UserId) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Offline,
            last_seen: None,
            updated_at: None,
            session_count: 0,
            corrected: false,
        }
    }
}

/// The canonical liveness predicate, evaluated in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Sessions exist and the heartbeat is fresh
    Active,
    /// Sessions exist but the heartbeat has expired (client backgrounded)
    Idle,
    /// No live sessions
    Gone,
}

/// Presence coordinator
#[derive(Clone)]
pub struct PresenceCoordinator {
    store: Arc<dyn PresenceStore>,
    registry: SessionRegistry,
    users: Arc<dyn UserStatusRepository>,
    settings: PresenceConfig,
    instance_id: String,
}

impl PresenceCoordinator {
    /// Create a coordinator
    pub fn new(
        store: Arc<dyn PresenceStore>,
        registry: SessionRegistry,
        users: Arc<dyn UserStatusRepository>,
        settings: PresenceConfig,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            users,
            settings,
            instance_id: instance_id.into(),
        }
    }

    /// The session registry this coordinator writes through
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Update a user's status.
    ///
    /// With a session id, `online` registers that session and `offline`
    /// deregisters only that session — other devices may remain connected.
    /// Never returns an error; failures come back as `success: false`.
    pub async fn set_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        session_id: Option<&SessionId>,
    ) -> StatusUpdate {
        match self.try_set_status(user_id, status, session_id).await {
            Ok(update) => update,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    status = %status,
                    error = %e,
                    "Status update failed"
                );
                StatusUpdate::failed(user_id, status, session_id.cloned(), e.to_string())
            }
        }
    }

    async fn try_set_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        session_id: Option<&SessionId>,
    ) -> ServiceResult<StatusUpdate> {
        let previous = self.read_status(user_id).await?;

        // Registry first so the record carries a fresh count
        match (status, session_id) {
            (PresenceStatus::Online, Some(sid)) => {
                self.registry
                    .register(
                        user_id,
                        sid,
                        SessionMetadata::for_instance(&self.instance_id),
                    )
                    .await?;
            }
            (PresenceStatus::Offline, Some(sid)) => {
                self.registry.deregister(user_id, sid).await?;
            }
            _ => {}
        }
        let session_count = self.registry.session_count(user_id).await?;

        // Tunable grace window: a last-session disconnect may leave the
        // online record in place with a clamped TTL, so a quick reconnect
        // never reads as a flicker. Expiry, the self-healing read, or the
        // next sweep completes the downgrade. Applies only to the
        // session-carrying disconnect path.
        if status == PresenceStatus::Offline
            && session_id.is_some()
            && session_count == 0
            && previous == PresenceStatus::Online
            && self.settings.offline_grace > 0
        {
            self.store
                .expire(&keys::presence(user_id), self.settings.offline_grace)
                .await?;

            debug!(
                user_id = %user_id,
                grace = self.settings.offline_grace,
                "Deferred offline downgrade for grace window"
            );

            return Ok(StatusUpdate {
                success: true,
                user_id,
                status: previous,
                previous_status: previous,
                session_id: session_id.cloned(),
                timestamp: Utc::now().timestamp(),
                error: None,
            });
        }

        // Last-session-wins: a disconnect while other devices remain
        // connected keeps the user's previous status. Only the final
        // session's departure downgrades.
        let effective_status = if status == PresenceStatus::Offline
            && session_id.is_some()
            && session_count > 0
        {
            debug!(
                user_id = %user_id,
                sessions = session_count,
                "Session closed but others remain, keeping status"
            );
            previous
        } else {
            status
        };

        // Write the record with a TTL chosen by status
        let record = PresenceRecord::new(effective_status, session_count, session_id.cloned());
        let presence_key = keys::presence(user_id);
        self.store
            .hash_set_all(&presence_key, &record.to_fields())
            .await?;
        let ttl = if effective_status.is_online() {
            self.settings.online_ttl
        } else {
            self.settings.idle_ttl
        };
        self.store.expire(&presence_key, ttl).await?;

        // Online-set transition rules
        if effective_status == PresenceStatus::Online && previous != PresenceStatus::Online {
            self.store
                .set_add(keys::ONLINE_USERS, &user_id.to_string())
                .await?;
        }
        if effective_status == PresenceStatus::Offline && session_count == 0 {
            self.store
                .set_remove(keys::ONLINE_USERS, &user_id.to_string())
                .await?;
        }

        // The status write is itself a liveness signal
        if effective_status == PresenceStatus::Online {
            self.heartbeat(user_id).await;
        }

        // Best-effort durable mirror; never rolls back the store-side write
        if let Err(e) = self
            .users
            .update_status(user_id, effective_status, Utc::now())
            .await
        {
            warn!(
                user_id = %user_id,
                error = %e,
                "Durable presence mirror write failed"
            );
        }

        debug!(
            user_id = %user_id,
            status = %effective_status,
            previous = %previous,
            sessions = session_count,
            "Status updated"
        );

        Ok(StatusUpdate {
            success: true,
            user_id,
            status: effective_status,
            previous_status: previous,
            session_id: session_id.cloned(),
            timestamp: record.updated_at,
            error: None,
        })
    }

    /// Self-healing presence read.
    ///
    /// Falls back store hash → durable mirror → offline. A record claiming
    /// `online` with no live sessions is stale: the read repairs it and
    /// returns the corrected value flagged `corrected`.
    pub async fn get_presence(&self, user_id: UserId) -> PresenceView {
        match self.try_get_presence(user_id).await {
            Ok(view) => view,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Presence read failed");
                PresenceView::offline(user_id)
            }
        }
    }

    async fn try_get_presence(&self, user_id: UserId) -> ServiceResult<PresenceView> {
        let fields = self.store.hash_get_all(&keys::presence(user_id)).await?;
        let record = PresenceRecord::from_fields(&fields);
        let session_count = self.registry.session_count(user_id).await?;

        let (status, last_seen, updated_at) = match record {
            Some(r) => (r.status, Some(r.last_seen), Some(r.updated_at)),
            None => match self.users.read_status(user_id).await {
                Ok(Some(durable)) => (
                    durable.status,
                    durable.last_seen.map(|t| t.timestamp()),
                    None,
                ),
                Ok(None) => (PresenceStatus::Offline, None, None),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Durable presence read failed");
                    (PresenceStatus::Offline, None, None)
                }
            },
        };

        // Correction rule: online with zero sessions is stale
        if status == PresenceStatus::Online && session_count == 0 {
            debug!(user_id = %user_id, "Correcting stale online record");
            self.set_status(user_id, PresenceStatus::Offline, None).await;

            return Ok(PresenceView {
                user_id,
                status: PresenceStatus::Offline,
                last_seen,
                updated_at: Some(Utc::now().timestamp()),
                session_count: 0,
                corrected: true,
            });
        }

        Ok(PresenceView {
            user_id,
            status,
            last_seen,
            updated_at,
            session_count,
            corrected: false,
        })
    }

    /// Confirmed-online users, globally or within a channel.
    ///
    /// Every candidate is re-validated through the self-healing read; invalid
    /// entries are removed from the backing set opportunistically, not only
    /// on scheduled sweeps.
    pub async fn get_online_users(&self, channel_id: Option<ChannelId>) -> Vec<UserId> {
        match self.try_get_online_users(channel_id).await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Online-user read failed");
                Vec::new()
            }
        }
    }

    async fn try_get_online_users(
        &self,
        channel_id: Option<ChannelId>,
    ) -> ServiceResult<Vec<UserId>> {
        match channel_id {
            Some(channel) => {
                let online_key = keys::channel_online(channel);
                let members_key = keys::channel_members(channel);
                let mut confirmed = Vec::new();

                for member in self.store.set_members(&online_key).await? {
                    let Ok(user_id) = member.parse::<UserId>() else {
                        self.store.set_remove(&online_key, &member).await?;
                        continue;
                    };
                    // Online subset must stay within channel membership
                    if !self.store.set_contains(&members_key, &member).await? {
                        self.store.set_remove(&online_key, &member).await?;
                        continue;
                    }
                    if self.get_presence(user_id).await.status.is_online() {
                        confirmed.push(user_id);
                    } else {
                        self.store.set_remove(&online_key, &member).await?;
                    }
                }

                Ok(confirmed)
            }
            None => {
                let mut confirmed = Vec::new();

                for member in self.store.set_members(keys::ONLINE_USERS).await? {
                    let Ok(user_id) = member.parse::<UserId>() else {
                        self.store.set_remove(keys::ONLINE_USERS, &member).await?;
                        continue;
                    };
                    if self.get_presence(user_id).await.status.is_online() {
                        confirmed.push(user_id);
                    } else {
                        self.store.set_remove(keys::ONLINE_USERS, &member).await?;
                    }
                }

                Ok(confirmed)
            }
        }
    }

    /// Refresh the user's heartbeat key.
    ///
    /// Active connections must call this at an interval under half the
    /// heartbeat TTL to avoid false negatives. Returns false if the store
    /// rejected the write.
    pub async fn heartbeat(&self, user_id: UserId) -> bool {
        let result = self
            .store
            .put(
                &keys::heartbeat(user_id),
                &Utc::now().timestamp().to_string(),
                Some(self.settings.heartbeat_ttl),
            )
            .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Heartbeat refresh failed");
                false
            }
        }
    }

    /// The canonical online predicate: session count and heartbeat
    /// freshness, evaluated here and nowhere else.
    pub async fn liveness(&self, user_id: UserId) -> ServiceResult<Liveness> {
        if self.registry.session_count(user_id).await? == 0 {
            return Ok(Liveness::Gone);
        }
        if self.store.exists(&keys::heartbeat(user_id)).await? {
            Ok(Liveness::Active)
        } else {
            Ok(Liveness::Idle)
        }
    }

    /// Previous status for a transition: store hash → durable → offline
    async fn read_status(&self, user_id: UserId) -> ServiceResult<PresenceStatus> {
        let fields = self.store.hash_get_all(&keys::presence(user_id)).await?;
        if let Some(record) = PresenceRecord::from_fields(&fields) {
            return Ok(record.status);
        }

        match self.users.read_status(user_id).await {
            Ok(Some(durable)) => Ok(durable.status),
            Ok(None) => Ok(PresenceStatus::Offline),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Durable status read failed");
                Ok(PresenceStatus::Offline)
            }
        }
    }
}

impl std::fmt::Debug for PresenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceCoordinator")
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use arena_core::{
        ChannelDirectory, ChannelId, DurableStatus, PresenceStatus, RepoResult, UserId,
        UserStatusRepository,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory durable mirror recording every write
    #[derive(Default)]
    pub struct RecordingUserStore {
        pub statuses: Mutex<HashMap<UserId, (PresenceStatus, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl UserStatusRepository for RecordingUserStore {
        async fn update_status(
            &self,
            user_id: UserId,
            status: PresenceStatus,
            last_seen: DateTime<Utc>,
        ) -> RepoResult<()> {
            self.statuses
                .lock()
                .unwrap()
                .insert(user_id, (status, last_seen));
            Ok(())
        }

        async fn read_status(&self, user_id: UserId) -> RepoResult<Option<DurableStatus>> {
            Ok(self.statuses.lock().unwrap().get(&user_id).map(
                |(status, last_seen)| DurableStatus {
                    status: *status,
                    last_seen: Some(*last_seen),
                },
            ))
        }
    }

    /// Static channel membership for tests
    #[derive(Default)]
    pub struct StaticDirectory {
        pub memberships: HashMap<UserId, Vec<ChannelId>>,
    }

    #[async_trait]
    impl ChannelDirectory for StaticDirectory {
        async fn channels_for_user(&self, user_id: UserId) -> RepoResult<Vec<ChannelId>> {
            Ok(self.memberships.get(&user_id).cloned().unwrap_or_default())
        }

        async fn members_of(&self, channel_id: ChannelId) -> RepoResult<Vec<UserId>> {
            Ok(self
                .memberships
                .iter()
                .filter(|(_, channels)| channels.contains(&channel_id))
                .map(|(user, _)| *user)
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingUserStore;
    use super::*;
    use arena_cache::MemoryStore;
    use arena_core::ChannelId;

    fn coordinator_on(store: Arc<dyn PresenceStore>, instance: &str) -> PresenceCoordinator {
        let settings = PresenceConfig::default();
        PresenceCoordinator::new(
            store.clone(),
            SessionRegistry::new(store, settings.session_ttl),
            Arc::new(RecordingUserStore::default()),
            settings,
            instance,
        )
    }

    fn fixture() -> (Arc<MemoryStore>, PresenceCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator_on(store.clone(), "gw-1");
        (store, coordinator)
    }

    #[tokio::test]
    async fn test_online_registers_session() {
        let (store, coordinator) = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        let update = coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        assert!(update.success);
        assert_eq!(update.status, PresenceStatus::Online);
        assert_eq!(update.previous_status, PresenceStatus::Offline);

        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Online);
        assert_eq!(view.session_count, 1);
        assert!(!view.corrected);

        assert!(store
            .set_contains(&keys::user_sessions(user_id), session_id.as_str())
            .await
            .unwrap());
        assert!(store
            .set_contains(keys::ONLINE_USERS, &user_id.to_string())
            .await
            .unwrap());
        // The status write doubled as a heartbeat
        assert!(store.exists(&keys::heartbeat(user_id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_multi_session_last_wins() {
        let (_, coordinator) = fixture();
        let user_id = UserId::random();
        let s1 = SessionId::generate();
        let s2 = SessionId::generate();

        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&s1))
            .await;
        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&s2))
            .await;

        // First disconnect leaves the other device online
        coordinator
            .set_status(user_id, PresenceStatus::Offline, Some(&s1))
            .await;
        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Online);
        assert_eq!(view.session_count, 1);

        // Last disconnect takes the user offline
        coordinator
            .set_status(user_id, PresenceStatus::Offline, Some(&s2))
            .await;
        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Offline);
        assert_eq!(view.session_count, 0);
    }

    #[tokio::test]
    async fn test_offline_never_clears_other_sessions() {
        let (store, coordinator) = fixture();
        let user_id = UserId::random();
        let s1 = SessionId::generate();
        let s2 = SessionId::generate();

        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&s1))
            .await;
        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&s2))
            .await;
        coordinator
            .set_status(user_id, PresenceStatus::Offline, Some(&s1))
            .await;

        assert!(store
            .set_contains(&keys::user_sessions(user_id), s2.as_str())
            .await
            .unwrap());
        // Still in the online set: a session remains
        assert!(store
            .set_contains(keys::ONLINE_USERS, &user_id.to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_drift_correction_on_read() {
        let (store, coordinator) = fixture();
        let user_id = UserId::random();

        // Forge the drift: online record and set membership, zero sessions
        let record = PresenceRecord::new(PresenceStatus::Online, 1, None);
        store
            .hash_set_all(&keys::presence(user_id), &record.to_fields())
            .await
            .unwrap();
        store
            .set_add(keys::ONLINE_USERS, &user_id.to_string())
            .await
            .unwrap();

        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Offline);
        assert!(view.corrected);

        // The correction also repaired the online set
        assert!(!store
            .set_contains(keys::ONLINE_USERS, &user_id.to_string())
            .await
            .unwrap());

        // Steady state afterwards: no further correction
        let view = coordinator.get_presence(user_id).await;
        assert!(!view.corrected);
    }

    #[tokio::test]
    async fn test_get_online_users_prunes_invalid() {
        let (store, coordinator) = fixture();
        let live = UserId::random();
        let stale = UserId::random();
        let session_id = SessionId::generate();

        coordinator
            .set_status(live, PresenceStatus::Online, Some(&session_id))
            .await;
        store
            .set_add(keys::ONLINE_USERS, &stale.to_string())
            .await
            .unwrap();
        store.set_add(keys::ONLINE_USERS, "garbage").await.unwrap();

        let online = coordinator.get_online_users(None).await;
        assert_eq!(online, vec![live]);

        assert!(!store
            .set_contains(keys::ONLINE_USERS, &stale.to_string())
            .await
            .unwrap());
        assert!(!store
            .set_contains(keys::ONLINE_USERS, "garbage")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_channel_online_is_subset() {
        let (store, coordinator) = fixture();
        let channel = ChannelId::random();
        let member_online = UserId::random();
        let member_offline = UserId::random();
        let outsider = UserId::random();
        let session_id = SessionId::generate();

        for user in [member_online, member_offline] {
            store
                .set_add(&keys::channel_members(channel), &user.to_string())
                .await
                .unwrap();
        }
        for user in [member_online, member_offline, outsider] {
            store
                .set_add(&keys::channel_online(channel), &user.to_string())
                .await
                .unwrap();
        }
        coordinator
            .set_status(member_online, PresenceStatus::Online, Some(&session_id))
            .await;

        let channel_online = coordinator.get_online_users(Some(channel)).await;
        assert_eq!(channel_online, vec![member_online]);

        // Subset of the global view as well
        let global = coordinator.get_online_users(None).await;
        for user in &channel_online {
            assert!(global.contains(user));
        }

        // Non-members and non-online members were pruned from the subset
        assert_eq!(
            store
                .set_size(&keys::channel_online(channel))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_two_instances_one_user() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let gw1 = coordinator_on(store.clone(), "gw-1");
        let gw2 = coordinator_on(store.clone(), "gw-2");
        let user_id = UserId::random();
        let s1 = SessionId::generate();
        let s2 = SessionId::generate();

        gw1.set_status(user_id, PresenceStatus::Online, Some(&s1)).await;
        gw2.set_status(user_id, PresenceStatus::Online, Some(&s2)).await;

        // Exactly one online user with two sessions, seen from either side
        assert_eq!(gw1.get_online_users(None).await, vec![user_id]);
        assert_eq!(gw2.get_presence(user_id).await.session_count, 2);
    }

    #[tokio::test]
    async fn test_manual_status_without_session() {
        let (_, coordinator) = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        let update = coordinator
            .set_status(user_id, PresenceStatus::Away, None)
            .await;

        assert!(update.success);
        assert_eq!(update.previous_status, PresenceStatus::Online);

        // The session registry was not touched
        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Away);
        assert_eq!(view.session_count, 1);
    }

    #[tokio::test]
    async fn test_durable_mirror_receives_writes() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let users = Arc::new(RecordingUserStore::default());
        let settings = PresenceConfig::default();
        let coordinator = PresenceCoordinator::new(
            store.clone(),
            SessionRegistry::new(store, settings.session_ttl),
            users.clone(),
            settings,
            "gw-1",
        );
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;

        let mirrored = users.statuses.lock().unwrap().get(&user_id).copied();
        assert_eq!(mirrored.map(|(s, _)| s), Some(PresenceStatus::Online));
    }

    #[tokio::test]
    async fn test_fallback_to_durable_store() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let users = Arc::new(RecordingUserStore::default());
        let settings = PresenceConfig::default();
        let coordinator = PresenceCoordinator::new(
            store.clone(),
            SessionRegistry::new(store, settings.session_ttl),
            users.clone(),
            settings,
            "gw-1",
        );
        let user_id = UserId::random();

        users
            .update_status(user_id, PresenceStatus::Away, Utc::now())
            .await
            .unwrap();

        // No cached record: the durable mirror answers
        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Away);
        assert!(view.last_seen.is_some());
    }

    #[tokio::test]
    async fn test_liveness_predicate() {
        let (store, coordinator) = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        assert_eq!(
            coordinator.liveness(user_id).await.unwrap(),
            Liveness::Gone
        );

        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        assert_eq!(
            coordinator.liveness(user_id).await.unwrap(),
            Liveness::Active
        );

        // Heartbeat expiry with a live session reads as idle
        store.delete(&keys::heartbeat(user_id)).await.unwrap();
        assert_eq!(
            coordinator.liveness(user_id).await.unwrap(),
            Liveness::Idle
        );
    }

    #[tokio::test]
    async fn test_store_failure_returns_failed_update() {
        use arena_cache::{StoreError, StoreResult};
        use std::collections::HashMap;

        // A store that refuses everything
        struct DownStore;

        fn down<T>() -> StoreResult<T> {
            Err(StoreError::CreatePool("store down".to_string()))
        }

        #[async_trait::async_trait]
        impl PresenceStore for DownStore {
            async fn put(&self, _: &str, _: &str, _: Option<u64>) -> StoreResult<()> {
                down()
            }
            async fn get(&self, _: &str) -> StoreResult<Option<String>> {
                down()
            }
            async fn delete(&self, _: &str) -> StoreResult<bool> {
                down()
            }
            async fn exists(&self, _: &str) -> StoreResult<bool> {
                down()
            }
            async fn expire(&self, _: &str, _: u64) -> StoreResult<bool> {
                down()
            }
            async fn ttl(&self, _: &str) -> StoreResult<Option<i64>> {
                down()
            }
            async fn set_add(&self, _: &str, _: &str) -> StoreResult<bool> {
                down()
            }
            async fn set_remove(&self, _: &str, _: &str) -> StoreResult<bool> {
                down()
            }
            async fn set_members(&self, _: &str) -> StoreResult<Vec<String>> {
                down()
            }
            async fn set_size(&self, _: &str) -> StoreResult<u64> {
                down()
            }
            async fn set_contains(&self, _: &str, _: &str) -> StoreResult<bool> {
                down()
            }
            async fn hash_set_all(&self, _: &str, _: &[(&str, String)]) -> StoreResult<()> {
                down()
            }
            async fn hash_set(&self, _: &str, _: &str, _: &str) -> StoreResult<()> {
                down()
            }
            async fn hash_get_all(&self, _: &str) -> StoreResult<HashMap<String, String>> {
                down()
            }
        }

        let coordinator = coordinator_on(Arc::new(DownStore), "gw-1");
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        // Failures are reported, never raised
        let update = coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        assert!(!update.success);
        assert!(update.error.is_some());

        // Reads degrade to safe defaults
        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Offline);
        assert!(coordinator.get_online_users(None).await.is_empty());
        assert!(!coordinator.heartbeat(user_id).await);
    }

    #[tokio::test]
    async fn test_offline_grace_defers_downgrade() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let settings = PresenceConfig {
            offline_grace: 30,
            ..PresenceConfig::default()
        };
        let coordinator = PresenceCoordinator::new(
            store.clone(),
            SessionRegistry::new(store.clone(), settings.session_ttl),
            Arc::new(RecordingUserStore::default()),
            settings,
            "gw-1",
        );
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        let update = coordinator
            .set_status(user_id, PresenceStatus::Offline, Some(&session_id))
            .await;

        // Downgrade deferred: the record still reads online for the window
        assert!(update.success);
        assert_eq!(update.status, PresenceStatus::Online);
        let ttl = store.ttl(&keys::presence(user_id)).await.unwrap().unwrap();
        assert!(ttl <= 30);

        // The self-healing read still converges immediately if asked
        let view = coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Offline);
        assert!(view.corrected);
    }
}
