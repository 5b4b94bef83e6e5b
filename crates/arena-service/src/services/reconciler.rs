//! Reconciliation sweeps
//!
//! A corrective pass resolving drift between cached presence state and
//! ground-truth session existence. Sweeps are idempotent and safe to run
//! redundantly from every instance on independent timers — no leader
//! election.

use arena_cache::{keys, PresenceRecord, PresenceStore, SessionRecord};
use arena_common::PresenceConfig;
use arena_core::{PresenceStatus, SessionId, UserId};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::coordinator::{Liveness, PresenceCoordinator};
use super::error::ServiceResult;

/// Counters from a session sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSweep {
    /// Entries whose session hash had already expired
    pub expired: u64,
    /// Live sessions force-deregistered for inactivity
    pub zombies: u64,
    /// Users downgraded to offline as a result
    pub downgraded: u64,
}

/// Counters from a presence sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSweep {
    /// Users with sessions but no heartbeat, marked away
    pub marked_away: u64,
    /// Users with no sessions, forced offline
    pub marked_offline: u64,
}

/// Scheduled reconciliation over the store and registry
pub struct Reconciler {
    store: Arc<dyn PresenceStore>,
    coordinator: PresenceCoordinator,
    settings: PresenceConfig,
    running: AtomicBool,
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(
        store: Arc<dyn PresenceStore>,
        coordinator: PresenceCoordinator,
        settings: PresenceConfig,
    ) -> Self {
        Self {
            store,
            coordinator,
            settings,
            running: AtomicBool::new(false),
        }
    }

    /// Sweep the global active-session set.
    ///
    /// Expired session hashes are pruned from their user's set and the
    /// global set; sessions idle past the zombie threshold are force-
    /// deregistered (clients that stopped all activity without a clean
    /// disconnect). Either way, a user left with no sessions while presence
    /// still reads online is downgraded.
    pub async fn sweep_sessions(&self) -> ServiceResult<SessionSweep> {
        let mut report = SessionSweep::default();
        let now = Utc::now().timestamp();

        for member in self.store.set_members(keys::ACTIVE_SESSIONS).await? {
            let Some((user_id, session_id)) = keys::parse_active_member(&member) else {
                self.store.set_remove(keys::ACTIVE_SESSIONS, &member).await?;
                continue;
            };

            let fields = self.store.hash_get_all(&keys::session(&session_id)).await?;
            match SessionRecord::from_fields(session_id.clone(), &fields) {
                None => {
                    // TTL already elapsed; only the set entries remain
                    self.prune(user_id, &session_id, &member).await?;
                    report.expired += 1;
                    if self.downgrade_if_sessionless(user_id).await? {
                        report.downgraded += 1;
                    }
                }
                Some(record) => {
                    if record.idle_secs(now) > self.settings.zombie_after as i64 {
                        debug!(
                            user_id = %user_id,
                            session_id = %session_id,
                            idle_secs = record.idle_secs(now),
                            "Force-deregistering zombie session"
                        );
                        let remaining = self
                            .coordinator
                            .registry()
                            .deregister(user_id, &session_id)
                            .await?;
                        report.zombies += 1;
                        if remaining == 0 && self.downgrade_if_sessionless(user_id).await? {
                            report.downgraded += 1;
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Sweep the global online set.
    ///
    /// Users with no sessions are forced offline; users whose sessions exist
    /// but whose heartbeat has lapsed are downgraded to away.
    pub async fn sweep_presence(&self) -> ServiceResult<PresenceSweep> {
        let mut report = PresenceSweep::default();

        for member in self.store.set_members(keys::ONLINE_USERS).await? {
            let Ok(user_id) = member.parse::<UserId>() else {
                self.store.set_remove(keys::ONLINE_USERS, &member).await?;
                continue;
            };

            match self.coordinator.liveness(user_id).await? {
                Liveness::Gone => {
                    self.coordinator
                        .set_status(user_id, PresenceStatus::Offline, None)
                        .await;
                    report.marked_offline += 1;
                }
                Liveness::Idle => {
                    if self.current_status(user_id).await? != PresenceStatus::Away {
                        self.coordinator
                            .set_status(user_id, PresenceStatus::Away, None)
                            .await;
                        report.marked_away += 1;
                    }
                }
                Liveness::Active => {}
            }
        }

        Ok(report)
    }

    /// Spawn the periodic sweep loop
    pub fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Reconciler is already running");
            return;
        }

        let interval_secs = self.settings.sweep_interval;
        let reconciler = self.clone();
        let interval = Duration::from_secs(interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so startup isn't a sweep
            ticker.tick().await;

            while reconciler.running.load(Ordering::SeqCst) {
                ticker.tick().await;

                match reconciler.sweep_sessions().await {
                    Ok(report) if report != SessionSweep::default() => {
                        info!(
                            expired = report.expired,
                            zombies = report.zombies,
                            downgraded = report.downgraded,
                            "Session sweep completed"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Session sweep failed"),
                }

                match reconciler.sweep_presence().await {
                    Ok(report) if report != PresenceSweep::default() => {
                        info!(
                            marked_away = report.marked_away,
                            marked_offline = report.marked_offline,
                            "Presence sweep completed"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Presence sweep failed"),
                }
            }
        });

        info!(interval_secs = interval_secs, "Reconciler started");
    }

    /// Stop the periodic loop
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the periodic loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn prune(
        &self,
        user_id: UserId,
        session_id: &SessionId,
        member: &str,
    ) -> ServiceResult<()> {
        self.store
            .set_remove(&keys::user_sessions(user_id), session_id.as_str())
            .await?;
        self.store.set_remove(keys::ACTIVE_SESSIONS, member).await?;
        debug!(
            user_id = %user_id,
            session_id = %session_id,
            "Pruned expired session"
        );
        Ok(())
    }

    /// Downgrade a sessionless user whose cached record still claims online
    async fn downgrade_if_sessionless(&self, user_id: UserId) -> ServiceResult<bool> {
        if self.coordinator.registry().session_count(user_id).await? > 0 {
            return Ok(false);
        }
        if self.current_status(user_id).await? != PresenceStatus::Online {
            return Ok(false);
        }

        self.coordinator
            .set_status(user_id, PresenceStatus::Offline, None)
            .await;
        Ok(true)
    }

    async fn current_status(&self, user_id: UserId) -> ServiceResult<PresenceStatus> {
        let fields = self.store.hash_get_all(&keys::presence(user_id)).await?;
        Ok(PresenceRecord::from_fields(&fields)
            .map(|r| r.status)
            .unwrap_or_default())
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::coordinator::test_support::RecordingUserStore;
    use super::*;
    use arena_cache::{MemoryStore, SessionRegistry};

    struct Fixture {
        store: Arc<MemoryStore>,
        coordinator: PresenceCoordinator,
        reconciler: Reconciler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let settings = PresenceConfig::default();
        let coordinator = PresenceCoordinator::new(
            store.clone(),
            SessionRegistry::new(store.clone(), settings.session_ttl),
            Arc::new(RecordingUserStore::default()),
            settings,
            "gw-1",
        );
        let reconciler = Reconciler::new(store.clone(), coordinator.clone(), settings);
        Fixture {
            store,
            coordinator,
            reconciler,
        }
    }

    #[tokio::test]
    async fn test_sweeps_are_noops_on_clean_state() {
        let f = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        f.coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;

        assert_eq!(
            f.reconciler.sweep_sessions().await.unwrap(),
            SessionSweep::default()
        );
        assert_eq!(
            f.reconciler.sweep_presence().await.unwrap(),
            PresenceSweep::default()
        );
        assert_eq!(
            f.coordinator.get_presence(user_id).await.status,
            PresenceStatus::Online
        );
    }

    #[tokio::test]
    async fn test_expired_session_hash_is_pruned_and_downgraded() {
        let f = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        f.coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;

        // Simulate the session hash expiring out from under the sets
        f.store.delete(&keys::session(&session_id)).await.unwrap();

        let report = f.reconciler.sweep_sessions().await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.downgraded, 1);

        assert_eq!(
            f.store.set_size(keys::ACTIVE_SESSIONS).await.unwrap(),
            0
        );
        let view = f.coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Offline);
    }

    #[tokio::test]
    async fn test_offline_after_one_pass_when_sessionless() {
        let f = fixture();
        let user_id = UserId::random();

        // Record and set claim online; no sessions anywhere
        let record = PresenceRecord::new(PresenceStatus::Online, 1, None);
        f.store
            .hash_set_all(&keys::presence(user_id), &record.to_fields())
            .await
            .unwrap();
        f.store
            .set_add(keys::ONLINE_USERS, &user_id.to_string())
            .await
            .unwrap();

        let report = f.reconciler.sweep_presence().await.unwrap();
        assert_eq!(report.marked_offline, 1);
        assert_eq!(
            f.coordinator.get_presence(user_id).await.status,
            PresenceStatus::Offline
        );
    }

    #[tokio::test]
    async fn test_stale_heartbeat_marks_away_not_offline() {
        let f = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        f.coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        // Heartbeat lapses while the session lives on
        f.store.delete(&keys::heartbeat(user_id)).await.unwrap();

        let report = f.reconciler.sweep_presence().await.unwrap();
        assert_eq!(report.marked_away, 1);
        assert_eq!(report.marked_offline, 0);

        let view = f.coordinator.get_presence(user_id).await;
        assert_eq!(view.status, PresenceStatus::Away);
        assert_eq!(view.session_count, 1);
    }

    #[tokio::test]
    async fn test_zombie_session_is_force_deregistered() {
        let f = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        f.coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;

        // Backdate activity past the zombie threshold
        let stale = Utc::now().timestamp() - 7_200;
        f.store
            .hash_set(
                &keys::session(&session_id),
                "last_active",
                &stale.to_string(),
            )
            .await
            .unwrap();

        let report = f.reconciler.sweep_sessions().await.unwrap();
        assert_eq!(report.zombies, 1);
        assert_eq!(report.downgraded, 1);

        assert_eq!(
            f.coordinator
                .registry()
                .session_count(user_id)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            f.coordinator.get_presence(user_id).await.status,
            PresenceStatus::Offline
        );
    }

    #[tokio::test]
    async fn test_sweeps_are_idempotent() {
        let f = fixture();
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        f.coordinator
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        f.store.delete(&keys::session(&session_id)).await.unwrap();

        let first = f.reconciler.sweep_sessions().await.unwrap();
        let second = f.reconciler.sweep_sessions().await.unwrap();

        assert_eq!(first.expired, 1);
        assert_eq!(second, SessionSweep::default());

        // Redundant concurrent-style execution: a second reconciler over the
        // same store sees nothing left to do either
        let other = Reconciler::new(
            f.store.clone(),
            f.coordinator.clone(),
            PresenceConfig::default(),
        );
        assert_eq!(
            other.sweep_presence().await.unwrap(),
            PresenceSweep::default()
        );
    }
}
