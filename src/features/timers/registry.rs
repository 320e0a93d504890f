//! # Timer Registry
//!
//! Per-user timer collections with the create/acknowledge lifecycle and
//! the synchronous sweep entry point. Mutations on one user's collection
//! are serialized by the map's per-entry locks; operations on different
//! users never contend. The injected [`TimerStore`] is invoked after
//! every mutation, so the host's persisted view always trails the
//! in-memory one by at most the current call.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{info, warn};

use crate::core::config::DEFAULT_REALERT_INTERVAL_SECS;
use crate::core::errors::TimerError;
use crate::features::timers::parser::parse_timer;
use crate::features::timers::scheduler::{apply_alert, plan_sweep, PlannedAlert};
use crate::features::timers::Timer;

/// Persistence sink invoked after every mutation of a user's collection.
///
/// Encoding and storage medium are the host's concern; the registry only
/// guarantees the call happens while the mutation is already visible in
/// memory, under the owning user's lock.
pub trait TimerStore: Send + Sync {
    fn persist(&self, user: &str, timers: &[Timer]) -> anyhow::Result<()>;
}

/// Store for hosts that keep timers purely in memory.
pub struct NullStore;

impl TimerStore for NullStore {
    fn persist(&self, _user: &str, _timers: &[Timer]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One notification the host must deliver to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub user: String,
    pub description: String,
    pub text: String,
}

/// All users' timer collections, keyed by user id, each timer keyed by
/// its description.
pub struct TimerRegistry {
    users: DashMap<String, BTreeMap<String, Timer>>,
    store: Arc<dyn TimerStore>,
    realert_interval: chrono::Duration,
}

impl TimerRegistry {
    pub fn new(store: Arc<dyn TimerStore>, realert_interval: std::time::Duration) -> Self {
        TimerRegistry {
            users: DashMap::new(),
            store,
            realert_interval: chrono::Duration::from_std(realert_interval)
                .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_REALERT_INTERVAL_SECS as i64)),
        }
    }

    /// Parse `raw` and add the resulting timer to `user`'s collection.
    ///
    /// Fails without touching the collection when the expression does not
    /// parse, the description is already taken, or the store rejects the
    /// write.
    pub fn create(&self, user: &str, raw: &str, now: DateTime<Utc>) -> Result<Timer, TimerError> {
        let timer = parse_timer(raw, now)?;

        let mut timers = self.users.entry(user.to_string()).or_default();
        if timers.contains_key(&timer.description) {
            return Err(TimerError::DuplicateDescription(timer.description));
        }

        timers.insert(timer.description.clone(), timer.clone());
        if let Err(e) = self.persist_user(user, &timers) {
            timers.remove(&timer.description);
            return Err(TimerError::Store(e));
        }

        info!(
            "user {user}: timer '{}' set for {}",
            timer.description, timer.target_time
        );
        Ok(timer)
    }

    /// Remove the named timer, before or after it fired.
    pub fn acknowledge(&self, user: &str, description: &str) -> Result<(), TimerError> {
        let mut timers = self
            .users
            .get_mut(user)
            .ok_or_else(|| TimerError::NotFound(description.to_string()))?;
        let removed = timers
            .remove(description)
            .ok_or_else(|| TimerError::NotFound(description.to_string()))?;

        if let Err(e) = self.persist_user(user, &timers) {
            timers.insert(removed.description.clone(), removed);
            return Err(TimerError::Store(e));
        }

        info!("user {user}: timer '{description}' acknowledged");
        Ok(())
    }

    /// Snapshot of a user's timers, ordered by description.
    pub fn timers_for(&self, user: &str) -> Vec<Timer> {
        self.users
            .get(user)
            .map(|timers| timers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Install previously persisted timers for a user, replacing any
    /// in-memory collection. Intended for host startup; does not write
    /// back to the store.
    pub fn restore(&self, user: &str, timers: Vec<Timer>) {
        let collection: BTreeMap<String, Timer> = timers
            .into_iter()
            .map(|t| (t.description.clone(), t))
            .collect();
        self.users.insert(user.to_string(), collection);
    }

    /// One sweep cycle over every notifiable user: plan and commit due
    /// alerts under each user's lock, returning the notifications the
    /// host must now deliver.
    ///
    /// State changes (fire-and-delete, re-alert stamps) are committed
    /// before returning; hosts that need per-delivery failure isolation
    /// drive the sweep through
    /// [`SweepScheduler`](crate::features::timers::SweepScheduler)
    /// instead.
    pub fn sweep_once(
        &self,
        now: DateTime<Utc>,
        notifiable: impl Fn(&str) -> bool,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for user in self.user_ids() {
            if !notifiable(&user) {
                continue;
            }
            let Some(mut timers) = self.users.get_mut(&user) else {
                continue;
            };

            let mut dirty = false;
            for planned in plan_sweep(&timers, now, self.realert_interval) {
                if apply_alert(&mut timers, &planned, now) {
                    dirty = true;
                    alerts.push(Alert {
                        user: user.clone(),
                        description: planned.description,
                        text: planned.text,
                    });
                }
            }

            if dirty {
                if let Err(e) = self.persist_user(&user, &timers) {
                    warn!("user {user}: failed to persist sweep results: {e:#}");
                }
            }
        }

        alerts
    }

    /// Users currently holding at least one collection, snapshotted so
    /// callers never iterate the map while taking entry locks.
    pub(crate) fn user_ids(&self) -> Vec<String> {
        self.users.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Plan one user's sweep without committing anything.
    pub(crate) fn plan_user(&self, user: &str, now: DateTime<Utc>) -> Vec<PlannedAlert> {
        self.users
            .get(user)
            .map(|timers| plan_sweep(&timers, now, self.realert_interval))
            .unwrap_or_default()
    }

    /// Commit a single delivered alert; false when the plan went stale.
    pub(crate) fn commit_alert(&self, user: &str, alert: &PlannedAlert, now: DateTime<Utc>) -> bool {
        let Some(mut timers) = self.users.get_mut(user) else {
            return false;
        };
        if !apply_alert(&mut timers, alert, now) {
            return false;
        }
        if let Err(e) = self.persist_user(user, &timers) {
            warn!("user {user}: failed to persist committed alert: {e:#}");
        }
        true
    }

    fn persist_user(&self, user: &str, timers: &BTreeMap<String, Timer>) -> anyhow::Result<()> {
        let snapshot: Vec<Timer> = timers.values().cloned().collect();
        self.store.persist(user, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ParseError;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn registry() -> TimerRegistry {
        TimerRegistry::new(Arc::new(NullStore), StdDuration::from_secs(300))
    }

    /// Counts writes; optionally refuses them all.
    struct CountingStore {
        writes: AtomicUsize,
        fail: bool,
    }

    impl CountingStore {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(CountingStore {
                writes: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl TimerStore for CountingStore {
        fn persist(&self, _user: &str, _timers: &[Timer]) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_create_inserts_and_returns_timer() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        let timer = reg.create("alice", "tea: in 5m", now).unwrap();
        assert_eq!(timer.target_time, at(2024, 1, 1, 10, 5, 0));
        assert_eq!(reg.timers_for("alice"), vec![timer]);
    }

    #[test]
    fn test_create_rejects_duplicate_description_and_keeps_original() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        let original = reg.create("alice", "tea: in 5m", now).unwrap();

        let err = reg.create("alice", "tea: in 2h", now).unwrap_err();
        assert!(matches!(err, TimerError::DuplicateDescription(d) if d == "tea"));
        assert_eq!(reg.timers_for("alice"), vec![original]);
    }

    #[test]
    fn test_same_description_is_fine_across_users() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        reg.create("alice", "tea: in 5m", now).unwrap();
        reg.create("bob", "tea: in 5m", now).unwrap();
        assert_eq!(reg.timers_for("alice").len(), 1);
        assert_eq!(reg.timers_for("bob").len(), 1);
    }

    #[test]
    fn test_create_surfaces_parse_errors() {
        let reg = registry();
        let err = reg
            .create("alice", "gibberish", at(2024, 1, 1, 10, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            TimerError::Parse(ParseError::Unrecognized(_))
        ));
        assert!(reg.timers_for("alice").is_empty());
    }

    #[test]
    fn test_acknowledge_removes_before_firing() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        reg.create("alice", "tea: in 5m", now).unwrap();
        reg.acknowledge("alice", "tea").unwrap();
        assert!(reg.timers_for("alice").is_empty());
    }

    #[test]
    fn test_acknowledge_unknown_description() {
        let reg = registry();
        let err = reg.acknowledge("alice", "tea").unwrap_err();
        assert!(matches!(err, TimerError::NotFound(d) if d == "tea"));

        reg.create("alice", "tea: in 5m", at(2024, 1, 1, 10, 0, 0))
            .unwrap();
        let err = reg.acknowledge("alice", "coffee").unwrap_err();
        assert!(matches!(err, TimerError::NotFound(d) if d == "coffee"));
    }

    #[test]
    fn test_store_failure_rolls_back_create() {
        let reg = TimerRegistry::new(CountingStore::new(true), StdDuration::from_secs(300));
        let err = reg
            .create("alice", "tea: in 5m", at(2024, 1, 1, 10, 0, 0))
            .unwrap_err();
        assert!(matches!(err, TimerError::Store(_)));
        assert!(reg.timers_for("alice").is_empty());
    }

    #[test]
    fn test_every_mutation_hits_the_store() {
        let store = CountingStore::new(false);
        let reg = TimerRegistry::new(store.clone(), StdDuration::from_secs(300));
        let now = at(2024, 1, 1, 10, 0, 0);

        reg.create("alice", "tea: in 5m", now).unwrap();
        reg.acknowledge("alice", "tea").unwrap();
        reg.create("alice", "walk: in 1m", now).unwrap();
        reg.sweep_once(at(2024, 1, 1, 10, 2, 0), |_| true);

        // create + ack + create + fire-delete
        assert_eq!(store.writes.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_sweep_once_fires_and_deletes_one_shot() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        reg.create("alice", "tea: in 5m", now).unwrap();

        let alerts = reg.sweep_once(at(2024, 1, 1, 10, 6, 0), |_| true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].user, "alice");
        assert_eq!(alerts[0].text, "Timer 'tea' done at 10:05:00AM");
        assert!(reg.timers_for("alice").is_empty());

        assert!(reg.sweep_once(at(2024, 1, 1, 10, 7, 0), |_| true).is_empty());
    }

    #[test]
    fn test_sweep_once_throttles_ack_required_realerts() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        reg.create("alice", "meds: in 5m req-ack", now).unwrap();

        // Overdue: first alert goes out, timer survives.
        let alerts = reg.sweep_once(at(2024, 1, 1, 10, 6, 0), |_| true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].text,
            "Timer 'meds' done at 10:05:00AM. Ack the timer to stop alerts."
        );
        assert_eq!(reg.timers_for("alice").len(), 1);

        // Two minutes later: inside the re-alert interval, silence.
        assert!(reg.sweep_once(at(2024, 1, 1, 10, 8, 0), |_| true).is_empty());

        // Past the interval: nags again until acknowledged.
        assert_eq!(reg.sweep_once(at(2024, 1, 1, 10, 11, 30), |_| true).len(), 1);
        reg.acknowledge("alice", "meds").unwrap();
        assert!(reg.sweep_once(at(2024, 1, 1, 10, 30, 0), |_| true).is_empty());
    }

    #[test]
    fn test_sweep_once_skips_unnotifiable_users() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        reg.create("alice", "tea: in 5m", now).unwrap();
        reg.create("bob", "tea: in 5m", now).unwrap();

        let alerts = reg.sweep_once(at(2024, 1, 1, 10, 6, 0), |user| user == "bob");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].user, "bob");

        // Alice's timer waited; it fires once she is reachable again.
        let alerts = reg.sweep_once(at(2024, 1, 1, 10, 10, 0), |_| true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].user, "alice");
    }

    #[test]
    fn test_restore_replaces_collection() {
        let reg = registry();
        let now = at(2024, 1, 1, 10, 0, 0);
        let timer = Timer::new("tea".to_string(), at(2024, 1, 1, 12, 0, 0), false, now);
        reg.restore("alice", vec![timer.clone()]);
        assert_eq!(reg.timers_for("alice"), vec![timer]);
    }
}
