//! # Sweep Scheduler
//!
//! Periodic due-timer detection and alert dispatch. The decision logic is
//! a pure plan/commit pair so it can be tested without locks or I/O. The
//! async driver delivers each planned alert through the host's
//! [`Notifier`] and commits it only once delivery succeeded, so a failed
//! send leaves that timer untouched until the next cycle.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Commit alerts individually after delivery instead of batching
//!   state updates per cycle
//! - 1.0.0: Initial release with interval-driven sweep loop

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::features::timers::registry::TimerRegistry;
use crate::features::timers::Timer;

/// What a planned alert does to its timer when committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// One-shot timer: deleted on commit.
    FireOnce,
    /// Ack-required timer: `last_alert` stamped on commit, nagging continues.
    Realert,
}

/// A notification decision for one due timer, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAlert {
    pub description: String,
    pub kind: AlertKind,
    pub text: String,
    /// Target the decision was made against. A commit is refused when the
    /// timer under this description has been replaced since planning.
    pub target_time: DateTime<Utc>,
}

/// Delivery sink for alert texts, implemented by the host transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &str, text: &str) -> anyhow::Result<()>;
}

/// Whether a user can currently receive alerts. Users failing this check
/// are skipped by the sweep; their due timers wait for the next cycle in
/// which the user is reachable.
pub trait Presence: Send + Sync {
    fn is_notifiable(&self, user: &str) -> bool;
}

/// Decide which timers in one user's collection alert right now.
///
/// Due one-shot timers always alert. Due ack-required timers alert only
/// when they have never alerted or their previous alert is older than
/// `realert_interval`.
pub fn plan_sweep(
    timers: &BTreeMap<String, Timer>,
    now: DateTime<Utc>,
    realert_interval: Duration,
) -> Vec<PlannedAlert> {
    let mut planned = Vec::new();

    for timer in timers.values() {
        if !timer.is_due(now) {
            continue;
        }

        if !timer.require_ack {
            planned.push(PlannedAlert {
                description: timer.description.clone(),
                kind: AlertKind::FireOnce,
                text: format!("Timer '{}' done {}", timer.description, timer.target_str(now)),
                target_time: timer.target_time,
            });
        } else if timer
            .last_alert
            .map_or(true, |at| now - at > realert_interval)
        {
            planned.push(PlannedAlert {
                description: timer.description.clone(),
                kind: AlertKind::Realert,
                text: format!(
                    "Timer '{}' done {}. Ack the timer to stop alerts.",
                    timer.description,
                    timer.target_str(now)
                ),
                target_time: timer.target_time,
            });
        }
    }

    planned
}

/// Commit one planned alert against a user's collection.
///
/// Returns false, leaving the collection unchanged, when the plan went
/// stale: the timer was acknowledged or replaced between planning and
/// commit. The stale check is what caps a racing sweep/acknowledge pair
/// at a single terminal transition.
pub fn apply_alert(
    timers: &mut BTreeMap<String, Timer>,
    alert: &PlannedAlert,
    now: DateTime<Utc>,
) -> bool {
    match timers.get(&alert.description) {
        Some(timer) if timer.target_time == alert.target_time => {}
        _ => return false,
    }

    match alert.kind {
        AlertKind::FireOnce => {
            timers.remove(&alert.description);
        }
        AlertKind::Realert => {
            if let Some(timer) = timers.get_mut(&alert.description) {
                timer.last_alert = Some(now);
            }
        }
    }
    true
}

/// Background driver: scans every user's timers on a fixed cadence and
/// dispatches due alerts through the host's [`Notifier`].
pub struct SweepScheduler {
    registry: Arc<TimerRegistry>,
    notifier: Arc<dyn Notifier>,
    presence: Arc<dyn Presence>,
    cadence: StdDuration,
}

impl SweepScheduler {
    pub fn new(
        registry: Arc<TimerRegistry>,
        notifier: Arc<dyn Notifier>,
        presence: Arc<dyn Presence>,
        cadence: StdDuration,
    ) -> Self {
        SweepScheduler {
            registry,
            notifier,
            presence,
            cadence,
        }
    }

    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut interval = tokio::time::interval(self.cadence);
        info!("timer sweep task started (cadence: {:?})", self.cadence);

        loop {
            interval.tick().await;
            self.sweep(Utc::now()).await;
        }
    }

    /// One sweep cycle: plan per user, deliver, commit what was delivered.
    pub async fn sweep(&self, now: DateTime<Utc>) {
        for user in self.registry.user_ids() {
            if !self.presence.is_notifiable(&user) {
                debug!("user {user}: not notifiable, skipping sweep");
                continue;
            }

            for alert in self.registry.plan_user(&user, now) {
                if let Err(e) = self.notifier.notify(&user, &alert.text).await {
                    warn!(
                        "user {user}: failed to deliver alert for '{}': {e:#}",
                        alert.description
                    );
                    continue;
                }
                if !self.registry.commit_alert(&user, &alert, now) {
                    debug!(
                        "user {user}: alert for '{}' went stale before commit",
                        alert.description
                    );
                }
            }
        }
    }
}
