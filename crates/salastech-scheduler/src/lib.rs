//! Lifecycle Scheduler: periodic housekeeping ticks for reservations.
//!
//! Grounded on the original `reservation_scheduler` module's task functions
//! (`auto_approve_reservations`, `send_reminders`, `update_reservation_status`,
//! `cleanup_old_reservations`, `check_no_shows`), translated from an
//! externally-triggered cron job into self-scheduling `tokio::time::interval`
//! loops, one per job kind, each spawned by [`SchedulerRunner::spawn`].
//!
//! Each job kind gets its own `Semaphore`, sized so at most 3 ticks of that
//! kind can be doing real work at once; a tick that can't acquire a permit is
//! skipped rather than queued, so a slow tick of one job kind never builds up
//! a backlog, and never starves the other job kinds of their own capacity.

pub mod jobs;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use salastech_core::clock::Clock;
use salastech_db::Database;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Caps concurrent ticks of a single job kind.
const MAX_CONCURRENT_TICKS_PER_KIND: usize = 3;

/// Runtime-configurable thresholds consumed by the lifecycle jobs.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub auto_approve_after: Duration,
    pub archive_after: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { auto_approve_after: Duration::hours(24), archive_after: Duration::days(90) }
    }
}

const AUTO_APPROVE_PERIOD: StdDuration = StdDuration::from_secs(60 * 60);
const ADVANCE_STATUSES_PERIOD: StdDuration = StdDuration::from_secs(5 * 60);
const SEND_REMINDERS_PERIOD: StdDuration = StdDuration::from_secs(60 * 60);
const DETECT_NO_SHOWS_PERIOD: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const ARCHIVE_OLD_PERIOD: StdDuration = StdDuration::from_secs(7 * 24 * 60 * 60);
const TOKEN_PRUNE_PERIOD: StdDuration = StdDuration::from_secs(60 * 60);

/// Owns the periodic tasks, each with its own back-pressure semaphore. Holding
/// onto the returned `SchedulerHandles` keeps the tasks alive; dropping it
/// (or calling `abort_all`) stops them.
pub struct SchedulerRunner<C: Clock + 'static> {
    db: Database,
    clock: Arc<C>,
    token_store: Arc<salastech_auth::TokenStore>,
    config: SchedulerConfig,
}

pub struct SchedulerHandles {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandles {
    pub fn abort_all(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl<C: Clock + 'static> SchedulerRunner<C> {
    pub fn new(
        db: Database,
        clock: Arc<C>,
        token_store: Arc<salastech_auth::TokenStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self { db, clock, token_store, config }
    }

    /// Spawn all lifecycle jobs as independent `tokio` tasks. Each job runs
    /// on its own interval with its own back-pressure semaphore, so a stuck
    /// tick of one job kind can't starve the others of their own capacity.
    pub fn spawn(&self) -> SchedulerHandles {
        let mut tasks = Vec::new();

        let auto_approve_after = self.config.auto_approve_after;
        tasks.push(self.spawn_job("auto_approve", AUTO_APPROVE_PERIOD, move |db, clock| {
            jobs::auto_approve(db, clock.as_ref(), auto_approve_after)
                .map(|n| tracing::info!(count = n, "auto-approved stale pending reservations"))
        }));

        tasks.push(self.spawn_job("advance_statuses", ADVANCE_STATUSES_PERIOD, |db, clock| {
            jobs::advance_statuses(db, clock.as_ref())
                .map(|(started, finished)| tracing::info!(started, finished, "advanced reservation statuses"))
        }));

        tasks.push(self.spawn_job("send_reminders", SEND_REMINDERS_PERIOD, |db, clock| {
            jobs::send_reminders(db, clock.as_ref()).map(|n| tracing::info!(count = n, "sent reservation reminders"))
        }));

        tasks.push(self.spawn_job("detect_no_shows", DETECT_NO_SHOWS_PERIOD, |db, clock| {
            jobs::detect_no_shows(db, clock.as_ref()).map(|no_shows| {
                for r in &no_shows {
                    tracing::warn!(reservation_id = %r.id, room_id = %r.room_id, "reservation marked no-show");
                }
                tracing::info!(count = no_shows.len(), "no-show sweep complete");
            })
        }));

        let archive_after = self.config.archive_after;
        tasks.push(self.spawn_job("archive_old", ARCHIVE_OLD_PERIOD, move |db, clock| {
            jobs::archive_old(db, clock.as_ref(), archive_after)
                .map(|n| tracing::info!(count = n, "archived stale reservations"))
        }));

        tasks.push(self.spawn_token_prune());

        SchedulerHandles { tasks }
    }

    fn spawn_job<F>(&self, name: &'static str, period: StdDuration, run: F) -> JoinHandle<()>
    where
        F: Fn(&Database, &Arc<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let db = self.db.clone();
        let clock = self.clock.clone();
        let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_TICKS_PER_KIND));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Ok(_permit) = permits.try_acquire() else {
                    tracing::debug!(job = name, "skipping tick, scheduler at capacity");
                    continue;
                };
                if let Err(err) = run(&db, &clock) {
                    tracing::error!(job = name, error = %err, "scheduled job failed");
                }
            }
        })
    }

    fn spawn_token_prune(&self) -> JoinHandle<()> {
        let store = self.token_store.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TOKEN_PRUNE_PERIOD);
            loop {
                ticker.tick().await;
                store.prune_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salastech_core::clock::SystemClock;

    #[tokio::test]
    async fn spawn_returns_a_handle_per_job() {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        let runner = SchedulerRunner::new(
            db,
            Arc::new(SystemClock),
            Arc::new(salastech_auth::TokenStore::new()),
            SchedulerConfig::default(),
        );
        let handles = runner.spawn();
        assert_eq!(handles.tasks.len(), 6);
        handles.abort_all();
    }
}
