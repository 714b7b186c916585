// SPDX-License-Identifier: MPL-2.0

use crate::api::{DataClient, DataError};
use crate::streak::{self, DEFAULT_STAGES, PastStreak, StreakState, StreakStatus};
use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Name of the persisted streak document
pub const STREAK_KEY: &str = "streak";

/// Streak state plus everything derived from it at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct StreakSnapshot {
    pub state: StreakState,
    pub status: StreakStatus,
    pub hours_remaining: f64,
    pub stage: &'static str,
}

impl StreakSnapshot {
    pub fn at<Tz: TimeZone>(state: StreakState, now: &DateTime<Tz>) -> Self {
        let stage = streak::stage(state.current_streak, DEFAULT_STAGES)
            .map(|s| s.label)
            .unwrap_or_default();
        Self {
            status: streak::status(&state, now),
            hours_remaining: streak::hours_remaining(&state, now),
            stage,
            state,
        }
    }
}

/// Owns the user's streak and keeps it persisted through the data client.
/// Clones share the same state.
#[derive(Clone)]
pub struct StreakService {
    client: DataClient,
    state: Arc<Mutex<StreakState>>,
}

impl StreakService {
    /// Load the saved streak, or start from an empty one
    pub async fn load(client: DataClient) -> Result<Self, DataError> {
        let state = client
            .load_state::<StreakState>(STREAK_KEY)
            .await?
            .unwrap_or_default();
        debug!(current = state.current_streak, "loaded streak");
        Ok(Self {
            client,
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub async fn state(&self) -> StreakState {
        self.state.lock().await.clone()
    }

    pub async fn snapshot<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> StreakSnapshot {
        StreakSnapshot::at(self.state().await, now)
    }

    /// Count a study session. A streak that ran out since the last check is
    /// archived first. Nothing changes in memory unless the save succeeds.
    pub async fn record_activity<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<StreakSnapshot, DataError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if let Some(archived) = streak::check_and_break(&mut next, now) {
            info!(streak = archived.streak, "streak broken");
        }
        streak::record_activity(&mut next, now);
        self.client.save_state(STREAK_KEY, &next).await?;
        *state = next;
        Ok(StreakSnapshot::at(state.clone(), now))
    }

    /// Archive the current streak if it has run out
    pub async fn check_and_break<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<Option<PastStreak>, DataError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let Some(archived) = streak::check_and_break(&mut next, now) else {
            return Ok(None);
        };
        self.client.save_state(STREAK_KEY, &next).await?;
        *state = next;
        info!(streak = archived.streak, "streak broken");
        Ok(Some(archived))
    }

    /// Wipe the streak and its history
    pub async fn reset(&self) -> Result<(), DataError> {
        let mut state = self.state.lock().await;
        let cleared = StreakState::default();
        self.client.save_state(STREAK_KEY, &cleared).await?;
        *state = cleared;
        info!("streak reset");
        Ok(())
    }

    /// Check now, then keep checking every `every` until the watcher is stopped
    pub async fn watch(&self, every: Duration) -> StreakWatcher {
        StreakWatcher::start(self.clone(), every).await
    }

    async fn check_local(&self) {
        if let Err(e) = self.check_and_break(&Local::now()).await {
            warn!(error = %e, "streak check failed");
        }
    }
}

/// Background task re-evaluating the streak on a fixed interval.
/// Stopping or dropping the watcher cancels the task.
pub struct StreakWatcher {
    handle: JoinHandle<()>,
}

impl StreakWatcher {
    pub async fn start(service: StreakService, every: Duration) -> Self {
        service.check_local().await;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                service.check_local().await;
            }
        });
        debug!(?every, "streak watcher started");

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
        debug!("streak watcher stopped");
    }
}

impl Drop for StreakWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
