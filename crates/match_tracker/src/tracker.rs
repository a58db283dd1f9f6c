//! One match from "confirmed live" to "finished and dequeued".
//!
//! A tracker owns its registry entry and its live session. It polls at the
//! live cadence (or the slower reset cadence between maps), hands every valid
//! snapshot to the [`MapTracker`] and, once a map decides the series, runs the
//! format's finale inline: every delayed step is a cancellable pause of this
//! same task, so stopping the tracker also stops its pending transitions.

use live_sampler::{LiveSession, Sample};
use logger::{now_iso, MapWonEvent, MatchWonEvent, QueueCleanupEvent, TrackerStartedEvent, TrackerStoppedEvent};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::map_tracker::{MapStep, MapTracker, MapWin};
use crate::model::{MatchFormat, MatchRecord, QueueStatus, WinState};
use crate::registry::Registration;
use crate::TrackerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MatchFinished,
    Cancelled,
    ErrorExhaustion,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::MatchFinished => "match_finished",
            StopReason::Cancelled => "cancelled",
            StopReason::ErrorExhaustion => "error_exhaustion",
        }
    }
}

enum Ended {
    Finished(MapWin),
    Cancelled,
    Exhausted,
}

pub struct MatchTracker {
    ctx: TrackerContext,
    record: MatchRecord,
    reg: Registration,
    session: Option<Box<dyn LiveSession>>,
    maps: MapTracker,
    consecutive_errors: u32,
}

impl MatchTracker {
    pub fn new(ctx: TrackerContext, record: MatchRecord, reg: Registration, session: Box<dyn LiveSession>) -> Self {
        let maps = MapTracker::new(&record);
        Self {
            ctx,
            record,
            reg,
            session: Some(session),
            maps,
            consecutive_errors: 0,
        }
    }

    fn id(&self) -> &str {
        &self.record.match_id
    }

    pub async fn run(mut self) -> StopReason {
        info!(
            "🎮 [{}] Tracker started ({}) {} vs {}",
            self.id(),
            self.record.format,
            self.record.team1_name,
            self.record.team2_name
        );
        let _ = self.ctx.events.log(&TrackerStartedEvent {
            ts: now_iso(),
            event: "TRACKER_STARTED",
            match_id: self.record.match_id.clone(),
            match_url: self.record.match_url.clone(),
            match_format: self.record.format.to_string(),
        });

        let reason = match self.track().await {
            Ended::Finished(win) => {
                if self.finish(win).await {
                    StopReason::MatchFinished
                } else {
                    StopReason::Cancelled
                }
            }
            Ended::Cancelled => StopReason::Cancelled,
            Ended::Exhausted => StopReason::ErrorExhaustion,
        };

        self.release().await;
        info!("🛑 [{}] Tracker stopped: {}", self.id(), reason.as_str());
        let _ = self.ctx.events.log(&TrackerStoppedEvent {
            ts: now_iso(),
            event: "TRACKER_STOPPED",
            match_id: self.record.match_id.clone(),
            reason: reason.as_str().to_string(),
        });
        reason
    }

    fn still_active(&self) -> bool {
        !self.reg.is_cancelled() && self.ctx.registry.is_current(&self.reg)
    }

    async fn track(&mut self) -> Ended {
        loop {
            if !self.still_active() {
                return Ended::Cancelled;
            }

            match self.poll_once().await {
                Ok(Some(win)) => return Ended::Finished(win),
                Ok(None) => self.consecutive_errors = 0,
                Err(e) => {
                    self.consecutive_errors += 1;
                    warn!(
                        "❌ [{}] Tracking error ({}/{}): {:#}",
                        self.id(),
                        self.consecutive_errors,
                        self.ctx.config.max_consecutive_errors,
                        e
                    );
                    if self.consecutive_errors >= self.ctx.config.max_consecutive_errors {
                        error!("[{}] Giving up after {} consecutive errors", self.id(), self.consecutive_errors);
                        return Ended::Exhausted;
                    }
                }
            }

            let pause = if self.maps.awaiting_reset() {
                self.ctx.config.map_reset_poll_interval
            } else {
                self.ctx.config.live_poll_interval
            };
            if !self.pause(pause).await {
                return Ended::Cancelled;
            }
        }
    }

    /// One sampling cycle. `Some` when this cycle's map win decided the series.
    async fn poll_once(&mut self) -> anyhow::Result<Option<MapWin>> {
        let Some(snapshot) = self.sample().await.into_live() else {
            debug!("⚠️ [{}] Live score temporarily unavailable", self.id());
            return Ok(None);
        };

        match self.maps.observe(&self.ctx.store, &snapshot)? {
            MapStep::MapWon(win) => {
                info!(
                    "🏆 [{}] {} wins map {} ({}), maps {}",
                    self.id(),
                    win.winning_team,
                    win.map_number,
                    win.winning_score,
                    win.map_counts
                );
                let _ = self.ctx.events.log(&MapWonEvent {
                    ts: now_iso(),
                    event: "MAP_WON",
                    match_id: self.record.match_id.clone(),
                    map_number: win.map_number,
                    winning_team: win.winning_team.clone(),
                    winning_score: win.winning_score.clone(),
                    map_counts: win.map_counts.clone(),
                });

                if win.series_winner.is_some() {
                    return Ok(Some(win));
                }
                info!("[{}] Waiting for score reset to start map {}", self.id(), win.map_number + 1);
                Ok(None)
            }
            MapStep::NextMap(n) => {
                info!("[{}] Detected map {} started", self.id(), n);
                Ok(None)
            }
            MapStep::Unchanged | MapStep::Recorded | MapStep::InvalidWinner | MapStep::AwaitingReset => Ok(None),
        }
    }

    async fn sample(&mut self) -> Sample {
        let timeout = self.ctx.config.sample_timeout;
        let Some(session) = self.session.as_mut() else {
            return Sample::Unavailable;
        };
        match tokio::time::timeout(timeout, session.sample()).await {
            Ok(sample) => sample,
            Err(_) => {
                debug!("[{}] sample timed out after {:?}", self.record.match_id, timeout);
                Sample::Unavailable
            }
        }
    }

    /// `false` when cancelled before `d` elapsed.
    async fn pause(&self, d: Duration) -> bool {
        tokio::select! {
            _ = self.reg.cancelled() => false,
            _ = tokio::time::sleep(d) => true,
        }
    }

    /// Releases the registry entry and closes the session; safe to repeat.
    async fn release(&mut self) {
        self.ctx.registry.release(&self.reg);
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    /// Runs the format's completion. `false` if cancelled part-way.
    async fn finish(&mut self, win: MapWin) -> bool {
        let winner = win.series_winner.clone().unwrap_or_else(|| win.winning_team.clone());
        if let Err(e) = self.ctx.store.finish_match(self.id(), &winner) {
            warn!("[{}] could not mark match finished: {:#}", self.id(), e);
        }

        match self.record.format {
            MatchFormat::Bo1 => {
                self.set_queue_finished();
                self.announce(&WinState::announce(true, true, &winner, &win.winning_score, &win.map_counts));
                info!("🎯 [{}] BO1 match finished. Winner: {}", self.id(), winner);
                self.log_match_won(&winner, &win);
                true
            }
            MatchFormat::Bo3 | MatchFormat::Bo5 => self.series_finale(&winner, &win).await,
        }
    }

    async fn series_finale(&mut self, winner: &str, win: &MapWin) -> bool {
        let format = self.record.format;
        self.announce(&WinState::announce(true, false, winner, &win.winning_score, &win.map_counts));
        info!("🏆 [{}] {} match finished. Winner: {} (map win)", self.id(), format, winner);

        if !self.pause(self.ctx.config.match_win_delay).await {
            return false;
        }
        self.announce(&WinState::announce(false, true, winner, &win.winning_score, &win.map_counts));
        self.set_queue_finished();
        info!("🎯 [{}] {} match finished. Winner: {} (match win)", self.id(), format, winner);
        self.log_match_won(winner, win);

        if !self.pause(self.ctx.config.cleanup_delay).await {
            return false;
        }
        self.release().await;
        info!("🕒 [{}] Tracker cleanup after match win", self.id());

        if !self.pause(self.ctx.config.queue_delete_delay).await {
            return false;
        }
        self.remove_queue_entry().await;
        true
    }

    fn announce(&self, state: &WinState) {
        if let Err(e) = self.ctx.store.write_win_state(self.id(), state) {
            warn!("[{}] win state write failed: {:#}", self.id(), e);
        }
    }

    fn set_queue_finished(&self) {
        if let Err(e) = self.ctx.store.set_queue_status(self.id(), QueueStatus::Finished) {
            warn!("[{}] queue status update failed: {:#}", self.id(), e);
        }
    }

    fn log_match_won(&self, winner: &str, win: &MapWin) {
        let _ = self.ctx.events.log(&MatchWonEvent {
            ts: now_iso(),
            event: "MATCH_WON",
            match_id: self.record.match_id.clone(),
            match_format: self.record.format.to_string(),
            winning_team: winner.to_string(),
            winning_score: win.winning_score.clone(),
            map_counts: win.map_counts.clone(),
        });
    }

    async fn remove_queue_entry(&self) {
        let queue_id = match self.ctx.store.queue_entry_id(self.id()) {
            Ok(Some(id)) => id,
            Ok(None) => {
                error!("❌ [{}] Could not find queue row to delete", self.id());
                self.log_cleanup(None, false, "queue row not found");
                return;
            }
            Err(e) => {
                error!("❌ [{}] Queue row lookup failed: {:#}", self.id(), e);
                self.log_cleanup(None, false, &format!("{e:#}"));
                return;
            }
        };

        match self.ctx.queue.remove_queue_entry(queue_id).await {
            Ok(()) => {
                info!("🗑️ [{}] Deleted queue entry {} after match win", self.id(), queue_id);
                self.log_cleanup(Some(queue_id), true, "deleted");
            }
            Err(e) => {
                error!("❌ [{}] Queue entry {} deletion failed: {:#}", self.id(), queue_id, e);
                self.log_cleanup(Some(queue_id), false, &format!("{e:#}"));
            }
        }
    }

    fn log_cleanup(&self, queue_id: Option<i64>, ok: bool, message: &str) {
        let _ = self.ctx.events.log(&QueueCleanupEvent {
            ts: now_iso(),
            event: "QUEUE_CLEANUP",
            match_id: self.record.match_id.clone(),
            queue_id,
            ok,
            message: message.to_string(),
        });
    }
}
