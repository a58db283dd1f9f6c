//! Discovers live matches and starts one tracker per match.
//!
//! Every `scheduler_interval` the unfinished matches are listed; each one
//! without a tracker gets a probe session. A live probe is handed over to a
//! new tracker, a non-live one is closed and the scan pauses briefly before
//! the next candidate.

use anyhow::{anyhow, Result};
use live_sampler::{LiveSession, ScoreSampler};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::MatchRecord;
use crate::tracker::{MatchTracker, StopReason};
use crate::TrackerContext;

pub struct MatchScheduler {
    ctx: TrackerContext,
    sampler: Arc<dyn ScoreSampler>,
}

impl MatchScheduler {
    pub fn new(ctx: TrackerContext, sampler: Arc<dyn ScoreSampler>) -> Self {
        Self { ctx, sampler }
    }

    /// Scans until the registry shuts down.
    pub async fn run(&self) {
        let shutdown = self.ctx.registry.shutdown_token();
        info!(
            "📡 Scheduler started (scan every {:?}, live poll {:?})",
            self.ctx.config.scheduler_interval, self.ctx.config.live_poll_interval
        );

        while !shutdown.is_cancelled() {
            let started = self.scan_once().await;
            if !started.is_empty() {
                info!("📡 {} tracker(s) started, {} active", started.len(), self.ctx.registry.len());
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.ctx.config.scheduler_interval) => {}
            }
        }
        info!("📡 Scheduler stopped");
    }

    /// One pass over the unfinished matches. Returns the trackers started.
    pub async fn scan_once(&self) -> Vec<JoinHandle<StopReason>> {
        let shutdown = self.ctx.registry.shutdown_token();
        let matches = match self.ctx.store.unfinished_matches() {
            Ok(m) => m,
            Err(e) => {
                warn!("⚠️ Could not list unfinished matches: {:#}", e);
                Vec::new()
            }
        };

        let mut started = Vec::new();
        for record in matches {
            if shutdown.is_cancelled() {
                break;
            }
            if self.ctx.registry.is_active(&record.match_id) {
                continue;
            }

            match self.probe(&record).await {
                Ok(Some(session)) => {
                    if let Some(handle) = self.start_tracker(record, session).await {
                        started.push(handle);
                    }
                }
                Ok(None) => {
                    info!("🔍 Match {} not live yet. Keep searching...", record.match_id);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.ctx.config.non_live_rotation_delay) => {}
                    }
                }
                Err(e) => warn!("❌ Error checking match {}: {:#}", record.match_id, e),
            }
        }
        started
    }

    /// Opens the match page and samples once. A live session is returned open.
    async fn probe(&self, record: &MatchRecord) -> Result<Option<Box<dyn LiveSession>>> {
        let limit = self.ctx.config.page_load_timeout;
        let mut session = tokio::time::timeout(limit, self.sampler.open(&record.match_url))
            .await
            .map_err(|_| anyhow!("page load timed out after {limit:?}"))??;

        let live = tokio::time::timeout(self.ctx.config.sample_timeout, session.sample())
            .await
            .is_ok_and(|sample| sample.is_live());
        if live {
            return Ok(Some(session));
        }

        session.close().await;
        Ok(None)
    }

    /// Registers the match and spawns its tracker. The session is closed when
    /// another tracker won the race for this id.
    pub async fn start_tracker(
        &self,
        record: MatchRecord,
        mut session: Box<dyn LiveSession>,
    ) -> Option<JoinHandle<StopReason>> {
        let Some(reg) = self.ctx.registry.try_register(&record.match_id) else {
            debug!("Match {} already tracked, dropping probe session", record.match_id);
            session.close().await;
            return None;
        };

        let tracker = MatchTracker::new(self.ctx.clone(), record, reg, session);
        Some(tokio::spawn(tracker.run()))
    }
}
