/// cs-live-tracker: Logger
/// JSONL event stream of tracker lifecycle and win announcements.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Appends one event to today's `<date>.jsonl`.
    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct TrackerStartedEvent {
    pub ts:           String,
    pub event:        &'static str,   // "TRACKER_STARTED"
    pub match_id:     String,
    pub match_url:    String,
    pub match_format: String,
}

#[derive(Serialize, Debug)]
pub struct MapWonEvent {
    pub ts:            String,
    pub event:         &'static str,  // "MAP_WON"
    pub match_id:      String,
    pub map_number:    u32,
    pub winning_team:  String,
    pub winning_score: String,        // "ct:t"
    pub map_counts:    String,        // "team1:team2"
}

#[derive(Serialize, Debug)]
pub struct MatchWonEvent {
    pub ts:            String,
    pub event:         &'static str,  // "MATCH_WON"
    pub match_id:      String,
    pub match_format:  String,
    pub winning_team:  String,
    pub winning_score: String,
    pub map_counts:    String,
}

#[derive(Serialize, Debug)]
pub struct TrackerStoppedEvent {
    pub ts:       String,
    pub event:    &'static str,       // "TRACKER_STOPPED"
    pub match_id: String,
    pub reason:   String,             // "match_finished" | "cancelled" | "error_exhaustion"
}

#[derive(Serialize, Debug)]
pub struct QueueCleanupEvent {
    pub ts:       String,
    pub event:    &'static str,       // "QUEUE_CLEANUP"
    pub match_id: String,
    pub queue_id: Option<i64>,
    pub ok:       bool,
    pub message:  String,
}
