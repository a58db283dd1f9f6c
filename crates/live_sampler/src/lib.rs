//! Live score sampling boundary.
//!
//! The tracker only ever sees a [`Sample`]: either a complete, validated
//! scoreboard snapshot or `Unavailable`. Everything that can go wrong while
//! reading a page (timeouts, half-rendered DOM, non-numeric scores, missing
//! team names) collapses into `Unavailable`.
//!
//! The HLTV implementation drives a headless Chrome tab per tracked match.

mod hltv;

pub use hltv::{match_id_from_url, parse_match_info, parse_scoreboard, HltvSampler, HltvSession, MatchInfo};

use anyhow::Result;
use async_trait::async_trait;
use round_rules::Side;
use serde::Serialize;

/// One observed scoreboard: side → team name, side → cumulative round score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSnapshot {
    pub ct_name: String,
    pub t_name: String,
    pub ct_score: u32,
    pub t_score: u32,
}

impl ScoreSnapshot {
    pub fn new(ct_name: impl Into<String>, ct_score: u32, t_score: u32, t_name: impl Into<String>) -> Self {
        Self {
            ct_name: ct_name.into(),
            t_name: t_name.into(),
            ct_score,
            t_score,
        }
    }

    /// Identity of the observation; a poll only counts as a change when this differs.
    pub fn score_key(&self) -> String {
        format!("{}-{}-{}-{}", self.ct_name, self.ct_score, self.t_score, self.t_name)
    }

    /// `ct:t`
    pub fn score_label(&self) -> String {
        format!("{}:{}", self.ct_score, self.t_score)
    }

    /// Both sides back at zero, i.e. a fresh map has started.
    pub fn is_reset(&self) -> bool {
        self.ct_score == 0 && self.t_score == 0
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Ct => &self.ct_name,
            Side::T => &self.t_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample {
    Live(ScoreSnapshot),
    Unavailable,
}

impl Sample {
    /// Validates raw scoreboard text. Scores follow integer-prefix parsing
    /// (`"13 "` and `"13*"` both read as 13); names must be non-blank.
    pub fn from_raw(ct_name: &str, ct_score: &str, t_score: &str, t_name: &str) -> Sample {
        let ct_name = ct_name.trim();
        let t_name = t_name.trim();
        if ct_name.is_empty() || t_name.is_empty() {
            return Sample::Unavailable;
        }

        match (parse_score(ct_score), parse_score(t_score)) {
            (Some(ct), Some(t)) => Sample::Live(ScoreSnapshot::new(ct_name, ct, t, t_name)),
            _ => Sample::Unavailable,
        }
    }

    pub fn into_live(self) -> Option<ScoreSnapshot> {
        match self {
            Sample::Live(snapshot) => Some(snapshot),
            Sample::Unavailable => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Sample::Live(_))
    }
}

fn parse_score(raw: &str) -> Option<u32> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Opens live views of match pages.
#[async_trait]
pub trait ScoreSampler: Send + Sync {
    async fn open(&self, match_url: &str) -> Result<Box<dyn LiveSession>>;
}

/// A live view on one match page. Owned by exactly one tracker (or one probe).
#[async_trait]
pub trait LiveSession: Send + Sync {
    async fn sample(&mut self) -> Sample;

    async fn close(&mut self);
}
