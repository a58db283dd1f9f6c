use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFormat {
    #[serde(rename = "BO1")]
    Bo1,
    #[serde(rename = "BO3")]
    Bo3,
    #[serde(rename = "BO5")]
    Bo5,
}

impl MatchFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchFormat::Bo1 => "BO1",
            MatchFormat::Bo3 => "BO3",
            MatchFormat::Bo5 => "BO5",
        }
    }

    /// Finished-map wins that end the series. BO5 plays to three wins rather
    /// than ending on its first map.
    pub fn wins_needed(&self) -> u32 {
        match self {
            MatchFormat::Bo1 => 1,
            MatchFormat::Bo3 => 2,
            MatchFormat::Bo5 => 3,
        }
    }

    pub fn from_best_of(n: u8) -> Option<Self> {
        match n {
            1 => Some(MatchFormat::Bo1),
            3 => Some(MatchFormat::Bo3),
            5 => Some(MatchFormat::Bo5),
            _ => None,
        }
    }
}

impl fmt::Display for MatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BO1" => Ok(MatchFormat::Bo1),
            "BO3" => Ok(MatchFormat::Bo3),
            "BO5" => Ok(MatchFormat::Bo5),
            other => Err(anyhow!("unknown match format {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStatus {
    NotStarted,
    Running,
    Finished,
}

impl MapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapStatus::NotStarted => "not_started",
            MapStatus::Running => "running",
            MapStatus::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "running" => MapStatus::Running,
            "finished" => MapStatus::Finished,
            _ => MapStatus::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    NotStarted,
    Running,
    Finished,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::NotStarted => "not_started",
            QueueStatus::Running => "running",
            QueueStatus::Finished => "finished",
        }
    }
}

/// Input for registering a match (API / add-match).
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub match_id: String,
    pub match_url: String,
    pub team1_name: String,
    pub team2_name: String,
    pub format: MatchFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub match_url: String,
    pub team1_name: String,
    pub team2_name: String,
    pub format: MatchFormat,
    pub winner: Option<String>,
    pub is_finished: bool,
}

/// Latest announcement for a match. Overwritten on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinState {
    pub map_win: bool,
    pub match_win: bool,
    pub winning_team: Option<String>,
    pub winning_score: Option<String>,
    pub map_counts: Option<String>,
}

impl WinState {
    /// Nothing to announce (between maps).
    pub fn neutral() -> Self {
        Self {
            map_win: false,
            match_win: false,
            winning_team: None,
            winning_score: None,
            map_counts: None,
        }
    }

    pub fn announce(map_win: bool, match_win: bool, team: &str, score: &str, counts: &str) -> Self {
        Self {
            map_win,
            match_win,
            winning_team: Some(team.to_string()),
            winning_score: Some(score.to_string()),
            map_counts: Some(counts.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinStateRow {
    pub match_id: String,
    #[serde(flatten)]
    pub state: WinState,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSnapshotRow {
    pub match_id: String,
    pub map_number: u32,
    pub ct_team: String,
    pub t_team: String,
    pub ct_score: u32,
    pub t_score: u32,
    pub status: String,
    pub updated_at: String,
}

impl LiveSnapshotRow {
    /// Round score of `team` on the current map, whichever side it plays.
    pub fn score_of(&self, team: &str) -> u32 {
        if self.ct_team == team {
            self.ct_score
        } else {
            self.t_score
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapResultRow {
    pub match_id: String,
    pub map_number: u32,
    pub status: MapStatus,
    pub winning_team: Option<String>,
    pub ct_score: Option<u32>,
    pub t_score: Option<u32>,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRow {
    pub id: i64,
    pub match_id: String,
    pub team1_name: String,
    pub team2_name: String,
    pub match_format: String,
    pub priority: i64,
    pub status: String,
}

/// Direction of a queue reorder: `Up` swaps with the next lower priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMove {
    Up,
    Down,
}

impl QueueMove {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueMove::Up => "up",
            QueueMove::Down => "down",
        }
    }
}

impl FromStr for QueueMove {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(QueueMove::Up),
            "down" => Ok(QueueMove::Down),
            other => Err(anyhow!("invalid direction {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMoveOutcome {
    Moved,
    NotFound,
    /// Already first (up) or last (down).
    AtEdge,
}

/// Finished-map wins per team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapTally {
    wins: Vec<(String, u32)>,
}

impl MapTally {
    pub fn new(wins: Vec<(String, u32)>) -> Self {
        Self { wins }
    }

    pub fn wins_for(&self, team: &str) -> u32 {
        self.wins
            .iter()
            .find(|(name, _)| name == team)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// `team1:team2` map score as shown on the win widget.
    pub fn counts_label(&self, team1: &str, team2: &str) -> String {
        format!("{}:{}", self.wins_for(team1), self.wins_for(team2))
    }

    /// First team holding at least `needed` wins.
    pub fn series_winner(&self, needed: u32) -> Option<&str> {
        self.wins
            .iter()
            .find(|(_, n)| *n >= needed)
            .map(|(name, _)| name.as_str())
    }
}
