//! Round rules for CS2 maps.
//!
//! Decides from a cumulative round score `(ct, t)` whether one side has won
//! the map. Stateless: the tracker re-evaluates on every observed score
//! change, so a score that skipped past a threshold between polls still
//! resolves from the latest pair alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regulation target: first to 13 while the opponent is under 12.
pub const REGULATION_TARGET: u32 = 13;
/// Score both sides must reach before overtime rules apply.
pub const OVERTIME_CHECKPOINT: u32 = 12;
/// Rounds per overtime half-cycle.
pub const OVERTIME_CYCLE: u32 = 3;
/// Lowest score that can ever end an overtime map.
pub const OVERTIME_MIN_WIN: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ct,
    T,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ct => f.write_str("ct"),
            Side::T => f.write_str("t"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundDecision {
    NoDecision,
    Wins(Side),
}

impl RoundDecision {
    pub fn winner(&self) -> Option<Side> {
        match self {
            RoundDecision::Wins(side) => Some(*side),
            RoundDecision::NoDecision => None,
        }
    }
}

/// Evaluates a cumulative map score.
pub fn evaluate_round(ct: u32, t: u32) -> RoundDecision {
    let max_score = ct.max(t);
    let min_score = ct.min(t);
    let leader = if ct > t { Side::Ct } else { Side::T };

    if max_score >= REGULATION_TARGET && min_score < OVERTIME_CHECKPOINT {
        return RoundDecision::Wins(leader);
    }

    if min_score >= OVERTIME_CHECKPOINT {
        // 12:12, 15:15, 18:18 ... another overtime block follows
        if ct == t {
            return RoundDecision::NoDecision;
        }

        let threshold = overtime_win_threshold(min_score);
        let reached = ct >= threshold || t >= threshold;
        let margin_ok = ct.abs_diff(t) >= 2;
        let past_first_block = max_score >= OVERTIME_MIN_WIN;

        if reached && margin_ok && past_first_block {
            return RoundDecision::Wins(leader);
        }
    }

    RoundDecision::NoDecision
}

/// Zero-based overtime cycle for a score whose lower side is `min_score`.
pub fn overtime_index(min_score: u32) -> u32 {
    min_score.saturating_sub(OVERTIME_CHECKPOINT) / OVERTIME_CYCLE
}

/// Score a side must reach to win the overtime cycle containing `min_score`.
pub fn overtime_win_threshold(min_score: u32) -> u32 {
    let baseline = OVERTIME_CHECKPOINT + overtime_index(min_score) * OVERTIME_CYCLE;
    baseline + 4
}

/// One-based overtime number when the score is tied at an overtime checkpoint.
pub fn tied_overtime(ct: u32, t: u32) -> Option<u32> {
    (ct == t && ct >= OVERTIME_CHECKPOINT).then(|| overtime_index(ct) + 1)
}
