//! Per-map bookkeeping for one tracked match.
//!
//! Turns a stream of scoreboard snapshots into store writes: every changed
//! score is persisted, every decided map is finalized and announced, and after
//! a map win nothing happens until the scoreboard shows 0:0 for the next map.

use anyhow::Result;
use live_sampler::ScoreSnapshot;
use round_rules::{evaluate_round, tied_overtime};
use tracing::{debug, info, warn};

use crate::model::{MatchFormat, MatchRecord, WinState};
use crate::store::Store;

/// A decided map, as announced on the win-state row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapWin {
    pub map_number: u32,
    pub winning_team: String,
    /// `ct:t` of the deciding snapshot.
    pub winning_score: String,
    /// `team1:team2` finished-map wins, this map included.
    pub map_counts: String,
    /// Set when this map gave a team enough wins to take the series.
    pub series_winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapStep {
    /// Same scoreboard as the previous poll.
    Unchanged,
    /// New score persisted, map still open.
    Recorded,
    /// A side won but its team name is unusable; nothing announced.
    InvalidWinner,
    MapWon(MapWin),
    /// Between maps, scoreboard not back at 0:0 yet.
    AwaitingReset,
    /// 0:0 seen after a map win; carries the new map number.
    NextMap(u32),
}

pub struct MapTracker {
    match_id: String,
    team1: String,
    team2: String,
    format: MatchFormat,
    map_number: u32,
    last_key: Option<String>,
    awaiting_reset: bool,
}

impl MapTracker {
    pub fn new(record: &MatchRecord) -> Self {
        Self {
            match_id: record.match_id.clone(),
            team1: record.team1_name.clone(),
            team2: record.team2_name.clone(),
            format: record.format,
            map_number: 1,
            last_key: None,
            awaiting_reset: false,
        }
    }

    pub fn map_number(&self) -> u32 {
        self.map_number
    }

    pub fn awaiting_reset(&self) -> bool {
        self.awaiting_reset
    }

    /// Processes one valid snapshot. On a store error nothing is remembered,
    /// so the same snapshot is processed again on the next poll.
    pub fn observe(&mut self, store: &Store, snap: &ScoreSnapshot) -> Result<MapStep> {
        if self.awaiting_reset {
            return Ok(self.check_reset(store, snap));
        }

        let key = snap.score_key();
        if self.last_key.as_deref() == Some(key.as_str()) {
            return Ok(MapStep::Unchanged);
        }

        debug!(
            "[{}] map {} score {} {} {}",
            self.match_id,
            self.map_number,
            snap.ct_name,
            snap.score_label(),
            snap.t_name
        );
        store.upsert_live_snapshot(&self.match_id, self.map_number, snap)?;
        store.upsert_running_map(&self.match_id, self.map_number, snap)?;

        if let Some(ot) = tied_overtime(snap.ct_score, snap.t_score) {
            info!("🔁 [{}] Overtime tied score ({}), OT{}", self.match_id, snap.score_label(), ot);
        }

        let Some(side) = evaluate_round(snap.ct_score, snap.t_score).winner() else {
            self.last_key = Some(key);
            return Ok(MapStep::Recorded);
        };

        let winning_team = snap.team(side).trim();
        if winning_team.is_empty() {
            warn!(
                "[{}] invalid winning team for side {} at {}, not announcing",
                self.match_id,
                side,
                snap.score_label()
            );
            self.last_key = Some(key);
            return Ok(MapStep::InvalidWinner);
        }

        store.finish_map(&self.match_id, self.map_number, winning_team)?;
        store.mark_live_finished(&self.match_id)?;

        let tally = store.map_wins(&self.match_id)?;
        let win = MapWin {
            map_number: self.map_number,
            winning_team: winning_team.to_string(),
            winning_score: snap.score_label(),
            map_counts: tally.counts_label(&self.team1, &self.team2),
            series_winner: tally.series_winner(self.format.wins_needed()).map(str::to_string),
        };

        store.write_win_state(
            &self.match_id,
            &WinState::announce(true, false, &win.winning_team, &win.winning_score, &win.map_counts),
        )?;

        self.last_key = Some(key);
        self.awaiting_reset = true;
        Ok(MapStep::MapWon(win))
    }

    fn check_reset(&mut self, store: &Store, snap: &ScoreSnapshot) -> MapStep {
        if !snap.is_reset() {
            return MapStep::AwaitingReset;
        }

        self.map_number += 1;
        self.last_key = None;
        self.awaiting_reset = false;

        if let Err(e) = store.reset_win_state(&self.match_id) {
            warn!("[{}] win state reset failed: {:#}", self.match_id, e);
        }
        MapStep::NextMap(self.map_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MapStatus, NewMatch};

    fn setup(format: MatchFormat) -> (Store, MapTracker) {
        let store = Store::open_in_memory().unwrap();
        let new = NewMatch {
            match_id: "100".to_string(),
            match_url: "https://www.hltv.org/matches/100/a-vs-b".to_string(),
            team1_name: "Vitality".to_string(),
            team2_name: "Spirit".to_string(),
            format,
        };
        store.register_match(&new).unwrap();
        let record = store.load_match("100").unwrap().unwrap();
        (store, MapTracker::new(&record))
    }

    fn snap(ct: u32, t: u32) -> ScoreSnapshot {
        ScoreSnapshot::new("Vitality", ct, t, "Spirit")
    }

    #[test]
    fn repeated_snapshot_is_a_no_op() {
        let (store, mut maps) = setup(MatchFormat::Bo3);
        assert_eq!(maps.observe(&store, &snap(3, 1)).unwrap(), MapStep::Recorded);
        assert_eq!(maps.observe(&store, &snap(3, 1)).unwrap(), MapStep::Unchanged);
        assert_eq!(store.live_snapshot("100").unwrap().unwrap().ct_score, 3);
    }

    #[test]
    fn map_win_is_finalized_and_announced_once() {
        let (store, mut maps) = setup(MatchFormat::Bo3);
        maps.observe(&store, &snap(12, 9)).unwrap();

        let step = maps.observe(&store, &snap(13, 9)).unwrap();
        let MapStep::MapWon(win) = step else {
            panic!("expected map win, got {step:?}");
        };
        assert_eq!(win.map_number, 1);
        assert_eq!(win.winning_team, "Vitality");
        assert_eq!(win.winning_score, "13:9");
        assert_eq!(win.map_counts, "1:0");
        assert_eq!(win.series_winner, None);

        let first = store.win_state("100").unwrap().unwrap();
        assert!(first.state.map_win && !first.state.match_win);

        // replay while waiting for the next map does not touch the rows again
        assert_eq!(maps.observe(&store, &snap(13, 9)).unwrap(), MapStep::AwaitingReset);
        assert_eq!(store.win_state("100").unwrap().unwrap(), first);
        let rows = store.map_results("100").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, MapStatus::Finished);
        assert_eq!(store.live_snapshot("100").unwrap().unwrap().status, "finished");
    }

    #[test]
    fn reset_advances_map_exactly_once() {
        let (store, mut maps) = setup(MatchFormat::Bo3);
        maps.observe(&store, &snap(13, 4)).unwrap();

        assert_eq!(maps.observe(&store, &snap(13, 4)).unwrap(), MapStep::AwaitingReset);
        assert_eq!(maps.observe(&store, &snap(0, 0)).unwrap(), MapStep::NextMap(2));
        assert_eq!(store.win_state("100").unwrap().unwrap().state, WinState::neutral());

        // the 0:0 that ended the wait is the first snapshot of map 2
        assert_eq!(maps.observe(&store, &snap(0, 0)).unwrap(), MapStep::Recorded);
        assert_eq!(maps.observe(&store, &snap(0, 0)).unwrap(), MapStep::Unchanged);
        assert_eq!(maps.map_number(), 2);

        let rows = store.map_results("100").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].status, MapStatus::Running);
    }

    #[test]
    fn second_map_win_decides_best_of_three() {
        let (store, mut maps) = setup(MatchFormat::Bo3);
        maps.observe(&store, &snap(13, 7)).unwrap();
        maps.observe(&store, &snap(0, 0)).unwrap();

        // sides swapped on map 2
        let swapped = ScoreSnapshot::new("Spirit", 14, 16, "Vitality");
        let MapStep::MapWon(win) = maps.observe(&store, &swapped).unwrap() else {
            panic!("expected map win");
        };
        assert_eq!(win.map_number, 2);
        assert_eq!(win.winning_team, "Vitality");
        assert_eq!(win.winning_score, "14:16");
        assert_eq!(win.map_counts, "2:0");
        assert_eq!(win.series_winner.as_deref(), Some("Vitality"));
    }

    #[test]
    fn best_of_one_is_decided_by_first_map() {
        let (store, mut maps) = setup(MatchFormat::Bo1);
        let MapStep::MapWon(win) = maps.observe(&store, &snap(5, 13)).unwrap() else {
            panic!("expected map win");
        };
        assert_eq!(win.series_winner.as_deref(), Some("Spirit"));
        assert_eq!(win.map_counts, "0:1");
    }

    #[test]
    fn blank_winner_is_discarded_without_announcement() {
        let (store, mut maps) = setup(MatchFormat::Bo3);
        let nameless = ScoreSnapshot::new("Vitality", 13, 2, " ");

        assert_eq!(maps.observe(&store, &ScoreSnapshot::new(" ", 13, 2, "Spirit")).unwrap(), MapStep::InvalidWinner);
        assert!(store.win_state("100").unwrap().is_none());
        assert_eq!(store.map_results("100").unwrap()[0].status, MapStatus::Running);
        assert!(!maps.awaiting_reset());

        // a later valid decision still goes through
        assert!(matches!(maps.observe(&store, &nameless).unwrap(), MapStep::MapWon(_)));
    }
}
