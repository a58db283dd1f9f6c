//! SQLite persistence for matches, live scores, map results, the match queue
//! and the win-state announcements.
//!
//! One connection shared behind a mutex; every call is a short synchronous
//! statement, so holding the lock never spans an await.

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use live_sampler::ScoreSnapshot;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::{
    LiveSnapshotRow, MapResultRow, MapStatus, MapTally, MatchFormat, MatchRecord, NewMatch,
    QueueMove, QueueMoveOutcome, QueueRow, QueueStatus, WinState, WinStateRow,
};

pub const TABLES: [&str; 5] = ["matches", "live_scores", "match_maps", "match_queue", "win_state"];

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db {}", db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enable foreign keys")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("store connection mutex poisoned"))
    }

    // ── Registration / queue ────────────────────────────────────────────────

    /// Inserts the match and its queue entry (lowest priority). `None` if the id exists.
    pub fn register_match(&self, m: &NewMatch) -> Result<Option<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin register")?;

        let exists: Option<i64> = tx
            .query_row("SELECT 1 FROM matches WHERE match_id = ?1", [&m.match_id], |r| r.get(0))
            .optional()?;
        if exists.is_some() {
            return Ok(None);
        }

        tx.execute(
            r#"
            INSERT INTO matches (match_id, match_url, team1_name, team2_name, match_format, winner, is_finished, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, ?6)
            "#,
            params![m.match_id, m.match_url, m.team1_name, m.team2_name, m.format.as_str(), now_ts()],
        )
        .context("insert match")?;

        tx.execute(
            r#"
            INSERT INTO match_queue (match_id, priority, status)
            VALUES (?1, (SELECT IFNULL(MAX(priority), 0) + 1 FROM match_queue), 'queued')
            "#,
            [&m.match_id],
        )
        .context("insert queue entry")?;
        let queue_id = tx.last_insert_rowid();

        tx.commit().context("commit register")?;
        Ok(Some(queue_id))
    }

    pub fn unfinished_matches(&self) -> Result<Vec<MatchRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT match_id, match_url, team1_name, team2_name, match_format, winner, is_finished
            FROM matches WHERE is_finished = 0
            ORDER BY added_at, match_id
            "#,
        )?;
        let rows = stmt.query_map([], match_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("list unfinished matches")
    }

    pub fn load_match(&self, match_id: &str) -> Result<Option<MatchRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT match_id, match_url, team1_name, team2_name, match_format, winner, is_finished
            FROM matches WHERE match_id = ?1
            "#,
            [match_id],
            match_from_row,
        )
        .optional()
        .context("load match")
    }

    pub fn finish_match(&self, match_id: &str, winner: &str) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE matches SET is_finished = 1, winner = ?1 WHERE match_id = ?2",
                params![winner, match_id],
            )
            .context("finish match")?;
        Ok(())
    }

    pub fn set_queue_status(&self, match_id: &str, status: QueueStatus) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE match_queue SET status = ?1 WHERE match_id = ?2",
                params![status.as_str(), match_id],
            )
            .context("update queue status")?;
        Ok(())
    }

    pub fn queue_entry_id(&self, match_id: &str) -> Result<Option<i64>> {
        self.conn()?
            .query_row(
                "SELECT id FROM match_queue WHERE match_id = ?1 ORDER BY id LIMIT 1",
                [match_id],
                |r| r.get(0),
            )
            .optional()
            .context("find queue entry")
    }

    /// Removes a queue row together with its match and win-state, all or nothing.
    /// Returns the match id, or `None` when the row does not exist.
    pub fn delete_queue_entry(&self, queue_id: i64) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin queue delete")?;

        let match_id: Option<String> = tx
            .query_row("SELECT match_id FROM match_queue WHERE id = ?1", [queue_id], |r| r.get(0))
            .optional()?;
        let Some(match_id) = match_id else {
            return Ok(None);
        };

        tx.execute("DELETE FROM match_queue WHERE id = ?1", [queue_id])?;
        tx.execute("DELETE FROM matches WHERE match_id = ?1", [&match_id])?;
        tx.execute("DELETE FROM win_state WHERE match_id = ?1", [&match_id])?;
        tx.commit().context("commit queue delete")?;

        Ok(Some(match_id))
    }

    /// Swaps the row's priority with its neighbour in `direction`, in one transaction.
    pub fn move_queue_entry(&self, queue_id: i64, direction: QueueMove) -> Result<QueueMoveOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin queue reorder")?;

        let priority: Option<i64> = tx
            .query_row("SELECT priority FROM match_queue WHERE id = ?1", [queue_id], |r| r.get(0))
            .optional()?;
        let Some(priority) = priority else {
            return Ok(QueueMoveOutcome::NotFound);
        };

        let neighbour_sql = match direction {
            QueueMove::Up => {
                "SELECT id, priority FROM match_queue WHERE priority < ?1 ORDER BY priority DESC, id DESC LIMIT 1"
            }
            QueueMove::Down => {
                "SELECT id, priority FROM match_queue WHERE priority > ?1 ORDER BY priority ASC, id ASC LIMIT 1"
            }
        };
        let neighbour: Option<(i64, i64)> = tx
            .query_row(neighbour_sql, [priority], |r| Ok((r.get(0)?, r.get(1)?)))
            .optional()?;
        let Some((neighbour_id, neighbour_priority)) = neighbour else {
            return Ok(QueueMoveOutcome::AtEdge);
        };

        tx.execute(
            "UPDATE match_queue SET priority = ?1 WHERE id = ?2",
            params![neighbour_priority, queue_id],
        )?;
        tx.execute(
            "UPDATE match_queue SET priority = ?1 WHERE id = ?2",
            params![priority, neighbour_id],
        )?;
        tx.commit().context("commit queue reorder")?;

        Ok(QueueMoveOutcome::Moved)
    }

    /// Highest-priority unfinished match whose queue entry is still open.
    pub fn display_match(&self) -> Result<Option<MatchRecord>> {
        self.conn()?
            .query_row(
                r#"
                SELECT m.match_id, m.match_url, m.team1_name, m.team2_name, m.match_format, m.winner, m.is_finished
                FROM matches m
                JOIN match_queue mq ON m.match_id = mq.match_id
                WHERE m.is_finished = 0 AND mq.status IN ('queued', 'running')
                ORDER BY mq.priority ASC, mq.id ASC
                LIMIT 1
                "#,
                [],
                match_from_row,
            )
            .optional()
            .context("load display match")
    }

    pub fn queue(&self) -> Result<Vec<QueueRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT mq.id, mq.match_id, m.team1_name, m.team2_name, m.match_format, mq.priority, mq.status
            FROM match_queue mq
            JOIN matches m ON mq.match_id = m.match_id
            ORDER BY mq.priority ASC, mq.id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(QueueRow {
                id: r.get(0)?,
                match_id: r.get(1)?,
                team1_name: r.get(2)?,
                team2_name: r.get(3)?,
                match_format: r.get(4)?,
                priority: r.get(5)?,
                status: r.get(6)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("list queue")
    }

    // ── Live scores / maps ──────────────────────────────────────────────────

    pub fn upsert_live_snapshot(&self, match_id: &str, map_number: u32, s: &ScoreSnapshot) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO live_scores (match_id, map_number, ct_team, t_team, ct_score, t_score, status, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'live', ?7)
                ON CONFLICT(match_id) DO UPDATE SET
                    map_number=excluded.map_number,
                    ct_team=excluded.ct_team,
                    t_team=excluded.t_team,
                    ct_score=excluded.ct_score,
                    t_score=excluded.t_score,
                    status='live',
                    updated_at=excluded.updated_at
                "#,
                params![match_id, map_number, s.ct_name, s.t_name, s.ct_score, s.t_score, now_ts()],
            )
            .context("upsert live score")?;
        Ok(())
    }

    pub fn mark_live_finished(&self, match_id: &str) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE live_scores SET status = 'finished', updated_at = ?1 WHERE match_id = ?2",
                params![now_ts(), match_id],
            )
            .context("finish live score")?;
        Ok(())
    }

    pub fn upsert_running_map(&self, match_id: &str, map_number: u32, s: &ScoreSnapshot) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO match_maps (match_id, map_number, status, ct_score, t_score, updated_at)
                VALUES (?1, ?2, 'running', ?3, ?4, ?5)
                ON CONFLICT(match_id, map_number) DO UPDATE SET
                    ct_score=excluded.ct_score,
                    t_score=excluded.t_score,
                    status='running',
                    updated_at=excluded.updated_at
                "#,
                params![match_id, map_number, s.ct_score, s.t_score, now_ts()],
            )
            .context("upsert map")?;
        Ok(())
    }

    pub fn finish_map(&self, match_id: &str, map_number: u32, winning_team: &str) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                UPDATE match_maps SET status = 'finished', winning_team = ?1, updated_at = ?2
                WHERE match_id = ?3 AND map_number = ?4
                "#,
                params![winning_team, now_ts(), match_id, map_number],
            )
            .context("finish map")?;
        Ok(())
    }

    pub fn map_wins(&self, match_id: &str) -> Result<MapTally> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT winning_team, COUNT(*) FROM match_maps
            WHERE match_id = ?1 AND status = 'finished' AND winning_team IS NOT NULL
            GROUP BY winning_team
            ORDER BY winning_team
            "#,
        )?;
        let rows = stmt.query_map([match_id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u32>(1)?)))?;
        let wins = rows.collect::<rusqlite::Result<Vec<_>>>().context("count map wins")?;
        Ok(MapTally::new(wins))
    }

    pub fn map_results(&self, match_id: &str) -> Result<Vec<MapResultRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT match_id, map_number, status, winning_team, ct_score, t_score, updated_at
            FROM match_maps WHERE match_id = ?1 ORDER BY map_number
            "#,
        )?;
        let rows = stmt.query_map([match_id], |r| {
            Ok(MapResultRow {
                match_id: r.get(0)?,
                map_number: r.get(1)?,
                status: MapStatus::parse(&r.get::<_, String>(2)?),
                winning_team: r.get(3)?,
                ct_score: r.get(4)?,
                t_score: r.get(5)?,
                updated_at: r.get(6)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("list map results")
    }

    pub fn live_snapshot(&self, match_id: &str) -> Result<Option<LiveSnapshotRow>> {
        self.conn()?
            .query_row(
                r#"
                SELECT match_id, map_number, ct_team, t_team, ct_score, t_score, status, updated_at
                FROM live_scores WHERE match_id = ?1
                "#,
                [match_id],
                |r| {
                    Ok(LiveSnapshotRow {
                        match_id: r.get(0)?,
                        map_number: r.get(1)?,
                        ct_team: r.get(2)?,
                        t_team: r.get(3)?,
                        ct_score: r.get(4)?,
                        t_score: r.get(5)?,
                        status: r.get(6)?,
                        updated_at: r.get(7)?,
                    })
                },
            )
            .optional()
            .context("load live score")
    }

    // ── Win state ───────────────────────────────────────────────────────────

    pub fn write_win_state(&self, match_id: &str, state: &WinState) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT OR REPLACE INTO win_state (match_id, map_win, match_win, winning_team, winning_score, map_counts, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    match_id,
                    state.map_win,
                    state.match_win,
                    state.winning_team,
                    state.winning_score,
                    state.map_counts,
                    now_ts(),
                ],
            )
            .context("write win state")?;
        Ok(())
    }

    pub fn reset_win_state(&self, match_id: &str) -> Result<()> {
        self.write_win_state(match_id, &WinState::neutral())
    }

    pub fn win_state(&self, match_id: &str) -> Result<Option<WinStateRow>> {
        self.conn()?
            .query_row(
                r#"
                SELECT match_id, map_win, match_win, winning_team, winning_score, map_counts, updated_at
                FROM win_state WHERE match_id = ?1
                "#,
                [match_id],
                win_state_from_row,
            )
            .optional()
            .context("load win state")
    }

    /// Most recent announcement over all matches.
    pub fn latest_win_state(&self) -> Result<Option<WinStateRow>> {
        self.conn()?
            .query_row(
                r#"
                SELECT match_id, map_win, match_win, winning_team, winning_score, map_counts, updated_at
                FROM win_state ORDER BY updated_at DESC, rowid DESC LIMIT 1
                "#,
                [],
                win_state_from_row,
            )
            .optional()
            .context("load latest win state")
    }

    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let conn = self.conn()?;
        TABLES
            .iter()
            .map(|t| -> Result<(&'static str, i64)> {
                let count: i64 = conn
                    .query_row(&format!("SELECT COUNT(1) FROM {t}"), [], |r| r.get(0))
                    .with_context(|| format!("count {t}"))?;
                Ok((*t, count))
            })
            .collect()
    }
}

fn match_from_row(r: &Row<'_>) -> rusqlite::Result<MatchRecord> {
    let format: String = r.get(4)?;
    Ok(MatchRecord {
        match_id: r.get(0)?,
        match_url: r.get(1)?,
        team1_name: r.get(2)?,
        team2_name: r.get(3)?,
        format: format.parse().unwrap_or(MatchFormat::Bo1),
        winner: r.get(5)?,
        is_finished: r.get(6)?,
    })
}

fn win_state_from_row(r: &Row<'_>) -> rusqlite::Result<WinStateRow> {
    Ok(WinStateRow {
        match_id: r.get(0)?,
        state: WinState {
            map_win: r.get(1)?,
            match_win: r.get(2)?,
            winning_team: r.get(3)?,
            winning_score: r.get(4)?,
            map_counts: r.get(5)?,
        },
        updated_at: r.get(6)?,
    })
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            match_url TEXT NOT NULL,
            team1_name TEXT NOT NULL,
            team2_name TEXT NOT NULL,
            match_format TEXT NOT NULL CHECK (match_format IN ('BO1', 'BO3', 'BO5')),
            winner TEXT,
            is_finished INTEGER NOT NULL DEFAULT 0,
            added_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS live_scores (
            match_id TEXT PRIMARY KEY,
            map_number INTEGER NOT NULL,
            ct_team TEXT NOT NULL,
            t_team TEXT NOT NULL,
            ct_score INTEGER NOT NULL DEFAULT 0,
            t_score INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'live',
            updated_at TEXT NOT NULL,
            FOREIGN KEY (match_id) REFERENCES matches(match_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS match_maps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id TEXT NOT NULL,
            map_number INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'not_started' CHECK (status IN ('not_started', 'running', 'finished')),
            winning_team TEXT,
            ct_score INTEGER,
            t_score INTEGER,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (match_id) REFERENCES matches(match_id) ON DELETE CASCADE,
            UNIQUE (match_id, map_number)
        );

        CREATE TABLE IF NOT EXISTS match_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'queued' CHECK (status IN ('queued', 'not_started', 'running', 'finished')),
            FOREIGN KEY (match_id) REFERENCES matches(match_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_queue_match ON match_queue(match_id);

        CREATE TABLE IF NOT EXISTS win_state (
            match_id TEXT PRIMARY KEY,
            map_win INTEGER NOT NULL DEFAULT 0,
            match_win INTEGER NOT NULL DEFAULT 0,
            winning_team TEXT,
            winning_score TEXT,
            map_counts TEXT,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (match_id) REFERENCES matches(match_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_win_state_updated ON win_state(updated_at);
        "#,
    )
    .context("init schema")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_match(id: &str, format: MatchFormat) -> NewMatch {
        NewMatch {
            match_id: id.to_string(),
            match_url: format!("https://www.hltv.org/matches/{id}/navi-vs-faze"),
            team1_name: "NaVi".to_string(),
            team2_name: "FaZe".to_string(),
            format,
        }
    }

    #[test]
    fn register_queues_with_increasing_priority() {
        let store = Store::open_in_memory().unwrap();
        let q1 = store.register_match(&new_match("1", MatchFormat::Bo1)).unwrap();
        let q2 = store.register_match(&new_match("2", MatchFormat::Bo3)).unwrap();
        assert!(q1.is_some() && q2.is_some());
        assert_eq!(store.register_match(&new_match("1", MatchFormat::Bo1)).unwrap(), None);

        let queue = store.queue().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].match_id, "1");
        assert_eq!(queue[0].priority, 1);
        assert_eq!(queue[1].priority, 2);
        assert_eq!(queue[1].status, "queued");
        assert_eq!(queue[1].match_format, "BO3");
    }

    #[test]
    fn unfinished_excludes_finished_matches() {
        let store = Store::open_in_memory().unwrap();
        store.register_match(&new_match("1", MatchFormat::Bo1)).unwrap();
        store.register_match(&new_match("2", MatchFormat::Bo3)).unwrap();
        store.finish_match("1", "NaVi").unwrap();

        let open = store.unfinished_matches().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].match_id, "2");
        assert_eq!(open[0].format, MatchFormat::Bo3);

        let done = store.load_match("1").unwrap().unwrap();
        assert!(done.is_finished);
        assert_eq!(done.winner.as_deref(), Some("NaVi"));
    }

    #[test]
    fn map_rows_upsert_and_finish_once() {
        let store = Store::open_in_memory().unwrap();
        store.register_match(&new_match("1", MatchFormat::Bo3)).unwrap();

        store.upsert_running_map("1", 1, &ScoreSnapshot::new("NaVi", 5, 3, "FaZe")).unwrap();
        store.upsert_running_map("1", 1, &ScoreSnapshot::new("NaVi", 13, 3, "FaZe")).unwrap();
        store.finish_map("1", 1, "NaVi").unwrap();
        store.upsert_running_map("1", 2, &ScoreSnapshot::new("FaZe", 0, 0, "NaVi")).unwrap();

        let maps = store.map_results("1").unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].status, MapStatus::Finished);
        assert_eq!(maps[0].ct_score, Some(13));
        assert_eq!(maps[0].winning_team.as_deref(), Some("NaVi"));
        assert_eq!(maps[1].status, MapStatus::Running);

        let tally = store.map_wins("1").unwrap();
        assert_eq!(tally.counts_label("NaVi", "FaZe"), "1:0");
    }

    #[test]
    fn live_score_is_single_row() {
        let store = Store::open_in_memory().unwrap();
        store.register_match(&new_match("1", MatchFormat::Bo1)).unwrap();
        store.upsert_live_snapshot("1", 1, &ScoreSnapshot::new("NaVi", 1, 0, "FaZe")).unwrap();
        store.upsert_live_snapshot("1", 1, &ScoreSnapshot::new("NaVi", 2, 0, "FaZe")).unwrap();
        store.mark_live_finished("1").unwrap();

        let live = store.live_snapshot("1").unwrap().unwrap();
        assert_eq!(live.ct_score, 2);
        assert_eq!(live.status, "finished");
        assert_eq!(store.table_counts().unwrap()[1], ("live_scores", 1));
    }

    #[test]
    fn win_state_is_overwritten_not_appended() {
        let store = Store::open_in_memory().unwrap();
        store.register_match(&new_match("1", MatchFormat::Bo3)).unwrap();
        store.register_match(&new_match("2", MatchFormat::Bo3)).unwrap();

        store.write_win_state("1", &WinState::announce(true, false, "NaVi", "13:4", "1:0")).unwrap();
        store.reset_win_state("1").unwrap();
        store.write_win_state("2", &WinState::announce(true, false, "FaZe", "16:14", "0:1")).unwrap();

        assert_eq!(store.win_state("1").unwrap().unwrap().state, WinState::neutral());
        let latest = store.latest_win_state().unwrap().unwrap();
        assert_eq!(latest.match_id, "2");
        assert_eq!(latest.state.winning_score.as_deref(), Some("16:14"));
        assert_eq!(store.table_counts().unwrap()[4], ("win_state", 2));
    }

    #[test]
    fn queue_delete_removes_match_and_win_state_together() {
        let store = Store::open_in_memory().unwrap();
        let queue_id = store.register_match(&new_match("1", MatchFormat::Bo3)).unwrap().unwrap();
        store.register_match(&new_match("2", MatchFormat::Bo1)).unwrap();
        store.write_win_state("1", &WinState::announce(false, true, "NaVi", "13:9", "2:1")).unwrap();
        store.upsert_running_map("1", 1, &ScoreSnapshot::new("NaVi", 13, 9, "FaZe")).unwrap();

        assert_eq!(store.queue_entry_id("1").unwrap(), Some(queue_id));
        assert_eq!(store.delete_queue_entry(queue_id).unwrap().as_deref(), Some("1"));
        assert_eq!(store.delete_queue_entry(queue_id).unwrap(), None);

        assert!(store.load_match("1").unwrap().is_none());
        assert!(store.win_state("1").unwrap().is_none());
        assert!(store.map_results("1").unwrap().is_empty());
        assert_eq!(store.queue().unwrap().len(), 1);
    }

    #[test]
    fn reorder_swaps_with_neighbour_priority() {
        let store = Store::open_in_memory().unwrap();
        let q1 = store.register_match(&new_match("1", MatchFormat::Bo1)).unwrap().unwrap();
        store.register_match(&new_match("2", MatchFormat::Bo1)).unwrap();
        let q3 = store.register_match(&new_match("3", MatchFormat::Bo1)).unwrap().unwrap();

        assert_eq!(store.move_queue_entry(q3, QueueMove::Up).unwrap(), QueueMoveOutcome::Moved);
        let order: Vec<_> = store.queue().unwrap().into_iter().map(|r| r.match_id).collect();
        assert_eq!(order, ["1", "3", "2"]);

        assert_eq!(store.move_queue_entry(q1, QueueMove::Up).unwrap(), QueueMoveOutcome::AtEdge);
        assert_eq!(store.move_queue_entry(999, QueueMove::Down).unwrap(), QueueMoveOutcome::NotFound);

        let priorities: Vec<_> = store.queue().unwrap().into_iter().map(|r| r.priority).collect();
        assert_eq!(priorities, [1, 2, 3]);
    }

    #[test]
    fn display_match_is_top_priority_open_entry() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.display_match().unwrap().is_none());

        store.register_match(&new_match("1", MatchFormat::Bo3)).unwrap();
        let q2 = store.register_match(&new_match("2", MatchFormat::Bo1)).unwrap().unwrap();
        store.move_queue_entry(q2, QueueMove::Up).unwrap();
        assert_eq!(store.display_match().unwrap().unwrap().match_id, "2");

        store.finish_match("2", "NaVi").unwrap();
        assert_eq!(store.display_match().unwrap().unwrap().match_id, "1");

        store.set_queue_status("1", QueueStatus::Finished).unwrap();
        assert!(store.display_match().unwrap().is_none());
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tracker.db");
        {
            let store = Store::open(&path).unwrap();
            store.register_match(&new_match("7", MatchFormat::Bo5)).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.load_match("7").unwrap().unwrap().format, MatchFormat::Bo5);
    }
}
