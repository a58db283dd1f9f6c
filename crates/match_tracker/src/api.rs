//! Request routing for `tracker-api`: the read model consumed by the display
//! and the queue-management operations. Socket handling lives in the binary;
//! everything here is a pure function of the request and the store.

use live_sampler::match_id_from_url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::model::{MatchFormat, NewMatch, QueueMove, QueueMoveOutcome};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8",
            body: value.to_string(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    fn internal(context: &str, err: anyhow::Error) -> Self {
        warn!("api: {}: {:#}", context, err);
        Self::json(500, &json!({ "error": context, "details": format!("{err:#}") }))
    }

    pub fn status_line(&self) -> String {
        let reason = match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            _ => "Internal Server Error",
        };
        format!("HTTP/1.1 {} {}", self.status, reason)
    }
}

#[derive(Debug, Deserialize)]
struct AddMatchRequest {
    match_url: String,
    #[serde(default)]
    match_id: Option<String>,
    team1_name: String,
    team2_name: String,
    match_format: String,
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    direction: String,
}

pub fn route(method: &str, path: &str, body: &str, store: &Store) -> ApiResponse {
    let path = path.split('?').next().unwrap_or_default();

    if method == "POST" {
        if let Some(raw_id) = path
            .strip_prefix("/api/match-queue/")
            .and_then(|rest| rest.strip_suffix("/reorder"))
        {
            return reorder_queue_row(raw_id, body, store);
        }
    }

    match (method, path) {
        ("GET", "/health") => ApiResponse::text(200, "ok"),
        ("GET", "/api/display/win-state") => win_state(store),
        ("GET", "/api/display/live") => live_display(store),
        ("GET", "/api/match-queue") => match_queue(store),
        ("POST", "/api/matches") => add_match(body, store),
        ("DELETE", p) if p.starts_with("/api/match-queue/") => {
            delete_queue_row(&p["/api/match-queue/".len()..], store)
        }
        _ => ApiResponse::text(404, "not found"),
    }
}

fn win_state(store: &Store) -> ApiResponse {
    match store.latest_win_state() {
        Ok(Some(row)) => match serde_json::to_value(&row) {
            Ok(v) => ApiResponse::json(200, &v),
            Err(e) => ApiResponse::internal("Internal server error", e.into()),
        },
        Ok(None) => ApiResponse::error(404, "No win state found"),
        Err(e) => ApiResponse::internal("Internal server error", e),
    }
}

/// Current match for the scoreboard overlay: live round score per team,
/// map number and finished-map counts.
fn live_display(store: &Store) -> ApiResponse {
    let record = match store.display_match() {
        Ok(Some(m)) => m,
        Ok(None) => return ApiResponse::error(404, "No live match found"),
        Err(e) => return ApiResponse::internal("Internal server error", e),
    };
    let live = match store.live_snapshot(&record.match_id) {
        Ok(Some(l)) => l,
        Ok(None) => return ApiResponse::error(404, "No live score available"),
        Err(e) => return ApiResponse::internal("Internal server error", e),
    };
    let (tally, maps) = match (store.map_wins(&record.match_id), store.map_results(&record.match_id)) {
        (Ok(t), Ok(m)) => (t, m),
        (Err(e), _) | (_, Err(e)) => return ApiResponse::internal("Internal server error", e),
    };

    let (team1, team2) = (record.team1_name.as_str(), record.team2_name.as_str());
    ApiResponse::json(
        200,
        &json!({
            "match_id": record.match_id,
            "team1_name": team1,
            "team2_name": team2,
            "team1_score": live.score_of(team1),
            "team2_score": live.score_of(team2),
            "team1_map_wins": tally.wins_for(team1),
            "team2_map_wins": tally.wins_for(team2),
            "map_number": live.map_number.max(1),
            "map_info": format!("Map {} - {}", live.map_number.max(1), record.format),
            "match_format": record.format,
            "maps": maps,
        }),
    )
}

fn match_queue(store: &Store) -> ApiResponse {
    match store.queue() {
        Ok(rows) => ApiResponse::json(200, &json!({ "success": true, "queue": rows })),
        Err(e) => ApiResponse::internal("Failed to fetch match queue", e),
    }
}

fn delete_queue_row(raw_id: &str, store: &Store) -> ApiResponse {
    let Ok(queue_id) = raw_id.trim_end_matches('/').parse::<i64>() else {
        return ApiResponse::error(400, "Invalid queue id");
    };

    match store.delete_queue_entry(queue_id) {
        Ok(Some(match_id)) => {
            info!("🗑️ api: queue row {} removed (match {})", queue_id, match_id);
            ApiResponse::json(200, &json!({ "success": true }))
        }
        Ok(None) => ApiResponse::error(404, "Queue row not found"),
        Err(e) => ApiResponse::internal("Failed to remove from queue", e),
    }
}

fn reorder_queue_row(raw_id: &str, body: &str, store: &Store) -> ApiResponse {
    let Ok(queue_id) = raw_id.parse::<i64>() else {
        return ApiResponse::error(400, "Invalid queue id");
    };
    let direction = serde_json::from_str::<ReorderRequest>(body)
        .ok()
        .and_then(|r| r.direction.parse::<QueueMove>().ok());
    let Some(direction) = direction else {
        return ApiResponse::error(400, "Invalid direction");
    };

    match store.move_queue_entry(queue_id, direction) {
        Ok(QueueMoveOutcome::Moved) => {
            info!("↕️ api: queue row {} moved {}", queue_id, direction.as_str());
            ApiResponse::json(200, &json!({ "success": true }))
        }
        Ok(QueueMoveOutcome::NotFound) => ApiResponse::error(404, "Queue row not found"),
        Ok(QueueMoveOutcome::AtEdge) => ApiResponse::error(400, &format!("Cannot move {}", direction.as_str())),
        Err(e) => ApiResponse::internal("Failed to reorder queue", e),
    }
}

fn add_match(body: &str, store: &Store) -> ApiResponse {
    let req: AddMatchRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return ApiResponse::error(400, &format!("Invalid request body: {e}")),
    };

    let match_url = req.match_url.trim();
    if match_url.is_empty() {
        return ApiResponse::error(400, "No URL provided");
    }
    let match_id = match req.match_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id.trim().to_string(),
        None => match match_id_from_url(match_url) {
            Some(id) => id,
            None => return ApiResponse::error(400, "Malformed HLTV URL"),
        },
    };
    let (team1, team2) = (req.team1_name.trim(), req.team2_name.trim());
    if team1.is_empty() || team2.is_empty() {
        return ApiResponse::error(400, "Both team names are required");
    }
    let format: MatchFormat = match req.match_format.parse() {
        Ok(f) => f,
        Err(e) => return ApiResponse::error(400, &format!("{e:#}")),
    };

    let new = NewMatch {
        match_id: match_id.clone(),
        match_url: match_url.to_string(),
        team1_name: team1.to_string(),
        team2_name: team2.to_string(),
        format,
    };
    match store.register_match(&new) {
        Ok(Some(queue_id)) => {
            info!("➕ api: match {} queued ({} vs {}, {})", match_id, team1, team2, format);
            ApiResponse::json(200, &json!({ "success": true, "match_id": match_id, "queue_id": queue_id }))
        }
        Ok(None) => ApiResponse::error(409, "Match already exists"),
        Err(e) => ApiResponse::internal("Database error", e),
    }
}
