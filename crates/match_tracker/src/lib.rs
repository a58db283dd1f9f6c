//! Live match tracking core.
//!
//! `MatchScheduler` finds unfinished matches that went live and starts one
//! `MatchTracker` per match; the `ActiveRegistry` guarantees there is never a
//! second one. Trackers turn scoreboard snapshots into map results and
//! win-state announcements in the SQLite `Store`.

pub mod api;
pub mod config;
pub mod map_tracker;
pub mod model;
pub mod queue_client;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod tracker;

pub use config::TrackerConfig;
pub use map_tracker::{MapStep, MapTracker, MapWin};
pub use model::{MatchFormat, MatchRecord, NewMatch, QueueStatus, WinState};
pub use queue_client::{HttpQueueClient, QueueRemover};
pub use registry::{ActiveRegistry, Registration};
pub use scheduler::MatchScheduler;
pub use store::Store;
pub use tracker::{MatchTracker, StopReason};

use logger::EventLogger;
use std::sync::Arc;

/// Everything a tracker needs besides its own session. Cheap to clone.
#[derive(Clone)]
pub struct TrackerContext {
    pub store: Store,
    pub registry: ActiveRegistry,
    pub queue: Arc<dyn QueueRemover>,
    pub events: Arc<EventLogger>,
    pub config: TrackerConfig,
}
