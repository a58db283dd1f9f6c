#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use live_sampler::{LiveSession, Sample, ScoreSampler, ScoreSnapshot};
use logger::EventLogger;
use match_tracker::{
    ActiveRegistry, MatchFormat, MatchScheduler, NewMatch, QueueRemover, Store, TrackerConfig, TrackerContext,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const TEAM1: &str = "NaVi";
pub const TEAM2: &str = "FaZe";

pub fn live(ct_name: &str, ct: u32, t: u32, t_name: &str) -> Sample {
    Sample::Live(ScoreSnapshot::new(ct_name, ct, t, t_name))
}

/// NaVi on CT.
pub fn navi_ct(ct: u32, t: u32) -> Sample {
    live(TEAM1, ct, t, TEAM2)
}

/// NaVi on T.
pub fn navi_t(ct: u32, t: u32) -> Sample {
    live(TEAM2, ct, t, TEAM1)
}

pub fn match_url(id: &str) -> String {
    format!("https://www.hltv.org/matches/{id}/navi-vs-faze")
}

/// One scripted page read.
#[derive(Clone)]
pub enum Step {
    Read(Sample),
    /// The read never completes. Not repeated once the script runs out.
    Stall,
}

#[derive(Default)]
struct Script {
    pending: VecDeque<Step>,
    last: Option<Sample>,
}

impl Script {
    fn next(&mut self) -> Option<Sample> {
        match self.pending.pop_front() {
            Some(Step::Stall) => return None,
            Some(Step::Read(s)) => self.last = Some(s),
            None => {}
        }
        Some(self.last.clone().unwrap_or(Sample::Unavailable))
    }
}

/// Every session opened on a URL reads from the same script; the last
/// sample repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedSampler {
    scripts: Mutex<HashMap<String, Arc<Mutex<Script>>>>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

impl ScriptedSampler {
    pub fn script(&self, url: &str, samples: Vec<Sample>) {
        self.script_steps(url, samples.into_iter().map(Step::Read).collect());
    }

    pub fn script_steps(&self, url: &str, steps: Vec<Step>) {
        let script = Script {
            pending: steps.into(),
            last: None,
        };
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Arc::new(Mutex::new(script)));
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreSampler for ScriptedSampler {
    async fn open(&self, match_url: &str) -> Result<Box<dyn LiveSession>> {
        // lets concurrent scans interleave the way page loads do
        tokio::task::yield_now().await;

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(match_url)
            .cloned()
            .ok_or_else(|| anyhow!("no script for {match_url}"))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script,
            closed: Arc::clone(&self.closed),
            is_closed: false,
        }))
    }
}

struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

#[async_trait]
impl LiveSession for ScriptedSession {
    async fn sample(&mut self) -> Sample {
        let next = self.script.lock().unwrap().next();
        match next {
            Some(sample) => sample,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Records deletion requests and applies them to the store like the API would.
pub struct RecordingQueue {
    store: Store,
    pub calls: Mutex<Vec<i64>>,
}

#[async_trait]
impl QueueRemover for RecordingQueue {
    async fn remove_queue_entry(&self, queue_id: i64) -> Result<()> {
        self.calls.lock().unwrap().push(queue_id);
        match self.store.delete_queue_entry(queue_id)? {
            Some(_) => Ok(()),
            None => Err(anyhow!("Queue row not found")),
        }
    }
}

pub struct Harness {
    pub ctx: TrackerContext,
    pub sampler: Arc<ScriptedSampler>,
    pub queue: Arc<RecordingQueue>,
    pub logs: TempDir,
}

pub fn test_config() -> TrackerConfig {
    TrackerConfig {
        live_poll_interval: Duration::from_secs(1),
        map_reset_poll_interval: Duration::from_secs(1),
        ..TrackerConfig::default()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Store::open_in_memory().unwrap(), test_config())
    }

    pub fn with_store(store: Store, config: TrackerConfig) -> Self {
        let logs = tempfile::tempdir().unwrap();
        let queue = Arc::new(RecordingQueue {
            store: store.clone(),
            calls: Mutex::new(Vec::new()),
        });
        let ctx = TrackerContext {
            store,
            registry: ActiveRegistry::new(),
            queue: queue.clone(),
            events: Arc::new(EventLogger::new(logs.path())),
            config,
        };
        Self {
            ctx,
            sampler: Arc::new(ScriptedSampler::default()),
            queue,
            logs,
        }
    }

    /// Registers a NaVi vs FaZe match and scripts its page. Returns the queue id.
    pub fn add_match(&self, id: &str, format: MatchFormat, samples: Vec<Sample>) -> i64 {
        self.add_match_steps(id, format, samples.into_iter().map(Step::Read).collect())
    }

    pub fn add_match_steps(&self, id: &str, format: MatchFormat, steps: Vec<Step>) -> i64 {
        let queue_id = self
            .ctx
            .store
            .register_match(&NewMatch {
                match_id: id.to_string(),
                match_url: match_url(id),
                team1_name: TEAM1.to_string(),
                team2_name: TEAM2.to_string(),
                format,
            })
            .unwrap()
            .unwrap();
        self.sampler.script_steps(&match_url(id), steps);
        queue_id
    }

    pub fn scheduler(&self) -> MatchScheduler {
        MatchScheduler::new(self.ctx.clone(), self.sampler.clone())
    }

    pub fn queue_calls(&self) -> Vec<i64> {
        self.queue.calls.lock().unwrap().clone()
    }

    pub fn queue_status(&self, match_id: &str) -> Option<String> {
        self.ctx
            .store
            .queue()
            .unwrap()
            .into_iter()
            .find(|row| row.match_id == match_id)
            .map(|row| row.status)
    }

    /// `(map_win, match_win)` of the match's win-state row.
    pub fn flags(&self, match_id: &str) -> Option<(bool, bool)> {
        self.ctx
            .store
            .win_state(match_id)
            .unwrap()
            .map(|row| (row.state.map_win, row.state.match_win))
    }

    pub fn events(&self) -> Vec<serde_json::Value> {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(self.logs.path()).unwrap() {
            let raw = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            lines.extend(raw.lines().map(|l| serde_json::from_str(l).unwrap()));
        }
        lines
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["event"].as_str().unwrap().to_string())
            .collect()
    }
}

/// Steps paused time in 100ms increments until `cond` holds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..3000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for {what}");
}
