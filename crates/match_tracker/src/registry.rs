//! In-process set of match ids that currently own a polling loop.
//!
//! Membership is the single-tracker guard: `try_register` is the only way to
//! obtain a [`Registration`], and it refuses ids that are already present.
//! Each registration carries a generation so a stale tracker can never remove
//! the entry of a newer one, plus a child of the process shutdown token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Entry {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Inner {
    active: HashMap<String, Entry>,
    next_generation: u64,
}

#[derive(Clone)]
pub struct ActiveRegistry {
    inner: Arc<Mutex<Inner>>,
    shutdown: CancellationToken,
}

/// Proof of membership handed to exactly one tracker.
#[derive(Debug, Clone)]
pub struct Registration {
    pub match_id: String,
    generation: u64,
    token: CancellationToken,
}

impl Registration {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the tracker has been stopped or the process is shutting down.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Default for ActiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            shutdown: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // the map holds no invariants a panicking holder could break halfway
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims `match_id`. `None` when a tracker already owns it or shutdown began.
    pub fn try_register(&self, match_id: &str) -> Option<Registration> {
        if self.shutdown.is_cancelled() {
            return None;
        }

        let mut inner = self.lock();
        if inner.active.contains_key(match_id) {
            return None;
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let token = self.shutdown.child_token();
        inner.active.insert(
            match_id.to_string(),
            Entry {
                generation,
                token: token.clone(),
            },
        );
        debug!("registry: {} registered (gen {})", match_id, generation);

        Some(Registration {
            match_id: match_id.to_string(),
            generation,
            token,
        })
    }

    pub fn is_active(&self, match_id: &str) -> bool {
        self.lock().active.contains_key(match_id)
    }

    /// Still the owner of its match id (not released, stopped or replaced).
    pub fn is_current(&self, reg: &Registration) -> bool {
        self.lock()
            .active
            .get(&reg.match_id)
            .is_some_and(|e| e.generation == reg.generation)
    }

    /// Drops the entry owned by `reg`. Idempotent; entries of other generations are untouched.
    pub fn release(&self, reg: &Registration) -> bool {
        let mut inner = self.lock();
        let owned = inner
            .active
            .get(&reg.match_id)
            .is_some_and(|e| e.generation == reg.generation);
        if owned {
            inner.active.remove(&reg.match_id);
            debug!("registry: {} released (gen {})", reg.match_id, reg.generation);
        }
        owned
    }

    /// Removes `match_id` and cancels its tracker; the loop exits at its next suspension point.
    ///
    /// The binaries only stop trackers through [`shutdown`](Self::shutdown). This is the
    /// per-match hook for code embedding the scheduler, and for tests.
    pub fn stop(&self, match_id: &str) -> bool {
        let removed = self.lock().active.remove(match_id);
        match removed {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every tracker and refuses new registrations.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().active.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_is_refused() {
        let registry = ActiveRegistry::new();
        let first = registry.try_register("42");
        assert!(first.is_some());
        assert!(registry.try_register("42").is_none());
        assert!(registry.try_register("43").is_some());
        assert_eq!(registry.active_ids(), vec!["42".to_string(), "43".to_string()]);
    }

    #[test]
    fn stale_release_keeps_newer_owner() {
        let registry = ActiveRegistry::new();
        let old = registry.try_register("42").unwrap();
        assert!(registry.release(&old));
        assert!(!registry.release(&old));

        let new = registry.try_register("42").unwrap();
        assert!(!registry.is_current(&old));
        assert!(!registry.release(&old));
        assert!(registry.is_current(&new));
        assert!(registry.is_active("42"));
    }

    #[test]
    fn stop_cancels_only_that_tracker() {
        let registry = ActiveRegistry::new();
        let a = registry.try_register("a").unwrap();
        let b = registry.try_register("b").unwrap();

        assert!(registry.stop("a"));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!registry.is_active("a"));
        assert!(!registry.stop("a"));
    }

    #[tokio::test]
    async fn shutdown_cancels_everyone_and_closes_the_door() {
        let registry = ActiveRegistry::new();
        let reg = registry.try_register("a").unwrap();

        registry.shutdown();
        reg.cancelled().await;
        assert!(registry.try_register("b").is_none());
        assert!(registry.shutdown_token().is_cancelled());
        assert_eq!(registry.len(), 1);
    }
}
