use std::env;
use std::time::Duration;

/// Runtime settings. Every timing has the production default and an env override.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub db_path: String,
    pub log_dir: String,
    /// Where the queue-management API lives (used for delayed queue deletion).
    pub api_base_url: String,
    pub api_bind: String,

    pub scheduler_interval: Duration,
    pub non_live_rotation_delay: Duration,
    pub live_poll_interval: Duration,
    pub map_reset_poll_interval: Duration,
    /// Map-win announcement → match-win announcement.
    pub match_win_delay: Duration,
    /// Match-win announcement → tracker deregistration.
    pub cleanup_delay: Duration,
    /// Deregistration → queue entry deletion.
    pub queue_delete_delay: Duration,

    pub sample_timeout: Duration,
    pub page_load_timeout: Duration,
    pub max_consecutive_errors: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: "data/cs_match_tracker.db".to_string(),
            log_dir: "logs".to_string(),
            api_base_url: "http://127.0.0.1:3000".to_string(),
            api_bind: "127.0.0.1:3000".to_string(),
            scheduler_interval: Duration::from_secs(30),
            non_live_rotation_delay: Duration::from_secs(5),
            live_poll_interval: Duration::from_secs(5),
            map_reset_poll_interval: Duration::from_secs(3),
            match_win_delay: Duration::from_secs(2),
            cleanup_delay: Duration::from_secs(20),
            queue_delete_delay: Duration::from_secs(40),
            sample_timeout: Duration::from_secs(15),
            page_load_timeout: Duration::from_secs(60),
            max_consecutive_errors: 10,
        }
    }
}

impl TrackerConfig {
    /// Reads overrides from the environment (call `dotenv()` first).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            db_path: env_string("TRACKER_DB_PATH", d.db_path),
            log_dir: env_string("TRACKER_LOG_DIR", d.log_dir),
            api_base_url: env_string("TRACKER_API_BASE", d.api_base_url),
            api_bind: env_string("TRACKER_API_BIND", d.api_bind),
            scheduler_interval: env_secs("SCHEDULER_INTERVAL_SECS", d.scheduler_interval),
            non_live_rotation_delay: env_secs("NONLIVE_ROTATE_DELAY_SECS", d.non_live_rotation_delay),
            live_poll_interval: env_secs("LIVE_POLL_INTERVAL_SECS", d.live_poll_interval),
            map_reset_poll_interval: env_secs("MAP_RESET_POLL_INTERVAL_SECS", d.map_reset_poll_interval),
            match_win_delay: env_secs("MATCH_WIN_DELAY_SECS", d.match_win_delay),
            cleanup_delay: env_secs("CLEANUP_DELAY_SECS", d.cleanup_delay),
            queue_delete_delay: env_secs("QUEUE_DELETE_DELAY_SECS", d.queue_delete_delay),
            sample_timeout: env_secs("SAMPLE_TIMEOUT_SECS", d.sample_timeout),
            page_load_timeout: env_secs("PAGE_LOAD_TIMEOUT_SECS", d.page_load_timeout),
            max_consecutive_errors: env::var("TRACKER_MAX_CONSECUTIVE_ERRORS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(d.max_consecutive_errors),
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_timings() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.scheduler_interval, Duration::from_secs(30));
        assert_eq!(cfg.non_live_rotation_delay, Duration::from_secs(5));
        assert_eq!(cfg.live_poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.map_reset_poll_interval, Duration::from_secs(3));
        assert_eq!(
            cfg.match_win_delay + cfg.cleanup_delay + cfg.queue_delete_delay,
            Duration::from_secs(62)
        );
        assert_eq!(cfg.cleanup_delay + cfg.queue_delete_delay, Duration::from_secs(60));
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        env::set_var("CLEANUP_DELAY_SECS", "7");
        env::set_var("QUEUE_DELETE_DELAY_SECS", "soon");
        let cfg = TrackerConfig::from_env();
        env::remove_var("CLEANUP_DELAY_SECS");
        env::remove_var("QUEUE_DELETE_DELAY_SECS");

        assert_eq!(cfg.cleanup_delay, Duration::from_secs(7));
        assert_eq!(cfg.queue_delete_delay, Duration::from_secs(40));
    }
}
