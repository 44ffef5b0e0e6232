//! Configuration management for the monitor client

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base URL of the backend API, including the `/api` prefix
    pub api_base_url: String,

    /// Poll period for machine state and today's summary
    pub state_poll_interval: Duration,

    /// Poll period for active downtime, per-reason summary and top list
    pub downtime_poll_interval: Duration,

    /// Wall clock refresh period
    pub clock_tick_interval: Duration,

    /// Live downtime duration refresh period
    pub live_duration_interval: Duration,

    /// HTTP timeout for backend requests
    pub http_timeout: Duration,

    /// Scheduled work hours per day, denominator for availability
    pub total_work_hours: f64,

    /// Maximum number of points kept in the availability chart
    pub chart_capacity: usize,

    /// Append a new chart point every N state polls
    pub chart_append_every: u32,

    /// Directory exported reports are written to
    pub export_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            state_poll_interval: Duration::from_millis(2000),
            downtime_poll_interval: Duration::from_millis(5000),
            clock_tick_interval: Duration::from_millis(1000),
            live_duration_interval: Duration::from_millis(1000),
            http_timeout: Duration::from_secs(10),
            total_work_hours: 7.5,
            chart_capacity: 20,
            chart_append_every: 30,
            export_dir: PathBuf::from("."),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = MonitorConfig::default();

        if let Ok(url) = env::var("GUARD_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(ms) = parse_var::<u64>("GUARD_STATE_POLL_MS") {
            config.state_poll_interval = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>("GUARD_DOWNTIME_POLL_MS") {
            config.downtime_poll_interval = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>("GUARD_CLOCK_TICK_MS") {
            config.clock_tick_interval = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>("GUARD_LIVE_DURATION_TICK_MS") {
            config.live_duration_interval = Duration::from_millis(ms);
        }

        if let Some(seconds) = parse_var::<u64>("GUARD_HTTP_TIMEOUT_SECONDS") {
            config.http_timeout = Duration::from_secs(seconds);
        }

        if let Some(hours) = parse_var::<f64>("GUARD_TOTAL_WORK_HOURS") {
            config.total_work_hours = hours;
        }

        if let Some(capacity) = parse_var::<usize>("GUARD_CHART_CAPACITY") {
            config.chart_capacity = capacity;
        }

        if let Some(every) = parse_var::<u32>("GUARD_CHART_APPEND_EVERY") {
            config.chart_append_every = every;
        }

        if let Ok(dir) = env::var("GUARD_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }

        config
    }

    /// Total scheduled seconds per day
    pub fn total_work_seconds(&self) -> f64 {
        self.total_work_hours * 3600.0
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.is_empty() {
            return Err("api_base_url cannot be empty".to_string());
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            ));
        }

        for (name, interval) in [
            ("state_poll_interval", self.state_poll_interval),
            ("downtime_poll_interval", self.downtime_poll_interval),
            ("clock_tick_interval", self.clock_tick_interval),
            ("live_duration_interval", self.live_duration_interval),
            ("http_timeout", self.http_timeout),
        ] {
            if interval.is_zero() {
                return Err(format!("{} must be greater than 0", name));
            }
        }

        if self.total_work_hours.is_nan() || self.total_work_hours <= 0.0 {
            return Err("total_work_hours must be greater than 0".to_string());
        }

        if self.chart_capacity == 0 {
            return Err("chart_capacity must be greater than 0".to_string());
        }

        if self.chart_append_every == 0 {
            return Err("chart_append_every must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}
