//! Derived view metrics and duration formatting

use crate::models::{DailySummary, StateResponse};

/// Format seconds as `HH:MM:SS`.
///
/// Hours are not wrapped at 24; zero and negative inputs render as
/// `00:00:00`.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "00:00:00".to_string();
    }
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamp a percentage into [0, 100], e.g. for a progress-bar width.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Seconds as hours, rounded to one decimal.
pub fn hours(seconds: u64) -> f64 {
    round1(seconds as f64 / 3600.0)
}

/// Availability in percent, rounded to one decimal.
///
/// The backend figure always wins; the runtime ratio is only a fallback
/// for backends that do not report one.
pub fn availability(backend: Option<f64>, runtime_sec: u64, total_work_seconds: f64) -> f64 {
    match backend {
        Some(value) => round1(value),
        None if total_work_seconds > 0.0 => round1(runtime_sec as f64 / total_work_seconds * 100.0),
        None => 0.0,
    }
}

/// Client-computed figures behind the KPI cards. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    pub runtime_sec: u64,
    pub downtime_sec: u64,
    pub availability: f64,
    pub runtime_hours: f64,
    pub downtime_hours: f64,
    pub runtime_bar: f64,
    pub downtime_bar: f64,
    pub availability_bar: f64,
}

impl DashboardMetrics {
    pub fn derive(
        state: Option<&StateResponse>,
        summary: Option<&DailySummary>,
        total_work_seconds: f64,
    ) -> Self {
        let runtime_sec = state.map(|s| s.today_runtime_sec).unwrap_or(0);
        let downtime_sec = summary.map(|s| s.total_downtime_sec).unwrap_or(0);
        let availability = availability(
            summary.and_then(|s| s.availability),
            runtime_sec,
            total_work_seconds,
        );

        let share = |secs: u64| {
            if total_work_seconds > 0.0 {
                clamp_percent(secs as f64 / total_work_seconds * 100.0)
            } else {
                0.0
            }
        };

        Self {
            runtime_sec,
            downtime_sec,
            availability,
            runtime_hours: hours(runtime_sec),
            downtime_hours: hours(downtime_sec),
            runtime_bar: share(runtime_sec),
            downtime_bar: share(downtime_sec),
            availability_bar: clamp_percent(availability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3725), "01:02:05");
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(-5), "00:00:00");
        assert_eq!(format_duration(90_000), "25:00:00");
    }

    #[test]
    fn test_fallback_availability() {
        assert_eq!(availability(None, 27000, 7.5 * 3600.0), 100.0);
        assert_eq!(availability(None, 13500, 27000.0), 50.0);
        assert_eq!(availability(None, 100, 0.0), 0.0);
    }

    #[test]
    fn test_backend_availability_takes_precedence() {
        assert_eq!(availability(Some(62.3), 27000, 27000.0), 62.3);
        assert_eq!(availability(Some(62.34), 0, 27000.0), 62.3);
    }

    #[test]
    fn test_derived_metrics() {
        let state = StateResponse {
            today_runtime_sec: 5400,
            ..Default::default()
        };
        let summary = DailySummary {
            total_downtime_sec: 40_000,
            availability: Some(120.0),
            ..Default::default()
        };

        let metrics = DashboardMetrics::derive(Some(&state), Some(&summary), 27000.0);
        assert_eq!(metrics.runtime_hours, 1.5);
        assert_eq!(metrics.downtime_hours, 11.1);
        assert!((metrics.runtime_bar - 20.0).abs() < 1e-9);
        assert_eq!(metrics.downtime_bar, 100.0);
        assert_eq!(metrics.availability, 120.0);
        assert_eq!(metrics.availability_bar, 100.0);
    }

    #[test]
    fn test_metrics_before_first_poll() {
        let metrics = DashboardMetrics::derive(None, None, 27000.0);
        assert_eq!(metrics.availability, 0.0);
        assert_eq!(metrics.runtime_sec, 0);
        assert_eq!(metrics.downtime_bar, 0.0);
    }
}
