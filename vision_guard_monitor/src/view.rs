//! Point-in-time dashboard view and its text rendering

use crate::buffer::ChartPoint;
use crate::downtime::DowntimeState;
use crate::machine::Connectivity;
use crate::metrics::{format_duration, DashboardMetrics};
use crate::models::MachineState;
use chrono::{DateTime, Local};
use std::fmt;

const BAR_WIDTH: usize = 20;

/// Everything the dashboard shows at one instant
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub clock: DateTime<Local>,
    pub loading: bool,
    pub machine_state: Option<MachineState>,
    pub current_cycle: Option<u64>,
    pub connectivity: Connectivity,
    pub metrics: DashboardMetrics,
    pub chart: Vec<ChartPoint>,
    pub downtime: DowntimeState,
}

impl DashboardSnapshot {
    /// Machine state label; `INIT` until the first state arrives.
    pub fn state_label(&self) -> String {
        match &self.machine_state {
            Some(state) => state.to_string(),
            None => "INIT".to_string(),
        }
    }
}

/// Render a percentage as a fixed-width bar.
pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

impl fmt::Display for DashboardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;

        writeln!(
            f,
            "{}  {}    API: {}",
            self.clock.format("%d %b %Y"),
            self.clock.format("%H:%M:%S"),
            self.connectivity
        )?;
        if self.loading {
            writeln!(f, "Loading...")?;
        }

        let cycle = self
            .current_cycle
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(f, "Machine: {:<12} Cycle: {}", self.state_label(), cycle)?;

        writeln!(
            f,
            "Runtime      {} ({:.1} h) {}",
            format_duration(m.runtime_sec as i64),
            m.runtime_hours,
            progress_bar(m.runtime_bar)
        )?;
        writeln!(
            f,
            "Downtime     {} ({:.1} h) {}",
            format_duration(m.downtime_sec as i64),
            m.downtime_hours,
            progress_bar(m.downtime_bar)
        )?;
        writeln!(
            f,
            "Availability {:.1}%              {}",
            m.availability,
            progress_bar(m.availability_bar)
        )?;

        match self.downtime.current_record() {
            Some(record) => writeln!(
                f,
                "Downtime active: {} since {} ({})",
                record.downtime_reason.label(),
                record.start_time.with_timezone(&Local).format("%H:%M:%S"),
                format_duration(self.downtime.current_duration() as i64)
            )?,
            None => writeln!(f, "Downtime: idle")?,
        }

        let entries = self.downtime.summary().entries();
        if !entries.is_empty() {
            writeln!(f, "Downtime by reason:")?;
            for (reason, secs) in entries {
                writeln!(f, "  {:<24} {}", reason.label(), format_duration(secs as i64))?;
            }
        }

        let top = self.downtime.top();
        if !top.is_empty() {
            writeln!(f, "Top downtimes today:")?;
            for (rank, log) in top.iter().enumerate() {
                writeln!(
                    f,
                    "  {}. {:<24} {}",
                    rank + 1,
                    log.downtime_reason.label(),
                    format_duration(log.duration_sec.unwrap_or(0) as i64)
                )?;
            }
        }

        if let Some(last) = self.chart.last() {
            write!(
                f,
                "Chart: {} points, last {} = {:.1}%",
                self.chart.len(),
                last.time,
                last.availability
            )?;
        }

        Ok(())
    }
}
