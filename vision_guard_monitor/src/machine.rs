//! Machine state / daily summary view and the availability chart

use crate::buffer::{ChartBuffer, ChartPoint};
use crate::errors::{log_poll_error, Result};
use crate::metrics::DashboardMetrics;
use crate::models::{DailySummary, MachineState, StateResponse};
use chrono::{DateTime, Local};
use tracing::{debug, info};

/// Degraded-connectivity indicator shown next to the camera/API status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Active,
    Error,
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Active => write!(f, "ACTIVE"),
            Connectivity::Error => write!(f, "ERROR"),
        }
    }
}

/// Latest machine readings plus the chart history derived from them
#[derive(Debug, Clone)]
pub struct MachineMonitor {
    state: Option<StateResponse>,
    summary: Option<DailySummary>,
    chart: ChartBuffer,
    connectivity: Connectivity,
    loading: bool,
    total_work_seconds: f64,
    append_every: u32,
    polls_since_append: u32,
    state_seq: u64,
    summary_seq: u64,
}

impl MachineMonitor {
    pub fn new(total_work_seconds: f64, chart_capacity: usize, append_every: u32) -> Self {
        Self {
            state: None,
            summary: None,
            chart: ChartBuffer::seeded(chart_capacity),
            connectivity: Connectivity::Active,
            loading: true,
            total_work_seconds,
            append_every: append_every.max(1),
            polls_since_append: 0,
            state_seq: 0,
            summary_seq: 0,
        }
    }

    pub fn state(&self) -> Option<&StateResponse> {
        self.state.as_ref()
    }

    pub fn summary(&self) -> Option<&DailySummary> {
        self.summary.as_ref()
    }

    pub fn machine_state(&self) -> Option<MachineState> {
        self.state.as_ref().map(StateResponse::machine_state)
    }

    pub fn chart(&self) -> &ChartBuffer {
        &self.chart
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// True until the first poll has completed, successfully or not
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn metrics(&self) -> DashboardMetrics {
        DashboardMetrics::derive(
            self.state.as_ref(),
            self.summary.as_ref(),
            self.total_work_seconds,
        )
    }

    /// Apply one poll's results. Each read lands independently; a failed
    /// read leaves its slice untouched and marks connectivity degraded.
    ///
    /// Results from a poll issued before an already-applied one are
    /// discarded slice by slice.
    pub fn apply_poll(
        &mut self,
        seq: u64,
        state: Result<StateResponse>,
        summary: Result<DailySummary>,
        now: DateTime<Local>,
    ) -> bool {
        let mut all_ok = true;
        let mut changed = false;

        match state {
            Ok(state) if seq >= self.state_seq => {
                let previous = self.machine_state();
                let current = state.machine_state();
                if previous.as_ref() != Some(&current) {
                    info!("Machine state is now {}", current);
                }
                self.state_seq = seq;
                self.state = Some(state);
                changed = true;
            }
            Ok(_) => debug!("Discarded stale machine state from poll {}", seq),
            Err(e) => {
                all_ok = false;
                log_poll_error("machine state", &e);
            }
        }

        match summary {
            Ok(summary) if seq >= self.summary_seq => {
                self.summary_seq = seq;
                self.summary = Some(summary);
                changed = true;
            }
            Ok(_) => debug!("Discarded stale summary from poll {}", seq),
            Err(e) => {
                all_ok = false;
                log_poll_error("today summary", &e);
            }
        }

        self.loading = false;
        self.connectivity = if all_ok {
            Connectivity::Active
        } else {
            Connectivity::Error
        };

        if changed {
            self.update_chart(now);
        }

        all_ok
    }

    fn update_chart(&mut self, now: DateTime<Local>) {
        let availability = self.metrics().availability;

        self.polls_since_append += 1;
        if self.polls_since_append >= self.append_every {
            self.polls_since_append = 0;
            self.chart.push(ChartPoint {
                time: now.format("%H:%M:%S").to_string(),
                availability,
            });
        } else {
            self.chart.patch_last(availability);
        }
    }
}
