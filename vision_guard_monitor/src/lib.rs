//! Vision Guard Monitor Library
//!
//! Client-side core of the Spark Vision Guard dashboard: keeps local views of
//! machine state, daily summaries and downtime sessions synchronized with the
//! backend API, and derives the metrics and reports shown to operators.

pub mod buffer;
pub mod config;
pub mod downtime;
pub mod errors;
pub mod export;
pub mod machine;
pub mod metrics;
pub mod models;
pub mod synchronizer;
pub mod timer;
pub mod transport;
pub mod view;

#[cfg(test)]
mod testing;

pub use config::MonitorConfig;
pub use downtime::{DowntimePanel, DowntimeSession, DowntimeState, Tracked};
pub use errors::{MonitorError, Result};
pub use export::{save_report, ExportRequest, ReportScope};
pub use machine::{Connectivity, MachineMonitor};
pub use metrics::{format_duration, DashboardMetrics};
pub use models::{DowntimeLog, DowntimeReason, MachineState, ReasonCode};
pub use synchronizer::Synchronizer;
pub use transport::{DashboardApi, HttpTransport};
pub use view::DashboardSnapshot;
