//! In-memory backend used by unit tests

use crate::errors::{MonitorError, Result};
use crate::export::ExportRequest;
use crate::models::{
    ActiveDowntimeStatus, CycleRecord, DailySummary, DowntimeLog, DowntimeSummary, HistoryQuery,
    ReasonCode, StateResponse,
};
use crate::transport::DashboardApi;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub enum Failure {
    Network,
    Status(u16, Option<&'static str>),
    Malformed,
}

impl Failure {
    fn to_error(self) -> MonitorError {
        match self {
            Failure::Network => MonitorError::Network("connection refused".to_string()),
            Failure::Status(status, detail) => MonitorError::Api {
                status,
                detail: detail.map(str::to_string),
            },
            Failure::Malformed => MonitorError::MalformedResponse("unexpected shape".to_string()),
        }
    }
}

#[derive(Default)]
struct Failures {
    state: Option<Failure>,
    today_summary: Option<Failure>,
    active: Option<Failure>,
    downtime_summary: Option<Failure>,
    top: Option<Failure>,
    start: Option<Failure>,
    stop: Option<Failure>,
    export: Option<Failure>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<StateResponse>,
    today_summary: Mutex<DailySummary>,
    active: Mutex<ActiveDowntimeStatus>,
    downtime_summary: Mutex<DowntimeSummary>,
    top: Mutex<Vec<DowntimeLog>>,
    report: Mutex<Vec<u8>>,
    failures: Mutex<Failures>,
    delay: Mutex<Option<Duration>>,
    start_calls: AtomicU32,
    stop_calls: AtomicU32,
    export_calls: AtomicU32,
    last_start_reason: Mutex<Option<String>>,
}

fn check(failure: Option<Failure>) -> Result<()> {
    match failure {
        Some(failure) => Err(failure.to_error()),
        None => Ok(()),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, state: StateResponse) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_today_summary(&self, summary: DailySummary) {
        *self.today_summary.lock().unwrap() = summary;
    }

    pub fn set_active(&self, status: ActiveDowntimeStatus) {
        *self.active.lock().unwrap() = status;
    }

    pub fn set_downtime_summary(&self, summary: DowntimeSummary) {
        *self.downtime_summary.lock().unwrap() = summary;
    }

    pub fn set_top(&self, top: Vec<DowntimeLog>) {
        *self.top.lock().unwrap() = top;
    }

    /// Hold every response back by `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn respond_later(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn set_report(&self, bytes: Vec<u8>) {
        *self.report.lock().unwrap() = bytes;
    }

    pub fn fail_state(&self, failure: Failure) {
        self.failures.lock().unwrap().state = Some(failure);
    }

    pub fn fail_today_summary(&self, failure: Failure) {
        self.failures.lock().unwrap().today_summary = Some(failure);
    }

    pub fn fail_active(&self, failure: Failure) {
        self.failures.lock().unwrap().active = Some(failure);
    }

    pub fn fail_downtime_summary(&self, failure: Failure) {
        self.failures.lock().unwrap().downtime_summary = Some(failure);
    }

    pub fn fail_top(&self, failure: Failure) {
        self.failures.lock().unwrap().top = Some(failure);
    }

    pub fn fail_start(&self, failure: Failure) {
        self.failures.lock().unwrap().start = Some(failure);
    }

    pub fn fail_stop(&self, failure: Failure) {
        self.failures.lock().unwrap().stop = Some(failure);
    }

    pub fn fail_export(&self, failure: Failure) {
        self.failures.lock().unwrap().export = Some(failure);
    }

    pub fn clear_failures(&self) {
        *self.failures.lock().unwrap() = Failures::default();
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn export_calls(&self) -> u32 {
        self.export_calls.load(Ordering::SeqCst)
    }

    pub fn last_start_reason(&self) -> Option<String> {
        self.last_start_reason.lock().unwrap().clone()
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch_state(&self) -> Result<StateResponse> {
        self.respond_later().await;
        check(self.failures.lock().unwrap().state)?;
        Ok(self.state.lock().unwrap().clone())
    }

    async fn fetch_today_summary(&self) -> Result<DailySummary> {
        self.respond_later().await;
        check(self.failures.lock().unwrap().today_summary)?;
        Ok(self.today_summary.lock().unwrap().clone())
    }

    async fn fetch_active_downtime(&self) -> Result<ActiveDowntimeStatus> {
        self.respond_later().await;
        check(self.failures.lock().unwrap().active)?;
        Ok(self.active.lock().unwrap().clone())
    }

    async fn fetch_downtime_summary(&self) -> Result<DowntimeSummary> {
        self.respond_later().await;
        check(self.failures.lock().unwrap().downtime_summary)?;
        Ok(self.downtime_summary.lock().unwrap().clone())
    }

    async fn fetch_top_downtimes(&self) -> Result<Vec<DowntimeLog>> {
        self.respond_later().await;
        check(self.failures.lock().unwrap().top)?;
        Ok(self.top.lock().unwrap().clone())
    }

    async fn start_downtime(&self, reason: &ReasonCode) -> Result<()> {
        self.respond_later().await;
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        check(self.failures.lock().unwrap().start)?;
        *self.last_start_reason.lock().unwrap() = Some(reason.as_str().to_string());
        Ok(())
    }

    async fn stop_downtime(&self) -> Result<()> {
        self.respond_later().await;
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        check(self.failures.lock().unwrap().stop)
    }

    async fn export_report(&self, _request: &ExportRequest) -> Result<Vec<u8>> {
        self.respond_later().await;
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        check(self.failures.lock().unwrap().export)?;
        Ok(self.report.lock().unwrap().clone())
    }

    async fn fetch_summary_for(&self, _date: NaiveDate) -> Result<Option<DailySummary>> {
        Ok(Some(self.today_summary.lock().unwrap().clone()))
    }

    async fn fetch_cycles(&self, _date: NaiveDate) -> Result<Vec<CycleRecord>> {
        Ok(Vec::new())
    }

    async fn fetch_downtime_history(&self, _query: &HistoryQuery) -> Result<Vec<DowntimeLog>> {
        Ok(self.top.lock().unwrap().clone())
    }
}
