//! HTTP transport layer for talking to the machine backend

use crate::config::MonitorConfig;
use crate::errors::{MonitorError, Result};
use crate::export::ExportRequest;
use crate::models::{
    ActiveDowntimeStatus, CycleRecord, DailySummary, DowntimeLog, DowntimeSummary, HistoryQuery,
    ReasonCode, StartDowntimeRequest, StateResponse,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Backend operations the monitor depends on.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_state(&self) -> Result<StateResponse>;
    async fn fetch_today_summary(&self) -> Result<DailySummary>;
    async fn fetch_active_downtime(&self) -> Result<ActiveDowntimeStatus>;
    async fn fetch_downtime_summary(&self) -> Result<DowntimeSummary>;
    async fn fetch_top_downtimes(&self) -> Result<Vec<DowntimeLog>>;
    async fn start_downtime(&self, reason: &ReasonCode) -> Result<()>;
    async fn stop_downtime(&self) -> Result<()>;
    async fn export_report(&self, request: &ExportRequest) -> Result<Vec<u8>>;

    /// Summary for a past day; `None` when the backend has no data.
    async fn fetch_summary_for(&self, date: NaiveDate) -> Result<Option<DailySummary>>;
    async fn fetch_cycles(&self, date: NaiveDate) -> Result<Vec<CycleRecord>>;
    async fn fetch_downtime_history(&self, query: &HistoryQuery) -> Result<Vec<DowntimeLog>>;

    async fn metrics(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot::default()
    }
}

/// reqwest-backed implementation of [`DashboardApi`]
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
    metrics: TransportMetrics,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(base_url: String, http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("vision_guard_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: http_timeout,
            metrics: TransportMetrics::new(),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request, recording metrics and mapping failures onto
    /// [`MonitorError`]. Non-success statuses become `Api` errors.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let start_time = Instant::now();
        self.metrics.increment_attempts().await;

        let outcome = match timeout(self.timeout, request.send()).await {
            Err(_) => Err(MonitorError::Network(format!("{} timed out", what))),
            Ok(Err(e)) => Err(MonitorError::from(e)),
            Ok(Ok(response)) => self.handle_response(response, what).await,
        };

        match &outcome {
            Ok(_) => self.metrics.record_success(start_time.elapsed()).await,
            Err(_) => self.metrics.record_failure(start_time.elapsed()).await,
        }

        outcome
    }

    async fn handle_response(&self, response: Response, what: &str) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            debug!("{} succeeded with {}", what, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(MonitorError::from_response(status.as_u16(), &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.client.get(self.url(path)).query(query);
        let response = self.send(request, path).await?;
        decode(response, path).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response.text().await.map_err(MonitorError::from)?;
    serde_json::from_str(&body)
        .map_err(|e| MonitorError::MalformedResponse(format!("{}: {}", what, e)))
}

#[async_trait]
impl DashboardApi for HttpTransport {
    async fn fetch_state(&self) -> Result<StateResponse> {
        self.get_json("state", &[]).await
    }

    async fn fetch_today_summary(&self) -> Result<DailySummary> {
        self.get_json("summary/today", &[]).await
    }

    async fn fetch_active_downtime(&self) -> Result<ActiveDowntimeStatus> {
        self.get_json("downtime/active", &[]).await
    }

    async fn fetch_downtime_summary(&self) -> Result<DowntimeSummary> {
        self.get_json("downtime/summary/today", &[]).await
    }

    async fn fetch_top_downtimes(&self) -> Result<Vec<DowntimeLog>> {
        self.get_json("downtime/top-today", &[]).await
    }

    async fn start_downtime(&self, reason: &ReasonCode) -> Result<()> {
        let body = StartDowntimeRequest {
            downtime_reason: reason.as_str().to_string(),
        };
        let request = self.client.post(self.url("downtime/start")).json(&body);
        self.send(request, "downtime/start").await?;
        info!("Downtime started with reason {}", reason);
        Ok(())
    }

    async fn stop_downtime(&self) -> Result<()> {
        let request = self.client.post(self.url("downtime/stop"));
        self.send(request, "downtime/stop").await?;
        info!("Downtime stopped");
        Ok(())
    }

    async fn export_report(&self, request: &ExportRequest) -> Result<Vec<u8>> {
        let http_request = self
            .client
            .get(self.url("downtime/export"))
            .query(&request.query_pairs());
        let response = self.send(http_request, "downtime/export").await?;

        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.starts_with(crate::export::XLSX_CONTENT_TYPE) {
                warn!("Export returned unexpected content type {}", content_type);
            }
        }

        let bytes = response.bytes().await.map_err(MonitorError::from)?;
        Ok(bytes.to_vec())
    }

    async fn fetch_summary_for(&self, date: NaiveDate) -> Result<Option<DailySummary>> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        match self.get_json("summary", &query).await {
            Ok(summary) => Ok(Some(summary)),
            Err(MonitorError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_cycles(&self, date: NaiveDate) -> Result<Vec<CycleRecord>> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        self.get_json("cycles", &query).await
    }

    async fn fetch_downtime_history(&self, query: &HistoryQuery) -> Result<Vec<DowntimeLog>> {
        self.get_json("downtime/history", &query.to_query_pairs()).await
    }

    async fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot().await
    }
}

/// Request metrics tracking
#[derive(Debug)]
struct TransportMetrics {
    inner: RwLock<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    attempts: u64,
    successes: u64,
    failures: u64,
    total_duration: Duration,
    max_duration: Option<Duration>,
}

impl TransportMetrics {
    fn new() -> Self {
        Self {
            inner: RwLock::new(MetricsInner::default()),
        }
    }

    async fn increment_attempts(&self) {
        self.inner.write().await.attempts += 1;
    }

    async fn record_success(&self, duration: Duration) {
        let mut inner = self.inner.write().await;
        inner.successes += 1;
        inner.record_duration(duration);
    }

    async fn record_failure(&self, duration: Duration) {
        let mut inner = self.inner.write().await;
        inner.failures += 1;
        inner.record_duration(duration);
    }

    async fn snapshot(&self) -> TransportMetricsSnapshot {
        let inner = self.inner.read().await;

        let success_rate = if inner.attempts > 0 {
            (inner.successes as f64 / inner.attempts as f64) * 100.0
        } else {
            0.0
        };

        let avg_duration = if inner.attempts > 0 {
            inner.total_duration / inner.attempts as u32
        } else {
            Duration::ZERO
        };

        TransportMetricsSnapshot {
            attempts: inner.attempts,
            successes: inner.successes,
            failures: inner.failures,
            success_rate,
            avg_duration_ms: avg_duration.as_millis() as u64,
            max_duration_ms: inner.max_duration.map(|d| d.as_millis() as u64),
        }
    }
}

impl MetricsInner {
    fn record_duration(&mut self, duration: Duration) {
        self.total_duration += duration;
        self.max_duration = Some(self.max_duration.map_or(duration, |m| m.max(duration)));
    }
}

/// Snapshot of request metrics
#[derive(Debug, Clone, Default)]
pub struct TransportMetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f64,
    pub avg_duration_ms: u64,
    pub max_duration_ms: Option<u64>,
}
