//! Downtime session control.
//!
//! [`DowntimeState`] is the plain state machine:
//!
//! ```text
//!            start(reason) ok                 reconcile(active)
//!   Idle ─────────────────────► Active(Pending) ─────────────► Active(Confirmed)
//!    ▲                               │                               │
//!    │     stop ok / reconcile(idle) │                               │
//!    └───────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Start is refused locally while a session is known to be active or an
//! action is already in flight. Every downtime poll overwrites the session
//! with the backend snapshot, so an optimistic `Pending` record never
//! outlives the next successful poll.
//!
//! [`DowntimePanel`] wraps the state with the backend client, the poll
//! sequence guard and the one-second live-duration timer.

use crate::errors::{log_poll_error, MonitorError, Result};
use crate::models::{
    ActiveDowntimeStatus, DowntimeLog, DowntimeReason, DowntimeSummary, ReasonCode,
};
use crate::timer::TimerGuard;
use crate::transport::DashboardApi;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub const ALREADY_ACTIVE_MSG: &str = "มี downtime ที่กำลังดำเนินการอยู่แล้ว กรุณาหยุดก่อน";
pub const START_FAILED_MSG: &str = "เกิดข้อผิดพลาดในการเริ่ม downtime";
pub const STOP_FAILED_MSG: &str = "เกิดข้อผิดพลาดในการหยุด downtime";
pub const BUSY_MSG: &str = "another downtime action is still in progress";

/// How well the client knows the active record.
#[derive(Clone, Debug, PartialEq)]
pub enum Tracked {
    /// Record as last reported by the backend
    Confirmed(DowntimeLog),
    /// Locally synthesized after a successful start, awaiting the next poll
    Pending {
        provisional: DowntimeLog,
        issued_at: DateTime<Utc>,
    },
}

impl Tracked {
    pub fn record(&self) -> &DowntimeLog {
        match self {
            Tracked::Confirmed(log) => log,
            Tracked::Pending { provisional, .. } => provisional,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Tracked::Pending { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DowntimeSession {
    Idle,
    Active(Tracked),
}

/// Downtime panel view state
#[derive(Clone, Debug)]
pub struct DowntimeState {
    session: DowntimeSession,
    summary: DowntimeSummary,
    top: Vec<DowntimeLog>,
    current_duration: u64,
    busy: bool,
    degraded: bool,
    last_error: Option<String>,
    status_seq: u64,
    summary_seq: u64,
    top_seq: u64,
}

impl Default for DowntimeState {
    fn default() -> Self {
        Self::new()
    }
}

impl DowntimeState {
    pub fn new() -> Self {
        Self {
            session: DowntimeSession::Idle,
            summary: DowntimeSummary::default(),
            top: Vec::new(),
            current_duration: 0,
            busy: false,
            degraded: false,
            last_error: None,
            status_seq: 0,
            summary_seq: 0,
            top_seq: 0,
        }
    }

    pub fn session(&self) -> &DowntimeSession {
        &self.session
    }

    pub fn is_active(&self) -> bool {
        matches!(self.session, DowntimeSession::Active(_))
    }

    pub fn current_record(&self) -> Option<&DowntimeLog> {
        match &self.session {
            DowntimeSession::Active(tracked) => Some(tracked.record()),
            DowntimeSession::Idle => None,
        }
    }

    /// Live duration in whole seconds; zero while idle.
    pub fn current_duration(&self) -> u64 {
        self.current_duration
    }

    pub fn summary(&self) -> &DowntimeSummary {
        &self.summary
    }

    pub fn top(&self) -> &[DowntimeLog] {
        &self.top
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Preconditions for sending a start command.
    pub fn check_can_start(&self) -> Result<()> {
        if self.is_active() {
            return Err(MonitorError::Rejected(ALREADY_ACTIVE_MSG.to_string()));
        }
        if self.busy {
            return Err(MonitorError::Rejected(BUSY_MSG.to_string()));
        }
        Ok(())
    }

    /// Preconditions for sending a stop command. `Ok(false)` means there
    /// is nothing to stop.
    pub fn check_can_stop(&self) -> Result<bool> {
        if !self.is_active() {
            return Ok(false);
        }
        if self.busy {
            return Err(MonitorError::Rejected(BUSY_MSG.to_string()));
        }
        Ok(true)
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    /// Optimistically open a session after the backend accepted a start.
    pub fn apply_started(&mut self, reason: ReasonCode, now: DateTime<Utc>, seq: u64) {
        self.session = DowntimeSession::Active(Tracked::Pending {
            provisional: DowntimeLog::provisional(reason, now),
            issued_at: now,
        });
        self.current_duration = 0;
        self.status_seq = self.status_seq.max(seq);
    }

    /// Optimistically close the session after the backend accepted a stop.
    pub fn apply_stopped(&mut self, seq: u64) {
        self.session = DowntimeSession::Idle;
        self.current_duration = 0;
        self.status_seq = self.status_seq.max(seq);
    }

    /// Overwrite the session with an authoritative snapshot.
    ///
    /// Returns false when the snapshot was requested before the last
    /// applied change and has been discarded.
    pub fn apply_status(&mut self, seq: u64, status: &ActiveDowntimeStatus) -> bool {
        if seq < self.status_seq {
            return false;
        }
        self.status_seq = seq;

        match status.active_record() {
            Some(log) => {
                let replacing_pending = matches!(
                    &self.session,
                    DowntimeSession::Active(tracked) if tracked.is_pending()
                );
                if replacing_pending {
                    debug!("Provisional downtime replaced by backend record {}", log.id);
                }
                self.session = DowntimeSession::Active(Tracked::Confirmed(log.clone()));
            }
            None => {
                if self.is_active() {
                    info!("Backend reports no active downtime, closing local session");
                }
                self.session = DowntimeSession::Idle;
                self.current_duration = 0;
            }
        }
        true
    }

    pub fn apply_summary(&mut self, seq: u64, summary: DowntimeSummary) -> bool {
        if seq < self.summary_seq {
            return false;
        }
        self.summary_seq = seq;
        self.summary = summary;
        true
    }

    pub fn apply_top(&mut self, seq: u64, top: Vec<DowntimeLog>) -> bool {
        if seq < self.top_seq {
            return false;
        }
        self.top_seq = seq;
        self.top = top;
        true
    }

    /// Recompute the live duration against `now`.
    pub fn refresh_duration(&mut self, now: DateTime<Utc>) {
        self.current_duration = match self.current_record() {
            Some(record) => record.elapsed_secs(now),
            None => 0,
        };
    }
}

/// Downtime controller bound to a backend
pub struct DowntimePanel {
    api: Arc<dyn DashboardApi>,
    state: Arc<RwLock<DowntimeState>>,
    seq: AtomicU64,
    live_period: Duration,
    live_timer: Mutex<Option<TimerGuard>>,
    torn_down: AtomicBool,
}

impl DowntimePanel {
    pub fn new(api: Arc<dyn DashboardApi>, live_period: Duration) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(DowntimeState::new())),
            seq: AtomicU64::new(0),
            live_period,
            live_timer: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Copy of the current view state
    pub async fn snapshot(&self) -> DowntimeState {
        self.state.read().await.clone()
    }

    pub async fn take_error(&self) -> Option<String> {
        self.state.write().await.take_error()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub fn live_timer_running(&self) -> bool {
        self.live_timer
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Fetch status, per-reason summary and top list, applying each
    /// independently. Returns true when all three succeeded.
    pub async fn poll_once(&self) -> bool {
        if self.is_torn_down() {
            return false;
        }

        let seq = self.next_seq();
        let (status, summary, top) = futures::join!(
            self.api.fetch_active_downtime(),
            self.api.fetch_downtime_summary(),
            self.api.fetch_top_downtimes(),
        );

        if self.is_torn_down() {
            debug!("Discarding downtime poll {} that finished after teardown", seq);
            return false;
        }

        let mut all_ok = true;
        {
            let mut state = self.state.write().await;

            match status {
                Ok(status) => {
                    if !state.apply_status(seq, &status) {
                        debug!("Discarded stale downtime status from poll {}", seq);
                    }
                }
                Err(e) => {
                    all_ok = false;
                    log_poll_error("active downtime", &e);
                }
            }

            match summary {
                Ok(summary) => {
                    state.apply_summary(seq, summary);
                }
                Err(e) => {
                    all_ok = false;
                    log_poll_error("downtime summary", &e);
                }
            }

            match top {
                Ok(top) => {
                    state.apply_top(seq, top);
                }
                Err(e) => {
                    all_ok = false;
                    log_poll_error("top downtimes", &e);
                }
            }

            state.degraded = !all_ok;
            state.refresh_duration(Utc::now());
        }

        self.sync_live_timer().await;
        all_ok
    }

    /// Fetch only the active-downtime status and apply it.
    ///
    /// Unlike [`poll_once`](Self::poll_once) the read error is returned, so
    /// callers that act on the session never mistake an unknown state for
    /// idle.
    pub async fn load_status(&self) -> Result<()> {
        if self.is_torn_down() {
            return Err(MonitorError::Other("downtime panel has been torn down".to_string()));
        }

        let seq = self.next_seq();
        let status = self.api.fetch_active_downtime().await;

        if self.is_torn_down() {
            debug!("Discarding downtime status {} that finished after teardown", seq);
            return status.map(|_| ());
        }

        {
            let mut state = self.state.write().await;
            match &status {
                Ok(status) => {
                    if !state.apply_status(seq, status) {
                        debug!("Discarded stale downtime status from load {}", seq);
                    }
                    state.refresh_duration(Utc::now());
                }
                Err(e) => log_poll_error("active downtime", e),
            }
        }

        self.sync_live_timer().await;
        status.map(|_| ())
    }

    /// Open a downtime episode with the given reason.
    pub async fn start(&self, reason: DowntimeReason) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if let Err(e) = state.check_can_start() {
                warn!("Start downtime refused: {}", e);
                state.record_error(e.user_message(START_FAILED_MSG));
                return Err(e);
            }
            state.set_busy(true);
        }

        let code = ReasonCode::from(reason);
        let result = self.api.start_downtime(&code).await;

        if self.is_torn_down() {
            debug!("Discarding start response that finished after teardown");
            return result;
        }

        {
            let mut state = self.state.write().await;
            state.set_busy(false);
            match &result {
                Ok(()) => {
                    let seq = self.next_seq();
                    state.apply_started(code, Utc::now(), seq);
                }
                Err(e) => {
                    error!("Failed to start downtime ({}): {}", reason, e);
                    state.record_error(e.user_message(START_FAILED_MSG));
                }
            }
        }

        self.sync_live_timer().await;
        result
    }

    /// Close the open downtime episode. `Ok(false)` when none was open and
    /// no request was sent.
    pub async fn stop(&self) -> Result<bool> {
        {
            let mut state = self.state.write().await;
            match state.check_can_stop() {
                Ok(true) => state.set_busy(true),
                Ok(false) => {
                    debug!("Stop requested with no active downtime, ignoring");
                    return Ok(false);
                }
                Err(e) => {
                    warn!("Stop downtime refused: {}", e);
                    state.record_error(e.user_message(STOP_FAILED_MSG));
                    return Err(e);
                }
            }
        }

        let result = self.api.stop_downtime().await;

        if self.is_torn_down() {
            debug!("Discarding stop response that finished after teardown");
            return result.map(|_| true);
        }

        {
            let mut state = self.state.write().await;
            state.set_busy(false);
            match &result {
                Ok(()) => {
                    let seq = self.next_seq();
                    state.apply_stopped(seq);
                }
                Err(e) => {
                    error!("Failed to stop downtime: {}", e);
                    state.record_error(e.user_message(STOP_FAILED_MSG));
                }
            }
        }

        self.sync_live_timer().await;
        result.map(|_| true)
    }

    /// Run the live-duration timer exactly while a session is active.
    async fn sync_live_timer(&self) {
        let active = self.state.read().await.is_active() && !self.is_torn_down();

        let Ok(mut slot) = self.live_timer.lock() else {
            error!("Live duration timer lock poisoned");
            return;
        };

        if active && slot.is_none() {
            let state = Arc::clone(&self.state);
            *slot = Some(TimerGuard::every("live-duration", self.live_period, move || {
                let state = Arc::clone(&state);
                async move {
                    state.write().await.refresh_duration(Utc::now());
                }
            }));
        } else if !active {
            slot.take();
        }
    }

    /// Stop the live timer and refuse further state writes.
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.live_timer.lock() {
            slot.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Failure};
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, h, m, s).unwrap()
    }

    fn backend_record(id: i64, start: DateTime<Utc>) -> DowntimeLog {
        DowntimeLog {
            id,
            start_time: start,
            end_time: None,
            downtime_reason: DowntimeReason::Repair.into(),
            duration_sec: None,
            date: start.date_naive(),
            is_active: true,
        }
    }

    fn active(log: DowntimeLog) -> ActiveDowntimeStatus {
        ActiveDowntimeStatus {
            is_active: true,
            current_downtime: Some(log),
        }
    }

    #[test]
    fn test_duration_tracks_start_time() {
        let mut state = DowntimeState::new();
        state.apply_started(DowntimeReason::SetupDie.into(), at(8, 0, 0), 1);

        let mut previous = 0;
        for secs in [0u32, 1, 59, 61, 3725] {
            let now = at(8, 0, 0) + chrono::Duration::seconds(secs as i64);
            state.refresh_duration(now);
            assert_eq!(state.current_duration(), secs as u64);
            assert!(state.current_duration() >= previous);
            previous = state.current_duration();
        }
    }

    #[test]
    fn test_start_refused_while_active() {
        let mut state = DowntimeState::new();
        state.apply_status(1, &active(backend_record(3, at(8, 0, 0))));

        let before = state.session().clone();
        let err = state.check_can_start().unwrap_err();
        assert_eq!(err.user_message("x"), ALREADY_ACTIVE_MSG);
        assert_eq!(state.session(), &before);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let state = DowntimeState::new();
        assert!(!state.check_can_stop().unwrap());
    }

    #[test]
    fn test_reconcile_closes_session() {
        let mut state = DowntimeState::new();
        state.apply_started(DowntimeReason::Repair.into(), at(8, 0, 0), 1);
        state.refresh_duration(at(8, 1, 0));
        assert_eq!(state.current_duration(), 60);

        assert!(state.apply_status(2, &ActiveDowntimeStatus::idle()));
        assert_eq!(state.session(), &DowntimeSession::Idle);
        assert_eq!(state.current_duration(), 0);
    }

    #[test]
    fn test_reconcile_confirms_pending_record() {
        let mut state = DowntimeState::new();
        state.apply_started(DowntimeReason::Repair.into(), at(8, 0, 5), 1);
        assert!(matches!(
            state.session(),
            DowntimeSession::Active(tracked) if tracked.is_pending()
        ));

        let confirmed = backend_record(41, at(8, 0, 0));
        state.apply_status(2, &active(confirmed.clone()));
        assert_eq!(
            state.session(),
            &DowntimeSession::Active(Tracked::Confirmed(confirmed))
        );
    }

    #[test]
    fn test_stale_status_discarded() {
        let mut state = DowntimeState::new();
        // Poll 1 issued, then a stop completes as change 2, then poll 1's
        // response (still showing the session) arrives late.
        state.apply_status(0, &active(backend_record(3, at(8, 0, 0))));
        state.apply_stopped(2);
        assert!(!state.apply_status(1, &active(backend_record(3, at(8, 0, 0)))));
        assert!(!state.is_active());
    }

    #[tokio::test]
    async fn test_failed_start_stays_idle() {
        let api = Arc::new(FakeApi::new());
        api.fail_start(Failure::Status(400, Some("busy elsewhere")));
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        let result = panel.start(DowntimeReason::Maintenance).await;
        assert!(result.is_err());

        let state = panel.snapshot().await;
        assert!(!state.is_active());
        assert!(state.current_record().is_none());
        assert_eq!(state.last_error(), Some("busy elsewhere"));
        assert!(!panel.live_timer_running());
    }

    #[tokio::test]
    async fn test_failed_start_without_detail_uses_generic_message() {
        let api = Arc::new(FakeApi::new());
        api.fail_start(Failure::Status(500, None));
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        assert!(panel.start(DowntimeReason::Repair).await.is_err());
        assert_eq!(panel.take_error().await.as_deref(), Some(START_FAILED_MSG));
    }

    #[tokio::test]
    async fn test_start_then_double_start() {
        let api = Arc::new(FakeApi::new());
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        panel.start(DowntimeReason::PowerFailure).await.unwrap();
        assert_eq!(api.start_calls(), 1);
        assert_eq!(api.last_start_reason().as_deref(), Some("POWER_FAILURE"));

        let state = panel.snapshot().await;
        let record = state.current_record().unwrap();
        assert_eq!(record.downtime_reason, ReasonCode::from(DowntimeReason::PowerFailure));
        assert!(record.end_time.is_none());
        assert!(panel.live_timer_running());

        assert!(panel.start(DowntimeReason::Repair).await.is_err());
        assert_eq!(api.start_calls(), 1);
        assert_eq!(panel.snapshot().await.session(), state.session());
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_record() {
        let api = Arc::new(FakeApi::new());
        let record = backend_record(7, Utc::now());
        api.set_active(active(record.clone()));
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));
        panel.poll_once().await;

        api.fail_stop(Failure::Network);
        assert!(panel.stop().await.is_err());

        let state = panel.snapshot().await;
        assert_eq!(
            state.session(),
            &DowntimeSession::Active(Tracked::Confirmed(record))
        );
        assert_eq!(state.last_error(), Some(STOP_FAILED_MSG));
    }

    #[tokio::test]
    async fn test_stop_idle_sends_nothing() {
        let api = Arc::new(FakeApi::new());
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        assert!(!panel.stop().await.unwrap());
        assert_eq!(api.stop_calls(), 0);
    }

    #[tokio::test]
    async fn test_poll_reconciliation_stops_timer() {
        let api = Arc::new(FakeApi::new());
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        panel.start(DowntimeReason::QualityCheck).await.unwrap();
        assert!(panel.live_timer_running());

        // Backend never actually opened the session.
        api.set_active(ActiveDowntimeStatus::idle());
        assert!(panel.poll_once().await);

        let state = panel.snapshot().await;
        assert!(!state.is_active());
        assert_eq!(state.current_duration(), 0);
        assert!(!panel.live_timer_running());
    }

    #[tokio::test]
    async fn test_poll_slices_independent() {
        let api = Arc::new(FakeApi::new());
        api.set_downtime_summary(serde_json::from_str(r#"{"REPAIR": 300}"#).unwrap());
        api.set_top(vec![backend_record(5, at(7, 0, 0))]);
        api.fail_active(Failure::Malformed);
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        assert!(!panel.poll_once().await);

        let state = panel.snapshot().await;
        assert_eq!(state.summary().seconds_for("REPAIR"), 300);
        assert_eq!(state.top().len(), 1);
        assert_eq!(state.top()[0].id, 5);
        assert!(state.is_degraded());

        api.clear_failures();
        assert!(panel.poll_once().await);
        assert!(!panel.snapshot().await.is_degraded());
    }

    #[tokio::test]
    async fn test_failed_summary_and_top_keep_previous_values() {
        let api = Arc::new(FakeApi::new());
        api.set_downtime_summary(serde_json::from_str(r#"{"REPAIR": 300}"#).unwrap());
        api.set_top(vec![backend_record(5, at(7, 0, 0))]);
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));
        assert!(panel.poll_once().await);

        api.set_downtime_summary(serde_json::from_str(r#"{"REPAIR": 900}"#).unwrap());
        api.set_top(Vec::new());
        api.set_active(active(backend_record(6, Utc::now())));
        api.fail_downtime_summary(Failure::Network);
        api.fail_top(Failure::Status(500, None));

        assert!(!panel.poll_once().await);
        let state = panel.snapshot().await;
        assert!(state.is_active());
        assert_eq!(state.summary().seconds_for("REPAIR"), 300);
        assert_eq!(state.top()[0].id, 5);
        assert!(state.is_degraded());

        panel.teardown();
    }

    #[tokio::test]
    async fn test_no_writes_after_teardown() {
        let api = Arc::new(FakeApi::new());
        api.set_downtime_summary(serde_json::from_str(r#"{"REPAIR": 300}"#).unwrap());
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        panel.teardown();
        assert!(!panel.poll_once().await);
        assert_eq!(panel.snapshot().await.summary().total_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_finishing_after_teardown_is_discarded() {
        let api = Arc::new(FakeApi::new());
        api.set_downtime_summary(serde_json::from_str(r#"{"REPAIR": 300}"#).unwrap());
        api.set_active(active(backend_record(9, Utc::now())));
        api.set_delay(Duration::from_millis(200));
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        let (applied, _) = tokio::join!(panel.poll_once(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            panel.teardown();
        });

        assert!(!applied);
        let state = panel.snapshot().await;
        assert_eq!(state.summary().total_secs(), 0);
        assert!(!state.is_active());
        assert!(!panel.live_timer_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_finishing_after_teardown_is_discarded() {
        let api = Arc::new(FakeApi::new());
        api.set_delay(Duration::from_millis(200));
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        let (result, _) = tokio::join!(panel.start(DowntimeReason::Repair), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            panel.teardown();
        });

        assert!(result.is_ok());
        assert_eq!(api.start_calls(), 1);
        assert!(!panel.snapshot().await.is_active());
        assert!(!panel.live_timer_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_finishing_after_teardown_is_discarded() {
        let api = Arc::new(FakeApi::new());
        let record = backend_record(7, Utc::now());
        api.set_active(active(record.clone()));
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));
        assert!(panel.poll_once().await);

        api.set_delay(Duration::from_millis(200));
        let (result, _) = tokio::join!(panel.stop(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            panel.teardown();
        });

        assert!(result.unwrap());
        assert_eq!(api.stop_calls(), 1);
        assert_eq!(
            panel.snapshot().await.session(),
            &DowntimeSession::Active(Tracked::Confirmed(record))
        );
        assert!(!panel.live_timer_running());
    }

    #[tokio::test]
    async fn test_load_status_surfaces_read_failure() {
        let api = Arc::new(FakeApi::new());
        api.set_active(active(backend_record(7, Utc::now())));
        api.fail_active(Failure::Network);
        let panel = DowntimePanel::new(api.clone(), Duration::from_secs(1));

        let err = panel.load_status().await.unwrap_err();
        assert!(err.is_network());
        assert!(!panel.snapshot().await.is_active());

        api.clear_failures();
        panel.load_status().await.unwrap();
        assert!(panel.snapshot().await.is_active());
        assert!(panel.live_timer_running());

        assert!(panel.stop().await.unwrap());
        assert_eq!(api.stop_calls(), 1);
    }
}
