//! Polling synchronizer orchestrating all dashboard timers

use crate::config::MonitorConfig;
use crate::downtime::DowntimePanel;
use crate::errors::{MonitorError, Result};
use crate::machine::{Connectivity, MachineMonitor};
use crate::timer::TimerGuard;
use crate::transport::DashboardApi;
use crate::view::DashboardSnapshot;

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const METRICS_REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// State and backend handle shared with the timer tasks
struct SyncCore {
    config: MonitorConfig,
    api: Arc<dyn DashboardApi>,
    machine: RwLock<MachineMonitor>,
    downtime: Arc<DowntimePanel>,
    clock: RwLock<DateTime<Local>>,
    machine_seq: AtomicU64,
    torn_down: AtomicBool,
    monitor_id: String,
}

impl SyncCore {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    async fn poll_machine_once(&self) -> bool {
        if self.is_torn_down() {
            return false;
        }

        let seq = self.machine_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let (state, summary) = futures::join!(
            self.api.fetch_state(),
            self.api.fetch_today_summary(),
        );

        if self.is_torn_down() {
            debug!("Discarding machine poll {} that finished after teardown", seq);
            return false;
        }

        self.machine
            .write()
            .await
            .apply_poll(seq, state, summary, Local::now())
    }

    async fn report_metrics(&self) {
        let metrics = self.api.metrics().await;
        info!(
            "Request metrics - {} attempts, {:.1}% success rate, {}ms average",
            metrics.attempts, metrics.success_rate, metrics.avg_duration_ms
        );
    }
}

/// Keeps local copies of machine state, summaries and downtime status in
/// step with the backend.
///
/// Owns every periodic timer it starts; dropping the synchronizer cancels
/// them.
pub struct Synchronizer {
    core: Arc<SyncCore>,
    timers: Mutex<Vec<TimerGuard>>,
}

impl Synchronizer {
    /// Create a new synchronizer
    pub fn new(config: MonitorConfig, api: Arc<dyn DashboardApi>) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let machine = MachineMonitor::new(
            config.total_work_seconds(),
            config.chart_capacity,
            config.chart_append_every,
        );

        let downtime = Arc::new(DowntimePanel::new(
            Arc::clone(&api),
            config.live_duration_interval,
        ));

        let core = SyncCore {
            config,
            api,
            machine: RwLock::new(machine),
            downtime,
            clock: RwLock::new(Local::now()),
            machine_seq: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
            monitor_id: Uuid::new_v4().to_string(),
        };

        Ok(Self {
            core: Arc::new(core),
            timers: Mutex::new(Vec::new()),
        })
    }

    pub fn monitor_id(&self) -> &str {
        &self.core.monitor_id
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    pub fn downtime(&self) -> &Arc<DowntimePanel> {
        &self.core.downtime
    }

    pub fn api(&self) -> &Arc<dyn DashboardApi> {
        &self.core.api
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.is_torn_down()
    }

    /// Start the clock, machine poll, downtime poll and metrics timers.
    /// Each timer fires immediately, then on its period.
    #[instrument(skip(self), fields(monitor_id = %self.core.monitor_id))]
    pub fn start(&self) -> Result<()> {
        if self.is_torn_down() {
            return Err(MonitorError::Other(
                "synchronizer has already been shut down".to_string(),
            ));
        }

        let mut timers = self
            .timers
            .lock()
            .map_err(|_| MonitorError::Other("timer registry lock poisoned".to_string()))?;
        if !timers.is_empty() {
            return Err(MonitorError::Other("synchronizer is already running".to_string()));
        }

        let config = &self.core.config;
        info!(
            "Starting synchronizer against {} (state every {:?}, downtime every {:?})",
            config.api_base_url, config.state_poll_interval, config.downtime_poll_interval
        );

        let core = Arc::clone(&self.core);
        let clock_timer = TimerGuard::every("clock", config.clock_tick_interval, move || {
            let core = Arc::clone(&core);
            async move {
                *core.clock.write().await = Local::now();
            }
        });

        let core = Arc::clone(&self.core);
        let machine_timer = TimerGuard::every("machine-poll", config.state_poll_interval, move || {
            let core = Arc::clone(&core);
            async move {
                core.poll_machine_once().await;
            }
        });

        let downtime = Arc::clone(&self.core.downtime);
        let downtime_timer = TimerGuard::every(
            "downtime-poll",
            config.downtime_poll_interval,
            move || {
                let downtime = Arc::clone(&downtime);
                async move {
                    downtime.poll_once().await;
                }
            },
        );

        let core = Arc::clone(&self.core);
        let mut first_report = true;
        let metrics_timer = TimerGuard::every("metrics", METRICS_REPORT_INTERVAL, move || {
            let core = Arc::clone(&core);
            let skip = std::mem::replace(&mut first_report, false);
            async move {
                if !skip {
                    core.report_metrics().await;
                }
            }
        });

        timers.extend([clock_timer, machine_timer, downtime_timer, metrics_timer]);

        Ok(())
    }

    /// Run until Ctrl-C, then shut down.
    pub async fn run(&self) -> Result<()> {
        self.start()?;

        tokio::signal::ctrl_c().await.map_err(|e| {
            MonitorError::Other(format!("Failed to wait for shutdown signal: {}", e))
        })?;

        info!("Shutting down synchronizer");
        self.shutdown().await;
        Ok(())
    }

    /// Fetch machine state and today's summary concurrently and apply both.
    /// Returns true when both reads succeeded.
    pub async fn poll_machine_once(&self) -> bool {
        self.core.poll_machine_once().await
    }

    /// Run one poll of every slice, as the timers do on their first tick.
    pub async fn refresh(&self) -> bool {
        let (machine_ok, downtime_ok) = futures::join!(
            self.core.poll_machine_once(),
            self.core.downtime.poll_once()
        );
        machine_ok && downtime_ok
    }

    /// Cancel every timer; late responses are dropped afterwards.
    pub async fn shutdown(&self) {
        self.cancel_timers();

        let metrics = self.core.api.metrics().await;
        info!(
            "Final request metrics - Success rate: {:.1}%, Total attempts: {}, Avg duration: {}ms",
            metrics.success_rate, metrics.attempts, metrics.avg_duration_ms
        );
    }

    fn cancel_timers(&self) {
        self.core.torn_down.store(true, Ordering::SeqCst);

        match self.timers.lock() {
            Ok(mut timers) => {
                let cancelled = timers.len();
                timers.clear();
                debug!("Cancelled {} timers", cancelled);
            }
            Err(_) => error!("Timer registry lock poisoned during shutdown"),
        }
        self.core.downtime.teardown();
    }

    /// Current dashboard view
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let machine = self.core.machine.read().await.clone();
        let downtime = self.core.downtime.snapshot().await;
        let clock = *self.core.clock.read().await;

        let degraded = machine.connectivity() == Connectivity::Error || downtime.is_degraded();
        let connectivity = if degraded {
            Connectivity::Error
        } else {
            Connectivity::Active
        };

        DashboardSnapshot {
            clock,
            loading: machine.is_loading(),
            machine_state: machine.machine_state(),
            current_cycle: machine.state().and_then(|s| s.current_cycle),
            connectivity,
            metrics: machine.metrics(),
            chart: machine.chart().points(),
            downtime,
        }
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
