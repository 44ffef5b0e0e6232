//! Periodic timers that are cancelled when their guard is dropped

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Owns a spawned periodic task; dropping the guard aborts it.
#[derive(Debug)]
pub struct TimerGuard {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TimerGuard {
    /// Run `tick` every `period`, starting immediately.
    ///
    /// A tick that overruns the period delays the next one instead of
    /// firing a burst to catch up.
    pub fn every<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });

        debug!("Started {} timer with period {:?}", name, period);
        Self { name, handle }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Cancelled {} timer", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_dropped() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        let guard = TimerGuard::every("test", Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(guard);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
