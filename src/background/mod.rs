//! Background services — task supervision and restart escalation.
//!
//! Each processor task runs under [`Supervisor::supervise`], which
//! restarts it with exponential backoff on a `FatalError` and escalates
//! to process exit if restarts happen too often in too short a window
//! (§5, §7).

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::SupervisorConfig;
use crate::error::PipelineError;

/// Tracks restart timestamps for a single supervised task within a
/// sliding window, escalating once too many fatal restarts accumulate.
struct RestartWindow {
    timestamps: Mutex<Vec<Instant>>,
}

impl RestartWindow {
    fn new() -> Self {
        Self { timestamps: Mutex::new(Vec::new()) }
    }

    /// Record a restart and report whether the window's escalation
    /// threshold has now been exceeded.
    fn record_and_check(&self, window: Duration, threshold: u32) -> bool {
        let mut timestamps = self.timestamps.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        timestamps.retain(|t| now.duration_since(*t) < window);
        timestamps.push(now);
        timestamps.len() as u32 > threshold
    }
}

/// Supervises a single fallible async task, restarting it on recoverable
/// errors and exiting the process on runaway `Fatal` failures.
pub struct Supervisor {
    name: String,
    config: SupervisorConfig,
    window: RestartWindow,
}

impl Supervisor {
    pub fn new(name: impl Into<String>, config: SupervisorConfig) -> Self {
        Self { name: name.into(), config, window: RestartWindow::new() }
    }

    /// Run `make_task` in a loop. `make_task` is called fresh for each
    /// (re)start since most processor tasks hold non-`Clone` subscriber
    /// handles that must be re-acquired. Returns only when `stop` fires
    /// or the escalation threshold is crossed (in which case the process
    /// exits rather than returning, matching §7's "process exit").
    pub async fn supervise<F, Fut>(&self, mut stop: watch::Receiver<bool>, mut make_task: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), PipelineError>>,
    {
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);

        loop {
            if *stop.borrow() {
                info!(task = %self.name, "supervisor stopping on cancellation");
                return;
            }

            let result = tokio::select! {
                r = make_task() => r,
                _ = stop.changed() => {
                    info!(task = %self.name, "supervisor stopping on cancellation");
                    return;
                }
            };

            match result {
                Ok(()) => {
                    info!(task = %self.name, "task exited cleanly, not restarting");
                    return;
                }
                Err(e) if e.is_fatal() => {
                    error!(task = %self.name, error = %e, "fatal error, restarting");
                    let window = Duration::from_secs(self.config.restart_window_s);
                    if self.window.record_and_check(window, self.config.restart_escalation_count) {
                        error!(
                            task = %self.name,
                            window_s = self.config.restart_window_s,
                            threshold = self.config.restart_escalation_count,
                            "too many fatal restarts in window, exiting process"
                        );
                        std::process::exit(1);
                    }
                    self.sleep_and_back_off(&mut backoff).await;
                }
                Err(e) => {
                    warn!(task = %self.name, error = %e, "non-fatal error, restarting immediately");
                    backoff = Duration::from_millis(self.config.initial_backoff_ms);
                }
            }
        }
    }

    async fn sleep_and_back_off(&self, backoff: &mut Duration) {
        tokio::time::sleep(*backoff).await;
        let max = Duration::from_millis(self.config.max_backoff_ms);
        *backoff = (*backoff * 2).min(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn non_fatal_error_keeps_retrying_until_stop() {
        let attempts = Arc::new(AtomicU32::new(0));
        let (stop_tx, stop_rx) = watch::channel(false);
        let supervisor = Supervisor::new("test-task", SupervisorConfig::default());

        let attempts_clone = attempts.clone();
        let handle = tokio::spawn(async move {
            supervisor
                .supervise(stop_rx, || {
                    let attempts = attempts_clone.clone();
                    async move {
                        let n = attempts.fetch_add(1, Ordering::SeqCst);
                        if n < 3 {
                            Err(PipelineError::transient("still warming up"))
                        } else {
                            Err(PipelineError::transient("keep going"))
                        }
                    }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(attempts.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn clean_exit_does_not_restart() {
        let attempts = Arc::new(AtomicU32::new(0));
        let (_stop_tx, stop_rx) = watch::channel(false);
        let supervisor = Supervisor::new("test-task", SupervisorConfig::default());

        let attempts_clone = attempts.clone();
        supervisor
            .supervise(stop_rx, || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restart_window_escalates_past_threshold() {
        let window = RestartWindow::new();
        let dur = Duration::from_secs(60);
        for _ in 0..5 {
            assert!(!window.record_and_check(dur, 5));
        }
        assert!(window.record_and_check(dur, 5));
    }
}
