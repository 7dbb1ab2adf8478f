//! Cancellable periodic flush trigger
//!
//! A dedicated thread sleeps on a condition variable until the next deadline
//! or until cancelled. Cancelling joins the thread, so once [`FlushTimer::cancel`]
//! returns no tick is running and none will start.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Background ticker driving time triggered flushes
pub struct FlushTimer {
    interval: Duration,
    signal: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl FlushTimer {
    /// Spawn the ticker thread, calling `on_tick` every `interval`
    ///
    /// Ticks that fall behind are skipped rather than queued: after a slow
    /// `on_tick` the next deadline is one interval from now.
    pub fn start<F>(interval: Duration, mut on_tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if interval.is_zero() {
            return Err(Error::InvalidConfig(
                "flush timer interval must be greater than zero".to_string(),
            ));
        }

        let first = Instant::now().checked_add(interval).ok_or_else(|| {
            Error::InvalidConfig(format!("flush timer interval {:?} is out of range", interval))
        })?;

        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let worker_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name("tickbuf-flush".to_string())
            .spawn(move || {
                let (lock, cvar) = &*worker_signal;
                let mut deadline = Some(first);
                loop {
                    {
                        let mut cancelled = lock.lock();
                        while !*cancelled {
                            match deadline {
                                Some(at) => {
                                    if cvar.wait_until(&mut cancelled, at).timed_out() {
                                        break;
                                    }
                                }
                                // Unrepresentable deadline: park until cancelled
                                None => cvar.wait(&mut cancelled),
                            }
                        }
                        if *cancelled {
                            return;
                        }
                    }

                    on_tick();

                    let now = Instant::now();
                    deadline = deadline
                        .and_then(|at| at.checked_add(interval))
                        .filter(|at| *at > now)
                        .or_else(|| now.checked_add(interval));
                }
            })
            .map_err(|e| Error::Timer(format!("Failed to spawn flush timer: {}", e)))?;

        debug!(?interval, "Flush timer started");

        Ok(Self {
            interval,
            signal,
            handle: Some(handle),
        })
    }

    /// Tick period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the ticker thread is still owned by this timer
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop ticking and wait for an in-flight tick to finish. Idempotent.
    pub fn cancel(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        {
            let (lock, cvar) = &*self.signal;
            *lock.lock() = true;
            cvar.notify_all();
        }

        if handle.join().is_err() {
            warn!("Flush timer thread panicked");
        }
        debug!("Flush timer stopped");
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_timer_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let mut timer = FlushTimer::start(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(150));
        timer.cancel();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_no_tick_after_cancel() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let mut timer = FlushTimer::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        timer.cancel();
        assert!(!timer.is_running());

        let after_cancel = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut timer = FlushTimer::start(Duration::from_secs(60), || {}).unwrap();
        assert_eq!(timer.interval(), Duration::from_secs(60));
        timer.cancel();
        timer.cancel();
        assert!(!timer.is_running());
    }

    #[test]
    fn test_cancel_does_not_wait_for_deadline() {
        let mut timer = FlushTimer::start(Duration::from_secs(60), || {}).unwrap();
        let start = Instant::now();
        timer.cancel();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(FlushTimer::start(Duration::ZERO, || {}).is_err());
    }

    #[test]
    fn test_unrepresentable_interval_rejected() {
        let result = FlushTimer::start(Duration::MAX, || {});
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
