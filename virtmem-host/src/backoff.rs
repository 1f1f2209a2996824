//! Bounded retry with cooperative cancellation
//!
//! Waits grow from `initial` by `multiplier` up to `max`. Each wait sleeps in
//! short slices so a shutdown request is noticed within one slice rather than
//! after a full interval.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep while waiting
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    /// Fixed interval between attempts
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            max: interval,
            multiplier: 1.0,
        }
    }

    /// Growing interval, capped at `max`
    pub fn exponential(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            multiplier: multiplier.max(1.0),
        }
    }

    /// Wait before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(64) as i32);
        let millis = (self.initial.as_millis() as f64 * factor).round();
        if !millis.is_finite() || millis >= self.max.as_millis() as f64 {
            return self.max;
        }
        Duration::from_millis(millis as u64)
    }

    /// Run `op` until it succeeds or `cancel` is set
    ///
    /// `on_failure` sees every failed attempt. Returns
    /// [`Error::ShutdownRequested`] if cancelled before success.
    pub fn retry<T, F, L>(&self, cancel: &AtomicBool, mut op: F, mut on_failure: L) -> Result<T>
    where
        F: FnMut() -> Result<T>,
        L: FnMut(u32, &Error),
    {
        let mut attempt: u32 = 0;
        while !cancel.load(Ordering::Relaxed) {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    on_failure(attempt, &e);
                    if !sleep_cancellable(self.delay(attempt), cancel) {
                        break;
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
        Err(Error::ShutdownRequested)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(500))
    }
}

/// Sleep for `duration` unless cancelled; returns false if cancelled
pub fn sleep_cancellable(duration: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(CANCEL_CHECK_SLICE));
    }
}

/// Shared cancellation flag
pub type ShutdownFlag = Arc<AtomicBool>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fixed_delay() {
        let backoff = Backoff::fixed(Duration::from_millis(500));
        assert_eq!(backoff.delay(0), Duration::from_millis(500));
        assert_eq!(backoff.delay(10), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let backoff =
            Backoff::exponential(Duration::from_millis(100), Duration::from_millis(350), 2.0);
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(350));
        assert_eq!(backoff.delay(40), Duration::from_millis(350));
    }

    #[test]
    fn test_retry_until_success() {
        let backoff = Backoff::fixed(Duration::from_millis(1));
        let cancel = AtomicBool::new(false);
        let calls = Cell::new(0);
        let failures = Cell::new(0);

        let value = backoff
            .retry(
                &cancel,
                || {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        Err(Error::transport("busy"))
                    } else {
                        Ok(calls.get())
                    }
                },
                |_, _| failures.set(failures.get() + 1),
            )
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(failures.get(), 2);
    }

    #[test]
    fn test_retry_stops_when_cancelled() {
        let backoff = Backoff::fixed(Duration::from_secs(60));
        let cancel = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            setter.store(true, Ordering::Relaxed);
        });

        let started = Instant::now();
        let result: Result<()> =
            backoff.retry(&cancel, || Err(Error::transport("busy")), |_, _| {});
        handle.join().unwrap();

        assert!(matches!(result, Err(Error::ShutdownRequested)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_retry_never_runs_when_already_cancelled() {
        let cancel = AtomicBool::new(true);
        let result: Result<()> = Backoff::default().retry(
            &cancel,
            || panic!("operation must not run"),
            |_, _| {},
        );
        assert!(matches!(result, Err(Error::ShutdownRequested)));
    }
}
