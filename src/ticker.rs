//! Periodic background timer.
//!
//! Fires a callback at a fixed cadence on its own thread until it is
//! cancelled, dropped, or the callback asks to stop. Ticks are scheduled
//! against absolute deadlines so a slow callback does not accumulate drift.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

/// Handle to a running ticker. Cancelling consumes it; dropping it cancels too.
pub struct TickerHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<u64>>,
}

impl TickerHandle {
    /// Start a ticker calling `on_tick` every `interval`.
    ///
    /// The ticker stops on its own once `on_tick` returns `false`.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::spawn(move || {
            let mut ticks: u64 = 0;
            let mut deadline = Instant::now() + interval;
            loop {
                let wait = deadline.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        ticks += 1;
                        if !on_tick() {
                            break;
                        }
                        deadline += interval;
                    }
                    // Explicit stop, or the handle went away
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            ticks
        });

        Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }

    /// Stop the ticker and wait for its thread. Returns the number of ticks fired.
    pub fn cancel(mut self) -> u64 {
        self.shutdown()
    }

    /// False once the ticker thread has exited.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    fn shutdown(&mut self) -> u64 {
        if let Some(tx) = self.stop_tx.take() {
            // Ticker may already have exited on its own
            tx.send(()).ok();
        }
        let ticks = self
            .thread
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or(0);
        debug!("[Ticker] Stopped after {} ticks", ticks);
        ticks
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_ticker_fires_until_cancelled() {
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let ticker = TickerHandle::spawn(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        thread::sleep(Duration::from_millis(60));
        let fired = ticker.cancel();

        assert!(fired >= 1);
        assert_eq!(fired, count.load(Ordering::SeqCst));

        // No ticks after cancel returned
        thread::sleep(Duration::from_millis(20));
        assert_eq!(fired, count.load(Ordering::SeqCst));
    }

    #[test]
    fn test_ticker_stops_when_callback_declines() {
        let ticker = TickerHandle::spawn(Duration::from_millis(1), || false);
        thread::sleep(Duration::from_millis(50));
        assert!(!ticker.is_running());
        assert_eq!(ticker.cancel(), 1);
    }

    #[test]
    fn test_drop_cancels() {
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        {
            let _ticker = TickerHandle::spawn(Duration::from_millis(2), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            });
            thread::sleep(Duration::from_millis(10));
        }
        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_cancel_before_first_tick() {
        let ticker = TickerHandle::spawn(Duration::from_secs(60), || true);
        assert!(ticker.is_running());
        assert_eq!(ticker.cancel(), 0);
    }
}
