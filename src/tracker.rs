//! # Tracker
//!
//! Thread-safe owner of a [`SessionEngine`] and its tick timer.
//!
//! Location and step callbacks arrive from independent sensor threads; every
//! call goes through the engine mutex, which is the single serialized apply
//! path. The ticker lives outside the mutex so it can be cancelled without
//! holding the engine lock.
//!
//! All timestamps share the caller's clock: ticks are stamped with the
//! `now_ms` given to [`Tracker::start`] plus the monotonic time elapsed since.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::engine::{LocationOutcome, SessionEngine, SessionStore, StepOutcome};
use crate::events::LiveSnapshot;
use crate::ticker::TickerHandle;
use crate::{LocationSample, Result, SessionSummary, TrackerConfig};

/// Result of the single start/stop control.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Started { session_id: i64 },
    Stopped { summary: Option<SessionSummary> },
    /// Location/activity permissions not granted; nothing changed
    MissingPermissions,
}

pub struct Tracker<S: SessionStore + Send + 'static> {
    engine: Arc<Mutex<SessionEngine<S>>>,
    ticker: Option<TickerHandle>,
}

impl<S: SessionStore + Send + 'static> Tracker<S> {
    pub fn new(store: S, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: Arc::new(Mutex::new(SessionEngine::new(store, config))),
            ticker: None,
        })
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SessionEngine<S>) -> R,
    {
        let mut engine = lock(&self.engine);
        f(&mut engine)
    }

    /// Start a session and its tick timer. No-op if already tracking.
    ///
    /// A ticker that stopped on its own (the session was finished through
    /// [`with_engine`](Self::with_engine)) is replaced.
    pub fn start(&mut self, now_ms: i64) -> Result<i64> {
        let session_id = self.with_engine(|e| e.start(now_ms))?;
        if !self.is_ticking() {
            if let Some(stale) = self.ticker.take() {
                stale.cancel();
            }
            self.spawn_ticker(now_ms);
        }
        Ok(session_id)
    }

    /// Cancel the tick timer, then finish the session.
    ///
    /// If the summary cannot be stored the session keeps running and the
    /// timer is restarted.
    pub fn stop(&mut self, now_ms: i64) -> Result<Option<SessionSummary>> {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        match self.with_engine(|e| e.finish(now_ms)) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!("[Tracker] Stop failed, session continues: {}", e);
                if self.with_engine(|e| e.is_active()) {
                    self.spawn_ticker(now_ms);
                }
                Err(e)
            }
        }
    }

    /// Start when idle, stop when tracking.
    pub fn toggle(&mut self, now_ms: i64, has_permissions: bool) -> Result<ToggleOutcome> {
        if !has_permissions {
            return Ok(ToggleOutcome::MissingPermissions);
        }
        if self.is_active() {
            let summary = self.stop(now_ms)?;
            Ok(ToggleOutcome::Stopped { summary })
        } else {
            let session_id = self.start(now_ms)?;
            Ok(ToggleOutcome::Started { session_id })
        }
    }

    pub fn submit_location(&self, sample: LocationSample) -> Result<LocationOutcome> {
        self.with_engine(|e| e.submit_location(sample))
    }

    pub fn submit_step_count(&self, cumulative_count: u64, now_ms: i64) -> Result<StepOutcome> {
        self.with_engine(|e| e.submit_step_count(cumulative_count, now_ms))
    }

    pub fn attach_photo(&self, file_path: &str, now_ms: i64) -> Result<i64> {
        self.with_engine(|e| e.attach_photo(file_path, now_ms))
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.with_engine(|e| e.snapshot())
    }

    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<LiveSnapshot> {
        self.with_engine(|e| e.subscribe())
    }

    pub fn is_active(&self) -> bool {
        self.with_engine(|e| e.is_active())
    }

    /// True while the tick timer thread is alive.
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().map(|t| t.is_running()).unwrap_or(false)
    }

    /// Stop the timer and hand back the store, e.g. to close the database.
    ///
    /// An active session is left as-is in the store.
    pub fn into_store(mut self) -> Option<S> {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        let engine = Arc::try_unwrap(self.engine).ok()?;
        let engine = engine.into_inner().unwrap_or_else(|p| p.into_inner());
        Some(engine.into_store())
    }

    /// Spawn the tick timer, anchored so that `origin_ms` is "now".
    fn spawn_ticker(&mut self, origin_ms: i64) {
        let interval = self.with_engine(|e| e.config().tick_interval_ms);
        let engine = Arc::clone(&self.engine);
        let origin = Instant::now();
        self.ticker = Some(TickerHandle::spawn(
            Duration::from_millis(interval),
            move || {
                let now_ms = origin_ms + origin.elapsed().as_millis() as i64;
                match lock(&engine).tick(now_ms) {
                    Ok(snapshot) => snapshot.is_some(),
                    // Progress write failed; the session is still running
                    Err(_) => true,
                }
            },
        ));
        info!("[Tracker] Tick timer started ({}ms)", interval);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic in a callback must not take tracking down with it
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullStore;
    use crate::geo_utils::offset_north;
    use crate::{now_millis, GpsPoint};
    use std::thread;

    fn fast_config() -> TrackerConfig {
        TrackerConfig {
            tick_interval_ms: 5,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_start_spawns_ticker_and_stop_cancels_it() {
        let mut tracker = Tracker::new(NullStore::default(), fast_config()).unwrap();
        let start = now_millis();
        let id = tracker.start(start).unwrap();
        assert_eq!(id, 1);
        assert!(tracker.is_ticking());

        let rx = tracker.subscribe();
        thread::sleep(Duration::from_millis(40));
        assert!(rx.try_iter().any(|s| s.is_active));

        let summary = tracker.stop(now_millis()).unwrap().unwrap();
        assert_eq!(summary.session_id, 1);
        assert!(!tracker.is_ticking());
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_toggle() {
        let mut tracker = Tracker::new(NullStore::default(), fast_config()).unwrap();
        assert_eq!(
            tracker.toggle(0, false).unwrap(),
            ToggleOutcome::MissingPermissions
        );
        assert!(!tracker.is_active());

        assert_eq!(
            tracker.toggle(0, true).unwrap(),
            ToggleOutcome::Started { session_id: 1 }
        );
        match tracker.toggle(10_000, true).unwrap() {
            ToggleOutcome::Stopped { summary: Some(s) } => {
                assert_eq!(s.session_id, 1);
                assert_eq!(s.duration_seconds, 10);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ticks_follow_caller_clock() {
        let mut tracker = Tracker::new(NullStore::default(), fast_config()).unwrap();
        tracker.start(0).unwrap();
        thread::sleep(Duration::from_millis(30));

        // Ticks so far are stamped a few milliseconds after 0
        assert!(tracker.snapshot().duration_seconds < 5);

        let summary = tracker.stop(10_000).unwrap().unwrap();
        assert_eq!(summary.duration_seconds, 10);
        assert_eq!(summary.end_timestamp_ms, 10_000);
    }

    #[test]
    fn test_restart_replaces_exited_ticker() {
        let mut tracker = Tracker::new(NullStore::default(), fast_config()).unwrap();
        tracker.start(0).unwrap();
        tracker.with_engine(|e| e.finish(1_000)).unwrap();

        // Ticker notices the idle engine and exits
        thread::sleep(Duration::from_millis(30));
        assert!(!tracker.is_ticking());

        tracker.start(2_000).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(tracker.is_active());
        assert!(tracker.is_ticking());
    }

    #[test]
    fn test_sensor_callbacks_from_threads() {
        let mut tracker = Tracker::new(NullStore::default(), TrackerConfig::default()).unwrap();
        tracker.start(0).unwrap();
        let tracker = Arc::new(tracker);

        let steps = {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                for count in 500..=600u64 {
                    tracker.submit_step_count(count, 0).unwrap();
                }
            })
        };
        let gps = {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                let origin = GpsPoint::new(52.2297, 21.0122);
                for i in 0..=10 {
                    let p = offset_north(&origin, i as f64 * 10.0);
                    tracker
                        .submit_location(LocationSample::new(p.latitude, p.longitude, i * 1_000))
                        .unwrap();
                }
            })
        };
        steps.join().unwrap();
        gps.join().unwrap();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.steps, 100);
        assert!((snapshot.distance_meters - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_into_store_after_stop() {
        let mut tracker = Tracker::new(NullStore::default(), fast_config()).unwrap();
        tracker.start(now_millis()).unwrap();
        assert!(tracker.into_store().is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig {
            min_accuracy_meters: f64::NAN,
            ..TrackerConfig::default()
        };
        assert!(Tracker::new(NullStore::default(), config).is_err());
    }
}
