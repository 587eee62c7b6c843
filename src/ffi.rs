//! FFI bindings for mobile platforms (iOS/Android).
//!
//! Exposes a [`SessionTrackerHandle`] object owning the tracker and its
//! journal database, plus the display formatting helpers. Free functions are
//! prefixed with `ffi_` to avoid naming conflicts with the internal API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use log::{debug, info};

use crate::stats::{daily_progress, HistorySummary, WeeklySteps};
use crate::tracker::Tracker;
use crate::{
    day_key, format, init_logging, local_date, now_millis, persistence::JournalStats,
    DailyStepTotal, JournalStore, LiveSnapshot, LocationSample, Photo, RoutePoint,
    Session, SessionSummary, TrackerError,
};

// ============================================================================
// Snapshot Callback Interface
// ============================================================================

/// Receives live snapshots while a session is tracked.
/// Implement this in Kotlin/Swift to drive the dashboard.
#[uniffi::export(callback_interface)]
pub trait SnapshotListener: Send + Sync {
    fn on_snapshot(&self, snapshot: LiveSnapshot);
}

// ============================================================================
// Tracker Handle
// ============================================================================

#[derive(uniffi::Object)]
pub struct SessionTrackerHandle {
    tracker: Mutex<Option<Tracker<JournalStore>>>,
    /// Detach flag of the current listener's forwarding thread
    listener: Mutex<Option<Arc<AtomicBool>>>,
}

#[uniffi::export]
impl SessionTrackerHandle {
    /// Open the journal at `db_path` and close out sessions a previous run
    /// left active.
    #[uniffi::constructor]
    pub fn new(db_path: String) -> Result<Arc<Self>, TrackerError> {
        init_logging();
        let mut store = JournalStore::open(&db_path)?;
        store.abandon_active_sessions()?;
        let config = store.tracker_config()?;
        let tracker = Tracker::new(store, config)?;
        info!("[SessionTrackerFfi] Ready ({})", db_path);
        Ok(Arc::new(Self {
            tracker: Mutex::new(Some(tracker)),
            listener: Mutex::new(None),
        }))
    }

    pub fn start(&self) -> Result<i64, TrackerError> {
        self.with_tracker(|t| t.start(now_millis()))
    }

    pub fn stop(&self) -> Result<Option<SessionSummary>, TrackerError> {
        self.with_tracker(|t| t.stop(now_millis()))
    }

    pub fn is_active(&self) -> Result<bool, TrackerError> {
        self.with_tracker(|t| Ok(t.is_active()))
    }

    /// Returns true if the sample was recorded on the route.
    pub fn submit_location(&self, sample: LocationSample) -> Result<bool, TrackerError> {
        self.with_tracker(|t| Ok(t.submit_location(sample)?.is_accepted()))
    }

    pub fn submit_step_count(&self, cumulative_count: u64) -> Result<(), TrackerError> {
        self.with_tracker(|t| t.submit_step_count(cumulative_count, now_millis()).map(|_| ()))
    }

    /// Record a photo, tagged with the active session and last known location.
    pub fn attach_photo(&self, file_path: String) -> Result<i64, TrackerError> {
        self.with_tracker(|t| t.attach_photo(&file_path, now_millis()))
    }

    pub fn snapshot(&self) -> Result<LiveSnapshot, TrackerError> {
        self.with_tracker(|t| Ok(t.snapshot()))
    }

    /// Forward every published snapshot to `listener` on a background thread.
    ///
    /// Replaces any previous listener, which receives nothing further.
    pub fn set_snapshot_listener(
        &self,
        listener: Box<dyn SnapshotListener>,
    ) -> Result<(), TrackerError> {
        let rx = self.with_tracker(|t| Ok(t.subscribe()))?;
        let detached = Arc::new(AtomicBool::new(false));
        self.replace_listener(Some(Arc::clone(&detached)));

        thread::spawn(move || {
            for snapshot in rx {
                if detached.load(Ordering::SeqCst) {
                    break;
                }
                listener.on_snapshot(snapshot);
            }
            // Dropping the receiver unsubscribes it from the bus
            debug!("[SessionTrackerFfi] Snapshot listener detached");
        });
        Ok(())
    }

    pub fn clear_snapshot_listener(&self) {
        self.replace_listener(None);
    }

    // ------------------------------------------------------------------------
    // Journal queries
    // ------------------------------------------------------------------------

    pub fn completed_sessions(&self) -> Result<Vec<Session>, TrackerError> {
        self.with_store(|s| s.completed_sessions())
    }

    pub fn route_points(&self, session_id: i64) -> Result<Vec<RoutePoint>, TrackerError> {
        self.with_store(|s| s.route_points(session_id))
    }

    pub fn delete_session(&self, session_id: i64) -> Result<bool, TrackerError> {
        self.with_tracker(|t| {
            t.with_engine(|e| {
                if e.session_id() == Some(session_id) {
                    return Err(TrackerError::config("cannot delete the session being tracked"));
                }
                e.store_mut().delete_session(session_id)
            })
        })
    }

    pub fn history_summary(&self) -> Result<HistorySummary, TrackerError> {
        self.with_store(|s| Ok(HistorySummary::from_sessions(&s.completed_sessions()?)))
    }

    pub fn export_session_json(&self, session_id: i64) -> Result<String, TrackerError> {
        self.with_store(|s| s.export_session_json(session_id))
    }

    pub fn today_steps(&self) -> Result<Option<DailyStepTotal>, TrackerError> {
        self.with_store(|s| s.daily_steps(&day_key(now_millis())))
    }

    /// Today's progress toward the goal, in `[0, 1]`.
    pub fn today_progress(&self) -> Result<f64, TrackerError> {
        self.with_store(|s| {
            let goal = s.daily_step_goal()?;
            let steps = s
                .daily_steps(&day_key(now_millis()))?
                .map(|d| d.steps)
                .unwrap_or(0);
            Ok(daily_progress(steps, goal))
        })
    }

    pub fn weekly_steps(&self) -> Result<WeeklySteps, TrackerError> {
        self.with_store(|s| {
            let days = s.steps_for_week(local_date(now_millis()))?;
            Ok(WeeklySteps::from_days(&days))
        })
    }

    pub fn monthly_steps(&self) -> Result<Vec<DailyStepTotal>, TrackerError> {
        self.with_store(|s| s.steps_for_month(local_date(now_millis())))
    }

    pub fn photos(&self) -> Result<Vec<Photo>, TrackerError> {
        self.with_store(|s| s.all_photos())
    }

    pub fn photos_for_session(&self, session_id: i64) -> Result<Vec<Photo>, TrackerError> {
        self.with_store(|s| s.photos_for_session(session_id))
    }

    pub fn delete_photo(&self, photo_id: i64) -> Result<bool, TrackerError> {
        self.with_tracker(|t| t.with_engine(|e| e.store_mut().delete_photo(photo_id)))
    }

    pub fn daily_step_goal(&self) -> Result<u32, TrackerError> {
        self.with_store(|s| s.daily_step_goal())
    }

    /// Persist the goal and apply it to subsequent step ticks.
    pub fn set_daily_step_goal(&self, goal: u32) -> Result<(), TrackerError> {
        self.with_tracker(|t| {
            t.with_engine(|e| {
                e.store_mut().set_daily_step_goal(goal)?;
                e.set_daily_step_goal(goal);
                Ok(())
            })
        })
    }

    pub fn journal_stats(&self) -> Result<JournalStats, TrackerError> {
        self.with_store(|s| s.stats())
    }

    /// Stop the timer and close the database. An active session stays
    /// active in the journal and is closed out on the next open.
    pub fn close(&self) -> Result<(), TrackerError> {
        self.replace_listener(None);
        let tracker = self.lock().take();
        match tracker.and_then(|t| t.into_store()) {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }
}

impl SessionTrackerHandle {
    fn replace_listener(&self, next: Option<Arc<AtomicBool>>) {
        let mut slot = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = std::mem::replace(&mut *slot, next) {
            previous.store(true, Ordering::SeqCst);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Tracker<JournalStore>>> {
        self.tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_tracker<F, R>(&self, f: F) -> Result<R, TrackerError>
    where
        F: FnOnce(&mut Tracker<JournalStore>) -> Result<R, TrackerError>,
    {
        let mut guard = self.lock();
        let tracker = guard.as_mut().ok_or_else(|| TrackerError::NotFound {
            what: "tracker (closed)".to_string(),
        })?;
        f(tracker)
    }

    fn with_store<F, R>(&self, f: F) -> Result<R, TrackerError>
    where
        F: FnOnce(&JournalStore) -> Result<R, TrackerError>,
    {
        self.with_tracker(|t| t.with_engine(|e| f(e.store())))
    }
}

// ============================================================================
// Formatting
// ============================================================================

#[uniffi::export]
pub fn ffi_format_distance(meters: f64) -> String {
    format::format_distance(meters)
}

#[uniffi::export]
pub fn ffi_format_duration(seconds: u64) -> String {
    format::format_duration(seconds)
}

#[uniffi::export]
pub fn ffi_format_duration_compact(seconds: u64) -> String {
    format::format_duration_compact(seconds)
}

#[uniffi::export]
pub fn ffi_format_duration_short(seconds: u64) -> String {
    format::format_duration_short(seconds)
}

#[uniffi::export]
pub fn ffi_format_pace(pace_seconds_per_km: Option<f64>) -> String {
    format::format_pace(pace_seconds_per_km)
}

#[uniffi::export]
pub fn ffi_daily_progress(steps: u32, goal: u32) -> f64 {
    daily_progress(steps, goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingListener(Arc<AtomicUsize>);

    impl SnapshotListener for CountingListener {
        fn on_snapshot(&self, _snapshot: LiveSnapshot) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn open_handle(dir: &tempfile::TempDir) -> Arc<SessionTrackerHandle> {
        let path = dir.path().join("journal.db");
        SessionTrackerHandle::new(path.to_str().unwrap().to_string()).unwrap()
    }

    #[test]
    fn test_replaced_listener_stops_receiving() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_handle(&dir);

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        handle
            .set_snapshot_listener(Box::new(CountingListener(Arc::clone(&first))))
            .unwrap();
        handle
            .set_snapshot_listener(Box::new(CountingListener(Arc::clone(&second))))
            .unwrap();

        handle.start().unwrap();
        handle.stop().unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert!(second.load(Ordering::SeqCst) >= 2);
        handle.close().unwrap();
    }

    #[test]
    fn test_cleared_listener_stops_receiving() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_handle(&dir);

        let count = Arc::new(AtomicUsize::new(0));
        handle
            .set_snapshot_listener(Box::new(CountingListener(Arc::clone(&count))))
            .unwrap();
        handle.clear_snapshot_listener();

        handle.start().unwrap();
        handle.stop().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        handle.close().unwrap();
    }
}
