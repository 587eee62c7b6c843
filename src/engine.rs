//! # Session Engine
//!
//! Stateful tracking engine for one walking/running session at a time.
//!
//! ## Lifecycle
//!
//! `Idle --start--> Active --finish--> Idle`. Finishing passes through a
//! momentary finished state in which the summary is persisted; if that write
//! fails the session stays active so nothing is lost. `start` while active and
//! `finish` while idle are no-ops.
//!
//! ## Filtering
//!
//! Location samples are dropped when the engine is idle, when coordinates are
//! invalid, when the reported accuracy radius exceeds
//! [`TrackerConfig::min_accuracy_meters`], or when the movement from the last
//! accepted point is below [`TrackerConfig::min_distance_meters`]. Jitter drops
//! keep the previous reference point, so slow movement still accumulates once
//! it clears the threshold.
//!
//! The engine performs no locking: callers serialize access (see
//! [`crate::tracker::Tracker`]).

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::events::{LiveSnapshot, SnapshotBus};
use crate::geo_utils::haversine_distance;
use crate::{
    day_key, GpsPoint, LocationSample, NewPhoto, Result, RoutePoint, SessionSummary,
    TrackerConfig,
};

// ============================================================================
// Persistence Boundary
// ============================================================================

/// Storage collaborator for the engine.
///
/// Implemented by [`crate::persistence::JournalStore`]. Any failure must be
/// reported as [`crate::TrackerError::PersistenceFailure`].
pub trait SessionStore {
    /// Create a new active session row and return its id.
    fn begin_session(&mut self, start_timestamp_ms: i64) -> Result<i64>;

    /// Append one accepted location to a session's route.
    fn append_route_point(&mut self, point: &RoutePoint) -> Result<()>;

    /// Overwrite the running totals of a session that is still active.
    fn update_session_progress(&mut self, progress: &SessionProgress) -> Result<()>;

    /// Mark a session finished with its final totals.
    fn finish_session(&mut self, summary: &SessionSummary) -> Result<()>;

    /// Add `steps` to the tally for `date` (`YYYY-MM-DD`), creating the day with `goal` if needed.
    fn increment_daily_steps(&mut self, date: &str, steps: u32, goal: u32, now_ms: i64)
        -> Result<()>;

    /// Record a photo and return its id.
    fn add_photo(&mut self, photo: &NewPhoto) -> Result<i64>;
}

/// Store that keeps nothing. Session ids are handed out sequentially.
#[derive(Debug, Default)]
pub struct NullStore {
    next_id: i64,
}

impl SessionStore for NullStore {
    fn begin_session(&mut self, _start_timestamp_ms: i64) -> Result<i64> {
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn append_route_point(&mut self, _point: &RoutePoint) -> Result<()> {
        Ok(())
    }

    fn update_session_progress(&mut self, _progress: &SessionProgress) -> Result<()> {
        Ok(())
    }

    fn finish_session(&mut self, _summary: &SessionSummary) -> Result<()> {
        Ok(())
    }

    fn increment_daily_steps(
        &mut self,
        _date: &str,
        _steps: u32,
        _goal: u32,
        _now_ms: i64,
    ) -> Result<()> {
        Ok(())
    }

    fn add_photo(&mut self, _photo: &NewPhoto) -> Result<i64> {
        Ok(0)
    }
}

/// Running totals of an active session, written periodically so an
/// interrupted session can be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub session_id: i64,
    pub total_steps: u64,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub average_pace_seconds_per_km: Option<f64>,
}

/// Minimum session time between two progress writes.
pub const PROGRESS_WRITE_INTERVAL_SECONDS: u64 = 10;

// ============================================================================
// Outcomes & Stats
// ============================================================================

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TrackingState {
    Idle,
    Active,
}

/// What happened to a submitted location sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationOutcome {
    /// First point of the session; recorded without adding distance
    First,
    /// Recorded; `delta_meters` added to the session distance
    Accepted { delta_meters: f64 },
    /// Movement below the jitter threshold; dropped
    Jitter { delta_meters: f64 },
    /// Accuracy radius above the threshold; dropped
    LowAccuracy { accuracy_meters: f64 },
    /// Non-finite or out-of-range coordinates; dropped
    Invalid,
    /// No session active; dropped
    Inactive,
}

impl LocationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            LocationOutcome::First | LocationOutcome::Accepted { .. }
        )
    }
}

/// What happened to a submitted step-counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// First reading of the session; establishes the zero point
    Baseline,
    /// Session steps updated
    Counted { session_steps: u64 },
    /// Counter went backwards (device reboot); re-baselined, steps carried over
    CounterReset { session_steps: u64 },
    /// No session active; dropped
    Inactive,
}

/// Filtering and lifecycle counters, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineStats {
    pub sessions_started: u32,
    pub sessions_finished: u32,
    pub locations_accepted: u32,
    pub locations_low_accuracy: u32,
    pub locations_jitter: u32,
    pub locations_invalid: u32,
    pub locations_inactive: u32,
    pub step_ticks_accepted: u32,
    pub step_ticks_inactive: u32,
    pub step_counter_resets: u32,
    pub persistence_failures: u32,
}

/// Pace in seconds per kilometre, or None unless both inputs are positive.
pub fn compute_pace(distance_meters: f64, duration_seconds: u64) -> Option<f64> {
    if distance_meters > 0.0 && duration_seconds > 0 {
        Some(duration_seconds as f64 / (distance_meters / 1000.0))
    } else {
        None
    }
}

// ============================================================================
// Active Session State
// ============================================================================

#[derive(Debug, Clone)]
struct ActiveSession {
    id: i64,
    start_timestamp_ms: i64,
    distance_meters: f64,
    session_steps: u64,
    /// Steps counted under earlier baselines (before a counter reset)
    carried_steps: u64,
    baseline_step_count: Option<u64>,
    duration_seconds: u64,
    pace_seconds_per_km: Option<f64>,
    last_accepted: Option<LocationSample>,
    /// Session duration at the last progress write
    progress_written_at_seconds: u64,
}

impl ActiveSession {
    fn new(id: i64, start_timestamp_ms: i64) -> Self {
        Self {
            id,
            start_timestamp_ms,
            distance_meters: 0.0,
            session_steps: 0,
            carried_steps: 0,
            baseline_step_count: None,
            duration_seconds: 0,
            pace_seconds_per_km: None,
            last_accepted: None,
            progress_written_at_seconds: 0,
        }
    }

    fn progress(&self) -> SessionProgress {
        SessionProgress {
            session_id: self.id,
            total_steps: self.session_steps,
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
            average_pace_seconds_per_km: self.pace_seconds_per_km,
        }
    }

    /// Recompute duration from wall clock and derive pace. Duration never decreases.
    fn refresh_timing(&mut self, now_ms: i64) {
        let elapsed = (now_ms - self.start_timestamp_ms).max(0) / 1000;
        self.duration_seconds = self.duration_seconds.max(elapsed as u64);
        self.pace_seconds_per_km = compute_pace(self.distance_meters, self.duration_seconds);
    }

    fn snapshot(&self, is_active: bool) -> LiveSnapshot {
        LiveSnapshot {
            session_id: Some(self.id),
            steps: self.session_steps,
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
            pace_seconds_per_km: self.pace_seconds_per_km,
            is_active,
        }
    }
}

// ============================================================================
// Session Engine
// ============================================================================

/// Converts raw sensor readings into one tracked session at a time.
pub struct SessionEngine<S: SessionStore> {
    store: S,
    config: TrackerConfig,
    active: Option<ActiveSession>,
    bus: SnapshotBus,
    stats: EngineStats,
}

impl<S: SessionStore> SessionEngine<S> {
    /// Create an idle engine over the given store.
    ///
    /// An invalid configuration is replaced by the defaults.
    pub fn new(store: S, config: TrackerConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("[SessionEngine] {}, using default configuration", e);
                TrackerConfig::default()
            }
        };
        Self {
            store,
            config,
            active: None,
            bus: SnapshotBus::new(),
            stats: EngineStats::default(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Begin a new session at `now_ms`.
    ///
    /// Returns the session id. If a session is already active this is a no-op
    /// and the active id is returned.
    pub fn start(&mut self, now_ms: i64) -> Result<i64> {
        if let Some(session) = &self.active {
            debug!(
                "[SessionEngine] start ignored, session {} already active",
                session.id
            );
            return Ok(session.id);
        }

        let id = self.store.begin_session(now_ms).map_err(|e| {
            self.stats.persistence_failures += 1;
            warn!("[SessionEngine] Could not create session: {}", e);
            e
        })?;

        self.active = Some(ActiveSession::new(id, now_ms));
        self.stats.sessions_started += 1;
        info!("[SessionEngine] Session {} started", id);
        self.publish();
        Ok(id)
    }

    /// Finish the active session at `now_ms` and return its summary.
    ///
    /// Duration and pace are recomputed from the wall clock at `now_ms`, not
    /// taken from the last tick. Returns `Ok(None)` when idle. On a store
    /// failure the session stays active with its accumulators intact.
    pub fn finish(&mut self, now_ms: i64) -> Result<Option<SessionSummary>> {
        let Some(session) = &self.active else {
            debug!("[SessionEngine] finish ignored, no active session");
            return Ok(None);
        };

        let mut closing = session.clone();
        closing.refresh_timing(now_ms);

        let summary = SessionSummary {
            session_id: closing.id,
            start_timestamp_ms: closing.start_timestamp_ms,
            end_timestamp_ms: now_ms,
            total_steps: closing.session_steps,
            distance_meters: closing.distance_meters,
            duration_seconds: closing.duration_seconds,
            average_pace_seconds_per_km: closing.pace_seconds_per_km,
        };

        if let Err(e) = self.store.finish_session(&summary) {
            self.stats.persistence_failures += 1;
            warn!(
                "[SessionEngine] Could not persist session {}: {}",
                summary.session_id, e
            );
            return Err(e);
        }

        self.active = None;
        self.stats.sessions_finished += 1;
        info!(
            "[SessionEngine] Session {} finished: {} steps, {:.0}m in {}s",
            summary.session_id,
            summary.total_steps,
            summary.distance_meters,
            summary.duration_seconds
        );
        self.bus.publish(closing.snapshot(false));
        Ok(Some(summary))
    }

    /// Same as [`finish`](Self::finish).
    pub fn stop(&mut self, now_ms: i64) -> Result<Option<SessionSummary>> {
        self.finish(now_ms)
    }

    // ========================================================================
    // Sensor Input
    // ========================================================================

    /// Apply one location sample.
    ///
    /// Filtering drops are reported through the outcome, never as errors. An
    /// error means the route point could not be stored; the distance and
    /// reference point are already updated in that case.
    pub fn submit_location(&mut self, sample: LocationSample) -> Result<LocationOutcome> {
        let Some(session) = self.active.as_mut() else {
            self.stats.locations_inactive += 1;
            return Ok(LocationOutcome::Inactive);
        };

        if !sample.point().is_valid() {
            self.stats.locations_invalid += 1;
            debug!(
                "[SessionEngine] Dropping invalid location ({}, {})",
                sample.latitude, sample.longitude
            );
            return Ok(LocationOutcome::Invalid);
        }

        if let Some(accuracy) = sample.accuracy_meters {
            // NaN accuracy fails the comparison and is dropped too
            if !(accuracy <= self.config.min_accuracy_meters) {
                self.stats.locations_low_accuracy += 1;
                return Ok(LocationOutcome::LowAccuracy {
                    accuracy_meters: accuracy,
                });
            }
        }

        let outcome = match &session.last_accepted {
            None => LocationOutcome::First,
            Some(last) => {
                let delta = haversine_distance(&last.point(), &sample.point());
                if delta < self.config.min_distance_meters {
                    self.stats.locations_jitter += 1;
                    return Ok(LocationOutcome::Jitter {
                        delta_meters: delta,
                    });
                }
                session.distance_meters += delta;
                LocationOutcome::Accepted {
                    delta_meters: delta,
                }
            }
        };

        session.last_accepted = Some(sample);
        let point = RoutePoint::from_sample(session.id, &sample);
        self.stats.locations_accepted += 1;
        self.publish();

        if let Err(e) = self.store.append_route_point(&point) {
            self.stats.persistence_failures += 1;
            warn!(
                "[SessionEngine] Route point for session {} not stored: {}",
                point.session_id, e
            );
            return Err(e);
        }
        Ok(outcome)
    }

    /// Apply one step-counter reading taken at `now_ms`.
    ///
    /// Every accepted reading also adds exactly one step to the daily tally for
    /// the local day of `now_ms`, independent of the session delta.
    pub fn submit_step_count(&mut self, cumulative_count: u64, now_ms: i64) -> Result<StepOutcome> {
        let Some(session) = self.active.as_mut() else {
            self.stats.step_ticks_inactive += 1;
            return Ok(StepOutcome::Inactive);
        };

        let outcome = match session.baseline_step_count {
            None => {
                session.baseline_step_count = Some(cumulative_count);
                session.session_steps = session.carried_steps;
                StepOutcome::Baseline
            }
            Some(baseline) if cumulative_count < baseline => {
                info!(
                    "[SessionEngine] Step counter went back from {} to {}, re-baselining",
                    baseline, cumulative_count
                );
                session.carried_steps = session.session_steps;
                session.baseline_step_count = Some(cumulative_count);
                self.stats.step_counter_resets += 1;
                StepOutcome::CounterReset {
                    session_steps: session.session_steps,
                }
            }
            Some(baseline) => {
                let counted = session.carried_steps + (cumulative_count - baseline);
                session.session_steps = session.session_steps.max(counted);
                StepOutcome::Counted {
                    session_steps: session.session_steps,
                }
            }
        };

        self.stats.step_ticks_accepted += 1;
        self.publish();

        let goal = self.config.daily_step_goal;
        if let Err(e) = self
            .store
            .increment_daily_steps(&day_key(now_ms), 1, goal, now_ms)
        {
            self.stats.persistence_failures += 1;
            warn!("[SessionEngine] Daily step tally not updated: {}", e);
            return Err(e);
        }
        Ok(outcome)
    }

    /// Convenience wrapper for [`submit_step_count`](Self::submit_step_count).
    pub fn submit_step_sample(&mut self, sample: crate::StepSample) -> Result<StepOutcome> {
        self.submit_step_count(sample.cumulative_count, sample.timestamp_ms)
    }

    /// Recompute duration and pace at `now_ms` and publish the snapshot.
    ///
    /// Every [`PROGRESS_WRITE_INTERVAL_SECONDS`] of session time the running
    /// totals are also written to the store. Returns `Ok(None)` when idle. A
    /// failed progress write is reported after the snapshot is published and
    /// is retried on the next tick.
    pub fn tick(&mut self, now_ms: i64) -> Result<Option<LiveSnapshot>> {
        let Some(session) = self.active.as_mut() else {
            return Ok(None);
        };
        session.refresh_timing(now_ms);
        let snapshot = session.snapshot(true);

        let due = session.duration_seconds
            >= session.progress_written_at_seconds + PROGRESS_WRITE_INTERVAL_SECONDS;
        let progress = session.progress();
        self.bus.publish(snapshot.clone());

        if due {
            if let Err(e) = self.store.update_session_progress(&progress) {
                self.stats.persistence_failures += 1;
                warn!(
                    "[SessionEngine] Progress for session {} not stored: {}",
                    progress.session_id, e
                );
                return Err(e);
            }
            if let Some(session) = self.active.as_mut() {
                session.progress_written_at_seconds = progress.duration_seconds;
            }
        }
        Ok(Some(snapshot))
    }

    /// Record a photo, tagged with the active session and its last accepted location.
    pub fn attach_photo(&mut self, file_path: &str, now_ms: i64) -> Result<i64> {
        let (session_id, location) = match &self.active {
            Some(session) => (
                Some(session.id),
                session.last_accepted.as_ref().map(|s| s.point()),
            ),
            None => (None, None),
        };

        let photo = NewPhoto {
            session_id,
            file_path: file_path.to_string(),
            timestamp_ms: now_ms,
            latitude: location.map(|p| p.latitude),
            longitude: location.map(|p| p.longitude),
        };

        self.store.add_photo(&photo).map_err(|e| {
            self.stats.persistence_failures += 1;
            warn!("[SessionEngine] Photo {} not stored: {}", file_path, e);
            e
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> TrackingState {
        if self.active.is_some() {
            TrackingState::Active
        } else {
            TrackingState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session_id(&self) -> Option<i64> {
        self.active.as_ref().map(|s| s.id)
    }

    /// Current state for presentation. Idle engines report an empty snapshot.
    pub fn snapshot(&self) -> LiveSnapshot {
        self.active
            .as_ref()
            .map(|s| s.snapshot(true))
            .unwrap_or_default()
    }

    pub fn last_accepted_location(&self) -> Option<GpsPoint> {
        self.active
            .as_ref()
            .and_then(|s| s.last_accepted.as_ref())
            .map(|s| s.point())
    }

    /// Subscribe to live snapshots.
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<LiveSnapshot> {
        self.bus.subscribe()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect for the next sample.
    pub fn set_config(&mut self, config: TrackerConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_daily_step_goal(&mut self, goal: u32) {
        self.config.daily_step_goal = goal;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Tear down the engine and hand back the store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.bus.publish(snapshot);
    }
}

// ============================================================================
// Tests
// ============================================================================
