//! # Session Tracker
//!
//! Tracking core of a fitness journal: turns raw GPS and step-counter readings
//! into a recorded walking/running session.
//!
//! This library provides:
//! - A session engine with GPS accuracy/jitter filtering, distance, pace and
//!   duration accumulation, and step-counter baselining
//! - A periodic ticker and a serialized tracker facade for sensor callbacks
//! - A SQLite journal store for sessions, routes, daily steps and photos
//! - Formatting and dashboard statistics helpers
//!
//! ## Features
//!
//! - **`persistence`** (default) - SQLite journal store
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use session_tracker::{LocationSample, SessionEngine, TrackerConfig};
//! use session_tracker::engine::NullStore;
//!
//! let mut engine = SessionEngine::new(NullStore::default(), TrackerConfig::default());
//! engine.start(0).unwrap();
//! engine.submit_location(LocationSample::new(52.2297, 21.0122, 1_000)).unwrap();
//! engine.submit_location(LocationSample::new(52.2387, 21.0122, 300_000)).unwrap();
//! engine.tick(600_000).unwrap();
//!
//! let summary = engine.finish(600_000).unwrap().unwrap();
//! println!("{}", session_tracker::format::format_distance(summary.distance_meters));
//! ```

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

// Geographic utilities (haversine distance, path length)
pub mod geo_utils;

// Snapshot publication to dashboard subscribers
pub mod events;
pub use events::{LiveSnapshot, SnapshotBus};

// Session state machine
pub mod engine;
pub use engine::{
    EngineStats, LocationOutcome, SessionEngine, SessionProgress, SessionStore, StepOutcome,
    TrackingState,
};

// Periodic timer driving engine ticks
pub mod ticker;
pub use ticker::TickerHandle;

// Serialized facade owning engine + ticker
pub mod tracker;
pub use tracker::Tracker;

// Display formatting (distance, duration, pace)
pub mod format;

// History and dashboard aggregations
pub mod stats;
pub use stats::{daily_progress, HistorySummary, WeeklySteps};

// SQLite journal store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::{JournalStats, JournalStore, SessionExport};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("SessionTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use session_tracker::GpsPoint;
/// let point = GpsPoint::new(52.2297, 21.0122); // Warsaw
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a recorded route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A raw location reading from the platform location service.
///
/// Not persisted directly: it is either filtered into a [`RoutePoint`] or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, if the provider reported one
    pub accuracy_meters: Option<f64>,
    /// Altitude in meters above WGS84
    pub altitude: Option<f64>,
    /// Ground speed in m/s
    pub speed: Option<f64>,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: None,
            altitude: None,
            speed: None,
            timestamp_ms,
        }
    }

    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = Some(accuracy_meters);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A raw step-counter reading. The count is monotonic since the last device reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct StepSample {
    pub cumulative_count: u64,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

/// One accepted location, appended to its session's route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RoutePoint {
    pub session_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

impl RoutePoint {
    pub fn from_sample(session_id: i64, sample: &LocationSample) -> Self {
        Self {
            session_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: sample.altitude,
            speed: sample.speed,
            timestamp_ms: sample.timestamp_ms,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A stored session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Session {
    pub id: i64,
    /// Unix timestamp in milliseconds
    pub start_timestamp_ms: i64,
    /// None while the session is still being tracked
    pub end_timestamp_ms: Option<i64>,
    pub total_steps: u64,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub average_pace_seconds_per_km: Option<f64>,
    pub is_active: bool,
}

/// Immutable result of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SessionSummary {
    pub session_id: i64,
    pub start_timestamp_ms: i64,
    pub end_timestamp_ms: i64,
    /// Session-relative steps
    pub total_steps: u64,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub average_pace_seconds_per_km: Option<f64>,
}

/// Steps recorded on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct DailyStepTotal {
    /// Local calendar day, `YYYY-MM-DD`
    pub date: String,
    pub steps: u32,
    pub goal: u32,
    /// Unix timestamp in milliseconds
    pub last_updated_ms: i64,
}

/// A photo to be recorded in the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct NewPhoto {
    /// Session the photo was taken in, if any
    pub session_id: Option<i64>,
    pub file_path: String,
    pub timestamp_ms: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A stored photo record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Photo {
    pub id: i64,
    pub session_id: Option<i64>,
    pub file_path: String,
    pub timestamp_ms: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Configuration for the session engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default)]
pub struct TrackerConfig {
    /// Samples with a reported accuracy radius above this are dropped.
    /// Default: 20.0 meters
    pub min_accuracy_meters: f64,

    /// Movement below this distance from the last accepted point is treated as GPS jitter.
    /// Default: 2.0 meters
    pub min_distance_meters: f64,

    /// Interval between engine ticks while a session is active.
    /// Default: 1000 ms
    pub tick_interval_ms: u64,

    /// Daily step goal, normally read from user preferences.
    /// Default: 10000
    pub daily_step_goal: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_accuracy_meters: 20.0,
            min_distance_meters: 2.0,
            tick_interval_ms: 1000,
            daily_step_goal: DEFAULT_DAILY_STEP_GOAL,
        }
    }
}

/// Daily step goal used when the user has not set one.
pub const DEFAULT_DAILY_STEP_GOAL: u32 = 10_000;

impl TrackerConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn with_daily_step_goal(mut self, goal: u32) -> Self {
        self.daily_step_goal = goal;
        self
    }

    /// Reject thresholds that would make filtering meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.min_accuracy_meters.is_finite() || self.min_accuracy_meters <= 0.0 {
            return Err(TrackerError::config(format!(
                "min_accuracy_meters must be positive, got {}",
                self.min_accuracy_meters
            )));
        }
        if !self.min_distance_meters.is_finite() || self.min_distance_meters < 0.0 {
            return Err(TrackerError::config(format!(
                "min_distance_meters must be non-negative, got {}",
                self.min_distance_meters
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(TrackerError::config("tick_interval_ms must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Time Helpers
// ============================================================================

/// Current wall-clock time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local calendar date for a Unix millisecond timestamp.
pub fn local_date(timestamp_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .with_timezone(&Local)
        .date_naive()
}

/// Daily step table key (`YYYY-MM-DD`) for a Unix millisecond timestamp.
pub fn day_key(timestamp_ms: i64) -> String {
    date_key(local_date(timestamp_ms))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ============================================================================
// Tests
// ============================================================================
