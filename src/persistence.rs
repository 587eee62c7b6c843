//! # Journal Store
//!
//! SQLite-backed journal of tracked sessions.
//!
//! ## Tables
//!
//! - `sessions`: one row per tracked session, `is_active = 1` while tracking
//! - `route_points`: accepted locations, cascade-deleted with their session
//! - `daily_steps`: one row per local calendar day (`YYYY-MM-DD`)
//! - `photos`: photo records, optionally linked to a session
//! - `preferences`: user settings (daily step goal)
//!
//! The store is opened once at startup and closed explicitly with
//! [`JournalStore::close`]. It implements [`SessionStore`] so the engine can
//! write to it directly; the remaining methods serve history, dashboard and
//! gallery queries.

use chrono::{Days, Local, NaiveDate, NaiveTime};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use serde::{Deserialize, Serialize};

use crate::engine::{compute_pace, SessionProgress, SessionStore};
use crate::geo_utils::polyline_length;
use crate::{
    date_key, Bounds, DailyStepTotal, GpsPoint, NewPhoto, OptionExt, Photo, Result, RoutePoint,
    Session, SessionSummary, TrackerConfig, TrackerError, DEFAULT_DAILY_STEP_GOAL,
};

const DAILY_STEP_GOAL_KEY: &str = "daily_step_goal";

const SESSION_COLUMNS: &str = "id, start_timestamp_ms, end_timestamp_ms, total_steps, \
     distance_meters, duration_seconds, average_pace_seconds_per_km, is_active";

const ROUTE_POINT_COLUMNS: &str =
    "session_id, latitude, longitude, altitude, speed, timestamp_ms";

const PHOTO_COLUMNS: &str = "id, session_id, file_path, timestamp_ms, latitude, longitude";

// ============================================================================
// Types
// ============================================================================

/// Row counts, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct JournalStats {
    pub session_count: u32,
    pub active_session_count: u32,
    pub route_point_count: u32,
    pub photo_count: u32,
    pub days_recorded: u32,
}

/// A session with everything recorded during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    pub session: Session,
    pub route: Vec<RoutePoint>,
    pub bounds: Option<Bounds>,
    pub photos: Vec<Photo>,
}

// ============================================================================
// Journal Store
// ============================================================================

pub struct JournalStore {
    /// Database connection
    db: Connection,

    /// Database path (":memory:" for in-memory stores)
    db_path: String,
}

impl JournalStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) the journal at the given path.
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        info!("[JournalStore] Opened {}", db_path);

        Ok(Self {
            db,
            db_path: db_path.to_string(),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> SqlResult<()> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(
            r#"
            -- Tracked sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_timestamp_ms INTEGER NOT NULL,
                end_timestamp_ms INTEGER,
                total_steps INTEGER NOT NULL DEFAULT 0,
                distance_meters REAL NOT NULL DEFAULT 0,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                average_pace_seconds_per_km REAL,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            -- Accepted GPS points (append-only)
            CREATE TABLE IF NOT EXISTS route_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                altitude REAL,
                speed REAL,
                timestamp_ms INTEGER NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            -- Step tally per local calendar day
            CREATE TABLE IF NOT EXISTS daily_steps (
                date TEXT PRIMARY KEY,
                steps INTEGER NOT NULL DEFAULT 0,
                goal INTEGER NOT NULL DEFAULT 10000,
                last_updated_ms INTEGER NOT NULL
            );

            -- Photo records (session optional)
            CREATE TABLE IF NOT EXISTS photos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER,
                file_path TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                latitude REAL,
                longitude REAL,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            -- User preferences
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(is_active);
            CREATE INDEX IF NOT EXISTS idx_route_points_session ON route_points(session_id, timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_photos_session ON photos(session_id);
            CREATE INDEX IF NOT EXISTS idx_photos_timestamp ON photos(timestamp_ms);
        "#,
        )?;
        Ok(())
    }

    /// Close the database, reporting any error from flushing.
    pub fn close(self) -> Result<()> {
        let path = self.db_path;
        self.db.close().map_err(|(_, e)| TrackerError::from(e))?;
        info!("[JournalStore] Closed {}", path);
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub fn get_session(&self, id: i64) -> Result<Option<Session>> {
        let session = self
            .db
            .query_row(
                &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// The session currently marked active, if any.
    pub fn active_session(&self) -> Result<Option<Session>> {
        let session = self
            .db
            .query_row(
                &format!(
                    "SELECT {} FROM sessions WHERE is_active = 1 ORDER BY start_timestamp_ms DESC LIMIT 1",
                    SESSION_COLUMNS
                ),
                [],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// All sessions, newest first (active ones included).
    pub fn all_sessions(&self) -> Result<Vec<Session>> {
        self.query_sessions(
            &format!(
                "SELECT {} FROM sessions ORDER BY start_timestamp_ms DESC",
                SESSION_COLUMNS
            ),
            params![],
        )
    }

    /// Finished sessions, newest first.
    pub fn completed_sessions(&self) -> Result<Vec<Session>> {
        self.query_sessions(
            &format!(
                "SELECT {} FROM sessions WHERE is_active = 0 ORDER BY start_timestamp_ms DESC",
                SESSION_COLUMNS
            ),
            params![],
        )
    }

    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<Session>> {
        self.query_sessions(
            &format!(
                "SELECT {} FROM sessions ORDER BY start_timestamp_ms DESC LIMIT ?1",
                SESSION_COLUMNS
            ),
            params![limit],
        )
    }

    /// Sessions started in `[start_ms, end_ms)`, newest first.
    pub fn sessions_between(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Session>> {
        self.query_sessions(
            &format!(
                "SELECT {} FROM sessions
                 WHERE start_timestamp_ms >= ?1 AND start_timestamp_ms < ?2
                 ORDER BY start_timestamp_ms DESC",
                SESSION_COLUMNS
            ),
            params![start_ms, end_ms],
        )
    }

    /// Sessions started on the given local calendar day.
    pub fn sessions_for_day(&self, date: NaiveDate) -> Result<Vec<Session>> {
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
        self.sessions_between(local_midnight_ms(date), local_midnight_ms(next))
    }

    /// Delete a session along with its route points and photos.
    pub fn delete_session(&mut self, id: i64) -> Result<bool> {
        let deleted = self
            .db
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if deleted > 0 {
            info!("[JournalStore] Deleted session {}", id);
        }
        Ok(deleted > 0)
    }

    /// Close out sessions left active by a previous process.
    ///
    /// Totals come from the last progress write, extended by the stored route
    /// when it reaches further: the end time is the later of the last route
    /// point and the recorded duration, and the distance is the longer of the
    /// route length and the recorded distance. Returns the number of sessions
    /// closed.
    pub fn abandon_active_sessions(&mut self) -> Result<u32> {
        let stale = self.query_sessions(
            &format!("SELECT {} FROM sessions WHERE is_active = 1", SESSION_COLUMNS),
            params![],
        )?;

        for session in &stale {
            let route = self.route_points(session.id)?;
            let points: Vec<GpsPoint> = route.iter().map(|p| p.point()).collect();
            let recorded_end_ms =
                session.start_timestamp_ms + (session.duration_seconds as i64) * 1000;
            let end_ms = route
                .last()
                .map(|p| p.timestamp_ms)
                .unwrap_or(session.start_timestamp_ms)
                .max(recorded_end_ms);
            let distance = polyline_length(&points).max(session.distance_meters);
            let duration = ((end_ms - session.start_timestamp_ms) / 1000) as u64;

            self.finish_session(&SessionSummary {
                session_id: session.id,
                start_timestamp_ms: session.start_timestamp_ms,
                end_timestamp_ms: end_ms,
                total_steps: session.total_steps,
                distance_meters: distance,
                duration_seconds: duration,
                average_pace_seconds_per_km: compute_pace(distance, duration),
            })?;
        }

        if !stale.is_empty() {
            info!(
                "[JournalStore] Closed {} session(s) left active by a previous run",
                stale.len()
            );
        }
        Ok(stale.len() as u32)
    }

    fn query_sessions(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Session>> {
        let mut stmt = self.db.prepare(sql)?;
        let sessions = stmt
            .query_map(params, session_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(sessions)
    }

    // ========================================================================
    // Route Points
    // ========================================================================

    /// Route of a session, oldest point first.
    pub fn route_points(&self, session_id: i64) -> Result<Vec<RoutePoint>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {} FROM route_points WHERE session_id = ?1 ORDER BY timestamp_ms ASC, id ASC",
            ROUTE_POINT_COLUMNS
        ))?;
        let points = stmt
            .query_map(params![session_id], route_point_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(points)
    }

    pub fn last_route_point(&self, session_id: i64) -> Result<Option<RoutePoint>> {
        let point = self
            .db
            .query_row(
                &format!(
                    "SELECT {} FROM route_points WHERE session_id = ?1
                     ORDER BY timestamp_ms DESC, id DESC LIMIT 1",
                    ROUTE_POINT_COLUMNS
                ),
                params![session_id],
                route_point_from_row,
            )
            .optional()?;
        Ok(point)
    }

    pub fn route_point_count(&self, session_id: i64) -> Result<u32> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM route_points WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Bounding box of a session's route, for map display.
    pub fn route_bounds(&self, session_id: i64) -> Result<Option<Bounds>> {
        let points: Vec<GpsPoint> = self
            .route_points(session_id)?
            .iter()
            .map(|p| p.point())
            .collect();
        Ok(Bounds::from_points(&points))
    }

    // ========================================================================
    // Daily Steps
    // ========================================================================

    pub fn daily_steps(&self, date: &str) -> Result<Option<DailyStepTotal>> {
        let day = self
            .db
            .query_row(
                "SELECT date, steps, goal, last_updated_ms FROM daily_steps WHERE date = ?1",
                params![date],
                daily_from_row,
            )
            .optional()?;
        Ok(day)
    }

    /// Return the row for `date`, creating an empty one with `goal` if missing.
    pub fn get_or_create_daily_steps(
        &mut self,
        date: &str,
        goal: u32,
        now_ms: i64,
    ) -> Result<DailyStepTotal> {
        self.db.execute(
            "INSERT OR IGNORE INTO daily_steps (date, steps, goal, last_updated_ms)
             VALUES (?1, 0, ?2, ?3)",
            params![date, goal, now_ms],
        )?;
        self.daily_steps(date)?.ok_or_not_found(date)
    }

    /// Overwrite the tally for `date`.
    pub fn set_daily_steps(&mut self, date: &str, steps: u32, goal: u32, now_ms: i64) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO daily_steps (date, steps, goal, last_updated_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![date, steps, goal, now_ms],
        )?;
        Ok(())
    }

    /// Days in `[start, end]` (inclusive `YYYY-MM-DD` keys), oldest first.
    pub fn steps_between(&self, start: &str, end: &str) -> Result<Vec<DailyStepTotal>> {
        let mut stmt = self.db.prepare(
            "SELECT date, steps, goal, last_updated_ms FROM daily_steps
             WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
        )?;
        let days = stmt
            .query_map(params![start, end], daily_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(days)
    }

    /// The most recent `days` recorded days, newest first.
    pub fn last_days(&self, days: u32) -> Result<Vec<DailyStepTotal>> {
        let mut stmt = self.db.prepare(
            "SELECT date, steps, goal, last_updated_ms FROM daily_steps
             ORDER BY date DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![days], daily_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// The seven days ending with `today`, oldest first.
    pub fn steps_for_week(&self, today: NaiveDate) -> Result<Vec<DailyStepTotal>> {
        self.steps_for_window(today, 7)
    }

    /// The thirty days ending with `today`, oldest first.
    pub fn steps_for_month(&self, today: NaiveDate) -> Result<Vec<DailyStepTotal>> {
        self.steps_for_window(today, 30)
    }

    pub fn weekly_total(&self, today: NaiveDate) -> Result<u64> {
        let (start, end) = window_keys(today, 7);
        let total: Option<i64> = self.db.query_row(
            "SELECT SUM(steps) FROM daily_steps WHERE date >= ?1 AND date <= ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0) as u64)
    }

    /// Average over recorded days in the week; days with no row are not counted.
    pub fn weekly_average(&self, today: NaiveDate) -> Result<f64> {
        let (start, end) = window_keys(today, 7);
        let average: Option<f64> = self.db.query_row(
            "SELECT AVG(steps) FROM daily_steps WHERE date >= ?1 AND date <= ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(average.unwrap_or(0.0))
    }

    fn steps_for_window(&self, today: NaiveDate, days: u64) -> Result<Vec<DailyStepTotal>> {
        let (start, end) = window_keys(today, days);
        self.steps_between(&start, &end)
    }

    // ========================================================================
    // Photos
    // ========================================================================

    pub fn get_photo(&self, id: i64) -> Result<Option<Photo>> {
        let photo = self
            .db
            .query_row(
                &format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS),
                params![id],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    /// Photos of a session, newest first.
    pub fn photos_for_session(&self, session_id: i64) -> Result<Vec<Photo>> {
        self.query_photos(
            &format!(
                "SELECT {} FROM photos WHERE session_id = ?1 ORDER BY timestamp_ms DESC",
                PHOTO_COLUMNS
            ),
            params![session_id],
        )
    }

    /// Whole gallery, newest first.
    pub fn all_photos(&self) -> Result<Vec<Photo>> {
        self.query_photos(
            &format!("SELECT {} FROM photos ORDER BY timestamp_ms DESC", PHOTO_COLUMNS),
            params![],
        )
    }

    pub fn recent_photos(&self, limit: u32) -> Result<Vec<Photo>> {
        self.query_photos(
            &format!(
                "SELECT {} FROM photos ORDER BY timestamp_ms DESC LIMIT ?1",
                PHOTO_COLUMNS
            ),
            params![limit],
        )
    }

    pub fn photo_count(&self, session_id: i64) -> Result<u32> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM photos WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Remove a photo record. The image file itself is left to the caller.
    pub fn delete_photo(&mut self, id: i64) -> Result<bool> {
        let deleted = self
            .db
            .execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn query_photos(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Photo>> {
        let mut stmt = self.db.prepare(sql)?;
        let photos = stmt
            .query_map(params, photo_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(photos)
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    /// Daily step goal, or the default if the user never set one.
    pub fn daily_step_goal(&self) -> Result<u32> {
        let value: Option<String> = self
            .db
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![DAILY_STEP_GOAL_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DAILY_STEP_GOAL))
    }

    pub fn set_daily_step_goal(&mut self, goal: u32) -> Result<()> {
        if goal == 0 {
            return Err(TrackerError::config("daily step goal must be positive"));
        }
        self.db.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![DAILY_STEP_GOAL_KEY, goal.to_string()],
        )?;
        debug!("[JournalStore] Daily step goal set to {}", goal);
        Ok(())
    }

    /// Default tracker configuration with the stored step goal applied.
    pub fn tracker_config(&self) -> Result<TrackerConfig> {
        Ok(TrackerConfig::default().with_daily_step_goal(self.daily_step_goal()?))
    }

    // ========================================================================
    // Export & Stats
    // ========================================================================

    pub fn export_session(&self, id: i64) -> Result<SessionExport> {
        let session = self
            .get_session(id)?
            .ok_or_not_found(&format!("session {}", id))?;
        let route = self.route_points(id)?;
        let points: Vec<GpsPoint> = route.iter().map(|p| p.point()).collect();
        Ok(SessionExport {
            session,
            bounds: Bounds::from_points(&points),
            route,
            photos: self.photos_for_session(id)?,
        })
    }

    /// Session with its route and photos as JSON.
    pub fn export_session_json(&self, id: i64) -> Result<String> {
        let export = self.export_session(id)?;
        serde_json::to_string(&export).map_err(|e| TrackerError::persistence(e.to_string()))
    }

    pub fn stats(&self) -> Result<JournalStats> {
        let count = |sql: &str| -> Result<u32> {
            let n: i64 = self.db.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u32)
        };
        Ok(JournalStats {
            session_count: count("SELECT COUNT(*) FROM sessions")?,
            active_session_count: count("SELECT COUNT(*) FROM sessions WHERE is_active = 1")?,
            route_point_count: count("SELECT COUNT(*) FROM route_points")?,
            photo_count: count("SELECT COUNT(*) FROM photos")?,
            days_recorded: count("SELECT COUNT(*) FROM daily_steps")?,
        })
    }
}

// ============================================================================
// Engine Boundary
// ============================================================================

impl SessionStore for JournalStore {
    fn begin_session(&mut self, start_timestamp_ms: i64) -> Result<i64> {
        self.db.execute(
            "INSERT INTO sessions (start_timestamp_ms, is_active) VALUES (?1, 1)",
            params![start_timestamp_ms],
        )?;
        Ok(self.db.last_insert_rowid())
    }

    fn append_route_point(&mut self, point: &RoutePoint) -> Result<()> {
        self.db.execute(
            "INSERT INTO route_points (session_id, latitude, longitude, altitude, speed, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                point.session_id,
                point.latitude,
                point.longitude,
                point.altitude,
                point.speed,
                point.timestamp_ms
            ],
        )?;
        Ok(())
    }

    fn update_session_progress(&mut self, progress: &SessionProgress) -> Result<()> {
        let updated = self.db.execute(
            "UPDATE sessions SET total_steps = ?2, distance_meters = ?3, duration_seconds = ?4,
                 average_pace_seconds_per_km = ?5
             WHERE id = ?1 AND is_active = 1",
            params![
                progress.session_id,
                progress.total_steps as i64,
                progress.distance_meters,
                progress.duration_seconds as i64,
                progress.average_pace_seconds_per_km
            ],
        )?;
        if updated == 0 {
            return Err(TrackerError::persistence(format!(
                "session {} is not active",
                progress.session_id
            )));
        }
        Ok(())
    }

    fn finish_session(&mut self, summary: &SessionSummary) -> Result<()> {
        let updated = self.db.execute(
            "UPDATE sessions SET is_active = 0, end_timestamp_ms = ?2, total_steps = ?3,
                 distance_meters = ?4, duration_seconds = ?5, average_pace_seconds_per_km = ?6
             WHERE id = ?1",
            params![
                summary.session_id,
                summary.end_timestamp_ms,
                summary.total_steps as i64,
                summary.distance_meters,
                summary.duration_seconds as i64,
                summary.average_pace_seconds_per_km
            ],
        )?;
        if updated == 0 {
            return Err(TrackerError::persistence(format!(
                "session {} does not exist",
                summary.session_id
            )));
        }
        Ok(())
    }

    fn increment_daily_steps(
        &mut self,
        date: &str,
        steps: u32,
        goal: u32,
        now_ms: i64,
    ) -> Result<()> {
        self.db.execute(
            "INSERT INTO daily_steps (date, steps, goal, last_updated_ms) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO UPDATE SET
                 steps = steps + excluded.steps,
                 goal = excluded.goal,
                 last_updated_ms = excluded.last_updated_ms",
            params![date, steps, goal, now_ms],
        )?;
        Ok(())
    }

    fn add_photo(&mut self, photo: &NewPhoto) -> Result<i64> {
        self.db.execute(
            "INSERT INTO photos (session_id, file_path, timestamp_ms, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                photo.session_id,
                photo.file_path,
                photo.timestamp_ms,
                photo.latitude,
                photo.longitude
            ],
        )?;
        Ok(self.db.last_insert_rowid())
    }
}

// ============================================================================
// Row Mapping
// ============================================================================

fn session_from_row(row: &Row<'_>) -> SqlResult<Session> {
    Ok(Session {
        id: row.get(0)?,
        start_timestamp_ms: row.get(1)?,
        end_timestamp_ms: row.get(2)?,
        total_steps: row.get::<_, i64>(3)?.max(0) as u64,
        distance_meters: row.get(4)?,
        duration_seconds: row.get::<_, i64>(5)?.max(0) as u64,
        average_pace_seconds_per_km: row.get(6)?,
        is_active: row.get(7)?,
    })
}

fn route_point_from_row(row: &Row<'_>) -> SqlResult<RoutePoint> {
    Ok(RoutePoint {
        session_id: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        altitude: row.get(3)?,
        speed: row.get(4)?,
        timestamp_ms: row.get(5)?,
    })
}

fn daily_from_row(row: &Row<'_>) -> SqlResult<DailyStepTotal> {
    Ok(DailyStepTotal {
        date: row.get(0)?,
        steps: row.get(1)?,
        goal: row.get(2)?,
        last_updated_ms: row.get(3)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> SqlResult<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        session_id: row.get(1)?,
        file_path: row.get(2)?,
        timestamp_ms: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
    })
}

// ============================================================================
// Date Helpers
// ============================================================================

/// Inclusive `(start, end)` day keys for the `days`-long window ending at `today`.
fn window_keys(today: NaiveDate, days: u64) -> (String, String) {
    let start = today
        .checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(today);
    (date_key(start), date_key(today))
}

fn local_midnight_ms(date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

// ============================================================================
// Tests
// ============================================================================
