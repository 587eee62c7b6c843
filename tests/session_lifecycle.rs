//! Session lifecycle integration tests.
//!
//! Tests the full pipeline: sensor samples -> engine -> SQLite journal -> queries.
//!
//! Run with: `cargo test --test session_lifecycle`

use session_tracker::geo_utils::offset_north;
use session_tracker::stats::{HistorySummary, WeeklySteps};
use session_tracker::{
    day_key, local_date, GpsPoint, JournalStore, LocationOutcome, LocationSample, SessionEngine,
    SessionStore, TrackerConfig, TrackerError,
};
use tempfile::TempDir;

const ORIGIN: (f64, f64) = (52.2297, 21.0122);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Helper: open a journal in a temp dir, return engine + temp dir.
fn setup_engine() -> (SessionEngine<JournalStore>, TempDir) {
    init_logger();
    let tmp_dir = TempDir::new().expect("failed to create temp dir");
    let db_path = tmp_dir.path().join("journal.db");
    let store = JournalStore::open(db_path.to_str().unwrap()).expect("failed to open journal");
    let config = store.tracker_config().expect("failed to read config");
    (SessionEngine::new(store, config), tmp_dir)
}

fn sample_at(meters_north: f64, timestamp_ms: i64) -> LocationSample {
    let p = offset_north(&GpsPoint::new(ORIGIN.0, ORIGIN.1), meters_north);
    LocationSample::new(p.latitude, p.longitude, timestamp_ms).with_accuracy(5.0)
}

// ============================================================================
// Test: Full Session
// ============================================================================

#[test]
fn test_full_session_is_journaled() {
    let (mut engine, tmp) = setup_engine();
    let t0 = 1_700_000_000_000;

    let id = engine.start(t0).unwrap();

    // Route: 1 km north in 100 m steps, one jittery and one inaccurate sample
    for i in 0..=10 {
        let outcome = engine
            .submit_location(sample_at(i as f64 * 100.0, t0 + i * 30_000))
            .unwrap();
        assert!(outcome.is_accepted());
        if i == 5 {
            let jitter = engine
                .submit_location(sample_at(501.0, t0 + i * 30_000 + 500))
                .unwrap();
            assert!(matches!(jitter, LocationOutcome::Jitter { .. }));
            let blurry = engine
                .submit_location(
                    LocationSample::new(ORIGIN.0, ORIGIN.1, t0 + i * 30_000 + 700)
                        .with_accuracy(50.0),
                )
                .unwrap();
            assert!(matches!(blurry, LocationOutcome::LowAccuracy { .. }));
        }
    }

    // Steps: baseline 10_000, then 1_200 more
    for count in 10_000..=11_200u64 {
        engine.submit_step_count(count, t0 + 1_000).unwrap();
    }

    let summary = engine.finish(t0 + 300_000).unwrap().unwrap();
    assert_eq!(summary.session_id, id);
    assert_eq!(summary.total_steps, 1_200);
    assert_eq!(summary.duration_seconds, 300);
    assert!((summary.distance_meters - 1_000.0).abs() < 0.1);
    let pace = summary.average_pace_seconds_per_km.unwrap();
    assert!((pace - 300.0).abs() < 0.1);

    let store = engine.into_store();
    let stored = store.get_session(id).unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.end_timestamp_ms, Some(t0 + 300_000));
    assert_eq!(stored.total_steps, 1_200);
    assert_eq!(store.route_point_count(id).unwrap(), 11);

    // Daily tally counts every step event, the baseline reading included
    let today = store.daily_steps(&day_key(t0 + 1_000)).unwrap().unwrap();
    assert_eq!(today.steps, 1_201);
    assert_eq!(today.goal, 10_000);

    store.close().unwrap();
    drop(tmp);
}

// ============================================================================
// Test: Reopen
// ============================================================================

#[test]
fn test_journal_survives_reopen() {
    let (mut engine, tmp) = setup_engine();
    let db_path = tmp.path().join("journal.db");

    let id = engine.start(0).unwrap();
    engine.submit_location(sample_at(0.0, 1_000)).unwrap();
    engine.submit_location(sample_at(250.0, 61_000)).unwrap();
    engine.finish(120_000).unwrap();
    engine.into_store().close().unwrap();

    let store = JournalStore::open(db_path.to_str().unwrap()).unwrap();
    let sessions = store.completed_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, id);
    assert_eq!(sessions[0].duration_seconds, 120);

    let route = store.route_points(id).unwrap();
    assert_eq!(route.len(), 2);
    assert_eq!(route[0].timestamp_ms, 1_000);

    let history = HistorySummary::from_sessions(&sessions);
    assert_eq!(history.total_sessions, 1);
    assert!((history.total_distance_meters - 250.0).abs() < 0.1);
}

#[test]
fn test_interrupted_session_closed_on_next_open() {
    let (mut engine, tmp) = setup_engine();
    let db_path = tmp.path().join("journal.db");

    let id = engine.start(0).unwrap();
    engine.submit_location(sample_at(0.0, 0)).unwrap();
    engine.submit_location(sample_at(400.0, 240_000)).unwrap();
    // Process dies without finishing
    engine.into_store().close().unwrap();

    let mut store = JournalStore::open(db_path.to_str().unwrap()).unwrap();
    assert_eq!(store.active_session().unwrap().unwrap().id, id);
    assert_eq!(store.abandon_active_sessions().unwrap(), 1);

    let session = store.get_session(id).unwrap().unwrap();
    assert!(!session.is_active);
    assert_eq!(session.duration_seconds, 240);
    assert!((session.distance_meters - 400.0).abs() < 0.1);
}

#[test]
fn test_interrupted_session_keeps_progress() {
    let (mut engine, tmp) = setup_engine();
    let db_path = tmp.path().join("journal.db");

    let id = engine.start(0).unwrap();
    engine.submit_location(sample_at(0.0, 0)).unwrap();
    engine.submit_location(sample_at(150.0, 60_000)).unwrap();
    for count in 2_000..=2_800u64 {
        engine.submit_step_count(count, 60_000).unwrap();
    }
    engine.tick(95_000).unwrap();

    // Steps after the last progress write are lost with the process
    engine.submit_step_count(2_900, 96_000).unwrap();
    engine.into_store().close().unwrap();

    let mut store = JournalStore::open(db_path.to_str().unwrap()).unwrap();
    let stale = store.active_session().unwrap().unwrap();
    assert_eq!(stale.total_steps, 800);
    assert_eq!(stale.duration_seconds, 95);

    assert_eq!(store.abandon_active_sessions().unwrap(), 1);
    let session = store.get_session(id).unwrap().unwrap();
    assert!(!session.is_active);
    assert_eq!(session.total_steps, 800);
    assert_eq!(session.duration_seconds, 95);
    assert_eq!(session.end_timestamp_ms, Some(95_000));
    assert!((session.distance_meters - 150.0).abs() < 0.1);
    assert!(session.average_pace_seconds_per_km.is_some());
}

// ============================================================================
// Test: Photos & Deletion
// ============================================================================

#[test]
fn test_photos_follow_session_deletion() {
    let (mut engine, _tmp) = setup_engine();

    let id = engine.start(0).unwrap();
    engine.submit_location(sample_at(0.0, 1_000)).unwrap();
    let photo_id = engine.attach_photo("file:///DCIM/run.jpg", 2_000).unwrap();
    engine.finish(10_000).unwrap();

    // Photo taken while idle stays unlinked
    let loose_id = engine.attach_photo("file:///DCIM/later.jpg", 20_000).unwrap();

    let mut store = engine.into_store();
    let photo = store.get_photo(photo_id).unwrap().unwrap();
    assert_eq!(photo.session_id, Some(id));
    assert!((photo.latitude.unwrap() - ORIGIN.0).abs() < 1e-9);
    assert_eq!(store.get_photo(loose_id).unwrap().unwrap().session_id, None);

    assert!(store.delete_session(id).unwrap());
    assert!(store.get_session(id).unwrap().is_none());
    assert!(store.route_points(id).unwrap().is_empty());
    assert!(store.get_photo(photo_id).unwrap().is_none());
    assert!(store.get_photo(loose_id).unwrap().is_some());
}

// ============================================================================
// Test: Daily Steps & Goal
// ============================================================================

#[test]
fn test_goal_preference_applies_to_daily_steps() {
    let (engine, tmp) = setup_engine();
    let db_path = tmp.path().join("journal.db");
    let mut store = engine.into_store();
    store.set_daily_step_goal(6_000).unwrap();
    store.close().unwrap();

    let store = JournalStore::open(db_path.to_str().unwrap()).unwrap();
    let config: TrackerConfig = store.tracker_config().unwrap();
    assert_eq!(config.daily_step_goal, 6_000);

    let mut engine = SessionEngine::new(store, config);
    let now = 1_700_000_000_000;
    engine.start(now).unwrap();
    for count in 0..=6_000u64 {
        engine.submit_step_count(count, now).unwrap();
    }

    let store = engine.into_store();
    let week = WeeklySteps::from_days(&store.steps_for_week(local_date(now)).unwrap());
    assert_eq!(week.total_steps, 6_001);
    assert_eq!(week.days_goal_met, 1);
    assert_eq!(store.weekly_total(local_date(now)).unwrap(), 6_001);
}

#[test]
fn test_store_rejects_orphan_route_point() {
    let (engine, _tmp) = setup_engine();
    let mut store = engine.into_store();
    let err = store
        .append_route_point(&session_tracker::RoutePoint::from_sample(
            404,
            &sample_at(0.0, 0),
        ))
        .unwrap_err();
    assert!(matches!(err, TrackerError::PersistenceFailure { .. }));
}
