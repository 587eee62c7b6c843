//! Aggregations for the history screen and the step dashboard.

use serde::{Deserialize, Serialize};

use crate::{DailyStepTotal, Session};

/// Totals over finished sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HistorySummary {
    pub total_sessions: u32,
    pub total_steps: u64,
    pub total_distance_meters: f64,
    pub total_duration_seconds: u64,
}

impl HistorySummary {
    /// Sum up completed sessions. Sessions still being tracked are skipped.
    pub fn from_sessions(sessions: &[Session]) -> Self {
        sessions
            .iter()
            .filter(|s| !s.is_active)
            .fold(Self::default(), |mut acc, s| {
                acc.total_sessions += 1;
                acc.total_steps += s.total_steps;
                acc.total_distance_meters += s.distance_meters;
                acc.total_duration_seconds += s.duration_seconds;
                acc
            })
    }
}

/// Step totals over a window of days (normally the last seven).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct WeeklySteps {
    pub days: Vec<DailyStepTotal>,
    pub total_steps: u64,
    /// Mean over the recorded days only
    pub average_steps: f64,
    /// Recorded days on which the goal was reached
    pub days_goal_met: u32,
}

impl WeeklySteps {
    pub fn from_days(days: &[DailyStepTotal]) -> Self {
        let total_steps: u64 = days.iter().map(|d| d.steps as u64).sum();
        let average_steps = if days.is_empty() {
            0.0
        } else {
            total_steps as f64 / days.len() as f64
        };
        let days_goal_met = days
            .iter()
            .filter(|d| d.goal > 0 && d.steps >= d.goal)
            .count() as u32;

        Self {
            days: days.to_vec(),
            total_steps,
            average_steps,
            days_goal_met,
        }
    }
}

/// Fraction of the daily goal reached, clamped to `[0, 1]`.
///
/// A zero goal yields `0.0` rather than dividing by zero.
pub fn daily_progress(steps: u32, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    (steps as f64 / goal as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: i64, steps: u64, distance: f64, duration: u64, active: bool) -> Session {
        Session {
            id,
            start_timestamp_ms: id * 1_000,
            end_timestamp_ms: if active { None } else { Some(id * 1_000 + 500) },
            total_steps: steps,
            distance_meters: distance,
            duration_seconds: duration,
            average_pace_seconds_per_km: None,
            is_active: active,
        }
    }

    fn day(date: &str, steps: u32, goal: u32) -> DailyStepTotal {
        DailyStepTotal {
            date: date.to_string(),
            steps,
            goal,
            last_updated_ms: 0,
        }
    }

    #[test]
    fn test_history_summary_skips_active() {
        let summary = HistorySummary::from_sessions(&[
            session(1, 1_000, 800.0, 600, false),
            session(2, 2_500, 2_200.0, 1_500, false),
            session(3, 99, 50.0, 30, true),
        ]);
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.total_steps, 3_500);
        assert!((summary.total_distance_meters - 3_000.0).abs() < 1e-9);
        assert_eq!(summary.total_duration_seconds, 2_100);

        assert_eq!(HistorySummary::from_sessions(&[]), HistorySummary::default());
    }

    #[test]
    fn test_weekly_steps() {
        let week = WeeklySteps::from_days(&[
            day("2024-05-12", 12_000, 10_000),
            day("2024-05-13", 4_000, 10_000),
            day("2024-05-14", 5_000, 0),
        ]);
        assert_eq!(week.total_steps, 21_000);
        assert!((week.average_steps - 7_000.0).abs() < 1e-9);
        assert_eq!(week.days_goal_met, 1);
        assert_eq!(week.days.len(), 3);

        let empty = WeeklySteps::from_days(&[]);
        assert_eq!(empty.average_steps, 0.0);
    }

    #[test]
    fn test_daily_progress() {
        assert_eq!(daily_progress(5_000, 10_000), 0.5);
        assert_eq!(daily_progress(15_000, 10_000), 1.0);
        assert_eq!(daily_progress(0, 10_000), 0.0);
        assert_eq!(daily_progress(500, 0), 0.0);
    }
}
