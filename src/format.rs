//! Display formatting for distances, durations and paces.

/// Shown instead of a pace that is missing or not meaningful.
pub const PACE_PLACEHOLDER: &str = "--:--";

/// Paces slower than this (1 hour per km) are treated as standing still.
pub const MAX_DISPLAY_PACE_SECONDS_PER_KM: f64 = 3600.0;

/// `"850 m"` below one kilometre, `"1.50 km"` from one kilometre up.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

/// Stopwatch style: `"MM:SS"` under an hour, `"H:MM:SS"` from an hour up.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// History list style: `"1h 05min"` or `"5min 07s"`.
pub fn format_duration_compact(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}h {:02}min", hours, minutes)
    } else {
        format!("{}min {:02}s", minutes, secs)
    }
}

/// Dashboard style: `"1h 5min"` or `"5min"`.
pub fn format_duration_short(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}min", hours, minutes)
    } else {
        format!("{}min", minutes)
    }
}

/// `"M:SS min/km"`, rounded to the nearest second.
///
/// Returns [`PACE_PLACEHOLDER`] for a missing, non-positive, non-finite, or
/// implausibly slow pace.
pub fn format_pace(pace_seconds_per_km: Option<f64>) -> String {
    let pace = match pace_seconds_per_km {
        Some(p) if p.is_finite() && p > 0.0 && p <= MAX_DISPLAY_PACE_SECONDS_PER_KM => p,
        _ => return PACE_PLACEHOLDER.to_string(),
    };
    let total = pace.round() as u64;
    format!("{}:{:02} min/km", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(850.0), "850 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(1500.0), "1.50 km");
        assert_eq!(format_distance(12_346.0), "12.35 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(45), "00:45");
        assert_eq!(format_duration(600), "10:00");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3665), "1:01:05");
    }

    #[test]
    fn test_format_duration_variants() {
        assert_eq!(format_duration_compact(307), "5min 07s");
        assert_eq!(format_duration_compact(3900), "1h 05min");
        assert_eq!(format_duration_short(307), "5min");
        assert_eq!(format_duration_short(3900), "1h 5min");
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(Some(600.0)), "10:00 min/km");
        assert_eq!(format_pace(Some(330.4)), "5:30 min/km");
        assert_eq!(format_pace(Some(330.6)), "5:31 min/km");
        assert_eq!(format_pace(Some(599.9996)), "10:00 min/km");
        assert_eq!(format_pace(Some(3600.0)), "60:00 min/km");
    }

    #[test]
    fn test_format_pace_placeholder() {
        assert_eq!(format_pace(None), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(0.0)), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(-5.0)), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(3600.5)), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(f64::INFINITY)), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(f64::NAN)), PACE_PLACEHOLDER);
    }
}
