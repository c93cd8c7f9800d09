//! Fractional-hour arithmetic shared by the overlay, store and layout code.
//!
//! Hours are `f64` values where `9.5` means 09:30. A calendar day may start
//! at an hour other than midnight, so values earlier than the day start are
//! shifted onto a single increasing axis with [`effective_hour`].

pub const HOURS_PER_DAY: f64 = 24.0;
pub const QUARTER_HOUR: f64 = 0.25;
pub const LAST_QUARTER_HOUR: f64 = HOURS_PER_DAY - QUARTER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourInterval {
    pub start: f64,
    pub end: f64,
}

impl HourInterval {
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

pub fn normalize_hour(hour: f64) -> f64 {
    let normalized = hour.rem_euclid(HOURS_PER_DAY);
    // rem_euclid can round up to exactly 24.0 for tiny negative inputs
    if normalized >= HOURS_PER_DAY {
        0.0
    } else {
        normalized
    }
}

pub fn effective_hour(hour: f64, day_start_hour: f64) -> f64 {
    if hour < day_start_hour {
        hour + HOURS_PER_DAY
    } else {
        hour
    }
}

pub fn format_clock_label(hour: f64) -> String {
    let normalized = normalize_hour(hour).floor() as u32;
    let meridiem = if normalized >= 12 { "PM" } else { "AM" };
    let display_hour = match normalized % 12 {
        0 => 12,
        other => other,
    };
    format!("{display_hour}:00 {meridiem}")
}

/// Splits a possibly wrapping range into intervals on the `[0, 24)` axis.
///
/// `start <= end` yields the single interval `[start, end)` (empty when the
/// bounds are equal); otherwise the range wraps midnight and yields
/// `[start, 24)` followed by `[0, end)`.
pub fn split_overnight(start: f64, end: f64) -> Vec<HourInterval> {
    if start <= end {
        vec![HourInterval { start, end }]
    } else {
        vec![
            HourInterval {
                start,
                end: HOURS_PER_DAY,
            },
            HourInterval { start: 0.0, end },
        ]
    }
}

pub fn snap_to_quarter(hours: f64) -> f64 {
    (hours * 4.0).round() / 4.0
}

pub fn hours_from_parts(hours: u32, minutes: u32) -> f64 {
    f64::from(hours) + f64::from(minutes) / 60.0
}

/// Whole hours and rounded minutes, carrying a rounded 60 into the hour.
pub fn split_hours_minutes(hours: f64) -> (u32, u32) {
    let hours = hours.max(0.0);
    let mut whole = hours.floor() as u32;
    let mut minutes = ((hours - hours.floor()) * 60.0).round() as u32;
    if minutes >= 60 {
        whole += 1;
        minutes -= 60;
    }
    (whole, minutes)
}

pub fn format_duration_label(duration_hours: f64) -> String {
    let (hours, minutes) = split_hours_minutes(duration_hours);
    if minutes > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{hours}h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_hour_wraps_into_day() {
        assert_eq!(normalize_hour(25.5), 1.5);
        assert_eq!(normalize_hour(-1.0), 23.0);
        assert_eq!(normalize_hour(24.0), 0.0);
        assert_eq!(normalize_hour(12.25), 12.25);
    }

    #[test]
    fn effective_hour_shifts_early_morning_past_midnight() {
        assert_eq!(effective_hour(4.0, 5.0), 28.0);
        assert_eq!(effective_hour(5.0, 5.0), 5.0);
        assert_eq!(effective_hour(23.5, 5.0), 23.5);
    }

    #[test]
    fn clock_labels_use_twelve_hour_format() {
        assert_eq!(format_clock_label(0.0), "12:00 AM");
        assert_eq!(format_clock_label(12.0), "12:00 PM");
        assert_eq!(format_clock_label(5.0), "5:00 AM");
        assert_eq!(format_clock_label(17.0), "5:00 PM");
        assert_eq!(format_clock_label(28.0), "4:00 AM");
    }

    #[test]
    fn split_overnight_handles_wrapping_and_plain_ranges() {
        assert_eq!(
            split_overnight(12.0, 13.0),
            vec![HourInterval {
                start: 12.0,
                end: 13.0
            }]
        );
        assert_eq!(
            split_overnight(22.0, 6.0),
            vec![
                HourInterval {
                    start: 22.0,
                    end: 24.0
                },
                HourInterval { start: 0.0, end: 6.0 },
            ]
        );
        let degenerate = split_overnight(8.0, 8.0);
        assert_eq!(degenerate.len(), 1);
        assert!(degenerate[0].is_empty());
    }

    #[test]
    fn duration_labels_match_sidebar_format() {
        assert_eq!(format_duration_label(2.0), "2h");
        assert_eq!(format_duration_label(1.5), "1h 30m");
        assert_eq!(format_duration_label(0.25), "0h 15m");
        assert_eq!(split_hours_minutes(1.9999), (2, 0));
    }

    #[test]
    fn quarter_snapping_rounds_to_nearest_increment() {
        assert_eq!(snap_to_quarter(1.1), 1.0);
        assert_eq!(snap_to_quarter(1.13), 1.25);
        assert_eq!(hours_from_parts(9, 45), 9.75);
    }
}
