use crate::domain::models::{DAYS_PER_WEEK, Settings};
use crate::domain::task_store::TaskStore;
use crate::domain::time::{HOURS_PER_DAY, effective_hour, format_clock_label, normalize_hour};
use crate::domain::zones::{ZoneOverlay, active_zones, slot_overlays};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GridRow {
    /// Position on the effective axis, `day_start..day_start + 24`.
    pub grid_hour: u32,
    /// Hour of day in `[0, 24)` that tasks are assigned to.
    pub hour_of_day: u32,
    pub label: String,
    pub overlays: Vec<ZoneOverlay>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct NowMarker {
    pub day: u8,
    pub offset_hours: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct StatusSummary {
    pub items: usize,
    pub scheduled: usize,
    pub completed: usize,
}

/// One row per hour from the day start through the following day start.
/// Overlays are the same for every day column.
pub fn grid_rows(day_start_hour: f64, settings: &Settings) -> Vec<GridRow> {
    let first = normalize_hour(day_start_hour).floor() as u32;
    let zones = active_zones(settings);
    (first..first + HOURS_PER_DAY as u32)
        .map(|grid_hour| {
            let hour = f64::from(grid_hour);
            GridRow {
                grid_hour,
                hour_of_day: grid_hour % HOURS_PER_DAY as u32,
                label: format_clock_label(hour),
                overlays: slot_overlays(hour, &zones),
            }
        })
        .collect()
}

/// Where the current-time line is drawn. Times before the day start belong to
/// the previous day's column, further down the grid.
pub fn now_marker(now: NaiveDateTime, day_start_hour: f64) -> NowMarker {
    let hour = f64::from(now.hour())
        + f64::from(now.minute()) / 60.0
        + f64::from(now.second()) / 3600.0;
    let weekday = now.weekday().num_days_from_monday() as u8;
    let day_start = normalize_hour(day_start_hour);

    let day = if hour < day_start {
        (weekday + DAYS_PER_WEEK - 1) % DAYS_PER_WEEK
    } else {
        weekday
    };
    NowMarker {
        day,
        offset_hours: effective_hour(hour, day_start) - day_start.floor(),
    }
}

pub fn status_summary(store: &TaskStore) -> StatusSummary {
    store
        .tasks()
        .iter()
        .fold(StatusSummary::default(), |mut summary, task| {
            summary.items += 1;
            if task.is_scheduled() {
                summary.scheduled += 1;
            }
            if task.completed {
                summary.completed += 1;
            }
            summary
        })
}
