//! iCalendar (RFC 5545) rendering of the scheduled week.
//!
//! Tasks only know a weekday and an hour, so every event is placed on the next
//! occurrence of that weekday at or after today, read as wall-clock time in the
//! configured timezone and written out in UTC.

use crate::domain::models::Task;
use crate::domain::time::HOURS_PER_DAY;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use ical::generator::{Emitter, IcalCalendarBuilder, IcalEvent};
use ical::ical_property;
use ical::property::Property;

const PRODUCT_ID: &str = "-//RetroWeek//Scheduler//EN";
const UID_DOMAIN: &str = "retroweek.local";
const UTC_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Start of the next `day` (Monday = 0) at `hour`, today included even when
/// the hour has already passed.
pub fn next_occurrence(day: u8, hour: f64, now: DateTime<Tz>) -> DateTime<Tz> {
    let today = now.weekday().num_days_from_monday() as i64;
    let days_ahead = (i64::from(day) - today).rem_euclid(7);
    let date = now.date_naive() + Duration::days(days_ahead);
    let seconds = (hour.clamp(0.0, HOURS_PER_DAY) * SECONDS_PER_HOUR).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)
        .unwrap_or(NaiveTime::MIN);
    resolve_local(&now.timezone(), date.and_time(time))
}

/// Ambiguous wall-clock times take the earlier instant; times inside a
/// forward gap move one hour later.
fn resolve_local(timezone: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match timezone.from_local_datetime(&local) {
        LocalResult::Single(resolved) => resolved,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => timezone
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| timezone.from_utc_datetime(&local)),
    }
}

/// `None` when the end falls outside the representable calendar range.
fn event_end(start: DateTime<Tz>, duration_hours: f64) -> Option<DateTime<Tz>> {
    let seconds = (duration_hours * SECONDS_PER_HOUR).round();
    if !seconds.is_finite() || seconds.abs() >= i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_seconds(seconds as i64)?;
    start.checked_add_signed(delta)
}

fn task_event(task: &Task, day: u8, start: DateTime<Tz>, end: DateTime<Tz>, stamp: &str) -> IcalEvent {
    let mut event = IcalEvent::new();
    event.properties = vec![
        ical_property!("UID", format!("task-{}-day-{day}@{UID_DOMAIN}", task.id)),
        ical_property!("DTSTAMP", stamp),
        ical_property!("SUMMARY", escape_text(&task.title)),
        ical_property!("DTSTART", format_utc(start)),
        ical_property!("DTEND", format_utc(end)),
        ical_property!(
            "DESCRIPTION",
            escape_text(&format!("Category: {}", task.category.as_str()))
        ),
    ];
    event
}

/// Renders every scheduled task as one VEVENT. Line folding and CRLF endings
/// come from the `ical` emitter.
pub fn export_calendar(tasks: &[Task], now: DateTime<Tz>) -> Result<String, InfraError> {
    let stamp = format_utc(now);
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PRODUCT_ID);

    for task in tasks {
        let Some(slot) = task.slot else {
            continue;
        };
        let start = next_occurrence(slot.day, slot.hour, now);
        let end = event_end(start, task.duration).ok_or_else(|| {
            InfraError::Validation(format!(
                "task {} lasts {} hours, which ends outside the exportable calendar range",
                task.id, task.duration
            ))
        })?;
        calendar = calendar.add_event(task_event(task, slot.day, start, end, &stamp));
    }

    Ok(calendar.build().generate())
}

fn format_utc(moment: DateTime<Tz>) -> String {
    moment.with_timezone(&Utc).format(UTC_STAMP_FORMAT).to_string()
}

/// The emitter escapes parameters only; property values are escaped here.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
