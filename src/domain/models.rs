use crate::domain::task_store::TaskStore;
use crate::domain::time::{
    HOURS_PER_DAY, hours_from_parts, normalize_hour, split_hours_minutes,
};
use serde::{Deserialize, Deserializer, Serialize};

pub type TaskId = u64;

pub const DAYS_PER_WEEK: u8 = 7;
pub const FIRST_TASK_ID: TaskId = 1;
pub const DEFAULT_TASK_COLOR: &str = "#ffffba";
pub const DEFAULT_ZONE_COLOR: &str = "#dddddd";
pub const DAY_NAMES: [&str; DAYS_PER_WEEK as usize] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Styling label of a task. The set is open: anything the presentation layer
/// offers is accepted, `work`/`personal`/`other` are the stock labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            Self::work()
        } else {
            Self(label.to_string())
        }
    }

    pub fn work() -> Self {
        Self("work".to_string())
    }

    pub fn personal() -> Self {
        Self("personal".to_string())
    }

    pub fn other() -> Self {
        Self("other".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::work()
    }
}

/// Day/hour placement of a scheduled task. Both halves exist together or
/// the task is unscheduled (`Task::slot == None`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub day: u8,
    pub hour: f64,
}

impl Slot {
    /// Builds a slot, folding hours outside `[0, 24)` back into the day.
    pub fn new(day: u8, hour: f64) -> Result<Self, String> {
        validate_day(day, "slot.day")?;
        if !hour.is_finite() {
            return Err("slot.hour must be a finite number of hours".to_string());
        }
        Ok(Self {
            day,
            hour: normalize_hour(hour),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub color: Option<String>,
    pub completed: bool,
    pub duration: f64,
    pub slot: Option<Slot>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        validate_duration(self.duration, "task.duration")?;
        if let Some(slot) = self.slot {
            validate_day(slot.day, "task.assigned_day")?;
            if !(0.0..HOURS_PER_DAY).contains(&slot.hour) {
                return Err("task.assigned_hour must be within [0, 24)".to_string());
            }
        }
        Ok(())
    }

    pub fn is_scheduled(&self) -> bool {
        self.slot.is_some()
    }

    pub fn day(&self) -> Option<u8> {
        self.slot.map(|slot| slot.day)
    }

    pub fn hour(&self) -> Option<f64> {
        self.slot.map(|slot| slot.hour)
    }
}

/// Persisted shape of a task, compatible with blobs that spell the slot as
/// two nullable `assignedDay`/`assignedHour` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(default)]
    completed: bool,
    duration: f64,
    #[serde(default)]
    assigned_day: Option<u8>,
    #[serde(default)]
    assigned_hour: Option<f64>,
}

/// Conversion never fails so one bad record cannot sink the whole task list;
/// out-of-range values are kept as read and rejected by `Task::validate`.
impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let slot = match (record.assigned_day, record.assigned_hour) {
            (Some(day), Some(hour)) => {
                Some(Slot::new(day, hour).unwrap_or(Slot { day, hour }))
            }
            _ => None,
        };
        Self {
            id: record.id,
            title: record.title,
            description: non_empty(record.description),
            category: record.category,
            color: non_empty(record.color),
            completed: record.completed,
            duration: record.duration,
            slot,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            category: task.category,
            color: task.color,
            completed: task.completed,
            duration: task.duration,
            assigned_day: task.slot.map(|slot| slot.day),
            assigned_hour: task.slot.map(|slot| slot.hour),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomZone {
    pub start: f64,
    pub end: f64,
    #[serde(default = "default_zone_color")]
    pub color: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub lunch_start: f64,
    pub lunch_end: f64,
    pub lunch_color: String,
    pub lunch_enabled: bool,
    pub sleep_start: f64,
    pub sleep_end: f64,
    pub sleep_color: String,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_zones: Vec<CustomZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_pet: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lunch_start: 12.0,
            lunch_end: 13.0,
            lunch_color: "#ffcc00".to_string(),
            lunch_enabled: true,
            sleep_start: 22.0,
            sleep_end: 6.0,
            sleep_color: "#cccccc".to_string(),
            custom_zones: Vec::new(),
            current_pet: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSettingsUpdate {
    pub lunch_start: f64,
    pub lunch_end: f64,
    pub lunch_color: String,
    pub lunch_enabled: bool,
    pub sleep_start: f64,
    pub sleep_end: f64,
    pub sleep_color: String,
}

impl Settings {
    pub fn apply_zone_update(&mut self, update: &ZoneSettingsUpdate) -> Result<(), String> {
        for (value, field_name) in [
            (update.lunch_start, "settings.lunch_start"),
            (update.lunch_end, "settings.lunch_end"),
            (update.sleep_start, "settings.sleep_start"),
            (update.sleep_end, "settings.sleep_end"),
        ] {
            validate_finite(value, field_name)?;
        }

        self.lunch_start = normalize_hour(update.lunch_start);
        self.lunch_end = normalize_hour(update.lunch_end);
        self.lunch_color = color_or(&update.lunch_color, &self.lunch_color);
        self.lunch_enabled = update.lunch_enabled;
        self.sleep_start = normalize_hour(update.sleep_start);
        self.sleep_end = normalize_hour(update.sleep_end);
        self.sleep_color = color_or(&update.sleep_color, &self.sleep_color);
        Ok(())
    }

    /// Appends a recurring zone. An end earlier than the start wraps midnight.
    pub fn add_custom_zone(
        &mut self,
        title: &str,
        start: f64,
        end: f64,
        color: Option<&str>,
    ) -> Result<CustomZone, String> {
        validate_non_empty(title, "zone.title")?;
        validate_finite(start, "zone.start")?;
        validate_finite(end, "zone.end")?;

        let zone = CustomZone {
            start: normalize_hour(start),
            end: normalize_hour(end),
            color: color
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_ZONE_COLOR)
                .to_string(),
            title: title.trim().to_string(),
        };
        self.custom_zones.push(zone.clone());
        Ok(zone)
    }

    pub fn remove_custom_zone(&mut self, index: usize) -> Option<CustomZone> {
        if index >= self.custom_zones.len() {
            return None;
        }
        Some(self.custom_zones.remove(index))
    }
}

/// The aggregate captured by history snapshots and written to persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SchedulerState {
    #[serde(flatten)]
    pub store: TaskStore,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: Settings,
}

impl SchedulerState {
    /// Repairs counters that an older or hand-edited blob may carry.
    pub fn sanitize(&mut self) {
        self.store.repair_next_id();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

impl ClockTime {
    pub fn from_hours(hours: f64) -> Self {
        let (hour, minute) = split_hours_minutes(normalize_hour(hours));
        Self {
            hour: hour % 24,
            minute,
        }
    }

    pub fn hours(&self) -> f64 {
        hours_from_parts(self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayChoice {
    Unscheduled,
    Day(u8),
}

/// Everything a properties dialog can change on a task in one save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub duration_hours: u32,
    pub duration_minutes: u32,
    pub day: DayChoice,
    #[serde(default)]
    pub start: Option<ClockTime>,
    #[serde(default)]
    pub end: Option<ClockTime>,
}

impl TaskUpdate {
    /// Prefills the dialog fields from the current task.
    pub fn from_task(task: &Task) -> Self {
        let (duration_hours, duration_minutes) = split_hours_minutes(task.duration);
        let (day, start, end) = match task.slot {
            Some(slot) => (
                DayChoice::Day(slot.day),
                Some(ClockTime::from_hours(slot.hour)),
                Some(ClockTime::from_hours(slot.hour + task.duration)),
            ),
            None => (DayChoice::Unscheduled, None, None),
        };

        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            category: task.category.clone(),
            color: task.color.clone(),
            completed: task.completed,
            duration_hours,
            duration_minutes,
            day,
            start,
            end,
        }
    }
}

pub fn day_name(day: u8) -> Option<&'static str> {
    DAY_NAMES.get(usize::from(day)).copied()
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_day(day: u8, field_name: &str) -> Result<(), String> {
    if day >= DAYS_PER_WEEK {
        return Err(format!("{field_name} must be within 0..=6"));
    }
    Ok(())
}

fn validate_duration(value: f64, field_name: &str) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{field_name} must be > 0"));
    }
    Ok(())
}

fn validate_finite(value: f64, field_name: &str) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{field_name} must be a finite number of hours"));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn color_or(candidate: &str, fallback: &str) -> String {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        fallback.to_string()
    } else {
        candidate.to_string()
    }
}

fn default_zone_color() -> String {
    DEFAULT_ZONE_COLOR.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: 7,
            title: "Write report".to_string(),
            description: Some("quarterly numbers".to_string()),
            category: Category::work(),
            color: Some("#baffc9".to_string()),
            completed: false,
            duration: 1.5,
            slot: Some(Slot { day: 2, hour: 9.0 }),
        }
    }

    #[test]
    fn task_validate_rejects_empty_title_and_bad_duration() {
        let mut task = sample_task();
        assert!(task.validate().is_ok());
        task.title = "  ".to_string();
        assert!(task.validate().is_err());

        let mut task = sample_task();
        task.duration = 0.0;
        assert!(task.validate().is_err());
    }

    #[test]
    fn slot_new_rejects_out_of_range_day_and_folds_hours() {
        assert!(Slot::new(7, 9.0).is_err());
        assert!(Slot::new(0, f64::NAN).is_err());
        assert_eq!(Slot::new(3, 26.0).expect("valid slot").hour, 2.0);
    }

    #[test]
    fn task_serializes_slot_as_assigned_day_and_hour() {
        let value = serde_json::to_value(sample_task()).expect("serialize task");
        assert_eq!(value["assignedDay"], 2);
        assert_eq!(value["assignedHour"], 9.0);

        let mut unscheduled = sample_task();
        unscheduled.slot = None;
        let value = serde_json::to_value(unscheduled).expect("serialize task");
        assert!(value["assignedDay"].is_null());
        assert!(value["assignedHour"].is_null());
    }

    #[test]
    fn task_with_half_a_slot_loads_unscheduled() {
        let raw = r#"{"id":1,"title":"Gym","duration":1,"category":"personal","assignedDay":3,"assignedHour":null}"#;
        let task: Task = serde_json::from_str(raw).expect("deserialize task");
        assert!(task.slot.is_none());
        assert_eq!(task.category, Category::personal());
        assert!(task.description.is_none());
    }

    #[test]
    fn out_of_range_task_loads_but_fails_validation() {
        let raw = r#"{"id":1,"title":"Broken","duration":0}"#;
        let task: Task = serde_json::from_str(raw).expect("deserialize task");
        assert!(task.validate().is_err());

        let raw = r#"{"id":2,"title":"Nowhere","duration":1,"assignedDay":9,"assignedHour":10}"#;
        let task: Task = serde_json::from_str(raw).expect("deserialize task");
        assert_eq!(task.slot, Some(Slot { day: 9, hour: 10.0 }));
        assert!(task.validate().is_err());
    }

    #[test]
    fn settings_merge_missing_fields_with_defaults() {
        let raw = r##"{"lunchStart":11.5,"sleepColor":"#000000","customZones":null}"##;
        let settings: Settings = serde_json::from_str(raw).expect("deserialize settings");
        assert_eq!(settings.lunch_start, 11.5);
        assert_eq!(settings.lunch_end, 13.0);
        assert!(settings.lunch_enabled);
        assert_eq!(settings.sleep_color, "#000000");
        assert!(settings.custom_zones.is_empty());
    }

    #[test]
    fn custom_zone_end_is_normalized_into_the_day() {
        let mut settings = Settings::default();
        let zone = settings
            .add_custom_zone("Night shift", 22.0, 30.0, None)
            .expect("add zone");
        assert_eq!(zone.start, 22.0);
        assert_eq!(zone.end, 6.0);
        assert_eq!(zone.color, DEFAULT_ZONE_COLOR);
        assert!(settings.add_custom_zone("   ", 1.0, 2.0, None).is_err());
        assert_eq!(settings.custom_zones.len(), 1);
    }

    #[test]
    fn zone_update_keeps_previous_color_when_blank() {
        let mut settings = Settings::default();
        let update = ZoneSettingsUpdate {
            lunch_start: 11.0,
            lunch_end: 12.0,
            lunch_color: String::new(),
            lunch_enabled: false,
            sleep_start: 23.0,
            sleep_end: 7.0,
            sleep_color: "#333333".to_string(),
        };
        settings.apply_zone_update(&update).expect("apply update");
        assert_eq!(settings.lunch_color, "#ffcc00");
        assert!(!settings.lunch_enabled);
        assert_eq!(settings.sleep_end, 7.0);
    }

    #[test]
    fn task_update_prefill_wraps_end_past_midnight() {
        let mut task = sample_task();
        task.slot = Some(Slot { day: 4, hour: 23.0 });
        task.duration = 2.25;
        let form = TaskUpdate::from_task(&task);
        assert_eq!(form.day, DayChoice::Day(4));
        assert_eq!(form.start, Some(ClockTime { hour: 23, minute: 0 }));
        assert_eq!(form.end, Some(ClockTime { hour: 1, minute: 15 }));
        assert_eq!((form.duration_hours, form.duration_minutes), (2, 15));
    }

    #[test]
    fn day_names_start_on_monday() {
        assert_eq!(day_name(0), Some("Monday"));
        assert_eq!(day_name(6), Some("Sunday"));
        assert_eq!(day_name(7), None);
    }
}
