use crate::domain::models::{
    Category, DAYS_PER_WEEK, DayChoice, FIRST_TASK_ID, Slot, Task, TaskId, TaskUpdate,
    validate_day, validate_non_empty,
};
use crate::domain::time::{LAST_QUARTER_HOUR, QUARTER_HOUR, hours_from_parts, snap_to_quarter};
use serde::{Deserialize, Serialize};

const FALLBACK_NEW_TASK_HOURS: f64 = 1.0;
const FALLBACK_EDIT_TASK_HOURS: f64 = 0.5;

/// Ordered task collection plus the id counter. Ids are handed out
/// monotonically and never reused, including after `delete_all`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStore {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default = "first_task_id")]
    next_id: TaskId,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: FIRST_TASK_ID,
        }
    }
}

pub fn snapped_duration(duration_hours: f64) -> f64 {
    snap_to_quarter(duration_hours).max(QUARTER_HOUR)
}

pub fn snapped_hour(hour: f64) -> f64 {
    snap_to_quarter(hour).clamp(0.0, LAST_QUARTER_HOUR)
}

impl TaskStore {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    fn get_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub(crate) fn repair_next_id(&mut self) {
        let floor = self
            .tasks
            .iter()
            .map(|task| task.id.saturating_add(1))
            .max()
            .unwrap_or(FIRST_TASK_ID);
        self.next_id = self.next_id.max(floor).max(FIRST_TASK_ID);
    }

    /// Removes tasks that fail validation; returns each removed id with the reason.
    pub(crate) fn drop_invalid(&mut self) -> Vec<(TaskId, String)> {
        let mut dropped = Vec::new();
        self.tasks.retain(|task| match task.validate() {
            Ok(()) => true,
            Err(reason) => {
                dropped.push((task.id, reason));
                false
            }
        });
        dropped
    }

    /// Creates an unscheduled task. Non-positive durations fall back to one hour.
    pub fn add_task(
        &mut self,
        title: &str,
        duration_hours: f64,
        category: Category,
    ) -> Result<Task, String> {
        validate_non_empty(title, "task.title")?;
        let duration = if duration_hours.is_finite() && duration_hours > 0.0 {
            duration_hours
        } else {
            FALLBACK_NEW_TASK_HOURS
        };

        let task = Task {
            id: self.allocate_id(),
            title: title.trim().to_string(),
            description: None,
            category,
            color: None,
            completed: false,
            duration,
            slot: None,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn assign(&mut self, task_id: TaskId, day: u8, hour: f64) -> Result<Option<Task>, String> {
        let slot = Slot::new(day, hour)?;
        let Some(task) = self.get_mut(task_id) else {
            return Ok(None);
        };
        task.slot = Some(slot);
        Ok(Some(task.clone()))
    }

    pub fn unassign(&mut self, task_id: TaskId) -> Option<Task> {
        let task = self.get_mut(task_id)?;
        task.slot = None;
        Some(task.clone())
    }

    pub fn resize(&mut self, task_id: TaskId, duration_hours: f64) -> Result<Option<Task>, String> {
        if !duration_hours.is_finite() {
            return Err("task.duration must be a finite number of hours".to_string());
        }
        let Some(task) = self.get_mut(task_id) else {
            return Ok(None);
        };
        task.duration = snapped_duration(duration_hours);
        Ok(Some(task.clone()))
    }

    /// Moves a scheduled task to a new start hour on its current day.
    /// Unscheduled tasks have no hour to move and are left alone.
    pub fn reschedule(&mut self, task_id: TaskId, hour: f64) -> Result<Option<Task>, String> {
        if !hour.is_finite() {
            return Err("task.assigned_hour must be a finite number of hours".to_string());
        }
        let Some(task) = self.get_mut(task_id) else {
            return Ok(None);
        };
        let Some(slot) = task.slot.as_mut() else {
            return Ok(None);
        };
        slot.hour = snapped_hour(hour);
        Ok(Some(task.clone()))
    }

    pub fn update_properties(
        &mut self,
        task_id: TaskId,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, String> {
        validate_non_empty(&update.title, "task.title")?;
        let Some(current_hour) = self.get(task_id).map(Task::hour) else {
            return Ok(None);
        };

        let base_duration = match hours_from_parts(update.duration_hours, update.duration_minutes) {
            value if value > 0.0 => value,
            _ => FALLBACK_EDIT_TASK_HOURS,
        };

        let (slot, duration) = match update.day {
            DayChoice::Unscheduled => (None, base_duration),
            DayChoice::Day(day) => {
                validate_day(day, "task.assigned_day")?;
                match update.start {
                    Some(start) => {
                        validate_clock(start.hour, start.minute, "task.start")?;
                        let start_hour = start.hours();
                        let mut span = None;
                        if let Some(end) = update.end {
                            validate_clock(end.hour, end.minute, "task.end")?;
                            let mut end_hour = end.hours();
                            if end_hour < start_hour {
                                end_hour += 24.0;
                            }
                            if end_hour > start_hour {
                                span = Some(end_hour - start_hour);
                            }
                        }
                        // Without a usable end the start only places tasks
                        // that have no hour yet.
                        match (span, current_hour) {
                            (Some(duration), _) => (Some(Slot::new(day, start_hour)?), duration),
                            (None, Some(hour)) => (Some(Slot::new(day, hour)?), base_duration),
                            (None, None) => (Some(Slot::new(day, start_hour)?), base_duration),
                        }
                    }
                    None => {
                        let hour = current_hour.ok_or_else(|| {
                            "task.start is required when scheduling an unscheduled task"
                                .to_string()
                        })?;
                        (Some(Slot::new(day, hour)?), base_duration)
                    }
                }
            }
        };

        let Some(task) = self.get_mut(task_id) else {
            return Ok(None);
        };
        task.title = update.title.trim().to_string();
        task.description = Some(update.description.trim().to_string()).filter(|value| !value.is_empty());
        task.category = Category::new(update.category.as_str());
        task.color = update
            .color
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        task.completed = update.completed;
        task.duration = duration;
        task.slot = slot;
        Ok(Some(task.clone()))
    }

    pub fn delete_task(&mut self, task_id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == task_id)?;
        Some(self.tasks.remove(index))
    }

    pub fn delete_all(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        removed
    }

    /// Moves every task back to the unscheduled list; returns how many moved.
    pub fn clear_assignments(&mut self) -> usize {
        let mut moved = 0;
        for task in &mut self.tasks {
            if task.slot.take().is_some() {
                moved += 1;
            }
        }
        moved
    }

    /// Copies a scheduled task onto the six other days at the same hour.
    pub fn duplicate_to_all_days(&mut self, task_id: TaskId) -> Result<Option<Vec<Task>>, String> {
        let Some(source) = self.get(task_id).cloned() else {
            return Ok(None);
        };
        let Some(source_slot) = source.slot else {
            return Err("task must be scheduled before it can be copied to all days".to_string());
        };

        let mut created = Vec::with_capacity(usize::from(DAYS_PER_WEEK) - 1);
        for day in (0..DAYS_PER_WEEK).filter(|day| *day != source_slot.day) {
            let copy = Task {
                id: self.allocate_id(),
                title: source.title.clone(),
                description: None,
                category: source.category.clone(),
                color: source.color.clone(),
                completed: false,
                duration: source.duration,
                slot: Some(Slot {
                    day,
                    hour: source_slot.hour,
                }),
            };
            self.tasks.push(copy.clone());
            created.push(copy);
        }
        Ok(Some(created))
    }

    pub fn unscheduled(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|task| task.slot.is_none()).collect()
    }

    pub fn scheduled_by_day(&self, day: u8) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.day() == Some(day))
            .collect()
    }
}

fn first_task_id() -> TaskId {
    FIRST_TASK_ID
}

fn validate_clock(hour: u32, minute: u32, field_name: &str) -> Result<(), String> {
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be a valid HH:MM time"));
    }
    Ok(())
}
