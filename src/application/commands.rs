use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::domain::grid::{GridRow, NowMarker, StatusSummary, grid_rows, now_marker, status_summary};
use crate::domain::history::{HistoryState, SnapshotHistory};
use crate::domain::layout::{TaskPlacement, layout_day};
use crate::domain::models::{
    Category, CustomZone, SchedulerState, Settings, Task, TaskId, TaskUpdate, ZoneSettingsUpdate,
    validate_day,
};
use crate::domain::zones::{ZoneOverlay, active_zones, custom_zone_labels, slot_overlays};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::ics_export::export_calendar;
use crate::infrastructure::pet_bridge::{
    KNOWN_PETS, PetController, RecordingPetController, is_known_pet,
};
use crate::infrastructure::state_repository::{
    KeyValueStore, SqliteKeyValueStore, load_dark_mode, load_scheduler_state, save_dark_mode,
    save_scheduler_state,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct AppState {
    config: AppConfig,
    database_path: PathBuf,
    logs_dir: PathBuf,
    exports_dir: PathBuf,
    store: Box<dyn KeyValueStore>,
    pet: Arc<dyn PetController>,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    /// Boots a workspace backed by its SQLite state file and a recording pet.
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let store = Box::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        Self::from_bootstrap(bootstrap, store, Arc::new(RecordingPetController::default()))
    }

    pub fn with_parts(
        workspace_root: PathBuf,
        store: Box<dyn KeyValueStore>,
        pet: Arc<dyn PetController>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Self::from_bootstrap(bootstrap, store, pet)
    }

    fn from_bootstrap(
        bootstrap: BootstrapResult,
        store: Box<dyn KeyValueStore>,
        pet: Arc<dyn PetController>,
    ) -> Result<Self, InfraError> {
        let state = Self {
            runtime: Mutex::new(RuntimeState::new(bootstrap.config.history_limit)),
            config: bootstrap.config,
            database_path: bootstrap.database_path,
            logs_dir: bootstrap.logs_dir,
            exports_dir: bootstrap.exports_dir,
            store,
            pet,
            log_guard: Mutex::new(()),
        };
        state.restore()?;
        Ok(state)
    }

    fn restore(&self) -> Result<(), InfraError> {
        let (scheduler, load_error) = load_scheduler_state(self.store.as_ref())?;
        if let Some(error) = load_error {
            self.log_error("load_state", &format!("starting empty: {error}"));
        }
        let dark_mode = load_dark_mode(self.store.as_ref())?;

        let current_pet = scheduler
            .settings
            .current_pet
            .clone()
            .filter(|name| is_known_pet(name));
        let task_count = scheduler.store.len();
        {
            let mut runtime = lock_runtime(self)?;
            runtime.scheduler = scheduler;
            runtime.dark_mode = dark_mode;
        }
        if let Some(name) = current_pet {
            self.pet.set_pet(&name);
        }

        self.log_info("load_state", &format!("restored tasks={task_count} dark_mode={dark_mode}"));
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        tracing::error!(command, "{message}");
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug)]
struct RuntimeState {
    scheduler: SchedulerState,
    history: SnapshotHistory<SchedulerState>,
    gesture: Option<Gesture>,
    dark_mode: bool,
}

impl RuntimeState {
    fn new(history_limit: usize) -> Self {
        Self {
            scheduler: SchedulerState::default(),
            history: SnapshotHistory::new(history_limit),
            gesture: None,
            dark_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Resize,
    Reschedule,
}

/// A drag in progress. Moves mutate the live state; only the end commits.
#[derive(Debug)]
struct Gesture {
    kind: GestureKind,
    task_id: TaskId,
    origin: f64,
    before: SchedulerState,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    pub state: SchedulerState,
    pub dark_mode: bool,
    pub history: HistoryState,
    pub status: StatusSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture: Option<GestureKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub path: String,
    pub event_count: usize,
    pub content: String,
}

/// Runs one mutation with snapshot, history and persistence ordering.
///
/// `Ok(None)` from `apply` is a lookup miss: nothing is recorded or saved.
/// `Err` restores the state captured before `apply` ran.
fn commit<T, F>(state: &AppState, apply: F) -> Result<Option<T>, InfraError>
where
    F: FnOnce(&mut SchedulerState) -> Result<Option<T>, String>,
{
    let mut runtime = lock_runtime(state)?;
    settle_gesture(state, &mut runtime)?;

    let before = runtime.scheduler.clone();
    match apply(&mut runtime.scheduler) {
        Ok(Some(value)) => {
            runtime.history.push(before);
            save_scheduler_state(state.store.as_ref(), &runtime.scheduler)?;
            Ok(Some(value))
        }
        Ok(None) => Ok(None),
        Err(message) => {
            runtime.scheduler = before;
            Err(InfraError::Validation(message))
        }
    }
}

/// Ends an open gesture the way a pointer release would.
fn settle_gesture(state: &AppState, runtime: &mut RuntimeState) -> Result<bool, InfraError> {
    let Some(gesture) = runtime.gesture.take() else {
        return Ok(false);
    };
    if runtime.scheduler == gesture.before {
        return Ok(false);
    }
    runtime.history.push(gesture.before);
    save_scheduler_state(state.store.as_ref(), &runtime.scheduler)?;
    Ok(true)
}

/// Drops an open gesture and rolls back its live edits.
fn cancel_gesture(runtime: &mut RuntimeState) {
    if let Some(gesture) = runtime.gesture.take() {
        runtime.scheduler = gesture.before;
    }
}

fn task_label(task: &Task) -> String {
    match task.slot {
        Some(slot) => format!(
            "task_id={} day={} hour={} duration={}",
            task.id, slot.day, slot.hour, task.duration
        ),
        None => format!("task_id={} unscheduled duration={}", task.id, task.duration),
    }
}

fn log_outcome(state: &AppState, command: &str, task_id: TaskId, outcome: Option<&Task>) {
    match outcome {
        Some(task) => state.log_info(command, &task_label(task)),
        None => state.log_info(command, &format!("ignored missing task_id={task_id}")),
    }
}

pub fn add_task_impl(
    state: &AppState,
    title: String,
    duration_hours: f64,
    category: Option<String>,
) -> Result<Task, InfraError> {
    let category = category
        .as_deref()
        .map(Category::new)
        .unwrap_or_default();
    let task = commit(state, |scheduler| {
        scheduler
            .store
            .add_task(&title, duration_hours, category)
            .map(Some)
    })?
    .ok_or_else(|| InfraError::Validation("task was not created".to_string()))?;

    state.log_info("add_task", &format!("created {}", task_label(&task)));
    Ok(task)
}

pub fn assign_task_impl(
    state: &AppState,
    task_id: TaskId,
    day: u8,
    hour: f64,
) -> Result<Option<Task>, InfraError> {
    let task = commit(state, |scheduler| scheduler.store.assign(task_id, day, hour))?;
    log_outcome(state, "assign_task", task_id, task.as_ref());
    Ok(task)
}

pub fn unassign_task_impl(state: &AppState, task_id: TaskId) -> Result<Option<Task>, InfraError> {
    let task = commit(state, |scheduler| Ok(scheduler.store.unassign(task_id)))?;
    log_outcome(state, "unassign_task", task_id, task.as_ref());
    Ok(task)
}

pub fn resize_task_impl(
    state: &AppState,
    task_id: TaskId,
    duration_hours: f64,
) -> Result<Option<Task>, InfraError> {
    let task = commit(state, |scheduler| scheduler.store.resize(task_id, duration_hours))?;
    log_outcome(state, "resize_task", task_id, task.as_ref());
    Ok(task)
}

pub fn reschedule_task_impl(
    state: &AppState,
    task_id: TaskId,
    hour: f64,
) -> Result<Option<Task>, InfraError> {
    let task = commit(state, |scheduler| scheduler.store.reschedule(task_id, hour))?;
    log_outcome(state, "reschedule_task", task_id, task.as_ref());
    Ok(task)
}

pub fn update_task_impl(
    state: &AppState,
    task_id: TaskId,
    update: TaskUpdate,
) -> Result<Option<Task>, InfraError> {
    let task = commit(state, |scheduler| {
        scheduler.store.update_properties(task_id, &update)
    })?;
    log_outcome(state, "update_task", task_id, task.as_ref());
    Ok(task)
}

/// The properties form as it should open for `task_id`.
pub fn task_form_impl(state: &AppState, task_id: TaskId) -> Result<Option<TaskUpdate>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.scheduler.store.get(task_id).map(TaskUpdate::from_task))
}

pub fn delete_task_impl(state: &AppState, task_id: TaskId) -> Result<bool, InfraError> {
    let removed = commit(state, |scheduler| Ok(scheduler.store.delete_task(task_id)))?;
    log_outcome(state, "delete_task", task_id, removed.as_ref());
    Ok(removed.is_some())
}

pub fn delete_all_tasks_impl(state: &AppState) -> Result<usize, InfraError> {
    let removed = commit(state, |scheduler| {
        Ok(Some(scheduler.store.delete_all()).filter(|count| *count > 0))
    })?
    .unwrap_or(0);
    state.log_info("delete_all_tasks", &format!("deleted={removed}"));
    Ok(removed)
}

pub fn clear_calendar_impl(state: &AppState) -> Result<usize, InfraError> {
    let moved = commit(state, |scheduler| {
        Ok(Some(scheduler.store.clear_assignments()).filter(|count| *count > 0))
    })?
    .unwrap_or(0);
    state.log_info("clear_calendar", &format!("unscheduled={moved}"));
    Ok(moved)
}

pub fn duplicate_to_all_days_impl(
    state: &AppState,
    task_id: TaskId,
) -> Result<Option<Vec<Task>>, InfraError> {
    let created = commit(state, |scheduler| {
        scheduler.store.duplicate_to_all_days(task_id)
    })?;
    match &created {
        Some(tasks) => state.log_info(
            "duplicate_to_all_days",
            &format!("task_id={task_id} created={}", tasks.len()),
        ),
        None => state.log_info(
            "duplicate_to_all_days",
            &format!("ignored missing task_id={task_id}"),
        ),
    }
    Ok(created)
}

pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.scheduler.store.tasks().to_vec())
}

pub fn list_unscheduled_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime
        .scheduler
        .store
        .unscheduled()
        .into_iter()
        .cloned()
        .collect())
}

pub fn list_day_impl(state: &AppState, day: u8) -> Result<Vec<Task>, InfraError> {
    validate_day(day, "day").map_err(InfraError::Validation)?;
    let runtime = lock_runtime(state)?;
    Ok(runtime
        .scheduler
        .store
        .scheduled_by_day(day)
        .into_iter()
        .cloned()
        .collect())
}

pub fn layout_day_impl(state: &AppState, day: u8) -> Result<Vec<TaskPlacement>, InfraError> {
    validate_day(day, "day").map_err(InfraError::Validation)?;
    let runtime = lock_runtime(state)?;
    let tasks = runtime.scheduler.store.scheduled_by_day(day);
    Ok(layout_day(&tasks, state.config.day_start_hour))
}

pub fn slot_overlays_impl(state: &AppState, slot_hour: f64) -> Result<Vec<ZoneOverlay>, InfraError> {
    if !slot_hour.is_finite() {
        return Err(InfraError::Validation(
            "slot_hour must be a finite number of hours".to_string(),
        ));
    }
    let runtime = lock_runtime(state)?;
    Ok(slot_overlays(slot_hour, &active_zones(&runtime.scheduler.settings)))
}

pub fn grid_impl(state: &AppState) -> Result<Vec<GridRow>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(grid_rows(state.config.day_start_hour, &runtime.scheduler.settings))
}

pub fn now_marker_impl(state: &AppState, now: DateTime<Utc>) -> NowMarker {
    let local = now.with_timezone(&state.config.timezone).naive_local();
    now_marker(local, state.config.day_start_hour)
}

pub fn get_state_impl(state: &AppState) -> Result<StateResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(StateResponse {
        state: runtime.scheduler.clone(),
        dark_mode: runtime.dark_mode,
        history: runtime.history.state(),
        status: status_summary(&runtime.scheduler.store),
        gesture: runtime.gesture.as_ref().map(|gesture| gesture.kind),
    })
}

fn begin_gesture(state: &AppState, task_id: TaskId, kind: GestureKind) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    settle_gesture(state, &mut runtime)?;

    let origin = runtime.scheduler.store.get(task_id).and_then(|task| match kind {
        GestureKind::Resize => task.is_scheduled().then_some(task.duration),
        GestureKind::Reschedule => task.hour(),
    });
    let Some(origin) = origin else {
        return Ok(false);
    };
    runtime.gesture = Some(Gesture {
        kind,
        task_id,
        origin,
        before: runtime.scheduler.clone(),
    });
    Ok(true)
}

pub fn begin_resize_impl(state: &AppState, task_id: TaskId) -> Result<bool, InfraError> {
    let started = begin_gesture(state, task_id, GestureKind::Resize)?;
    state.log_info("begin_resize", &format!("task_id={task_id} started={started}"));
    Ok(started)
}

pub fn begin_reschedule_impl(state: &AppState, task_id: TaskId) -> Result<bool, InfraError> {
    let started = begin_gesture(state, task_id, GestureKind::Reschedule)?;
    state.log_info("begin_reschedule", &format!("task_id={task_id} started={started}"));
    Ok(started)
}

/// Live feedback for the open gesture. `delta_hours` is measured from where
/// the gesture began, not from the previous move.
pub fn gesture_move_impl(state: &AppState, delta_hours: f64) -> Result<Option<Task>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some((kind, task_id, origin)) = runtime
        .gesture
        .as_ref()
        .map(|gesture| (gesture.kind, gesture.task_id, gesture.origin))
    else {
        return Ok(None);
    };
    let target = origin + delta_hours;
    let store = &mut runtime.scheduler.store;
    let moved = match kind {
        GestureKind::Resize => store.resize(task_id, target),
        GestureKind::Reschedule => store.reschedule(task_id, target),
    };
    moved.map_err(InfraError::Validation)
}

pub fn end_gesture_impl(state: &AppState) -> Result<Option<Task>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task_id) = runtime.gesture.as_ref().map(|gesture| gesture.task_id) else {
        return Ok(None);
    };
    let committed = settle_gesture(state, &mut runtime)?;
    let task = runtime.scheduler.store.get(task_id).cloned();
    drop(runtime);

    state.log_info(
        "end_gesture",
        &format!("task_id={task_id} committed={committed}"),
    );
    Ok(task)
}

pub fn undo_impl(state: &AppState) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    cancel_gesture(&mut runtime);
    let current = runtime.scheduler.clone();
    let Some(previous) = runtime.history.undo(&current) else {
        return Ok(false);
    };
    runtime.scheduler = previous;
    save_scheduler_state(state.store.as_ref(), &runtime.scheduler)?;
    drop(runtime);

    state.log_info("undo", "restored previous state");
    Ok(true)
}

pub fn redo_impl(state: &AppState) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    cancel_gesture(&mut runtime);
    let current = runtime.scheduler.clone();
    let Some(next) = runtime.history.redo(&current) else {
        return Ok(false);
    };
    runtime.scheduler = next;
    save_scheduler_state(state.store.as_ref(), &runtime.scheduler)?;
    drop(runtime);

    state.log_info("redo", "reapplied state");
    Ok(true)
}

pub fn update_zones_impl(state: &AppState, update: ZoneSettingsUpdate) -> Result<Settings, InfraError> {
    let settings = commit(state, |scheduler| {
        scheduler.settings.apply_zone_update(&update)?;
        Ok(Some(scheduler.settings.clone()))
    })?
    .ok_or_else(|| InfraError::Validation("zones were not updated".to_string()))?;

    state.log_info(
        "update_zones",
        &format!(
            "lunch={}-{} enabled={} sleep={}-{}",
            settings.lunch_start,
            settings.lunch_end,
            settings.lunch_enabled,
            settings.sleep_start,
            settings.sleep_end
        ),
    );
    Ok(settings)
}

pub fn add_custom_zone_impl(
    state: &AppState,
    title: String,
    start: f64,
    end: f64,
    color: Option<String>,
) -> Result<CustomZone, InfraError> {
    let zone = commit(state, |scheduler| {
        scheduler
            .settings
            .add_custom_zone(&title, start, end, color.as_deref())
            .map(Some)
    })?
    .ok_or_else(|| InfraError::Validation("zone was not added".to_string()))?;

    state.log_info(
        "add_custom_zone",
        &format!("title={} start={} end={}", zone.title, zone.start, zone.end),
    );
    Ok(zone)
}

pub fn remove_custom_zone_impl(
    state: &AppState,
    index: usize,
) -> Result<Option<CustomZone>, InfraError> {
    let removed = commit(state, |scheduler| {
        Ok(scheduler.settings.remove_custom_zone(index))
    })?;
    state.log_info(
        "remove_custom_zone",
        &format!("index={index} removed={}", removed.is_some()),
    );
    Ok(removed)
}

pub fn zone_labels_impl(state: &AppState) -> Result<Vec<String>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(custom_zone_labels(&runtime.scheduler.settings))
}

pub fn export_calendar_impl(state: &AppState, now: DateTime<Utc>) -> Result<ExportResponse, InfraError> {
    let file_name = state.config.export_file_name.as_str();
    if file_name.contains(['/', '\\']) || file_name == ".." {
        return Err(InfraError::InvalidConfig(format!(
            "exportFileName must be a plain file name, got '{file_name}'"
        )));
    }

    let tasks = list_tasks_impl(state)?;
    let event_count = tasks.iter().filter(|task| task.is_scheduled()).count();
    let content = export_calendar(&tasks, now.with_timezone(&state.config.timezone))?;

    let path = state.exports_dir.join(file_name);
    fs::write(&path, &content)?;
    state.log_info(
        "export_calendar",
        &format!("events={event_count} path={}", path.display()),
    );
    Ok(ExportResponse {
        path: path.display().to_string(),
        event_count,
        content,
    })
}

pub fn set_pet_impl(state: &AppState, name: String) -> Result<String, InfraError> {
    let name = name.trim().to_lowercase();
    if !is_known_pet(&name) {
        return Err(InfraError::Validation(format!(
            "unknown pet '{name}', expected one of: {}",
            KNOWN_PETS.join(", ")
        )));
    }

    commit(state, |scheduler| {
        if scheduler.settings.current_pet.as_deref() == Some(name.as_str()) {
            return Ok(None);
        }
        scheduler.settings.current_pet = Some(name.clone());
        Ok(Some(()))
    })?;
    state.pet.set_pet(&name);
    state.log_info("set_pet", &format!("pet={name}"));
    Ok(name)
}

pub fn set_pet_size_impl(state: &AppState, size_px: u32) -> Result<(), InfraError> {
    if size_px == 0 {
        return Err(InfraError::Validation("pet size must be > 0".to_string()));
    }
    state.pet.set_size(size_px);
    state.log_info("set_pet_size", &format!("size_px={size_px}"));
    Ok(())
}

pub fn set_pet_jump_power_impl(state: &AppState, power: f64) -> Result<(), InfraError> {
    if !power.is_finite() || power < 0.0 {
        return Err(InfraError::Validation(
            "jump power must be a finite value >= 0".to_string(),
        ));
    }
    state.pet.set_jump_power(power);
    state.log_info("set_pet_jump_power", &format!("power={power}"));
    Ok(())
}

pub fn set_dark_mode_impl(state: &AppState, enabled: bool) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    save_dark_mode(state.store.as_ref(), enabled)?;
    runtime.dark_mode = enabled;
    drop(runtime);

    state.log_info("set_dark_mode", &format!("enabled={enabled}"));
    Ok(enabled)
}

pub fn toggle_dark_mode_impl(state: &AppState) -> Result<bool, InfraError> {
    let enabled = !lock_runtime(state)?.dark_mode;
    set_dark_mode_impl(state, enabled)
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}
