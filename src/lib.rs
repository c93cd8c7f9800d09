pub mod application;
pub mod domain;
pub mod infrastructure;

use application::commands::{
    AppState, ExportResponse, StateResponse, add_custom_zone_impl, add_task_impl,
    assign_task_impl, begin_reschedule_impl, begin_resize_impl, clear_calendar_impl,
    delete_all_tasks_impl, delete_task_impl, duplicate_to_all_days_impl, end_gesture_impl,
    export_calendar_impl, gesture_move_impl, get_state_impl, grid_impl, layout_day_impl,
    list_day_impl, list_tasks_impl, list_unscheduled_impl, now_marker_impl, redo_impl,
    remove_custom_zone_impl, reschedule_task_impl, resize_task_impl, set_dark_mode_impl,
    set_pet_impl, set_pet_jump_power_impl, set_pet_size_impl, slot_overlays_impl,
    task_form_impl, toggle_dark_mode_impl, unassign_task_impl, undo_impl, update_task_impl,
    update_zones_impl, zone_labels_impl,
};
use chrono::Utc;
use domain::grid::{GridRow, NowMarker};
use domain::layout::TaskPlacement;
use domain::models::{CustomZone, Settings, Task, TaskId, TaskUpdate, ZoneSettingsUpdate};
use domain::zones::ZoneOverlay;
use serde::{Deserialize, Serialize};

pub use infrastructure::error::InfraError;

/// Named operations the presentation layer can invoke.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    AddTask {
        title: String,
        duration_hours: f64,
        #[serde(default)]
        category: Option<String>,
    },
    AssignTask {
        task_id: TaskId,
        day: u8,
        hour: f64,
    },
    UnassignTask {
        task_id: TaskId,
    },
    ResizeTask {
        task_id: TaskId,
        duration_hours: f64,
    },
    RescheduleTask {
        task_id: TaskId,
        hour: f64,
    },
    TaskForm {
        task_id: TaskId,
    },
    UpdateTask {
        task_id: TaskId,
        update: TaskUpdate,
    },
    DeleteTask {
        task_id: TaskId,
    },
    DeleteAllTasks,
    ClearCalendar,
    DuplicateToAllDays {
        task_id: TaskId,
    },
    ListTasks,
    ListUnscheduled,
    ListDay {
        day: u8,
    },
    LayoutDay {
        day: u8,
    },
    SlotOverlays {
        slot_hour: f64,
    },
    Grid,
    NowMarker,
    BeginResize {
        task_id: TaskId,
    },
    BeginReschedule {
        task_id: TaskId,
    },
    GestureMove {
        delta_hours: f64,
    },
    EndGesture,
    Undo,
    Redo,
    UpdateZones {
        zones: ZoneSettingsUpdate,
    },
    AddCustomZone {
        title: String,
        start: f64,
        end: f64,
        #[serde(default)]
        color: Option<String>,
    },
    RemoveCustomZone {
        index: usize,
    },
    ZoneLabels,
    ExportCalendar,
    SetPet {
        name: String,
    },
    SetPetSize {
        size_px: u32,
    },
    SetPetJumpPower {
        power: f64,
    },
    SetDarkMode {
        enabled: bool,
    },
    ToggleDarkMode,
    GetState,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTask { .. } => "add_task",
            Self::AssignTask { .. } => "assign_task",
            Self::UnassignTask { .. } => "unassign_task",
            Self::ResizeTask { .. } => "resize_task",
            Self::RescheduleTask { .. } => "reschedule_task",
            Self::TaskForm { .. } => "task_form",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::DeleteAllTasks => "delete_all_tasks",
            Self::ClearCalendar => "clear_calendar",
            Self::DuplicateToAllDays { .. } => "duplicate_to_all_days",
            Self::ListTasks => "list_tasks",
            Self::ListUnscheduled => "list_unscheduled",
            Self::ListDay { .. } => "list_day",
            Self::LayoutDay { .. } => "layout_day",
            Self::SlotOverlays { .. } => "slot_overlays",
            Self::Grid => "grid",
            Self::NowMarker => "now_marker",
            Self::BeginResize { .. } => "begin_resize",
            Self::BeginReschedule { .. } => "begin_reschedule",
            Self::GestureMove { .. } => "gesture_move",
            Self::EndGesture => "end_gesture",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::UpdateZones { .. } => "update_zones",
            Self::AddCustomZone { .. } => "add_custom_zone",
            Self::RemoveCustomZone { .. } => "remove_custom_zone",
            Self::ZoneLabels => "zone_labels",
            Self::ExportCalendar => "export_calendar",
            Self::SetPet { .. } => "set_pet",
            Self::SetPetSize { .. } => "set_pet_size",
            Self::SetPetJumpPower { .. } => "set_pet_jump_power",
            Self::SetDarkMode { .. } => "set_dark_mode",
            Self::ToggleDarkMode => "toggle_dark_mode",
            Self::GetState => "get_state",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommandOutput {
    Task(Task),
    MaybeTask(Option<Task>),
    Tasks(Vec<Task>),
    MaybeTasks(Option<Vec<Task>>),
    TaskForm(Option<TaskUpdate>),
    Placements(Vec<TaskPlacement>),
    Overlays(Vec<ZoneOverlay>),
    Grid(Vec<GridRow>),
    NowMarker(NowMarker),
    Settings(Settings),
    Zone(CustomZone),
    MaybeZone(Option<CustomZone>),
    Labels(Vec<String>),
    Export(ExportResponse),
    State(Box<StateResponse>),
    Pet(String),
    Flag(bool),
    Count(usize),
    Done,
}

/// Runs one command. Failures are logged to the command log and returned as
/// display strings; the scheduler stays usable afterwards.
pub fn dispatch(state: &AppState, command: Command) -> Result<CommandOutput, String> {
    let name = command.name();
    run(state, command).map_err(|error| state.command_error(name, &error))
}

fn run(state: &AppState, command: Command) -> Result<CommandOutput, InfraError> {
    Ok(match command {
        Command::AddTask {
            title,
            duration_hours,
            category,
        } => CommandOutput::Task(add_task_impl(state, title, duration_hours, category)?),
        Command::AssignTask { task_id, day, hour } => {
            CommandOutput::MaybeTask(assign_task_impl(state, task_id, day, hour)?)
        }
        Command::UnassignTask { task_id } => {
            CommandOutput::MaybeTask(unassign_task_impl(state, task_id)?)
        }
        Command::ResizeTask {
            task_id,
            duration_hours,
        } => CommandOutput::MaybeTask(resize_task_impl(state, task_id, duration_hours)?),
        Command::RescheduleTask { task_id, hour } => {
            CommandOutput::MaybeTask(reschedule_task_impl(state, task_id, hour)?)
        }
        Command::TaskForm { task_id } => CommandOutput::TaskForm(task_form_impl(state, task_id)?),
        Command::UpdateTask { task_id, update } => {
            CommandOutput::MaybeTask(update_task_impl(state, task_id, update)?)
        }
        Command::DeleteTask { task_id } => CommandOutput::Flag(delete_task_impl(state, task_id)?),
        Command::DeleteAllTasks => CommandOutput::Count(delete_all_tasks_impl(state)?),
        Command::ClearCalendar => CommandOutput::Count(clear_calendar_impl(state)?),
        Command::DuplicateToAllDays { task_id } => {
            CommandOutput::MaybeTasks(duplicate_to_all_days_impl(state, task_id)?)
        }
        Command::ListTasks => CommandOutput::Tasks(list_tasks_impl(state)?),
        Command::ListUnscheduled => CommandOutput::Tasks(list_unscheduled_impl(state)?),
        Command::ListDay { day } => CommandOutput::Tasks(list_day_impl(state, day)?),
        Command::LayoutDay { day } => CommandOutput::Placements(layout_day_impl(state, day)?),
        Command::SlotOverlays { slot_hour } => {
            CommandOutput::Overlays(slot_overlays_impl(state, slot_hour)?)
        }
        Command::Grid => CommandOutput::Grid(grid_impl(state)?),
        Command::NowMarker => CommandOutput::NowMarker(now_marker_impl(state, Utc::now())),
        Command::BeginResize { task_id } => {
            CommandOutput::Flag(begin_resize_impl(state, task_id)?)
        }
        Command::BeginReschedule { task_id } => {
            CommandOutput::Flag(begin_reschedule_impl(state, task_id)?)
        }
        Command::GestureMove { delta_hours } => {
            CommandOutput::MaybeTask(gesture_move_impl(state, delta_hours)?)
        }
        Command::EndGesture => CommandOutput::MaybeTask(end_gesture_impl(state)?),
        Command::Undo => CommandOutput::Flag(undo_impl(state)?),
        Command::Redo => CommandOutput::Flag(redo_impl(state)?),
        Command::UpdateZones { zones } => CommandOutput::Settings(update_zones_impl(state, zones)?),
        Command::AddCustomZone {
            title,
            start,
            end,
            color,
        } => CommandOutput::Zone(add_custom_zone_impl(state, title, start, end, color)?),
        Command::RemoveCustomZone { index } => {
            CommandOutput::MaybeZone(remove_custom_zone_impl(state, index)?)
        }
        Command::ZoneLabels => CommandOutput::Labels(zone_labels_impl(state)?),
        Command::ExportCalendar => CommandOutput::Export(export_calendar_impl(state, Utc::now())?),
        Command::SetPet { name } => CommandOutput::Pet(set_pet_impl(state, name)?),
        Command::SetPetSize { size_px } => {
            set_pet_size_impl(state, size_px)?;
            CommandOutput::Done
        }
        Command::SetPetJumpPower { power } => {
            set_pet_jump_power_impl(state, power)?;
            CommandOutput::Done
        }
        Command::SetDarkMode { enabled } => CommandOutput::Flag(set_dark_mode_impl(state, enabled)?),
        Command::ToggleDarkMode => CommandOutput::Flag(toggle_dark_mode_impl(state)?),
        Command::GetState => CommandOutput::State(Box::new(get_state_impl(state)?)),
    })
}
