//! Side-by-side placement of overlapping tasks within one day column.
//!
//! Tasks are swept in start order into clusters of transitively overlapping
//! intervals, then packed first-fit into lanes. First-fit is not a minimum
//! lane colouring; a task keeps a stable lane while it is dragged or resized.

use crate::domain::models::{Task, TaskId};
use crate::domain::time::effective_hour;
use serde::Serialize;

pub const DEFAULT_DAY_START_HOUR: f64 = 5.0;
const LANE_EPSILON_HOURS: f64 = 0.01;
const USABLE_WIDTH_PERCENT: f64 = 94.0;
const LANE_MARGIN_PERCENT: f64 = 2.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskPlacement {
    pub task_id: TaskId,
    pub cluster_index: usize,
    pub lane_index: usize,
    pub lane_count: usize,
    pub effective_start: f64,
    pub effective_end: f64,
    /// Grid row the card is anchored in (`floor(effective_start)`).
    pub slot_hour: u32,
    /// Offset of the card top within its anchor row, in hours.
    pub top_offset_hours: f64,
    pub width_percent: f64,
    pub left_percent: f64,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    task_id: TaskId,
    start: f64,
    end: f64,
    duration: f64,
}

/// Lays out the scheduled tasks of a single day. Unscheduled tasks in the
/// input are skipped. Placements come back in sweep order.
pub fn layout_day(tasks: &[&Task], day_start_hour: f64) -> Vec<TaskPlacement> {
    let mut spans = tasks
        .iter()
        .filter_map(|task| {
            let start = effective_hour(task.hour()?, day_start_hour);
            Some(Span {
                task_id: task.id,
                start,
                end: start + task.duration,
                duration: task.duration,
            })
        })
        .collect::<Vec<_>>();
    spans.sort_by(|left, right| {
        left.start
            .total_cmp(&right.start)
            .then_with(|| right.duration.total_cmp(&left.duration))
    });

    let mut placements = Vec::with_capacity(spans.len());
    for (cluster_index, cluster) in clusters(&spans).into_iter().enumerate() {
        let lanes = assign_lanes(cluster);
        let lane_count = lanes.iter().copied().max().map_or(1, |max| max + 1);
        let width_percent = USABLE_WIDTH_PERCENT / lane_count as f64;

        for (span, lane_index) in cluster.iter().zip(lanes) {
            let slot_hour = span.start.floor();
            placements.push(TaskPlacement {
                task_id: span.task_id,
                cluster_index,
                lane_index,
                lane_count,
                effective_start: span.start,
                effective_end: span.end,
                slot_hour: slot_hour as u32,
                top_offset_hours: span.start - slot_hour,
                width_percent,
                left_percent: lane_index as f64 * width_percent + LANE_MARGIN_PERCENT,
            });
        }
    }
    placements
}

/// Splits sorted spans wherever a start reaches the running cluster end.
fn clusters(spans: &[Span]) -> Vec<&[Span]> {
    let mut clusters = Vec::new();
    let mut cluster_start = 0;
    let mut cluster_end = f64::NEG_INFINITY;

    for (index, span) in spans.iter().enumerate() {
        if index > cluster_start && span.start >= cluster_end {
            clusters.push(&spans[cluster_start..index]);
            cluster_start = index;
            cluster_end = span.end;
        } else {
            cluster_end = cluster_end.max(span.end);
        }
    }
    if cluster_start < spans.len() {
        clusters.push(&spans[cluster_start..]);
    }
    clusters
}

/// First-fit lane index for each span of one cluster.
fn assign_lanes(cluster: &[Span]) -> Vec<usize> {
    let mut lane_ends: Vec<f64> = Vec::new();
    cluster
        .iter()
        .map(|span| {
            match lane_ends
                .iter()
                .position(|lane_end| span.start >= lane_end - LANE_EPSILON_HOURS)
            {
                Some(lane) => {
                    lane_ends[lane] = span.end;
                    lane
                }
                None => {
                    lane_ends.push(span.end);
                    lane_ends.len() - 1
                }
            }
        })
        .collect()
}
