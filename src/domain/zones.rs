use crate::domain::models::Settings;
use crate::domain::time::{format_clock_label, normalize_hour, split_overnight};
use serde::Serialize;

pub const LUNCH_LABEL: &str = "Lunch";
pub const SLEEP_LABEL: &str = "Sleep";
const FALLBACK_OVERLAY_COLOR: &str = "#ccc";

/// One recurring range as fed to the overlay engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDefinition {
    pub start: f64,
    pub end: f64,
    pub color: String,
    pub label: String,
}

/// Part of a one-hour slot covered by a zone, as fractions of the slot height.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZoneOverlay {
    pub offset_fraction: f64,
    pub duration_fraction: f64,
    pub color: String,
    pub label: String,
}

/// Lunch (when enabled), sleep, then custom zones in their configured order.
pub fn active_zones(settings: &Settings) -> Vec<ZoneDefinition> {
    let mut zones = Vec::with_capacity(settings.custom_zones.len() + 2);
    if settings.lunch_enabled {
        zones.push(ZoneDefinition {
            start: settings.lunch_start,
            end: settings.lunch_end,
            color: settings.lunch_color.clone(),
            label: LUNCH_LABEL.to_string(),
        });
    }
    zones.push(ZoneDefinition {
        start: settings.sleep_start,
        end: settings.sleep_end,
        color: settings.sleep_color.clone(),
        label: SLEEP_LABEL.to_string(),
    });
    zones.extend(settings.custom_zones.iter().map(|zone| ZoneDefinition {
        start: zone.start,
        end: zone.end,
        color: zone.color.clone(),
        label: zone.title.clone(),
    }));
    zones
}

/// Overlays for the slot `[slot_hour, slot_hour + 1)`.
///
/// Zones never merge or shadow each other: every zone interval that touches
/// the slot yields its own overlay, in zone order.
pub fn slot_overlays(slot_hour: f64, zones: &[ZoneDefinition]) -> Vec<ZoneOverlay> {
    let slot_start = normalize_hour(slot_hour);
    let slot_end = slot_start + 1.0;

    let mut overlays = Vec::new();
    for zone in zones {
        for interval in split_overnight(zone.start, zone.end) {
            let overlap_start = slot_start.max(interval.start);
            let overlap_end = slot_end.min(interval.end);
            if overlap_start < overlap_end {
                overlays.push(ZoneOverlay {
                    offset_fraction: overlap_start - slot_start,
                    duration_fraction: overlap_end - overlap_start,
                    color: if zone.color.trim().is_empty() {
                        FALLBACK_OVERLAY_COLOR.to_string()
                    } else {
                        zone.color.clone()
                    },
                    label: zone.label.clone(),
                });
            }
        }
    }
    overlays
}

/// "Title (H:00 AM - H:00 PM)" rows for the custom zone list in settings.
pub fn custom_zone_labels(settings: &Settings) -> Vec<String> {
    settings
        .custom_zones
        .iter()
        .map(|zone| {
            format!(
                "{} ({} - {})",
                zone.title,
                format_clock_label(zone.start),
                format_clock_label(zone.end)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(start: f64, end: f64, label: &str) -> ZoneDefinition {
        ZoneDefinition {
            start,
            end,
            color: "#123456".to_string(),
            label: label.to_string(),
        }
    }

    fn single(overlays: &[ZoneOverlay]) -> (f64, f64) {
        assert_eq!(overlays.len(), 1, "expected one overlay: {overlays:?}");
        (overlays[0].offset_fraction, overlays[0].duration_fraction)
    }

    #[test]
    fn lunch_covers_the_whole_noon_slot() {
        let zones = [zone(12.0, 13.0, LUNCH_LABEL)];
        assert_eq!(single(&slot_overlays(12.0, &zones)), (0.0, 1.0));
        assert!(slot_overlays(13.0, &zones).is_empty());
    }

    #[test]
    fn sleep_wraps_midnight() {
        let zones = [zone(22.0, 6.0, SLEEP_LABEL)];
        assert_eq!(single(&slot_overlays(23.0, &zones)), (0.0, 1.0));
        assert_eq!(single(&slot_overlays(5.0, &zones)), (0.0, 1.0));
        assert!(slot_overlays(6.0, &zones).is_empty());
        assert!(slot_overlays(21.0, &zones).is_empty());
    }

    #[test]
    fn grid_hours_past_midnight_are_normalized() {
        let zones = [zone(22.0, 6.0, SLEEP_LABEL)];
        assert_eq!(single(&slot_overlays(28.0, &zones)), (0.0, 1.0));
        assert!(slot_overlays(4.0 + 24.0 + 2.0, &zones).is_empty());
    }

    #[test]
    fn partial_coverage_reports_offset_and_fraction() {
        let zones = [zone(12.5, 13.25, LUNCH_LABEL)];
        assert_eq!(single(&slot_overlays(12.0, &zones)), (0.5, 0.5));
        assert_eq!(single(&slot_overlays(13.0, &zones)), (0.0, 0.25));
    }

    #[test]
    fn empty_zone_never_overlaps() {
        let zones = [zone(9.0, 9.0, "Nothing")];
        for hour in 0..24 {
            assert!(slot_overlays(f64::from(hour), &zones).is_empty());
        }
    }

    #[test]
    fn overlapping_zones_stack_in_zone_order() {
        let zones = [zone(12.0, 13.0, LUNCH_LABEL), zone(11.5, 12.5, "Gym")];
        let overlays = slot_overlays(12.0, &zones);
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].label, LUNCH_LABEL);
        assert_eq!(overlays[1].label, "Gym");
        assert_eq!(overlays[1].duration_fraction, 0.5);
    }

    #[test]
    fn disabled_lunch_is_left_out_of_active_zones() {
        let mut settings = Settings::default();
        settings
            .add_custom_zone("Focus", 9.0, 11.0, Some("#abcdef"))
            .expect("add zone");
        let labels = |settings: &Settings| {
            active_zones(settings)
                .into_iter()
                .map(|zone| zone.label)
                .collect::<Vec<_>>()
        };
        assert_eq!(labels(&settings), vec!["Lunch", "Sleep", "Focus"]);

        settings.lunch_enabled = false;
        assert_eq!(labels(&settings), vec!["Sleep", "Focus"]);
        assert!(slot_overlays(12.0, &active_zones(&settings)).is_empty());
    }

    #[test]
    fn custom_zone_labels_use_clock_format() {
        let mut settings = Settings::default();
        settings
            .add_custom_zone("Night shift", 22.0, 6.0, None)
            .expect("add zone");
        assert_eq!(
            custom_zone_labels(&settings),
            vec!["Night shift (10:00 PM - 6:00 AM)".to_string()]
        );
    }
}
