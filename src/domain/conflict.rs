use crate::domain::interval::format_hhmm;
use crate::domain::models::{Conflict, ScheduleBlock};

// A flexible item with no explicit end occupies this many minutes.
pub const DEFAULT_ITEM_MINUTES: u32 = 15;
// Breathing room left between a suggested slot and the fixed event.
pub const SUGGESTION_GAP_MINUTES: u32 = 15;
// Suggested slots stay inside waking hours: start no earlier than 06:00,
// end no later than 23:00.
pub const EARLIEST_SUGGESTED_START: u32 = 6 * 60;
pub const LATEST_SUGGESTED_END: u32 = 23 * 60;

pub const WORKOUT_ROUTINE_ID: &str = "workout";

pub fn detect_conflicts(
    fixed_events: &[ScheduleBlock],
    flexible_items: &[ScheduleBlock],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for fixed in fixed_events {
        for item in flexible_items {
            if fixed.interval.overlaps(&item.interval) {
                conflicts.push(Conflict {
                    fixed_event: fixed.clone(),
                    flexible_item: item.clone(),
                    suggestion: suggest(fixed, item),
                });
            }
        }
    }
    conflicts
}

fn suggest(fixed: &ScheduleBlock, item: &ScheduleBlock) -> String {
    let duration = item.interval.duration_minutes();

    let before_start = fixed.interval.start_minute as i64
        - duration as i64
        - SUGGESTION_GAP_MINUTES as i64;
    if before_start >= EARLIEST_SUGGESTED_START as i64 {
        return format!(
            "Move \"{}\" to {} (before the {})",
            item.label,
            format_hhmm(before_start as u32),
            fixed.label
        );
    }

    let after_start = fixed.interval.end_minute + SUGGESTION_GAP_MINUTES;
    if after_start + duration <= LATEST_SUGGESTED_END {
        return format!(
            "Move \"{}\" to {} (after the {})",
            item.label,
            format_hhmm(after_start),
            fixed.label
        );
    }

    if item.id == WORKOUT_ROUTINE_ID {
        return format!("Move workout to the morning (before the {})", fixed.label);
    }

    format!(
        "Adjust \"{}\" around {} ({}-{})",
        item.label,
        fixed.label,
        fixed.interval.start_hhmm(),
        fixed.interval.end_hhmm()
    )
}
