use crate::domain::interval::{TimeInterval, DAY_END_MINUTE};
use crate::domain::models::{BlockKind, ScheduleBlock};
use serde::{Deserialize, Serialize};

// Pointer travel below this many pixels is a click, not a drag.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;
pub const SNAP_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DragMode {
    Move,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PressTarget {
    Block { block: ScheduleBlock, mode: DragMode },
    EmptySlot { date: String, minute_of_day: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragCommit {
    pub block_id: String,
    pub kind: BlockKind,
    pub date: String,
    pub interval: TimeInterval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    Ignored,
    ClickedBlock { block_id: String },
    ClickedEmpty { date: String, minute_of_day: u32 },
    NoChange { block_id: String },
    Committed(DragCommit),
}

#[derive(Debug, Clone)]
struct Session {
    target: PressTarget,
    origin: PointerPoint,
    px_per_minute: f64,
}

#[derive(Debug, Clone)]
enum DragState {
    Idle,
    Pending(Session),
    Dragging(Session),
}

#[derive(Debug)]
pub struct DragController {
    state: DragState,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn pointer_down(
        &mut self,
        target: PressTarget,
        origin: PointerPoint,
        px_per_minute: f64,
    ) -> Result<(), String> {
        if self.is_active() {
            return Err("a drag is already in progress".to_string());
        }
        if !(px_per_minute > 0.0) {
            return Err(format!(
                "px_per_minute must be a positive number: got {px_per_minute}"
            ));
        }
        if let PressTarget::Block { block, .. } = &target {
            if !block.editable {
                return Err(format!("block \"{}\" is not editable", block.id));
            }
        }
        self.state = DragState::Pending(Session {
            target,
            origin,
            px_per_minute,
        });
        Ok(())
    }

    // Returns the live preview interval once the drag threshold is crossed.
    pub fn pointer_move(&mut self, point: PointerPoint) -> Option<TimeInterval> {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Idle => None,
            DragState::Pending(session) => {
                if crossed_threshold(session.origin, point) {
                    let preview = session_preview(&session, point);
                    self.state = DragState::Dragging(session);
                    preview
                } else {
                    self.state = DragState::Pending(session);
                    None
                }
            }
            DragState::Dragging(session) => {
                let preview = session_preview(&session, point);
                self.state = DragState::Dragging(session);
                preview
            }
        }
    }

    pub fn pointer_up(&mut self, point: PointerPoint, day: &str) -> DragOutcome {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Pending(session) => click_outcome(session),
            DragState::Dragging(session) => release_outcome(session, point, day),
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

fn crossed_threshold(origin: PointerPoint, point: PointerPoint) -> bool {
    (point.x - origin.x).abs() >= DRAG_THRESHOLD_PX
        || (point.y - origin.y).abs() >= DRAG_THRESHOLD_PX
}

fn session_preview(session: &Session, point: PointerPoint) -> Option<TimeInterval> {
    let PressTarget::Block { block, mode } = &session.target else {
        return None;
    };
    let minutes_delta = (point.y - session.origin.y) / session.px_per_minute;
    Some(match mode {
        DragMode::Move => moved_interval(block.interval, minutes_delta),
        DragMode::Resize => resized_interval(block.interval, minutes_delta),
    })
}

fn click_outcome(session: Session) -> DragOutcome {
    match session.target {
        PressTarget::Block { block, .. } => DragOutcome::ClickedBlock { block_id: block.id },
        PressTarget::EmptySlot {
            date,
            minute_of_day,
        } => DragOutcome::ClickedEmpty {
            date,
            minute_of_day: snap_minute(minute_of_day),
        },
    }
}

fn release_outcome(session: Session, point: PointerPoint, day: &str) -> DragOutcome {
    let preview = session_preview(&session, point);
    let PressTarget::Block { block, .. } = session.target else {
        // Dragging from empty space selects nothing and creates nothing.
        return DragOutcome::Ignored;
    };
    let Some(interval) = preview else {
        return DragOutcome::Ignored;
    };

    // Flexible blocks stay on the day their routine belongs to; only
    // custom events follow the pointer across day columns.
    let date = if block.kind == BlockKind::Custom && day != block.date {
        day.to_string()
    } else {
        block.date.clone()
    };

    if interval == block.interval && date == block.date {
        return DragOutcome::NoChange { block_id: block.id };
    }

    DragOutcome::Committed(DragCommit {
        block_id: block.id,
        kind: block.kind,
        date,
        interval,
    })
}

fn snap_to_grid(raw_minutes: f64) -> f64 {
    let step = SNAP_MINUTES as f64;
    (raw_minutes / step).round() * step
}

pub fn snap_minute(minute_of_day: u32) -> u32 {
    (((minute_of_day + SNAP_MINUTES / 2) / SNAP_MINUTES) * SNAP_MINUTES).min(DAY_END_MINUTE)
}

fn moved_interval(original: TimeInterval, minutes_delta: f64) -> TimeInterval {
    let duration = original.duration_minutes();
    let latest_start = (DAY_END_MINUTE - duration) as f64;
    let snapped = snap_to_grid(original.start_minute as f64 + minutes_delta);
    let start_minute = snapped.clamp(0.0, latest_start) as u32;
    TimeInterval {
        start_minute,
        end_minute: start_minute + duration,
    }
}

fn resized_interval(original: TimeInterval, minutes_delta: f64) -> TimeInterval {
    // The floor cannot pass the end of the day for blocks starting after 23:55.
    let shortest_end = (original.start_minute + SNAP_MINUTES).min(DAY_END_MINUTE);
    let snapped = snap_to_grid(original.end_minute as f64 + minutes_delta);
    let end_minute = snapped.clamp(shortest_end as f64, DAY_END_MINUTE as f64) as u32;
    TimeInterval {
        start_minute: original.start_minute,
        end_minute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(id: &str, kind: BlockKind, editable: bool, start: u32, end: u32) -> ScheduleBlock {
        ScheduleBlock {
            id: id.to_string(),
            label: id.to_string(),
            date: "2026-03-02".to_string(),
            interval: TimeInterval::new(start, end).expect("valid interval"),
            kind,
            editable,
            completed: None,
        }
    }

    fn point(x: f64, y: f64) -> PointerPoint {
        PointerPoint { x, y }
    }

    fn press_move(controller: &mut DragController, block: ScheduleBlock, scale: f64) {
        controller
            .pointer_down(
                PressTarget::Block {
                    block,
                    mode: DragMode::Move,
                },
                point(100.0, 200.0),
                scale,
            )
            .expect("pointer down accepted");
    }

    #[test]
    fn fixed_blocks_are_rejected_at_pointer_down() {
        let mut controller = DragController::new();
        let result = controller.pointer_down(
            PressTarget::Block {
                block: block("game-1", BlockKind::Fixed, false, 900, 1020),
                mode: DragMode::Move,
            },
            point(0.0, 0.0),
            1.8,
        );
        assert!(result.is_err());
        assert!(!controller.is_active());
        assert_eq!(
            controller.pointer_up(point(0.0, 0.0), "2026-03-02"),
            DragOutcome::Ignored
        );
    }

    #[test]
    fn second_pointer_down_is_rejected_while_active() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("workout", BlockKind::Flexible, true, 1050, 1095), 1.8);
        let result = controller.pointer_down(
            PressTarget::EmptySlot {
                date: "2026-03-02".to_string(),
                minute_of_day: 600,
            },
            point(0.0, 0.0),
            1.8,
        );
        assert!(result.is_err());
    }

    #[test]
    fn release_below_threshold_is_a_block_click() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("workout", BlockKind::Flexible, true, 1050, 1095), 1.8);
        assert!(controller.pointer_move(point(102.0, 203.0)).is_none());
        assert_eq!(
            controller.pointer_up(point(102.0, 203.0), "2026-03-02"),
            DragOutcome::ClickedBlock {
                block_id: "workout".to_string()
            }
        );
        assert!(!controller.is_active());
    }

    #[test]
    fn release_on_empty_slot_reports_a_snapped_create_intent() {
        let mut controller = DragController::new();
        controller
            .pointer_down(
                PressTarget::EmptySlot {
                    date: "2026-03-02".to_string(),
                    minute_of_day: 543,
                },
                point(50.0, 50.0),
                1.8,
            )
            .expect("pointer down accepted");
        assert_eq!(
            controller.pointer_up(point(51.0, 51.0), "2026-03-02"),
            DragOutcome::ClickedEmpty {
                date: "2026-03-02".to_string(),
                minute_of_day: 545,
            }
        );
    }

    #[test]
    fn dragging_from_empty_space_creates_nothing() {
        let mut controller = DragController::new();
        controller
            .pointer_down(
                PressTarget::EmptySlot {
                    date: "2026-03-02".to_string(),
                    minute_of_day: 600,
                },
                point(50.0, 50.0),
                1.8,
            )
            .expect("pointer down accepted");
        assert!(controller.pointer_move(point(50.0, 80.0)).is_none());
        assert_eq!(
            controller.pointer_up(point(50.0, 80.0), "2026-03-02"),
            DragOutcome::Ignored
        );
    }

    #[test]
    fn seven_pixels_at_default_scale_moves_one_snap_step() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("workout", BlockKind::Flexible, true, 540, 600), 1.8);

        // 7 px / 1.8 px per minute is under 4 minutes of travel, but the
        // grid rounds the new start up to 09:05.
        let preview = controller.pointer_move(point(100.0, 207.0));
        assert_eq!(preview, Some(TimeInterval::new(545, 605).expect("valid")));

        match controller.pointer_up(point(100.0, 207.0), "2026-03-02") {
            DragOutcome::Committed(commit) => {
                assert_eq!(commit.block_id, "workout");
                assert_eq!(commit.interval.start_minute, 545);
                assert_eq!(commit.interval.end_minute, 605);
                assert_eq!(commit.date, "2026-03-02");
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn move_preserves_duration_and_clamps_to_day_bounds() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("late", BlockKind::Custom, true, 1380, 1410), 1.0);
        let preview = controller.pointer_move(point(100.0, 900.0));
        assert_eq!(preview, Some(TimeInterval::new(1410, 1440).expect("valid")));

        controller.cancel();
        press_move(&mut controller, block("early", BlockKind::Custom, true, 60, 120), 1.0);
        let preview = controller.pointer_move(point(100.0, -800.0));
        assert_eq!(preview, Some(TimeInterval::new(0, 60).expect("valid")));
    }

    #[test]
    fn resize_moves_end_only_and_never_collapses_below_one_step() {
        let mut controller = DragController::new();
        controller
            .pointer_down(
                PressTarget::Block {
                    block: block("workout", BlockKind::Flexible, true, 540, 600),
                    mode: DragMode::Resize,
                },
                point(100.0, 200.0),
                1.0,
            )
            .expect("pointer down accepted");

        let preview = controller.pointer_move(point(100.0, -700.0));
        assert_eq!(preview, Some(TimeInterval::new(540, 545).expect("valid")));

        let preview = controller.pointer_move(point(100.0, 2000.0));
        assert_eq!(preview, Some(TimeInterval::new(540, 1440).expect("valid")));
    }

    #[test]
    fn returning_to_the_origin_commits_nothing() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("workout", BlockKind::Flexible, true, 1050, 1095), 1.8);
        assert!(controller.pointer_move(point(100.0, 207.0)).is_some());
        assert_eq!(
            controller.pointer_up(point(100.0, 200.0), "2026-03-02"),
            DragOutcome::NoChange {
                block_id: "workout".to_string()
            }
        );
    }

    #[test]
    fn horizontal_jitter_alone_changes_nothing() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("workout", BlockKind::Flexible, true, 1050, 1095), 1.8);
        assert!(controller.pointer_move(point(140.0, 200.0)).is_some());
        assert_eq!(
            controller.pointer_up(point(140.0, 200.0), "2026-03-02"),
            DragOutcome::NoChange {
                block_id: "workout".to_string()
            }
        );
    }

    #[test]
    fn custom_blocks_follow_the_pointer_across_days() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("evt-1", BlockKind::Custom, true, 600, 660), 1.0);
        assert!(controller.pointer_move(point(100.0, 230.0)).is_some());
        match controller.pointer_up(point(100.0, 230.0), "2026-03-03") {
            DragOutcome::Committed(commit) => {
                assert_eq!(commit.date, "2026-03-03");
                assert_eq!(commit.interval, TimeInterval::new(630, 690).expect("valid"));
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn flexible_blocks_keep_their_routine_date_across_days() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("workout", BlockKind::Flexible, true, 1050, 1095), 1.0);
        assert!(controller.pointer_move(point(100.0, 230.0)).is_some());
        match controller.pointer_up(point(100.0, 230.0), "2026-03-03") {
            DragOutcome::Committed(commit) => {
                assert_eq!(commit.date, "2026-03-02");
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn day_change_alone_commits_a_custom_block() {
        let mut controller = DragController::new();
        press_move(&mut controller, block("evt-1", BlockKind::Custom, true, 600, 660), 1.0);
        assert!(controller.pointer_move(point(140.0, 200.0)).is_some());
        match controller.pointer_up(point(140.0, 200.0), "2026-03-04") {
            DragOutcome::Committed(commit) => {
                assert_eq!(commit.date, "2026-03-04");
                assert_eq!(commit.interval, TimeInterval::new(600, 660).expect("valid"));
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    // Feature: dayboard, Property 7: a move drag preserves duration, stays
    // inside the day, and lands on the five-minute grid
    proptest! {
        #[test]
        fn property7_move_snaps_and_clamps(
            start_step in 0u32..287,
            duration_steps in 1u32..48,
            delta_y in -3000.0f64..3000.0,
            scale in 0.5f64..4.0
        ) {
            let duration = duration_steps * 5;
            let start = (start_step * 5).min(1440 - duration);
            let original = TimeInterval::new(start, start + duration).expect("valid interval");

            let mut controller = DragController::new();
            controller
                .pointer_down(
                    PressTarget::Block {
                        block: ScheduleBlock {
                            id: "b".to_string(),
                            label: "b".to_string(),
                            date: "2026-03-02".to_string(),
                            interval: original,
                            kind: BlockKind::Custom,
                            editable: true,
                            completed: None,
                        },
                        mode: DragMode::Move,
                    },
                    point(0.0, 0.0),
                    scale,
                )
                .expect("pointer down accepted");

            if let Some(preview) = controller.pointer_move(point(0.0, delta_y)) {
                prop_assert_eq!(preview.duration_minutes(), duration);
                prop_assert!(preview.end_minute <= 1440);
                prop_assert_eq!(preview.start_minute % 5, 0);
            }
        }
    }

    // Feature: dayboard, Property 8: a resize drag keeps the start fixed and
    // the end inside [start + 5, 1440] on the grid
    proptest! {
        #[test]
        fn property8_resize_clamps_end_only(
            start_step in 0u32..287,
            duration_steps in 1u32..48,
            delta_y in -3000.0f64..3000.0,
            scale in 0.5f64..4.0
        ) {
            let duration = duration_steps * 5;
            let start = (start_step * 5).min(1440 - duration);
            let original = TimeInterval::new(start, start + duration).expect("valid interval");

            let mut controller = DragController::new();
            controller
                .pointer_down(
                    PressTarget::Block {
                        block: ScheduleBlock {
                            id: "b".to_string(),
                            label: "b".to_string(),
                            date: "2026-03-02".to_string(),
                            interval: original,
                            kind: BlockKind::Custom,
                            editable: true,
                            completed: None,
                        },
                        mode: DragMode::Resize,
                    },
                    point(0.0, 0.0),
                    scale,
                )
                .expect("pointer down accepted");

            if let Some(preview) = controller.pointer_move(point(0.0, delta_y)) {
                prop_assert_eq!(preview.start_minute, start);
                prop_assert!(preview.end_minute >= start + 5);
                prop_assert!(preview.end_minute <= 1440);
                prop_assert_eq!(preview.end_minute % 5, 0);
            }
        }
    }
}
