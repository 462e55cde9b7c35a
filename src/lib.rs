pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::commands::{
    add_game_impl, begin_drag_impl, cancel_drag_impl, create_custom_event_impl, current_week_impl,
    delete_custom_event_impl, detect_conflicts_impl, finish_drag_impl, get_day_schedule_impl,
    import_calendar_event_impl, list_streaks_impl, list_upcoming_games_impl, reset_routine_impl,
    scan_conflicts_impl, set_routine_override_impl, skip_routine_impl, streak_for_impl,
    toggle_completion_impl, update_custom_event_impl, update_drag_impl, AppState,
    DragStateResponse, FinishDragResponse,
};
pub use application::schedule::{CompletionUpdate, DaySchedule, DayScheduleService};
pub use domain::interval::TimeInterval;
pub use domain::models::{
    BlockKind, ColumnAssignment, Conflict, CustomEvent, GameEvent, RoutineItem, RoutineOverride,
    ScheduleBlock, Streak,
};
pub use infrastructure::calendar_feed::CalendarEvent;
pub use infrastructure::error::InfraError;
