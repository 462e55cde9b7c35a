use crate::application::bootstrap::bootstrap_workspace;
use crate::application::schedule::{CompletionUpdate, DaySchedule, DayScheduleService};
use crate::domain::drag::{DragController, DragMode, DragOutcome, PointerPoint, PressTarget};
use crate::domain::interval::{format_hhmm, parse_hhmm, TimeInterval};
use crate::domain::models::{
    parse_date, Conflict, CustomEvent, GameEvent, RoutineOverride, Streak,
};
use crate::infrastructure::calendar_feed::{CalendarEvent, CalendarProvider, SqliteCalendarFeed};
use crate::infrastructure::config::{load_routine_items, read_app_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::game_schedule::{GameProvider, SqliteGameSchedule, UPCOMING_WINDOW_DAYS};
use crate::infrastructure::planner_store::{PlannerStore, SqlitePlannerStore};
use crate::infrastructure::routine_schedule::{WeeklyRoutineSchedule, DAILY_GOAL_IDS};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_PX_PER_MINUTE: f64 = 1.8;
const DEFAULT_CONFLICT_SCAN_DAYS: u32 = 14;
const EXTERNAL_ORIGIN: &str = "external";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    planner_store: Arc<SqlitePlannerStore>,
    game_schedule: Arc<SqliteGameSchedule>,
    calendar_feed: Arc<SqliteCalendarFeed>,
    routine_schedule: Arc<WeeklyRoutineSchedule>,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");
        let routine_items = load_routine_items(&config_dir)?;

        let planner_store = Arc::new(SqlitePlannerStore::new(&bootstrap.database_path));
        let game_schedule = Arc::new(SqliteGameSchedule::new(&bootstrap.database_path));
        let calendar_feed = Arc::new(SqliteCalendarFeed::new(&bootstrap.database_path));

        Ok(Self {
            config_dir,
            database_path: bootstrap.database_path,
            logs_dir,
            planner_store,
            game_schedule,
            calendar_feed,
            routine_schedule: Arc::new(WeeklyRoutineSchedule::new(routine_items)),
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
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

#[derive(Debug, Default)]
struct RuntimeState {
    drag: DragController,
    drag_date: Option<String>,
}

#[derive(Debug, Clone)]
struct AppSettings {
    px_per_minute: f64,
    conflict_scan_days: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            px_per_minute: DEFAULT_PX_PER_MINUTE,
            conflict_scan_days: DEFAULT_CONFLICT_SCAN_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DragStateResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<TimeInterval>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishDragResponse {
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute_of_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<DaySchedule>,
}

type AppScheduleService = DayScheduleService<
    WeeklyRoutineSchedule,
    SqliteGameSchedule,
    SqliteCalendarFeed,
    SqlitePlannerStore,
>;

fn schedule_service(state: &AppState) -> AppScheduleService {
    DayScheduleService::new(
        Arc::clone(&state.routine_schedule),
        Arc::clone(&state.game_schedule),
        Arc::clone(&state.calendar_feed),
        Arc::clone(&state.planner_store),
    )
}

pub async fn get_day_schedule_impl(
    state: &AppState,
    date: String,
) -> Result<DaySchedule, InfraError> {
    let date = required_date(&date, "date")?;
    schedule_service(state).day(&date).await
}

pub async fn begin_drag_impl(
    state: &AppState,
    date: String,
    block_id: Option<String>,
    mode: Option<String>,
    minute_of_day: Option<u32>,
    x: f64,
    y: f64,
    px_per_minute: Option<f64>,
) -> Result<DragStateResponse, InfraError> {
    let date = required_date(&date, "date")?;
    let px_per_minute =
        px_per_minute.unwrap_or_else(|| load_app_settings(state.config_dir()).px_per_minute);

    let target = match block_id {
        Some(raw_id) => {
            let block_id = required_text(&raw_id, "block_id")?;
            let day = schedule_service(state).day(&date).await?;
            let block = day
                .blocks
                .iter()
                .find(|block| block.id == block_id)
                .cloned()
                .ok_or_else(|| {
                    InfraError::InvalidConfig(format!("unknown block '{block_id}' on {date}"))
                })?;
            let mode = parse_drag_mode(mode.as_deref().unwrap_or("move"))?;
            PressTarget::Block { block, mode }
        }
        None => {
            let minute_of_day = minute_of_day.ok_or_else(|| {
                InfraError::InvalidConfig(
                    "minute_of_day is required when block_id is not set".to_string(),
                )
            })?;
            PressTarget::EmptySlot {
                date: date.clone(),
                minute_of_day,
            }
        }
    };

    let mut runtime = lock_runtime(state)?;
    runtime
        .drag
        .pointer_down(target, PointerPoint { x, y }, px_per_minute)
        .map_err(InfraError::InvalidConfig)?;
    runtime.drag_date = Some(date);
    Ok(DragStateResponse {
        active: true,
        preview: None,
    })
}

pub fn update_drag_impl(state: &AppState, x: f64, y: f64) -> Result<DragStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let preview = runtime.drag.pointer_move(PointerPoint { x, y });
    Ok(DragStateResponse {
        active: runtime.drag.is_active(),
        preview,
    })
}

pub async fn finish_drag_impl(
    state: &AppState,
    x: f64,
    y: f64,
) -> Result<FinishDragResponse, InfraError> {
    let (outcome, drag_date) = {
        let mut runtime = lock_runtime(state)?;
        let drag_date = runtime.drag_date.take().unwrap_or_default();
        let outcome = runtime.drag.pointer_up(PointerPoint { x, y }, &drag_date);
        (outcome, drag_date)
    };

    match outcome {
        DragOutcome::Ignored => Ok(FinishDragResponse {
            outcome: "ignored".to_string(),
            block_id: None,
            date: None,
            minute_of_day: None,
            day: None,
        }),
        DragOutcome::ClickedBlock { block_id } => Ok(FinishDragResponse {
            outcome: "clicked_block".to_string(),
            block_id: Some(block_id),
            date: Some(drag_date),
            minute_of_day: None,
            day: None,
        }),
        DragOutcome::ClickedEmpty {
            date,
            minute_of_day,
        } => Ok(FinishDragResponse {
            outcome: "clicked_empty".to_string(),
            block_id: None,
            date: Some(date),
            minute_of_day: Some(minute_of_day),
            day: None,
        }),
        DragOutcome::NoChange { block_id } => Ok(FinishDragResponse {
            outcome: "no_change".to_string(),
            block_id: Some(block_id),
            date: Some(drag_date),
            minute_of_day: None,
            day: None,
        }),
        DragOutcome::Committed(commit) => {
            let service = schedule_service(state);
            service.apply_commit(&commit).await?;
            state.log_info(
                "finish_drag",
                &format!(
                    "committed {} to {} {}-{}",
                    commit.block_id,
                    commit.date,
                    commit.interval.start_hhmm(),
                    commit.interval.end_hhmm()
                ),
            );
            // The day is rebuilt from the stores rather than patched in place.
            let day = service.day(&commit.date).await?;
            Ok(FinishDragResponse {
                outcome: "committed".to_string(),
                block_id: Some(commit.block_id),
                date: Some(commit.date),
                minute_of_day: None,
                day: Some(day),
            })
        }
    }
}

pub fn cancel_drag_impl(state: &AppState) -> Result<DragStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.drag.cancel();
    runtime.drag_date = None;
    Ok(DragStateResponse {
        active: false,
        preview: None,
    })
}

pub async fn create_custom_event_impl(
    state: &AppState,
    name: String,
    date: String,
    start: String,
    end: String,
) -> Result<CustomEvent, InfraError> {
    let name = required_text(&name, "name")?;
    let date = required_date(&date, "date")?;
    let interval = interval_from_hhmm(&start, &end)?;

    let event = CustomEvent {
        id: next_id("evt"),
        name,
        date,
        interval,
    };
    state.planner_store.create_custom_event(&event).await?;
    state.log_info(
        "create_custom_event",
        &format!(
            "created {} on {} {}-{}",
            event.id,
            event.date,
            event.interval.start_hhmm(),
            event.interval.end_hhmm()
        ),
    );
    Ok(event)
}

pub async fn update_custom_event_impl(
    state: &AppState,
    event_id: String,
    name: Option<String>,
    date: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<CustomEvent, InfraError> {
    let event_id = required_text(&event_id, "event_id")?;
    let Some(mut event) = state.planner_store.get_custom_event(&event_id).await? else {
        return Err(InfraError::InvalidConfig(format!(
            "unknown custom event '{event_id}'"
        )));
    };

    if let Some(raw) = name {
        event.name = required_text(&raw, "name")?;
    }
    if let Some(raw) = date {
        event.date = required_date(&raw, "date")?;
    }
    if start.is_some() || end.is_some() {
        let start = match start {
            Some(raw) => raw,
            None => event.interval.start_hhmm(),
        };
        let end = match end {
            Some(raw) => raw,
            None => event.interval.end_hhmm(),
        };
        event.interval = interval_from_hhmm(&start, &end)?;
    }

    state.planner_store.update_custom_event(&event).await?;
    state.log_info(
        "update_custom_event",
        &format!("updated {} on {}", event.id, event.date),
    );
    Ok(event)
}

pub async fn delete_custom_event_impl(
    state: &AppState,
    event_id: String,
) -> Result<bool, InfraError> {
    let event_id = required_text(&event_id, "event_id")?;
    let existed = state
        .planner_store
        .get_custom_event(&event_id)
        .await?
        .is_some();
    if existed {
        state.planner_store.delete_custom_event(&event_id).await?;
        state.log_info("delete_custom_event", &format!("deleted {event_id}"));
    }
    Ok(existed)
}

pub async fn set_routine_override_impl(
    state: &AppState,
    routine_id: String,
    date: String,
    start: String,
    end: String,
) -> Result<RoutineOverride, InfraError> {
    let routine_id = required_text(&routine_id, "routine_id")?;
    let date = required_date(&date, "date")?;
    let interval = interval_from_hhmm(&start, &end)?;

    state
        .planner_store
        .set_override(&routine_id, &date, interval)
        .await?;
    state.log_info(
        "set_routine_override",
        &format!(
            "moved {routine_id} on {date} to {}-{}",
            interval.start_hhmm(),
            interval.end_hhmm()
        ),
    );
    Ok(RoutineOverride {
        routine_id,
        date,
        interval: Some(interval),
    })
}

pub async fn reset_routine_impl(
    state: &AppState,
    routine_id: String,
    date: String,
) -> Result<bool, InfraError> {
    let routine_id = required_text(&routine_id, "routine_id")?;
    let date = required_date(&date, "date")?;

    let existed = state
        .planner_store
        .get_override(&routine_id, &date)
        .await?
        .is_some();
    if existed {
        state
            .planner_store
            .remove_override(&routine_id, &date)
            .await?;
        state.log_info(
            "reset_routine",
            &format!("cleared override for {routine_id} on {date}"),
        );
    }
    Ok(existed)
}

pub async fn skip_routine_impl(
    state: &AppState,
    routine_id: String,
    date: String,
) -> Result<RoutineOverride, InfraError> {
    let routine_id = required_text(&routine_id, "routine_id")?;
    let date = required_date(&date, "date")?;

    state.planner_store.skip(&routine_id, &date).await?;
    state.log_info("skip_routine", &format!("skipped {routine_id} on {date}"));
    Ok(RoutineOverride {
        routine_id,
        date,
        interval: None,
    })
}

pub async fn toggle_completion_impl(
    state: &AppState,
    routine_id: String,
    date: String,
) -> Result<CompletionUpdate, InfraError> {
    let routine_id = required_text(&routine_id, "routine_id")?;
    let date = required_date(&date, "date")?;

    let update = schedule_service(state)
        .toggle_completion(&routine_id, &date)
        .await?;
    state.log_info(
        "toggle_completion",
        &format!(
            "toggled {routine_id} on {date} to {} (streak {})",
            update.completed, update.streak.current
        ),
    );
    Ok(update)
}

pub async fn streak_for_impl(state: &AppState, routine_id: String) -> Result<Streak, InfraError> {
    let routine_id = required_text(&routine_id, "routine_id")?;
    schedule_service(state).streak_for(&routine_id).await
}

pub async fn list_streaks_impl(state: &AppState) -> Result<Vec<Streak>, InfraError> {
    let service = schedule_service(state);
    let mut streaks = Vec::with_capacity(DAILY_GOAL_IDS.len());
    for routine_id in DAILY_GOAL_IDS {
        streaks.push(service.streak_for(routine_id).await?);
    }
    Ok(streaks)
}

pub async fn detect_conflicts_impl(
    state: &AppState,
    date: String,
) -> Result<Vec<Conflict>, InfraError> {
    let date = required_date(&date, "date")?;
    schedule_service(state).conflicts_for(&date).await
}

pub async fn scan_conflicts_impl(
    state: &AppState,
    start_date: Option<String>,
    days: Option<u32>,
) -> Result<Vec<Conflict>, InfraError> {
    let start_date = match start_date {
        Some(raw) => required_date(&raw, "start_date")?,
        None => today_string(),
    };
    let days = days.unwrap_or_else(|| load_app_settings(state.config_dir()).conflict_scan_days);
    schedule_service(state)
        .scan_conflicts(&start_date, days)
        .await
}

pub async fn list_upcoming_games_impl(
    state: &AppState,
    from: Option<String>,
) -> Result<Vec<GameEvent>, InfraError> {
    let from = match from {
        Some(raw) => required_date(&raw, "from")?,
        None => today_string(),
    };
    state
        .game_schedule
        .list_upcoming(&from, UPCOMING_WINDOW_DAYS)
        .await
}

pub async fn add_game_impl(
    state: &AppState,
    label: String,
    date: String,
    start: String,
    end: String,
    venue: Option<String>,
    competition: Option<String>,
) -> Result<GameEvent, InfraError> {
    // Kickoff times are stored zero-padded so the per-date text ordering holds.
    let start_minute = parse_hhmm(&start, "start").map_err(InfraError::InvalidConfig)?;
    let end_minute = parse_hhmm(&end, "end").map_err(InfraError::InvalidConfig)?;
    let game = GameEvent {
        id: next_id("game"),
        label: required_text(&label, "label")?,
        date: required_date(&date, "date")?,
        start: format_hhmm(start_minute),
        end: format_hhmm(end_minute),
        venue,
        competition,
    };
    game.validate().map_err(InfraError::InvalidConfig)?;

    state.game_schedule.upsert(&game).await?;
    state.log_info(
        "add_game",
        &format!("stored {} on {} at {}", game.id, game.date, game.start),
    );
    Ok(game)
}

pub async fn import_calendar_event_impl(
    state: &AppState,
    label: String,
    date: String,
    start: String,
    end: String,
    origin: Option<String>,
) -> Result<CalendarEvent, InfraError> {
    let interval = interval_from_hhmm(&start, &end)?;
    let event = CalendarEvent {
        id: next_id("cal"),
        label: required_text(&label, "label")?,
        date: required_date(&date, "date")?,
        start_minute: interval.start_minute,
        end_minute: interval.end_minute,
        origin: origin
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(EXTERNAL_ORIGIN)
            .to_string(),
    };

    state.calendar_feed.upsert(&event).await?;
    state.log_info(
        "import_calendar_event",
        &format!(
            "imported {} on {} from {}",
            event.id, event.date, event.origin
        ),
    );
    Ok(event)
}

pub async fn current_week_impl(state: &AppState, date: Option<String>) -> Result<u32, InfraError> {
    let date = match date {
        Some(raw) => required_date(&raw, "date")?,
        None => today_string(),
    };
    schedule_service(state).current_week(&date).await
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn parse_drag_mode(value: &str) -> Result<DragMode, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "move" => Ok(DragMode::Move),
        "resize" => Ok(DragMode::Resize),
        other => Err(InfraError::InvalidConfig(format!(
            "unsupported drag mode: {}",
            other
        ))),
    }
}

fn required_text(value: &str, field_name: &str) -> Result<String, InfraError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(InfraError::InvalidConfig(format!(
            "{field_name} must not be empty"
        )));
    }
    Ok(normalized.to_string())
}

fn required_date(value: &str, field_name: &str) -> Result<String, InfraError> {
    let normalized = value.trim();
    parse_date(normalized, field_name).map_err(InfraError::InvalidConfig)?;
    Ok(normalized.to_string())
}

fn interval_from_hhmm(start: &str, end: &str) -> Result<TimeInterval, InfraError> {
    TimeInterval::from_hhmm(start.trim(), end.trim()).map_err(InfraError::InvalidInterval)
}

fn today_string() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

fn load_app_settings(config_dir: &Path) -> AppSettings {
    let mut settings = AppSettings::default();
    let Ok(parsed) = read_app_config(config_dir) else {
        return settings;
    };

    if let Some(value) = parsed.get("pxPerMinute").and_then(serde_json::Value::as_f64) {
        if value > 0.0 {
            settings.px_per_minute = value;
        }
    }
    if let Some(value) = parsed
        .get("conflictScanDays")
        .and_then(serde_json::Value::as_u64)
    {
        settings.conflict_scan_days = value.max(1) as u32;
    }

    settings
}
