use crate::domain::conflict::detect_conflicts;
use crate::domain::drag::DragCommit;
use crate::domain::interval::TimeInterval;
use crate::domain::layout::layout;
use crate::domain::models::{
    parse_date, BlockKind, ColumnAssignment, Completion, Conflict, CustomEvent, GameEvent,
    RoutineOverride, ScheduleBlock, Streak,
};
use crate::domain::streak::calculate_streak;
use crate::infrastructure::calendar_feed::CalendarProvider;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::game_schedule::GameProvider;
use crate::infrastructure::planner_store::PlannerStore;
use crate::infrastructure::routine_schedule::{monday_of, plan_week, RoutineProvider};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: String,
    pub week: u32,
    pub blocks: Vec<ScheduleBlock>,
    pub layout: Vec<ColumnAssignment>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionUpdate {
    pub routine_id: String,
    pub date: String,
    pub completed: bool,
    pub streak: Streak,
}

pub struct DayScheduleService<R, G, C, S>
where
    R: RoutineProvider,
    G: GameProvider,
    C: CalendarProvider,
    S: PlannerStore,
{
    routine_schedule: Arc<R>,
    game_schedule: Arc<G>,
    calendar_feed: Arc<C>,
    planner_store: Arc<S>,
    now_provider: NowProvider,
}

impl<R, G, C, S> DayScheduleService<R, G, C, S>
where
    R: RoutineProvider,
    G: GameProvider,
    C: CalendarProvider,
    S: PlannerStore,
{
    pub fn new(
        routine_schedule: Arc<R>,
        game_schedule: Arc<G>,
        calendar_feed: Arc<C>,
        planner_store: Arc<S>,
    ) -> Self {
        Self {
            routine_schedule,
            game_schedule,
            calendar_feed,
            planner_store,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    // Assembles one day from all four sources. A source that fails turns
    // into a warning instead of failing the whole day.
    pub async fn day(&self, date: &str) -> Result<DaySchedule, InfraError> {
        let parsed = parse_date(date, "date").map_err(InfraError::InvalidConfig)?;
        let mut warnings = Vec::new();

        let week = match self.ensure_week_anchor(parsed).await {
            Ok(anchor) => plan_week(anchor, parsed),
            Err(error) => {
                warnings.push(format!("week anchor unavailable: {error}"));
                1
            }
        };

        let (routine_result, game_result, calendar_result, custom_result) = tokio::join!(
            self.routine_schedule.blocks_for(date, week),
            self.game_schedule.games_for(date),
            self.calendar_feed.blocks_for(date),
            self.planner_store.list_custom_events(date),
        );

        let mut routine_blocks = collect_or_warn(routine_result, "routine schedule", &mut warnings);
        let games = collect_or_warn(game_result, "game schedule", &mut warnings);
        let calendar_blocks = collect_or_warn(calendar_result, "calendar feed", &mut warnings);
        let custom_events = collect_or_warn(custom_result, "custom events", &mut warnings);

        let overrides = collect_or_warn(
            self.planner_store.overrides_for(date).await,
            "routine overrides",
            &mut warnings,
        );
        let completions = collect_or_warn(
            self.planner_store.completions_for(date).await,
            "completions",
            &mut warnings,
        );

        apply_overrides(&mut routine_blocks, &overrides);
        stamp_completions(&mut routine_blocks, &completions);

        let mut blocks = routine_blocks;
        blocks.extend(calendar_blocks);
        for game in games {
            match game_block(&game) {
                Ok(block) => blocks.push(block),
                Err(error) => warnings.push(format!("dropping game '{}': {error}", game.id)),
            }
        }
        blocks.extend(custom_events.into_iter().map(custom_block));

        blocks.retain(|block| match block.validate() {
            Ok(()) => true,
            Err(error) => {
                warnings.push(format!("dropping invalid block '{}': {error}", block.id));
                false
            }
        });

        blocks.sort_by(|left, right| {
            left.interval
                .start_minute
                .cmp(&right.interval.start_minute)
                .then_with(|| {
                    right
                        .interval
                        .duration_minutes()
                        .cmp(&left.interval.duration_minutes())
                })
        });

        let layout = layout(&blocks);

        Ok(DaySchedule {
            date: date.to_string(),
            week,
            blocks,
            layout,
            warnings,
        })
    }

    pub async fn conflicts_for(&self, date: &str) -> Result<Vec<Conflict>, InfraError> {
        let day = self.day(date).await?;
        Ok(conflicts_in(&day.blocks))
    }

    // One pass per distinct date, so a day with several games is still
    // checked against its routine exactly once.
    pub async fn scan_conflicts(
        &self,
        start_date: &str,
        days: u32,
    ) -> Result<Vec<Conflict>, InfraError> {
        let parsed = parse_date(start_date, "start_date").map_err(InfraError::InvalidConfig)?;
        let mut conflicts = Vec::new();
        for offset in 0..i64::from(days) {
            let date = (parsed + Duration::days(offset))
                .format(DATE_FORMAT)
                .to_string();
            let day = self.day(&date).await?;
            conflicts.extend(conflicts_in(&day.blocks));
        }
        Ok(conflicts)
    }

    pub async fn current_week(&self, date: &str) -> Result<u32, InfraError> {
        let parsed = parse_date(date, "date").map_err(InfraError::InvalidConfig)?;
        let anchor = self.ensure_week_anchor(parsed).await?;
        Ok(plan_week(anchor, parsed))
    }

    pub async fn apply_commit(&self, commit: &DragCommit) -> Result<(), InfraError> {
        match commit.kind {
            BlockKind::Custom => {
                let Some(mut event) = self.planner_store.get_custom_event(&commit.block_id).await?
                else {
                    return Err(InfraError::InvalidConfig(format!(
                        "unknown custom event '{}'",
                        commit.block_id
                    )));
                };
                event.date = commit.date.clone();
                event.interval = commit.interval;
                self.planner_store.update_custom_event(&event).await
            }
            BlockKind::Flexible => {
                self.planner_store
                    .set_override(&commit.block_id, &commit.date, commit.interval)
                    .await
            }
            BlockKind::Fixed => Err(InfraError::InvalidConfig(format!(
                "block \"{}\" is not editable",
                commit.block_id
            ))),
        }
    }

    pub async fn toggle_completion(
        &self,
        routine_id: &str,
        date: &str,
    ) -> Result<CompletionUpdate, InfraError> {
        let completed = self.planner_store.toggle_completion(routine_id, date).await?;
        let streak = self.recompute_streak(routine_id).await?;
        Ok(CompletionUpdate {
            routine_id: routine_id.to_string(),
            date: date.to_string(),
            completed,
            streak,
        })
    }

    // Recomputes from the completion log without persisting anything.
    pub async fn streak_for(&self, routine_id: &str) -> Result<Streak, InfraError> {
        let raw_dates = self.planner_store.completed_dates(routine_id).await?;
        let dates: Vec<NaiveDate> = raw_dates
            .iter()
            .filter_map(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
            .collect();
        let stored_best = self
            .planner_store
            .get_streak(routine_id)
            .await?
            .map(|streak| streak.best)
            .unwrap_or(0);
        let today = (self.now_provider)().date_naive();
        Ok(calculate_streak(routine_id, &dates, today, stored_best))
    }

    // The first day ever assembled pins week 1 to its own Monday.
    async fn ensure_week_anchor(&self, date: NaiveDate) -> Result<NaiveDate, InfraError> {
        if let Some(stored) = self.planner_store.week_anchor().await? {
            return parse_date(&stored, "week1_start").map_err(InfraError::InvalidConfig);
        }
        let anchor = monday_of(date);
        self.planner_store
            .set_week_anchor(&anchor.format(DATE_FORMAT).to_string())
            .await?;
        Ok(anchor)
    }

    async fn recompute_streak(&self, routine_id: &str) -> Result<Streak, InfraError> {
        let streak = self.streak_for(routine_id).await?;
        self.planner_store.put_streak(&streak).await?;
        Ok(streak)
    }
}

fn collect_or_warn<T>(
    result: Result<Vec<T>, InfraError>,
    source: &str,
    warnings: &mut Vec<String>,
) -> Vec<T> {
    match result {
        Ok(values) => values,
        Err(error) => {
            warnings.push(format!("{source} unavailable: {error}"));
            Vec::new()
        }
    }
}

// A skip drops the block for the day; a timed override replaces its interval.
fn apply_overrides(blocks: &mut Vec<ScheduleBlock>, overrides: &[RoutineOverride]) {
    let by_routine: HashMap<&str, &RoutineOverride> = overrides
        .iter()
        .map(|value| (value.routine_id.as_str(), value))
        .collect();
    blocks.retain_mut(|block| match by_routine.get(block.id.as_str()) {
        Some(value) => match value.interval {
            Some(interval) => {
                block.interval = interval;
                true
            }
            None => false,
        },
        None => true,
    });
}

fn stamp_completions(blocks: &mut [ScheduleBlock], completions: &[Completion]) {
    let by_routine: HashMap<&str, bool> = completions
        .iter()
        .map(|value| (value.routine_id.as_str(), value.completed))
        .collect();
    for block in blocks {
        let completed = by_routine.get(block.id.as_str()).copied().unwrap_or(false);
        block.completed = Some(completed);
    }
}

fn game_block(game: &GameEvent) -> Result<ScheduleBlock, String> {
    let interval = TimeInterval::from_hhmm(&game.start, &game.end)?;
    Ok(ScheduleBlock {
        id: game.id.clone(),
        label: game.label.clone(),
        date: game.date.clone(),
        interval,
        kind: BlockKind::Fixed,
        editable: false,
        completed: None,
    })
}

fn custom_block(event: CustomEvent) -> ScheduleBlock {
    ScheduleBlock {
        id: event.id,
        label: event.name,
        date: event.date,
        interval: event.interval,
        kind: BlockKind::Custom,
        editable: true,
        completed: None,
    }
}

fn conflicts_in(blocks: &[ScheduleBlock]) -> Vec<Conflict> {
    let fixed: Vec<ScheduleBlock> = blocks
        .iter()
        .filter(|block| block.kind == BlockKind::Fixed)
        .cloned()
        .collect();
    let flexible: Vec<ScheduleBlock> = blocks
        .iter()
        .filter(|block| block.kind == BlockKind::Flexible)
        .cloned()
        .collect();
    detect_conflicts(&fixed, &flexible)
}
