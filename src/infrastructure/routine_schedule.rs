use crate::domain::conflict::DEFAULT_ITEM_MINUTES;
use crate::domain::interval::{parse_hhmm, TimeInterval, DAY_END_MINUTE};
use crate::domain::models::{parse_date, BlockKind, ProgressiveStart, RoutineItem, ScheduleBlock};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub const DAILY_GOAL_IDS: [&str; 4] = ["wake-up", "workout", "reading", "lights-out"];

#[async_trait]
pub trait RoutineProvider: Send + Sync {
    async fn blocks_for(&self, date: &str, week: u32) -> Result<Vec<ScheduleBlock>, InfraError>;
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn plan_week(anchor: NaiveDate, date: NaiveDate) -> u32 {
    let days = (date - anchor).num_days();
    if days < 0 {
        return 1;
    }
    (days / 7) as u32 + 1
}

#[derive(Debug, Clone)]
pub struct WeeklyRoutineSchedule {
    items: Vec<RoutineItem>,
}

impl WeeklyRoutineSchedule {
    pub fn new(items: Vec<RoutineItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl RoutineProvider for WeeklyRoutineSchedule {
    async fn blocks_for(&self, date: &str, week: u32) -> Result<Vec<ScheduleBlock>, InfraError> {
        let parsed = parse_date(date, "date").map_err(InfraError::InvalidConfig)?;
        let weekend = matches!(parsed.weekday(), Weekday::Sat | Weekday::Sun);
        let mut blocks = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if weekend && item.weekdays_only {
                continue;
            }
            // An item whose configured times cannot form an interval is dropped
            // instead of failing the whole day.
            let Some(interval) = item_interval(item, week) else {
                continue;
            };
            blocks.push(ScheduleBlock {
                id: item.id.clone(),
                label: item.name.clone(),
                date: date.to_string(),
                interval,
                kind: BlockKind::Flexible,
                editable: true,
                completed: None,
            });
        }
        Ok(blocks)
    }
}

fn item_interval(item: &RoutineItem, week: u32) -> Option<TimeInterval> {
    let configured_start = parse_hhmm(&item.start, "routine.start").ok()?;
    let start = match &item.progressive {
        Some(progressive) => progressive_start_minute(progressive, week)?,
        None => configured_start,
    };
    let duration = match item.end.as_deref() {
        Some(end) => {
            let end_minute = parse_hhmm(end, "routine.end").ok()?;
            end_minute
                .checked_sub(configured_start)
                .filter(|minutes| *minutes > 0)?
        }
        None => DEFAULT_ITEM_MINUTES,
    };
    let end = (start + duration).min(DAY_END_MINUTE);
    TimeInterval::new(start, end).ok()
}

fn progressive_start_minute(progressive: &ProgressiveStart, week: u32) -> Option<u32> {
    let from = parse_hhmm(&progressive.from, "progressive.from").ok()?;
    let to = parse_hhmm(&progressive.to, "progressive.to").ok()?;
    if progressive.weeks == 0 || from < to {
        return None;
    }
    // Even steps from the week-1 start down to the floor reached in the final week.
    let step = if progressive.weeks > 1 {
        (from - to) / (progressive.weeks - 1)
    } else {
        0
    };
    let capped = week.clamp(1, progressive.weeks);
    let shifted = from.saturating_sub(step * (capped - 1));
    Some(shifted.max(to))
}
