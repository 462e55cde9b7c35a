use crate::domain::interval::{parse_hhmm, TimeInterval};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Fixed,
    Flexible,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleBlock {
    pub id: String,
    pub label: String,
    pub date: String,
    pub interval: TimeInterval,
    pub kind: BlockKind,
    pub editable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl ScheduleBlock {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        validate_non_empty(&self.label, "block.label")?;
        validate_date(&self.date, "block.date")?;
        if self.kind == BlockKind::Fixed && self.editable {
            return Err("block.editable must be false for fixed blocks".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressiveStart {
    pub from: String,
    pub to: String,
    pub weeks: u32,
}

impl ProgressiveStart {
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.from, "routine.progressive.from")?;
        validate_hhmm(&self.to, "routine.progressive.to")?;
        if self.weeks == 0 {
            return Err("routine.progressive.weeks must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineItem {
    pub id: String,
    pub name: String,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default)]
    pub weekdays_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<ProgressiveStart>,
}

impl RoutineItem {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "routine.id")?;
        validate_non_empty(&self.name, "routine.name")?;
        validate_hhmm(&self.start, "routine.start")?;
        if let Some(end) = self.end.as_deref() {
            validate_hhmm(end, "routine.end")?;
            let start_minute = parse_hhmm(&self.start, "routine.start")?;
            let end_minute = parse_hhmm(end, "routine.end")?;
            if end_minute <= start_minute {
                return Err("routine.end must be after routine.start".to_string());
            }
        }
        if let Some(progressive) = &self.progressive {
            progressive.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEvent {
    pub id: String,
    pub label: String,
    pub date: String,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
}

impl GameEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "game.id")?;
        validate_non_empty(&self.label, "game.label")?;
        validate_date(&self.date, "game.date")?;
        let start_minute = parse_hhmm(&self.start, "game.start")?;
        let end_minute = parse_hhmm(&self.end, "game.end")?;
        if end_minute <= start_minute {
            return Err("game.end must be after game.start".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomEvent {
    pub id: String,
    pub name: String,
    pub date: String,
    pub interval: TimeInterval,
}

impl CustomEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "event.id")?;
        validate_non_empty(&self.name, "event.name")?;
        validate_date(&self.date, "event.date")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineOverride {
    pub routine_id: String,
    pub date: String,
    // None marks the routine as skipped on this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<TimeInterval>,
}

impl RoutineOverride {
    pub fn is_skip(&self) -> bool {
        self.interval.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.routine_id, "override.routine_id")?;
        validate_date(&self.date, "override.date")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Completion {
    pub routine_id: String,
    pub date: String,
    pub completed: bool,
}

impl Completion {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.routine_id, "completion.routine_id")?;
        validate_date(&self.date, "completion.date")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streak {
    pub routine_id: String,
    pub current: u32,
    pub best: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<String>,
}

impl Streak {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.routine_id, "streak.routine_id")?;
        if self.best < self.current {
            return Err("streak.best must be >= streak.current".to_string());
        }
        if let Some(last_completed) = self.last_completed.as_deref() {
            validate_date(last_completed, "streak.last_completed")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conflict {
    pub fixed_event: ScheduleBlock,
    pub flexible_item: ScheduleBlock,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnAssignment {
    pub block_id: String,
    pub column: u32,
    pub total_columns: u32,
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    parse_hhmm(value, field_name).map(|_| ())
}

pub(crate) fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    parse_date(value, field_name).map(|_| ())
}

pub(crate) fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}
