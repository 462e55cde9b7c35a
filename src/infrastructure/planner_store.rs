use crate::domain::interval::TimeInterval;
use crate::domain::models::{Completion, CustomEvent, RoutineOverride, Streak};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait PlannerStore: Send + Sync {
    async fn get_override(
        &self,
        routine_id: &str,
        date: &str,
    ) -> Result<Option<RoutineOverride>, InfraError>;
    async fn set_override(
        &self,
        routine_id: &str,
        date: &str,
        interval: TimeInterval,
    ) -> Result<(), InfraError>;
    async fn remove_override(&self, routine_id: &str, date: &str) -> Result<(), InfraError>;
    async fn skip(&self, routine_id: &str, date: &str) -> Result<(), InfraError>;
    async fn is_skipped(&self, routine_id: &str, date: &str) -> Result<bool, InfraError>;
    async fn overrides_for(&self, date: &str) -> Result<Vec<RoutineOverride>, InfraError>;

    async fn create_custom_event(&self, event: &CustomEvent) -> Result<(), InfraError>;
    async fn update_custom_event(&self, event: &CustomEvent) -> Result<(), InfraError>;
    async fn delete_custom_event(&self, event_id: &str) -> Result<(), InfraError>;
    async fn get_custom_event(&self, event_id: &str) -> Result<Option<CustomEvent>, InfraError>;
    async fn list_custom_events(&self, date: &str) -> Result<Vec<CustomEvent>, InfraError>;

    async fn toggle_completion(&self, routine_id: &str, date: &str) -> Result<bool, InfraError>;
    async fn is_completed(&self, routine_id: &str, date: &str) -> Result<bool, InfraError>;
    async fn completions_for(&self, date: &str) -> Result<Vec<Completion>, InfraError>;
    async fn completed_dates(&self, routine_id: &str) -> Result<Vec<String>, InfraError>;

    async fn get_streak(&self, routine_id: &str) -> Result<Option<Streak>, InfraError>;
    async fn put_streak(&self, streak: &Streak) -> Result<(), InfraError>;

    async fn week_anchor(&self) -> Result<Option<String>, InfraError>;
    async fn set_week_anchor(&self, date: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqlitePlannerStore {
    db_path: PathBuf,
}

impl SqlitePlannerStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

fn interval_from_columns(
    start_minute: Option<u32>,
    end_minute: Option<u32>,
) -> Result<Option<TimeInterval>, InfraError> {
    match (start_minute, end_minute) {
        (Some(start), Some(end)) => TimeInterval::new(start, end)
            .map(Some)
            .map_err(InfraError::InvalidInterval),
        _ => Ok(None),
    }
}

#[async_trait]
impl PlannerStore for SqlitePlannerStore {
    async fn get_override(
        &self,
        routine_id: &str,
        date: &str,
    ) -> Result<Option<RoutineOverride>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(Option<u32>, Option<u32>)> = connection
            .query_row(
                "SELECT start_minute, end_minute FROM routine_overrides
                 WHERE routine_id = ?1 AND date = ?2",
                params![routine_id, date],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((start_minute, end_minute)) = row else {
            return Ok(None);
        };
        Ok(Some(RoutineOverride {
            routine_id: routine_id.to_string(),
            date: date.to_string(),
            interval: interval_from_columns(start_minute, end_minute)?,
        }))
    }

    async fn set_override(
        &self,
        routine_id: &str,
        date: &str,
        interval: TimeInterval,
    ) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO routine_overrides (routine_id, date, start_minute, end_minute, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(routine_id, date) DO UPDATE SET
               start_minute = excluded.start_minute,
               end_minute = excluded.end_minute,
               updated_at = excluded.updated_at",
            params![
                routine_id,
                date,
                interval.start_minute,
                interval.end_minute,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn remove_override(&self, routine_id: &str, date: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "DELETE FROM routine_overrides WHERE routine_id = ?1 AND date = ?2",
            params![routine_id, date],
        )?;
        Ok(())
    }

    async fn skip(&self, routine_id: &str, date: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        // A skip is an override row with no interval.
        connection.execute(
            "INSERT INTO routine_overrides (routine_id, date, start_minute, end_minute, updated_at)
             VALUES (?1, ?2, NULL, NULL, ?3)
             ON CONFLICT(routine_id, date) DO UPDATE SET
               start_minute = NULL,
               end_minute = NULL,
               updated_at = excluded.updated_at",
            params![routine_id, date, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn is_skipped(&self, routine_id: &str, date: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let start_minute: Option<Option<u32>> = connection
            .query_row(
                "SELECT start_minute FROM routine_overrides
                 WHERE routine_id = ?1 AND date = ?2",
                params![routine_id, date],
                |row| row.get(0),
            )
            .optional()?;
        Ok(matches!(start_minute, Some(None)))
    }

    async fn overrides_for(&self, date: &str) -> Result<Vec<RoutineOverride>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT routine_id, start_minute, end_minute FROM routine_overrides
             WHERE date = ?1 ORDER BY routine_id",
        )?;
        let rows = statement.query_map(params![date], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<u32>>(1)?,
                row.get::<_, Option<u32>>(2)?,
            ))
        })?;
        let mut overrides = Vec::new();
        for row in rows {
            let (routine_id, start_minute, end_minute) = row?;
            overrides.push(RoutineOverride {
                routine_id,
                date: date.to_string(),
                interval: interval_from_columns(start_minute, end_minute)?,
            });
        }
        Ok(overrides)
    }

    async fn create_custom_event(&self, event: &CustomEvent) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO custom_events (id, name, date, start_minute, end_minute, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id,
                event.name,
                event.date,
                event.interval.start_minute,
                event.interval.end_minute,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn update_custom_event(&self, event: &CustomEvent) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let updated = connection.execute(
            "UPDATE custom_events
             SET name = ?2, date = ?3, start_minute = ?4, end_minute = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                event.id,
                event.name,
                event.date,
                event.interval.start_minute,
                event.interval.end_minute,
                Utc::now().to_rfc3339()
            ],
        )?;
        if updated == 0 {
            return Err(InfraError::InvalidConfig(format!(
                "unknown custom event '{}'",
                event.id
            )));
        }
        Ok(())
    }

    async fn delete_custom_event(&self, event_id: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "DELETE FROM custom_events WHERE id = ?1",
            params![event_id],
        )?;
        Ok(())
    }

    async fn get_custom_event(&self, event_id: &str) -> Result<Option<CustomEvent>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(String, String, String, u32, u32)> = connection
            .query_row(
                "SELECT id, name, date, start_minute, end_minute FROM custom_events
                 WHERE id = ?1",
                params![event_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, name, date, start_minute, end_minute)) = row else {
            return Ok(None);
        };
        let interval =
            TimeInterval::new(start_minute, end_minute).map_err(InfraError::InvalidInterval)?;
        Ok(Some(CustomEvent {
            id,
            name,
            date,
            interval,
        }))
    }

    async fn list_custom_events(&self, date: &str) -> Result<Vec<CustomEvent>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, name, date, start_minute, end_minute FROM custom_events
             WHERE date = ?1 ORDER BY start_minute, id",
        )?;
        let rows = statement.query_map(params![date], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (id, name, date, start_minute, end_minute) = row?;
            let interval =
                TimeInterval::new(start_minute, end_minute).map_err(InfraError::InvalidInterval)?;
            events.push(CustomEvent {
                id,
                name,
                date,
                interval,
            });
        }
        Ok(events)
    }

    async fn toggle_completion(&self, routine_id: &str, date: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let current: Option<bool> = connection
            .query_row(
                "SELECT completed FROM routine_completions
                 WHERE routine_id = ?1 AND date = ?2",
                params![routine_id, date],
                |row| row.get(0),
            )
            .optional()?;
        let toggled = !current.unwrap_or(false);
        connection.execute(
            "INSERT INTO routine_completions (routine_id, date, completed, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(routine_id, date) DO UPDATE SET
               completed = excluded.completed,
               updated_at = excluded.updated_at",
            params![routine_id, date, toggled, Utc::now().to_rfc3339()],
        )?;
        Ok(toggled)
    }

    async fn is_completed(&self, routine_id: &str, date: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let completed: Option<bool> = connection
            .query_row(
                "SELECT completed FROM routine_completions
                 WHERE routine_id = ?1 AND date = ?2",
                params![routine_id, date],
                |row| row.get(0),
            )
            .optional()?;
        Ok(completed.unwrap_or(false))
    }

    async fn completions_for(&self, date: &str) -> Result<Vec<Completion>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT routine_id, completed FROM routine_completions
             WHERE date = ?1 ORDER BY routine_id",
        )?;
        let rows = statement.query_map(params![date], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;
        let mut completions = Vec::new();
        for row in rows {
            let (routine_id, completed) = row?;
            completions.push(Completion {
                routine_id,
                date: date.to_string(),
                completed,
            });
        }
        Ok(completions)
    }

    async fn completed_dates(&self, routine_id: &str) -> Result<Vec<String>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT date FROM routine_completions
             WHERE routine_id = ?1 AND completed = 1 ORDER BY date DESC",
        )?;
        let rows = statement.query_map(params![routine_id], |row| row.get::<_, String>(0))?;
        let mut dates = Vec::new();
        for row in rows {
            dates.push(row?);
        }
        Ok(dates)
    }

    async fn get_streak(&self, routine_id: &str) -> Result<Option<Streak>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(u32, u32, Option<String>)> = connection
            .query_row(
                "SELECT current_streak, best_streak, last_completed FROM routine_streaks
                 WHERE routine_id = ?1",
                params![routine_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(row.map(|(current, best, last_completed)| Streak {
            routine_id: routine_id.to_string(),
            current,
            best,
            last_completed,
        }))
    }

    async fn put_streak(&self, streak: &Streak) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO routine_streaks (routine_id, current_streak, best_streak, last_completed)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(routine_id) DO UPDATE SET
               current_streak = excluded.current_streak,
               best_streak = excluded.best_streak,
               last_completed = excluded.last_completed",
            params![
                streak.routine_id,
                streak.current,
                streak.best,
                streak.last_completed
            ],
        )?;
        Ok(())
    }

    async fn week_anchor(&self) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let anchor: Option<String> = connection
            .query_row(
                "SELECT week1_start FROM plan_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(anchor)
    }

    async fn set_week_anchor(&self, date: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO plan_state (id, week1_start) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET week1_start = excluded.week1_start",
            params![date],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    overrides: HashMap<(String, String), Option<TimeInterval>>,
    completions: HashMap<(String, String), bool>,
    custom_events: HashMap<String, CustomEvent>,
    streaks: HashMap<String, Streak>,
    week1_start: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryPlannerStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryPlannerStore {
    fn locked(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("planner store lock poisoned: {error}")))
    }
}

#[async_trait]
impl PlannerStore for InMemoryPlannerStore {
    async fn get_override(
        &self,
        routine_id: &str,
        date: &str,
    ) -> Result<Option<RoutineOverride>, InfraError> {
        let state = self.locked()?;
        Ok(state
            .overrides
            .get(&(routine_id.to_string(), date.to_string()))
            .map(|interval| RoutineOverride {
                routine_id: routine_id.to_string(),
                date: date.to_string(),
                interval: *interval,
            }))
    }

    async fn set_override(
        &self,
        routine_id: &str,
        date: &str,
        interval: TimeInterval,
    ) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        state
            .overrides
            .insert((routine_id.to_string(), date.to_string()), Some(interval));
        Ok(())
    }

    async fn remove_override(&self, routine_id: &str, date: &str) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        state
            .overrides
            .remove(&(routine_id.to_string(), date.to_string()));
        Ok(())
    }

    async fn skip(&self, routine_id: &str, date: &str) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        state
            .overrides
            .insert((routine_id.to_string(), date.to_string()), None);
        Ok(())
    }

    async fn is_skipped(&self, routine_id: &str, date: &str) -> Result<bool, InfraError> {
        let state = self.locked()?;
        Ok(matches!(
            state
                .overrides
                .get(&(routine_id.to_string(), date.to_string())),
            Some(None)
        ))
    }

    async fn overrides_for(&self, date: &str) -> Result<Vec<RoutineOverride>, InfraError> {
        let state = self.locked()?;
        let mut overrides: Vec<RoutineOverride> = state
            .overrides
            .iter()
            .filter(|((_, override_date), _)| override_date == date)
            .map(|((routine_id, override_date), interval)| RoutineOverride {
                routine_id: routine_id.clone(),
                date: override_date.clone(),
                interval: *interval,
            })
            .collect();
        overrides.sort_unstable_by(|left, right| left.routine_id.cmp(&right.routine_id));
        Ok(overrides)
    }

    async fn create_custom_event(&self, event: &CustomEvent) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        if state.custom_events.contains_key(&event.id) {
            return Err(InfraError::InvalidConfig(format!(
                "custom event '{}' already exists",
                event.id
            )));
        }
        state.custom_events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn update_custom_event(&self, event: &CustomEvent) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        if !state.custom_events.contains_key(&event.id) {
            return Err(InfraError::InvalidConfig(format!(
                "unknown custom event '{}'",
                event.id
            )));
        }
        state.custom_events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn delete_custom_event(&self, event_id: &str) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        state.custom_events.remove(event_id);
        Ok(())
    }

    async fn get_custom_event(&self, event_id: &str) -> Result<Option<CustomEvent>, InfraError> {
        let state = self.locked()?;
        Ok(state.custom_events.get(event_id).cloned())
    }

    async fn list_custom_events(&self, date: &str) -> Result<Vec<CustomEvent>, InfraError> {
        let state = self.locked()?;
        let mut events: Vec<CustomEvent> = state
            .custom_events
            .values()
            .filter(|event| event.date == date)
            .cloned()
            .collect();
        events.sort_unstable_by(|left, right| {
            left.interval
                .start_minute
                .cmp(&right.interval.start_minute)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(events)
    }

    async fn toggle_completion(&self, routine_id: &str, date: &str) -> Result<bool, InfraError> {
        let mut state = self.locked()?;
        let entry = state
            .completions
            .entry((routine_id.to_string(), date.to_string()))
            .or_insert(false);
        *entry = !*entry;
        Ok(*entry)
    }

    async fn is_completed(&self, routine_id: &str, date: &str) -> Result<bool, InfraError> {
        let state = self.locked()?;
        Ok(state
            .completions
            .get(&(routine_id.to_string(), date.to_string()))
            .copied()
            .unwrap_or(false))
    }

    async fn completions_for(&self, date: &str) -> Result<Vec<Completion>, InfraError> {
        let state = self.locked()?;
        let mut completions: Vec<Completion> = state
            .completions
            .iter()
            .filter(|((_, completion_date), _)| completion_date == date)
            .map(|((routine_id, completion_date), completed)| Completion {
                routine_id: routine_id.clone(),
                date: completion_date.clone(),
                completed: *completed,
            })
            .collect();
        completions.sort_unstable_by(|left, right| left.routine_id.cmp(&right.routine_id));
        Ok(completions)
    }

    async fn completed_dates(&self, routine_id: &str) -> Result<Vec<String>, InfraError> {
        let state = self.locked()?;
        let mut dates: Vec<String> = state
            .completions
            .iter()
            .filter(|((id, _), completed)| id == routine_id && **completed)
            .map(|((_, date), _)| date.clone())
            .collect();
        dates.sort_unstable_by(|left, right| right.cmp(left));
        Ok(dates)
    }

    async fn get_streak(&self, routine_id: &str) -> Result<Option<Streak>, InfraError> {
        let state = self.locked()?;
        Ok(state.streaks.get(routine_id).cloned())
    }

    async fn put_streak(&self, streak: &Streak) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        state
            .streaks
            .insert(streak.routine_id.clone(), streak.clone());
        Ok(())
    }

    async fn week_anchor(&self) -> Result<Option<String>, InfraError> {
        let state = self.locked()?;
        Ok(state.week1_start.clone())
    }

    async fn set_week_anchor(&self, date: &str) -> Result<(), InfraError> {
        let mut state = self.locked()?;
        state.week1_start = Some(date.to_string());
        Ok(())
    }
}
