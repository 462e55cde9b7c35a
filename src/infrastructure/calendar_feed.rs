use crate::domain::interval::TimeInterval;
use crate::domain::models::{BlockKind, ScheduleBlock};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// Events the app itself exported carry this origin and never come back
// through the feed as Fixed duplicates.
pub const APP_ORIGIN: &str = "dayboard";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub label: String,
    pub date: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub origin: String,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn blocks_for(&self, date: &str) -> Result<Vec<ScheduleBlock>, InfraError>;
    async fn upsert(&self, event: &CalendarEvent) -> Result<(), InfraError>;
}

fn block_from_event(event: CalendarEvent) -> Result<ScheduleBlock, InfraError> {
    let interval = TimeInterval::new(event.start_minute, event.end_minute)
        .map_err(InfraError::InvalidInterval)?;
    Ok(ScheduleBlock {
        id: event.id,
        label: event.label,
        date: event.date,
        interval,
        kind: BlockKind::Fixed,
        editable: false,
        completed: None,
    })
}

#[derive(Debug, Clone)]
pub struct SqliteCalendarFeed {
    db_path: PathBuf,
}

impl SqliteCalendarFeed {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

#[async_trait]
impl CalendarProvider for SqliteCalendarFeed {
    async fn blocks_for(&self, date: &str) -> Result<Vec<ScheduleBlock>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, label, date, start_minute, end_minute, origin FROM calendar_events
             WHERE date = ?1 AND origin <> ?2 ORDER BY start_minute, id",
        )?;
        let rows = statement.query_map(params![date, APP_ORIGIN], |row| {
            Ok(CalendarEvent {
                id: row.get(0)?,
                label: row.get(1)?,
                date: row.get(2)?,
                start_minute: row.get(3)?,
                end_minute: row.get(4)?,
                origin: row.get(5)?,
            })
        })?;
        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(block_from_event(row?)?);
        }
        Ok(blocks)
    }

    async fn upsert(&self, event: &CalendarEvent) -> Result<(), InfraError> {
        TimeInterval::new(event.start_minute, event.end_minute)
            .map_err(InfraError::InvalidInterval)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO calendar_events (id, label, date, start_minute, end_minute, origin)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               label = excluded.label,
               date = excluded.date,
               start_minute = excluded.start_minute,
               end_minute = excluded.end_minute,
               origin = excluded.origin",
            params![
                event.id,
                event.label,
                event.date,
                event.start_minute,
                event.end_minute,
                event.origin
            ],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCalendarFeed {
    events: Mutex<HashMap<String, CalendarEvent>>,
}

impl InMemoryCalendarFeed {
    fn locked(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CalendarEvent>>, InfraError> {
        self.events
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("calendar feed lock poisoned: {error}")))
    }
}

#[async_trait]
impl CalendarProvider for InMemoryCalendarFeed {
    async fn blocks_for(&self, date: &str) -> Result<Vec<ScheduleBlock>, InfraError> {
        let events = self.locked()?;
        let mut matching: Vec<CalendarEvent> = events
            .values()
            .filter(|event| event.date == date && event.origin != APP_ORIGIN)
            .cloned()
            .collect();
        matching.sort_unstable_by(|left, right| {
            left.start_minute
                .cmp(&right.start_minute)
                .then_with(|| left.id.cmp(&right.id))
        });
        matching.into_iter().map(block_from_event).collect()
    }

    async fn upsert(&self, event: &CalendarEvent) -> Result<(), InfraError> {
        TimeInterval::new(event.start_minute, event.end_minute)
            .map_err(InfraError::InvalidInterval)?;
        let mut events = self.locked()?;
        events.insert(event.id.clone(), event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(id: &str, origin: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            label: "Team Standup".to_string(),
            date: "2026-03-02".to_string(),
            start_minute: 9 * 60,
            end_minute: 9 * 60 + 30,
            origin: origin.to_string(),
        }
    }

    #[tokio::test]
    async fn feed_excludes_events_the_app_exported() {
        let feed = InMemoryCalendarFeed::default();
        feed.upsert(&sample_event("external", "google"))
            .await
            .expect("upsert");
        feed.upsert(&sample_event("mirrored", APP_ORIGIN))
            .await
            .expect("upsert");

        let blocks = feed.blocks_for("2026-03-02").await.expect("blocks");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, "external");
    }

    #[tokio::test]
    async fn feed_blocks_are_fixed_and_not_editable() {
        let feed = InMemoryCalendarFeed::default();
        feed.upsert(&sample_event("external", "google"))
            .await
            .expect("upsert");

        let blocks = feed.blocks_for("2026-03-02").await.expect("blocks");
        assert_eq!(blocks[0].kind, BlockKind::Fixed);
        assert!(!blocks[0].editable);
        assert_eq!(blocks[0].interval.start_hhmm(), "09:00");
    }

    #[tokio::test]
    async fn upsert_rejects_an_empty_interval() {
        let feed = InMemoryCalendarFeed::default();
        let mut event = sample_event("external", "google");
        event.end_minute = event.start_minute;
        assert!(feed.upsert(&event).await.is_err());
    }
}
