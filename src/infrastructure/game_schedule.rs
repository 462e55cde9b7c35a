use crate::domain::models::{parse_date, GameEvent};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::Duration;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const UPCOMING_WINDOW_DAYS: u32 = 14;

#[async_trait]
pub trait GameProvider: Send + Sync {
    async fn games_for(&self, date: &str) -> Result<Vec<GameEvent>, InfraError>;
    async fn list_upcoming(&self, from: &str, days: u32) -> Result<Vec<GameEvent>, InfraError>;
    async fn upsert(&self, game: &GameEvent) -> Result<(), InfraError>;
}

fn window_end(from: &str, days: u32) -> Result<String, InfraError> {
    let parsed = parse_date(from, "from").map_err(InfraError::InvalidConfig)?;
    Ok((parsed + Duration::days(i64::from(days)))
        .format("%Y-%m-%d")
        .to_string())
}

#[derive(Debug, Clone)]
pub struct SqliteGameSchedule {
    db_path: PathBuf,
}

impl SqliteGameSchedule {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

fn game_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GameEvent> {
    Ok(GameEvent {
        id: row.get(0)?,
        label: row.get(1)?,
        date: row.get(2)?,
        start: row.get(3)?,
        end: row.get(4)?,
        venue: row.get(5)?,
        competition: row.get(6)?,
    })
}

#[async_trait]
impl GameProvider for SqliteGameSchedule {
    async fn games_for(&self, date: &str) -> Result<Vec<GameEvent>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, label, date, start_time, end_time, venue, competition FROM games
             WHERE date = ?1 ORDER BY start_time, id",
        )?;
        let rows = statement.query_map(params![date], game_from_row)?;
        let mut games = Vec::new();
        for row in rows {
            games.push(row?);
        }
        Ok(games)
    }

    async fn list_upcoming(&self, from: &str, days: u32) -> Result<Vec<GameEvent>, InfraError> {
        let until = window_end(from, days)?;
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, label, date, start_time, end_time, venue, competition FROM games
             WHERE date >= ?1 AND date <= ?2 ORDER BY date, start_time, id",
        )?;
        let rows = statement.query_map(params![from, until], game_from_row)?;
        let mut games = Vec::new();
        for row in rows {
            games.push(row?);
        }
        Ok(games)
    }

    async fn upsert(&self, game: &GameEvent) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO games (id, label, date, start_time, end_time, venue, competition)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
               label = excluded.label,
               date = excluded.date,
               start_time = excluded.start_time,
               end_time = excluded.end_time,
               venue = excluded.venue,
               competition = excluded.competition",
            params![
                game.id,
                game.label,
                game.date,
                game.start,
                game.end,
                game.venue,
                game.competition
            ],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGameSchedule {
    games: Mutex<HashMap<String, GameEvent>>,
}

impl InMemoryGameSchedule {
    fn locked(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, GameEvent>>, InfraError> {
        self.games
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("game schedule lock poisoned: {error}")))
    }
}

#[async_trait]
impl GameProvider for InMemoryGameSchedule {
    async fn games_for(&self, date: &str) -> Result<Vec<GameEvent>, InfraError> {
        let games = self.locked()?;
        let mut matching: Vec<GameEvent> = games
            .values()
            .filter(|game| game.date == date)
            .cloned()
            .collect();
        matching.sort_unstable_by(|left, right| {
            left.start
                .cmp(&right.start)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(matching)
    }

    async fn list_upcoming(&self, from: &str, days: u32) -> Result<Vec<GameEvent>, InfraError> {
        let until = window_end(from, days)?;
        let games = self.locked()?;
        let mut matching: Vec<GameEvent> = games
            .values()
            .filter(|game| game.date.as_str() >= from && game.date <= until)
            .cloned()
            .collect();
        matching.sort_unstable_by(|left, right| {
            left.date
                .cmp(&right.date)
                .then_with(|| left.start.cmp(&right.start))
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(matching)
    }

    async fn upsert(&self, game: &GameEvent) -> Result<(), InfraError> {
        let mut games = self.locked()?;
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_game(id: &str, date: &str, start: &str) -> GameEvent {
        GameEvent {
            id: id.to_string(),
            label: "Man City vs Arsenal".to_string(),
            date: date.to_string(),
            start: start.to_string(),
            end: "17:00".to_string(),
            venue: Some("Etihad Stadium".to_string()),
            competition: Some("Premier League".to_string()),
        }
    }

    #[tokio::test]
    async fn games_for_returns_only_that_date_in_kickoff_order() {
        let schedule = InMemoryGameSchedule::default();
        schedule
            .upsert(&sample_game("late", "2026-03-02", "19:45"))
            .await
            .expect("upsert");
        schedule
            .upsert(&sample_game("early", "2026-03-02", "12:30"))
            .await
            .expect("upsert");
        schedule
            .upsert(&sample_game("other-day", "2026-03-03", "15:00"))
            .await
            .expect("upsert");

        let games = schedule.games_for("2026-03-02").await.expect("games");
        let ids: Vec<&str> = games.iter().map(|game| game.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn list_upcoming_window_is_inclusive_of_both_ends() {
        let schedule = InMemoryGameSchedule::default();
        schedule
            .upsert(&sample_game("today", "2026-03-02", "15:00"))
            .await
            .expect("upsert");
        schedule
            .upsert(&sample_game("edge", "2026-03-16", "15:00"))
            .await
            .expect("upsert");
        schedule
            .upsert(&sample_game("past", "2026-03-01", "15:00"))
            .await
            .expect("upsert");
        schedule
            .upsert(&sample_game("beyond", "2026-03-17", "15:00"))
            .await
            .expect("upsert");

        let games = schedule
            .list_upcoming("2026-03-02", UPCOMING_WINDOW_DAYS)
            .await
            .expect("games");
        let ids: Vec<&str> = games.iter().map(|game| game.id.as_str()).collect();
        assert_eq!(ids, vec!["today", "edge"]);
    }

    #[tokio::test]
    async fn upsert_replaces_an_existing_game() {
        let schedule = InMemoryGameSchedule::default();
        schedule
            .upsert(&sample_game("derby", "2026-03-02", "15:00"))
            .await
            .expect("upsert");
        let mut moved = sample_game("derby", "2026-03-02", "17:30");
        moved.end = "19:30".to_string();
        schedule.upsert(&moved).await.expect("upsert");

        let games = schedule.games_for("2026-03-02").await.expect("games");
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].start, "17:30");
    }
}
