pub mod calendar_feed;
pub mod config;
pub mod error;
pub mod game_schedule;
pub mod planner_store;
pub mod routine_schedule;
pub mod storage;
