pub mod conflict;
pub mod drag;
pub mod interval;
pub mod layout;
pub mod models;
pub mod streak;
