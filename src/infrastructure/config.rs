use crate::domain::models::{ProgressiveStart, RoutineItem};
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const ROUTINES_JSON: &str = "routines.json";

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Dayboard",
                "pxPerMinute": 1.8,
                "conflictScanDays": 14
            }),
        ),
        (
            ROUTINES_JSON,
            serde_json::json!({
                "schema": 1,
                "routines": []
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn read_app_config(config_dir: &Path) -> Result<serde_json::Value, InfraError> {
    read_config(&config_dir.join(APP_JSON))
}

pub fn load_routine_items(config_dir: &Path) -> Result<Vec<RoutineItem>, InfraError> {
    let path = config_dir.join(ROUTINES_JSON);
    let parsed = read_config(&path)?;
    let entries = parsed
        .get("routines")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("missing routines array in {}", path.display()))
        })?;
    // An empty routines list falls back to the built-in plan.
    if entries.is_empty() {
        return Ok(default_routine_items());
    }
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let item: RoutineItem = serde_json::from_value(entry.clone())?;
        item.validate().map_err(InfraError::InvalidConfig)?;
        items.push(item);
    }
    Ok(items)
}

pub fn default_routine_items() -> Vec<RoutineItem> {
    vec![
        RoutineItem {
            id: "wake-up".to_string(),
            name: "Wake Up".to_string(),
            start: "06:30".to_string(),
            end: Some("06:45".to_string()),
            weekdays_only: false,
            progressive: Some(ProgressiveStart {
                from: "06:30".to_string(),
                to: "05:00".to_string(),
                weeks: 4,
            }),
        },
        RoutineItem {
            id: "lunch".to_string(),
            name: "Lunch Break".to_string(),
            start: "13:00".to_string(),
            end: Some("14:00".to_string()),
            weekdays_only: true,
            progressive: None,
        },
        RoutineItem {
            id: "workout".to_string(),
            name: "Cycling Workout".to_string(),
            start: "17:30".to_string(),
            end: Some("18:15".to_string()),
            weekdays_only: false,
            progressive: None,
        },
        RoutineItem {
            id: "dinner".to_string(),
            name: "Dinner".to_string(),
            start: "18:15".to_string(),
            end: Some("19:00".to_string()),
            weekdays_only: false,
            progressive: None,
        },
        RoutineItem {
            id: "wash-face".to_string(),
            name: "Wash Face".to_string(),
            start: "21:00".to_string(),
            end: Some("21:15".to_string()),
            weekdays_only: false,
            progressive: None,
        },
        RoutineItem {
            id: "reading".to_string(),
            name: "Reading Before Bed".to_string(),
            start: "21:15".to_string(),
            end: Some("21:30".to_string()),
            weekdays_only: false,
            progressive: None,
        },
        RoutineItem {
            id: "lights-out".to_string(),
            name: "Lights Out".to_string(),
            start: "21:30".to_string(),
            end: Some("21:45".to_string()),
            weekdays_only: false,
            progressive: None,
        },
    ]
}
