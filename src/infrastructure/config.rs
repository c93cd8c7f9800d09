use crate::domain::history::DEFAULT_HISTORY_LIMIT;
use crate::domain::layout::DEFAULT_DAY_START_HOUR;
use crate::domain::time::HOURS_PER_DAY;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const CALENDAR_JSON: &str = "calendar.json";
const DEFAULT_APP_NAME: &str = "RetroWeek";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_EXPORT_FILE_NAME: &str = "schedule.ics";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub app_name: String,
    pub timezone: Tz,
    pub export_file_name: String,
    pub day_start_hour: f64,
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            timezone: Tz::UTC,
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            day_start_hour: DEFAULT_DAY_START_HOUR,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": DEFAULT_APP_NAME,
                "timezone": DEFAULT_TIMEZONE,
                "exportFileName": DEFAULT_EXPORT_FILE_NAME
            }),
        ),
        (
            CALENDAR_JSON,
            serde_json::json!({
                "schema": 1,
                "dayStartHour": DEFAULT_DAY_START_HOUR,
                "historyLimit": DEFAULT_HISTORY_LIMIT
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

fn read_text<'a>(config: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    config
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let calendar = read_config(&config_dir.join(CALENDAR_JSON))?;
    let defaults = AppConfig::default();

    let timezone = match read_text(&app, "timezone") {
        Some(name) => name.parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("invalid timezone '{name}' in {APP_JSON}: {error}"))
        })?,
        None => defaults.timezone,
    };

    let day_start_hour = calendar
        .get("dayStartHour")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(defaults.day_start_hour);
    if !(0.0..HOURS_PER_DAY).contains(&day_start_hour) {
        return Err(InfraError::InvalidConfig(format!(
            "dayStartHour must be within [0, 24) in {CALENDAR_JSON}, got {day_start_hour}"
        )));
    }

    let history_limit = match calendar.get("historyLimit") {
        Some(value) => value
            .as_u64()
            .filter(|limit| *limit >= 1)
            .map(|limit| limit as usize)
            .ok_or_else(|| {
                InfraError::InvalidConfig(format!(
                    "historyLimit must be a positive integer in {CALENDAR_JSON}"
                ))
            })?,
        None => defaults.history_limit,
    };

    Ok(AppConfig {
        app_name: read_text(&app, "appName")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.app_name),
        timezone,
        export_file_name: read_text(&app, "exportFileName")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.export_file_name),
        day_start_hour,
        history_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!(
                "retroweek-config-{}-{}",
                std::process::id(),
                NEXT_DIR.fetch_add(1, Ordering::Relaxed)
            ));
            fs::create_dir_all(&path).expect("create config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn default_configs_load_into_defaults() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let config = load_app_config(&dir.path).expect("load config");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(APP_JSON),
            r#"{"schema":1,"timezone":"Asia/Tokyo","exportFileName":"week.ics"}"#,
        )
        .expect("write app config");
        ensure_default_configs(&dir.path).expect("write defaults");

        let config = load_app_config(&dir.path).expect("load config");
        assert_eq!(config.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.export_file_name, "week.ics");
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        fs::write(dir.path.join(CALENDAR_JSON), r#"{"schema":2}"#).expect("write calendar");
        assert!(matches!(
            load_app_config(&dir.path),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        fs::write(dir.path.join(CALENDAR_JSON), r#"{"schema":1,"dayStartHour":24}"#)
            .expect("write calendar");
        assert!(load_app_config(&dir.path).is_err());

        fs::write(dir.path.join(CALENDAR_JSON), r#"{"schema":1,"historyLimit":0}"#)
            .expect("write calendar");
        assert!(load_app_config(&dir.path).is_err());

        fs::write(dir.path.join(CALENDAR_JSON), r#"{"schema":1}"#).expect("write calendar");
        fs::write(dir.path.join(APP_JSON), r#"{"schema":1,"timezone":"Mars/Olympus"}"#)
            .expect("write app");
        assert!(load_app_config(&dir.path).is_err());
    }
}
