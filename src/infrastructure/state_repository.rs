use crate::domain::models::SchedulerState;
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SCHEDULER_STATE_KEY: &str = "retroweek_scheduler_state";
pub const DARK_MODE_KEY: &str = "retroweek_dark_mode";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
    fn remove(&self, key: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, InfraError> {
        self.values
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("key-value store lock poisoned: {error}")))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

pub fn encode_state(state: &SchedulerState) -> Result<String, InfraError> {
    Ok(serde_json::to_string(state)?)
}

/// Parses a saved blob, applying defaults for anything an older blob lacks.
/// Tasks that fail validation are dropped one by one; the rest of the blob
/// still loads.
pub fn decode_state(raw: &str) -> Result<SchedulerState, InfraError> {
    let mut state: SchedulerState = serde_json::from_str(raw)?;
    state.sanitize();
    for (task_id, reason) in state.store.drop_invalid() {
        tracing::warn!(key = SCHEDULER_STATE_KEY, task_id, %reason, "dropping invalid saved task");
    }
    Ok(state)
}

pub fn save_scheduler_state(
    store: &dyn KeyValueStore,
    state: &SchedulerState,
) -> Result<(), InfraError> {
    store.set(SCHEDULER_STATE_KEY, &encode_state(state)?)
}

/// Loads the saved state. A blob that cannot be parsed counts as no prior
/// state; the failure is reported through `tracing` and returned alongside.
pub fn load_scheduler_state(
    store: &dyn KeyValueStore,
) -> Result<(SchedulerState, Option<InfraError>), InfraError> {
    let Some(raw) = store.get(SCHEDULER_STATE_KEY)? else {
        return Ok((SchedulerState::default(), None));
    };
    match decode_state(&raw) {
        Ok(state) => Ok((state, None)),
        Err(error) => {
            tracing::warn!(key = SCHEDULER_STATE_KEY, %error, "discarding unreadable scheduler state");
            Ok((SchedulerState::default(), Some(error)))
        }
    }
}

pub fn load_dark_mode(store: &dyn KeyValueStore) -> Result<bool, InfraError> {
    Ok(store
        .get(DARK_MODE_KEY)?
        .is_some_and(|value| value.trim() == "true"))
}

pub fn save_dark_mode(store: &dyn KeyValueStore, enabled: bool) -> Result<(), InfraError> {
    store.set(DARK_MODE_KEY, if enabled { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Category;
    use crate::infrastructure::storage::initialize_database;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!(
                "retroweek-kv-{}-{}.sqlite",
                std::process::id(),
                NEXT_DB.fetch_add(1, Ordering::Relaxed)
            ));
            initialize_database(&path).expect("initialize database");
            Self { path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn sample_state() -> SchedulerState {
        let mut state = SchedulerState::default();
        let task = state
            .store
            .add_task("Standup", 0.5, Category::work())
            .expect("add task");
        state.store.assign(task.id, 0, 9.0).expect("assign");
        state
            .store
            .add_task("Groceries", 1.0, Category::personal())
            .expect("add task");
        state
            .settings
            .add_custom_zone("Gym", 18.0, 19.5, Some("#a0c4ff"))
            .expect("add zone");
        state
    }

    #[test]
    fn sqlite_store_upserts_and_removes() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::new(&database.path);
        assert_eq!(store.get("k").expect("get"), None);

        store.set("k", "one").expect("set");
        store.set("k", "two").expect("overwrite");
        assert_eq!(store.get("k").expect("get"), Some("two".to_string()));

        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn sqlite_store_round_trips_scheduler_state() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::new(&database.path);
        let state = sample_state();

        save_scheduler_state(&store, &state).expect("save");
        let (loaded, warning) = load_scheduler_state(&store).expect("load");
        assert!(warning.is_none());
        assert_eq!(loaded, state);
    }

    #[test]
    fn blob_uses_camel_case_field_names() {
        let encoded = encode_state(&sample_state()).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&encoded).expect("parse");
        assert_eq!(value["nextId"], 3);
        assert_eq!(value["tasks"][0]["assignedDay"], 0);
        assert_eq!(value["settings"]["lunchStart"], 12.0);
        assert_eq!(value["settings"]["customZones"][0]["title"], "Gym");
    }

    #[test]
    fn older_blob_is_filled_with_defaults() {
        let raw = r#"{"tasks":[{"id":4,"title":"Call","duration":1,"category":"other","assignedDay":1,"assignedHour":8}],"settings":{"lunchEnabled":false}}"#;
        let state = decode_state(raw).expect("decode");
        assert_eq!(state.store.next_id(), 5);
        assert!(!state.settings.lunch_enabled);
        assert_eq!(state.settings.sleep_start, 22.0);
        assert!(state.settings.custom_zones.is_empty());
        assert_eq!(state.store.tasks()[0].hour(), Some(8.0));
    }

    #[test]
    fn stale_next_id_is_raised_past_existing_ids() {
        let raw = r#"{"tasks":[{"id":9,"title":"A","duration":1}],"nextId":2}"#;
        assert_eq!(decode_state(raw).expect("decode").store.next_id(), 10);
    }

    #[test]
    fn empty_object_decodes_to_default_state() {
        assert_eq!(decode_state("{}").expect("decode"), SchedulerState::default());
    }

    #[test]
    fn invalid_task_is_dropped_without_losing_the_rest() {
        let raw = r#"{"tasks":[{"id":3,"title":"  ","duration":1,"assignedDay":2,"assignedHour":9},{"id":4,"title":"Call","duration":1,"assignedDay":1,"assignedHour":8}],"nextId":5,"settings":{"lunchEnabled":false}}"#;
        let state = decode_state(raw).expect("decode");

        assert_eq!(state.store.len(), 1);
        assert_eq!(state.store.tasks()[0].title, "Call");
        assert_eq!(state.store.next_id(), 5);
        assert!(!state.settings.lunch_enabled);
    }

    #[test]
    fn bad_duration_or_day_drops_only_that_task() {
        let raw = r#"{"tasks":[{"id":1,"title":"Zero","duration":0},{"id":2,"title":"Late","duration":1,"assignedDay":7,"assignedHour":9},{"id":3,"title":"Fine","duration":2}],"nextId":4}"#;
        let state = decode_state(raw).expect("decode");
        let titles: Vec<&str> = state.store.tasks().iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, vec!["Fine"]);
        assert_eq!(state.store.next_id(), 4);
    }

    #[test]
    fn corrupted_blob_loads_as_empty_state() {
        let store = InMemoryKeyValueStore::default();
        store.set(SCHEDULER_STATE_KEY, "{not json").expect("set");

        let (state, warning) = load_scheduler_state(&store).expect("load");
        assert_eq!(state, SchedulerState::default());
        assert!(matches!(warning, Some(InfraError::Json(_))));
    }

    #[test]
    fn dark_mode_is_stored_under_its_own_key() {
        let store = InMemoryKeyValueStore::default();
        assert!(!load_dark_mode(&store).expect("load"));
        save_dark_mode(&store, true).expect("save");
        assert!(load_dark_mode(&store).expect("load"));
        assert_eq!(store.get(DARK_MODE_KEY).expect("get"), Some("true".to_string()));
        assert_eq!(store.get(SCHEDULER_STATE_KEY).expect("get"), None);
    }

    proptest! {
        #[test]
        fn saved_state_loads_back_unchanged(
            tasks in proptest::collection::vec(
                ("[a-z]{1,12}", 1u32..40, proptest::option::of((0u8..7, 0u32..96))),
                0..12,
            ),
            lunch_enabled in any::<bool>(),
        ) {
            let mut state = SchedulerState::default();
            state.settings.lunch_enabled = lunch_enabled;
            for (title, quarters, slot) in tasks {
                let task = state
                    .store
                    .add_task(&title, f64::from(quarters) / 4.0, Category::other())
                    .expect("add task");
                if let Some((day, quarter)) = slot {
                    state
                        .store
                        .assign(task.id, day, f64::from(quarter) / 4.0)
                        .expect("assign");
                }
            }

            let decoded = decode_state(&encode_state(&state).expect("encode")).expect("decode");
            prop_assert_eq!(decoded, state);
        }
    }
}
