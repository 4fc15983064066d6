//! Versioned state migrations
//!
//! Persisted state is stored as `{ "version": N, "state": { ... } }`. Older
//! payloads are upgraded by folding each migration whose target version lies
//! in `detected + 1 ..= CURRENT_VERSION` over the raw JSON payload. The
//! payload stays untyped until every migration has run.

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Version written by this build
pub const CURRENT_VERSION: u32 = 1;

/// Migration failures; any of these resets the state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("v{version}: state payload is not an object")]
    NotAnObject { version: u32 },

    #[error("v{version}: field '{field}' has the wrong type")]
    InvalidField { version: u32, field: &'static str },
}

type Migration = fn(Value) -> Result<Value, MigrationError>;

/// Migrations keyed by the version they produce, in ascending order
const MIGRATIONS: &[(u32, Migration)] = &[(1, migrate_to_v1)];

/// A fresh envelope with an empty payload at the current version
pub fn empty_state() -> Value {
    json!({ "state": {}, "version": CURRENT_VERSION })
}

/// Read the version of a persisted blob
///
/// The top-level `version` wins over `state.version`; a blob with neither
/// is version 0.
pub fn get_state_version(raw: &Value) -> u32 {
    raw.get("version")
        .and_then(Value::as_u64)
        .or_else(|| {
            raw.get("state")
                .and_then(|state| state.get("version"))
                .and_then(Value::as_u64)
        })
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Bring a persisted blob up to `CURRENT_VERSION`
///
/// - `None` or JSON null gives [`empty_state`].
/// - A blob at or above the current version is returned unchanged.
/// - A migration failure gives [`empty_state`] rather than an error.
pub fn migrate_state(raw: Option<Value>) -> Value {
    let raw = match raw {
        None | Some(Value::Null) => return empty_state(),
        Some(raw) => raw,
    };

    let detected = get_state_version(&raw);
    if detected >= CURRENT_VERSION {
        if detected > CURRENT_VERSION {
            warn!(
                "Persisted state is v{} but this build only knows v{}; loading as-is",
                detected, CURRENT_VERSION
            );
        }
        return raw;
    }

    info!(
        "Migrating persisted state from v{} to v{}",
        detected, CURRENT_VERSION
    );

    let payload = match raw {
        Value::Object(mut map) => match map.remove("state") {
            Some(state) => state,
            // Unwrapped legacy blob: the object is the payload itself
            None => {
                map.remove("version");
                Value::Object(map)
            }
        },
        other => other,
    };

    let migrated = MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > detected && *version <= CURRENT_VERSION)
        .try_fold(payload, |state, (version, migrate)| {
            debug!("Applying state migration to v{}", version);
            migrate(state)
        });

    match migrated {
        Ok(state) => json!({ "state": state, "version": CURRENT_VERSION }),
        Err(e) => {
            error!("State migration failed ({}); starting with empty state", e);
            empty_state()
        }
    }
}

/// v0 -> v1: fill in missing collections and stamp the version
fn migrate_to_v1(state: Value) -> Result<Value, MigrationError> {
    const VERSION: u32 = 1;

    let Value::Object(mut map) = state else {
        return Err(MigrationError::NotAnObject { version: VERSION });
    };

    for field in ["characters", "combatants", "customMonsters"] {
        ensure_array(&mut map, field, VERSION)?;
    }

    let round_ok = map
        .get("round")
        .and_then(Value::as_u64)
        .is_some_and(|r| r >= 1);
    if !round_ok {
        map.insert("round".to_string(), json!(1));
    }

    if !map.get("isInCombat").is_some_and(Value::is_boolean) {
        map.insert("isInCombat".to_string(), json!(false));
    }

    map.insert("version".to_string(), json!(VERSION));
    Ok(Value::Object(map))
}

fn ensure_array(
    map: &mut Map<String, Value>,
    field: &'static str,
    version: u32,
) -> Result<(), MigrationError> {
    match map.get(field) {
        None | Some(Value::Null) => {
            map.insert(field.to_string(), json!([]));
            Ok(())
        }
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(MigrationError::InvalidField { version, field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_null() {
        let expected = json!({ "state": {}, "version": CURRENT_VERSION });
        assert_eq!(migrate_state(None), expected);
        assert_eq!(migrate_state(Some(Value::Null)), expected);
    }

    #[test]
    fn test_current_version_unchanged() {
        let raw = json!({
            "state": { "characters": [], "round": 4, "version": CURRENT_VERSION, "extra": "kept" },
            "version": CURRENT_VERSION
        });
        assert_eq!(migrate_state(Some(raw.clone())), raw);
    }

    #[test]
    fn test_newer_version_passes_through() {
        let raw = json!({ "state": { "somethingNew": true }, "version": CURRENT_VERSION + 5 });
        assert_eq!(migrate_state(Some(raw.clone())), raw);
    }

    #[test]
    fn test_v0_gains_version() {
        let raw = json!({ "state": { "characters": [], "round": 3 } });
        let migrated = migrate_state(Some(raw));
        assert_eq!(migrated["version"], 1);
        assert_eq!(migrated["state"]["version"], 1);
        assert_eq!(migrated["state"]["round"], 3);
        assert_eq!(migrated["state"]["combatants"], json!([]));
        assert_eq!(migrated["state"]["customMonsters"], json!([]));
        assert_eq!(migrated["state"]["isInCombat"], false);
    }

    #[test]
    fn test_unwrapped_legacy_blob() {
        let raw = json!({ "characters": [], "isInCombat": true });
        let migrated = migrate_state(Some(raw));
        assert_eq!(migrated["version"], 1);
        assert_eq!(migrated["state"]["isInCombat"], true);
        assert_eq!(migrated["state"]["round"], 1);
    }

    #[test]
    fn test_failed_migration_resets() {
        let raw = json!({ "state": { "characters": "not a list" } });
        assert_eq!(migrate_state(Some(raw)), empty_state());

        let raw = json!({ "state": 42 });
        assert_eq!(migrate_state(Some(raw)), empty_state());

        assert_eq!(migrate_state(Some(json!("garbage"))), empty_state());
    }

    #[test]
    fn test_get_state_version() {
        assert_eq!(get_state_version(&json!({})), 0);
        assert_eq!(get_state_version(&json!({ "version": 3 })), 3);
        assert_eq!(get_state_version(&json!({ "state": { "version": 2 } })), 2);
        assert_eq!(
            get_state_version(&json!({ "version": 5, "state": { "version": 2 } })),
            5
        );
        assert_eq!(
            get_state_version(&json!({ "version": "1", "state": { "version": 2 } })),
            2
        );
    }

    #[test]
    fn test_migration_table_is_ascending() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|(v, _)| *v).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
        assert_eq!(versions.last().copied(), Some(CURRENT_VERSION));
    }
}
