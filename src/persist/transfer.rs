//! Export and import of party and encounter data
//!
//! Exports are pretty-printed JSON documents:
//!
//! ```json
//! { "version": 1, "exportedAt": "...", "data": { "characters": [], "combatants": [], "round": 1, "isInCombat": false } }
//! ```
//!
//! Custom monsters are not part of an export.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{ImportError, StorageError, CURRENT_VERSION};
use crate::combat::CombatState;
use crate::entities::{Character, Combatant};

/// Default cap on import file size (10 MiB)
pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

/// An exported snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub data: ExportPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub characters: Vec<Character>,
    pub combatants: Vec<Combatant>,
    #[serde(default = "first_round")]
    pub round: u32,
    #[serde(default)]
    pub is_in_combat: bool,
}

fn first_round() -> u32 {
    1
}

impl ExportData {
    /// Snapshot the roster and encounter
    pub fn new(characters: &[Character], combat: &CombatState) -> Self {
        Self {
            version: CURRENT_VERSION,
            exported_at: Utc::now(),
            data: ExportPayload {
                characters: characters.to_vec(),
                combatants: combat.combatants().to_vec(),
                round: combat.round(),
                is_in_combat: combat.is_in_combat(),
            },
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild the encounter carried by this export
    pub fn combat_state(&self) -> Result<CombatState, ImportError> {
        CombatState::restore(
            self.data.combatants.clone(),
            self.data.round,
            self.data.is_in_combat,
        )
        .map_err(|e| ImportError::InvalidData(format!("combat: {}", e)))
    }
}

/// Parse and validate an export document
///
/// Checks run in order: JSON syntax, document shape, version, field types,
/// then entity constraints. The first failure wins.
pub fn import_json(json: &str) -> Result<ExportData, ImportError> {
    let raw: Value = serde_json::from_str(json).map_err(|_| ImportError::InvalidJson)?;

    let version = check_shape(&raw)?;
    if version > u64::from(CURRENT_VERSION) {
        return Err(ImportError::UnsupportedVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    let data: ExportData =
        serde_json::from_value(raw).map_err(|e| ImportError::InvalidData(e.to_string()))?;

    for character in &data.data.characters {
        character
            .validate()
            .map_err(|e| ImportError::InvalidData(format!("character '{}': {}", character.name, e)))?;
    }
    data.combat_state()?;

    Ok(data)
}

fn check_shape(raw: &Value) -> Result<u64, ImportError> {
    let invalid = |reason: &str| ImportError::InvalidFormat(reason.to_string());

    let obj = raw
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object"))?;
    let version = obj
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("missing or non-numeric 'version'"))?;
    if !obj.get("exportedAt").is_some_and(Value::is_string) {
        return Err(invalid("missing 'exportedAt'"));
    }
    let data = obj
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing 'data' object"))?;
    for field in ["characters", "combatants"] {
        if !data.get(field).is_some_and(Value::is_array) {
            return Err(invalid(&format!("'data.{}' must be an array", field)));
        }
    }
    Ok(version)
}

/// Read and validate an export file
///
/// The extension and size are checked before the file is read.
pub async fn import_file(path: impl AsRef<Path>, max_bytes: u64) -> Result<ExportData, ImportError> {
    let path = path.as_ref();

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(ImportError::WrongExtension);
    }

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ImportError::Read(e.to_string()))?;
    if metadata.len() > max_bytes {
        warn!(
            "Refusing to import {} ({} bytes)",
            path.display(),
            metadata.len()
        );
        return Err(ImportError::TooLarge {
            size: metadata.len(),
            max: max_bytes,
        });
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ImportError::Read(e.to_string()))?;
    let data = import_json(&contents)?;

    info!(
        "Imported {} characters and {} combatants from {}",
        data.data.characters.len(),
        data.data.combatants.len(),
        path.display()
    );
    Ok(data)
}

/// Write an export document to disk
pub async fn export_to_file(data: &ExportData, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let path = path.as_ref();
    tokio::fs::write(path, data.to_json()?).await?;
    info!("Exported state to {}", path.display());
    Ok(())
}

/// Default export file name: `initrack-export-YYYY-MM-DD.json`
pub fn default_export_name(at: DateTime<Utc>) -> String {
    format!("initrack-export-{}.json", at.format("%Y-%m-%d"))
}
