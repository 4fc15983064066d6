//! Persistence: versioned state storage plus JSON export/import

mod migrate;
mod storage;
mod transfer;

use thiserror::Error;

pub use migrate::{empty_state, get_state_version, migrate_state, MigrationError, CURRENT_VERSION};
pub use storage::{FileStorage, MemoryStorage, StateStorage};
pub use transfer::{
    default_export_name, export_to_file, import_file, import_json, ExportData, ExportPayload,
    MAX_IMPORT_BYTES,
};

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons an import is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported export version {found} (this build reads up to {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Import file must have a .json extension")]
    WrongExtension,

    #[error("Import file is too large ({size} bytes, limit {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to read import file: {0}")]
    Read(String),
}
