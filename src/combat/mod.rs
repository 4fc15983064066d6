//! Combat system module
//!
//! Implements the initiative tracker:
//! - Turn order sorted by initiative
//! - Active-combatant tracking and round counting
//! - Defeated combatants skipped on turn advance
//! - HP, condition, and initiative updates on individual combatants

mod state;

use thiserror::Error;
use uuid::Uuid;

use crate::entities::ValidationError;

pub use crate::entities::sort_by_initiative;
pub use state::{CombatState, MAX_MANUAL_INITIATIVE, MIN_MANUAL_INITIATIVE};

/// Combat operation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    #[error("combatant not found: {0}")]
    NotFound(Uuid),

    #[error("initiative must be between -10 and 50 (got {0})")]
    InitiativeOutOfRange(f64),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
