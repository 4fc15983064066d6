//! Domain records
//!
//! Characters, monster templates, conditions, and the per-encounter
//! combatants created from them. Every record validates its own invariants;
//! data read from disk or an import file is only trusted after `validate()`.

mod character;
mod combatant;
mod condition;
mod monster;

use thiserror::Error;

use crate::dice::DiceError;

pub use character::{Character, CharacterUpdate, NewCharacter};
pub use combatant::{sort_by_initiative, Combatant, CombatantKind, NewCombatant};
pub use condition::{toggle_condition, Condition, ConditionInfo, ConditionSet};
pub use monster::{
    builtin_monsters, Monster, MonsterAbility, MonsterSize, MonsterType, NewMonster,
};

/// Schema validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} must be {max} characters or less")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("current HP ({current}) cannot exceed max HP ({max})")]
    HpExceedsMax { current: u32, max: u32 },

    #[error("challenge rating must be between 0 and 30 (got {0})")]
    ChallengeRating(f64),

    #[error("{field}: {source}")]
    Dice {
        field: &'static str,
        #[source]
        source: DiceError,
    },

    #[error("{0}")]
    Invariant(String),
}

/// Trim a required text field and enforce its length limit
fn check_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_hp(current: u32, max: u32) -> Result<(), ValidationError> {
    if current > max {
        return Err(ValidationError::HpExceedsMax { current, max });
    }
    Ok(())
}
