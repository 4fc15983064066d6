//! Dice engine
//!
//! Implements tabletop dice with:
//! - Single die and dice pool rolls
//! - d20 initiative rolls with a modifier
//! - Notation parsing (e.g., "2d6+3") and result formatting

mod notation;
mod roll;

use thiserror::Error;

pub use notation::{
    calculate_result, format_dice_result, parse_dice_notation, roll_notation, DiceResult,
    ParsedDice, MAX_DICE_COUNT, MAX_DICE_MODIFIER, MAX_DICE_SIDES,
};
pub use roll::{
    roll_dice, roll_dice_with, roll_die, roll_die_with, roll_initiative, roll_initiative_with,
    DicePool, InitiativeRoll,
};

/// Dice argument and notation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Dice notation cannot be empty")]
    EmptyNotation,

    #[error("Invalid dice notation: \"{0}\". Expected a format like 2d6+3")]
    InvalidNotation(String),

    #[error("Number of dice must be a positive integer (got {0})")]
    InvalidCount(u32),

    #[error("Number of sides must be a positive integer (got {0})")]
    InvalidSides(u32),

    #[error("Cannot roll more than {0} dice at once")]
    TooManyDice(u32),

    #[error("Dice cannot have more than {0} sides")]
    TooManySides(u32),

    #[error("Modifier must be between -{0} and +{0}")]
    ModifierTooLarge(i32),

    #[error("Expected {expected} rolls, got {actual}")]
    RollCountMismatch { expected: u32, actual: usize },

    #[error("Roll {roll} is outside the range 1-{sides}")]
    RollOutOfRange { roll: u32, sides: u32 },
}
