//! Die rolling primitives
//!
//! Uniform integer rolls for single dice, pools of dice, and initiative.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::DiceError;

/// Result of rolling a pool of identical dice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicePool {
    /// Number of sides per die
    pub sides: u32,
    /// Individual die results, in roll order
    pub rolls: Vec<u32>,
    /// Sum of all rolls
    pub total: u32,
}

/// Result of an initiative roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRoll {
    /// The natural d20
    pub roll: u32,
    /// Modifier applied (usually dexterity)
    pub modifier: i32,
    /// roll + modifier
    pub total: i32,
}

/// Roll a single die with the given number of sides
pub fn roll_die(sides: u32) -> Result<u32, DiceError> {
    roll_die_with(&mut rand::rng(), sides)
}

/// Roll a single die using the provided RNG
pub fn roll_die_with<R: Rng + ?Sized>(rng: &mut R, sides: u32) -> Result<u32, DiceError> {
    if sides == 0 {
        return Err(DiceError::InvalidSides(sides));
    }
    Ok(rng.random_range(1..=sides))
}

/// Roll `count` dice with `sides` sides each
pub fn roll_dice(count: u32, sides: u32) -> Result<DicePool, DiceError> {
    roll_dice_with(&mut rand::rng(), count, sides)
}

/// Roll a pool of dice using the provided RNG
pub fn roll_dice_with<R: Rng + ?Sized>(
    rng: &mut R,
    count: u32,
    sides: u32,
) -> Result<DicePool, DiceError> {
    if count == 0 {
        return Err(DiceError::InvalidCount(count));
    }
    if sides == 0 {
        return Err(DiceError::InvalidSides(sides));
    }

    let rolls: Vec<u32> = (0..count).map(|_| rng.random_range(1..=sides)).collect();
    let total = rolls.iter().sum();

    Ok(DicePool {
        sides,
        rolls,
        total,
    })
}

/// Roll a d20 for initiative and add the modifier
pub fn roll_initiative(modifier: i32) -> InitiativeRoll {
    roll_initiative_with(&mut rand::rng(), modifier)
}

/// Roll initiative using the provided RNG
pub fn roll_initiative_with<R: Rng + ?Sized>(rng: &mut R, modifier: i32) -> InitiativeRoll {
    let roll = rng.random_range(1..=20u32);
    InitiativeRoll {
        roll,
        modifier,
        total: (roll as i32).saturating_add(modifier),
    }
}
