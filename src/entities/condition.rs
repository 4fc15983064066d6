//! Status conditions
//!
//! The fixed set of conditions a character or combatant can carry, with the
//! static rules text shown next to them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Conditions attached to a character or combatant (no duplicates)
pub type ConditionSet = BTreeSet<Condition>;

/// Types of status conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Poisoned,
    Prone,
    Paralyzed,
    Stunned,
    Blinded,
    Frightened,
    Charmed,
}

/// Static rules metadata for a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Mechanical effect summary
    pub effect: &'static str,
    /// Display color (CSS hex)
    pub color: &'static str,
}

impl Condition {
    /// Every condition, in display order
    pub const ALL: [Condition; 7] = [
        Condition::Poisoned,
        Condition::Prone,
        Condition::Paralyzed,
        Condition::Stunned,
        Condition::Blinded,
        Condition::Frightened,
        Condition::Charmed,
    ];

    /// Rules text and display color
    pub fn info(&self) -> ConditionInfo {
        match self {
            Condition::Poisoned => ConditionInfo {
                name: "Poisoned",
                description: "A poisoned creature is sickened by toxins coursing through its body.",
                effect: "Disadvantage on attack rolls and ability checks.",
                color: "#16a34a",
            },
            Condition::Prone => ConditionInfo {
                name: "Prone",
                description: "A prone creature is lying on the ground and can only crawl.",
                effect: "Disadvantage on attack rolls. Melee attacks against it have advantage, ranged attacks have disadvantage.",
                color: "#a16207",
            },
            Condition::Paralyzed => ConditionInfo {
                name: "Paralyzed",
                description: "A paralyzed creature is incapacitated and can't move or speak.",
                effect: "Automatically fails Strength and Dexterity saves. Hits from within 5 feet are critical hits.",
                color: "#7c3aed",
            },
            Condition::Stunned => ConditionInfo {
                name: "Stunned",
                description: "A stunned creature is incapacitated, can't move, and can speak only falteringly.",
                effect: "Automatically fails Strength and Dexterity saves. Attacks against it have advantage.",
                color: "#ca8a04",
            },
            Condition::Blinded => ConditionInfo {
                name: "Blinded",
                description: "A blinded creature can't see and fails any check that requires sight.",
                effect: "Disadvantage on attack rolls. Attacks against it have advantage.",
                color: "#4b5563",
            },
            Condition::Frightened => ConditionInfo {
                name: "Frightened",
                description: "A frightened creature is shaken by the source of its fear.",
                effect: "Disadvantage on checks and attacks while the source is in sight. Can't willingly move closer to it.",
                color: "#dc2626",
            },
            Condition::Charmed => ConditionInfo {
                name: "Charmed",
                description: "A charmed creature regards the charmer as a trusted friend.",
                effect: "Can't attack the charmer. The charmer has advantage on social checks against it.",
                color: "#db2777",
            },
        }
    }

    /// Whether this condition stops the creature from taking actions
    pub fn prevents_action(&self) -> bool {
        matches!(self, Condition::Stunned | Condition::Paralyzed)
    }
}

/// Add the condition if absent, remove it if present
///
/// Returns whether the condition is now set.
pub fn toggle_condition(set: &mut ConditionSet, condition: Condition) -> bool {
    if set.remove(&condition) {
        false
    } else {
        set.insert(condition);
        true
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "poisoned" | "poison" => Ok(Condition::Poisoned),
            "prone" => Ok(Condition::Prone),
            "paralyzed" | "paralyze" => Ok(Condition::Paralyzed),
            "stunned" | "stun" => Ok(Condition::Stunned),
            "blinded" | "blind" => Ok(Condition::Blinded),
            "frightened" | "fear" => Ok(Condition::Frightened),
            "charmed" | "charm" => Ok(Condition::Charmed),
            other => Err(format!("Unknown condition: {}", other)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}
