//! Combatants
//!
//! A combatant is the per-encounter copy of a character or monster. It holds
//! a back-reference to its source entity but owns its own HP, initiative,
//! and conditions for the length of the encounter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{check_hp, check_range, check_text, Character, ConditionSet, Monster, ValidationError};

pub const MAX_NAME_LEN: usize = 60;
pub const MAX_NOTES_LEN: usize = 500;

/// Where a combatant came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatantKind {
    Character,
    Monster,
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatantKind::Character => f.write_str("character"),
            CombatantKind::Monster => f.write_str("monster"),
        }
    }
}

/// A participant in the current encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub id: Uuid,
    /// Id of the source character or monster
    pub entity_id: Uuid,
    #[serde(rename = "type")]
    pub kind: CombatantKind,
    pub name: String,
    pub armor_class: u32,
    pub max_hp: u32,
    pub current_hp: u32,
    pub initiative: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex_modifier: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A combatant that has not joined an encounter yet
///
/// Joining assigns the id, timestamp, and active flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCombatant {
    pub entity_id: Uuid,
    #[serde(rename = "type")]
    pub kind: CombatantKind,
    pub name: String,
    pub armor_class: u32,
    pub max_hp: u32,
    pub current_hp: u32,
    pub initiative: i32,
    #[serde(default)]
    pub dex_modifier: Option<i32>,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewCombatant {
    /// Draft a combatant from a roster character
    ///
    /// HP and conditions are copied as they stand right now.
    pub fn from_character(character: &Character, initiative: i32) -> Self {
        Self {
            entity_id: character.id,
            kind: CombatantKind::Character,
            name: character.name.clone(),
            armor_class: character.armor_class,
            max_hp: character.max_hp,
            current_hp: character.current_hp,
            initiative,
            dex_modifier: Some(character.dex_modifier),
            conditions: character.conditions.clone(),
            is_player: true,
            notes: None,
        }
    }

    /// Draft a combatant from a monster template
    ///
    /// When `existing` already holds combatants spawned from the same
    /// monster, the name gets the next number after the highest suffix in
    /// use ("Goblin 2", "Goblin 3").
    pub fn from_monster(monster: &Monster, initiative: i32, existing: &[Combatant]) -> Self {
        let highest = existing
            .iter()
            .filter(|c| c.kind == CombatantKind::Monster && c.entity_id == monster.id)
            .map(|c| copy_number(&c.name, &monster.name))
            .max();
        let name = match highest {
            None => monster.name.clone(),
            Some(n) => format!("{} {}", monster.name, n.saturating_add(1)),
        };

        Self {
            entity_id: monster.id,
            kind: CombatantKind::Monster,
            name,
            armor_class: monster.armor_class,
            max_hp: monster.hit_points,
            current_hp: monster.hit_points,
            initiative,
            dex_modifier: None,
            conditions: ConditionSet::new(),
            is_player: false,
            notes: None,
        }
    }

    /// Turn the draft into a combatant with a fresh id and timestamp
    pub fn into_combatant(self) -> Result<Combatant, ValidationError> {
        let combatant = Combatant {
            id: Uuid::new_v4(),
            entity_id: self.entity_id,
            kind: self.kind,
            name: check_text("name", &self.name, MAX_NAME_LEN)?,
            armor_class: self.armor_class,
            max_hp: self.max_hp,
            current_hp: self.current_hp,
            initiative: self.initiative,
            dex_modifier: self.dex_modifier,
            is_active: false,
            conditions: self.conditions,
            is_player: self.is_player,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            added_at: Utc::now(),
        };
        combatant.validate()?;
        Ok(combatant)
    }
}

/// Suffix of a copy name: "Goblin" is 1, "Goblin 3" is 3
fn copy_number(name: &str, base: &str) -> u32 {
    name.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix(' '))
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

impl Combatant {
    /// Check every field constraint
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("name", &self.name, MAX_NAME_LEN)?;
        check_range("armor class", self.armor_class as i64, 0, 30)?;
        check_hp(self.current_hp, self.max_hp)?;
        if let Some(dex) = self.dex_modifier {
            check_range("dex modifier", dex as i64, -5, 10)?;
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                return Err(ValidationError::TooLong {
                    field: "notes",
                    max: MAX_NOTES_LEN,
                });
            }
        }
        Ok(())
    }

    /// Out of the fight (0 HP)
    pub fn is_defeated(&self) -> bool {
        self.current_hp == 0
    }

    /// At or below half HP
    pub fn is_bloodied(&self) -> bool {
        (self.current_hp as u64) * 2 <= self.max_hp as u64
    }

    /// Remaining HP as a rounded percentage; 0 when max HP is 0
    pub fn hp_percentage(&self) -> u32 {
        if self.max_hp == 0 {
            return 0;
        }
        (100.0 * self.current_hp as f64 / self.max_hp as f64).round() as u32
    }

    /// Set current HP, clamped to 0..=max_hp
    pub fn set_hp(&mut self, hp: i64) {
        self.current_hp = hp.clamp(0, self.max_hp as i64) as u32;
    }
}

/// Sort combatants by initiative, highest first
///
/// The sort is stable, so combatants with equal initiative keep their
/// relative order. The input is left untouched.
pub fn sort_by_initiative(combatants: &[Combatant]) -> Vec<Combatant> {
    let mut sorted = combatants.to_vec();
    sorted.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{builtin_monsters, NewCharacter};

    fn combatant(name: &str, initiative: i32, hp: u32, max_hp: u32) -> Combatant {
        NewCombatant {
            entity_id: Uuid::new_v4(),
            kind: CombatantKind::Monster,
            name: name.to_string(),
            armor_class: 12,
            max_hp,
            current_hp: hp,
            initiative,
            dex_modifier: None,
            conditions: ConditionSet::new(),
            is_player: false,
            notes: None,
        }
        .into_combatant()
        .unwrap()
    }

    #[test]
    fn test_sort_by_initiative() {
        let list = vec![
            combatant("a", 5, 10, 10),
            combatant("b", 20, 10, 10),
            combatant("c", 12, 10, 10),
        ];
        let sorted = sort_by_initiative(&list);
        let inits: Vec<i32> = sorted.iter().map(|c| c.initiative).collect();
        assert_eq!(inits, vec![20, 12, 5]);
        // input untouched
        let original: Vec<i32> = list.iter().map(|c| c.initiative).collect();
        assert_eq!(original, vec![5, 20, 12]);
    }

    #[test]
    fn test_sort_is_stable() {
        let list = vec![
            combatant("first", 10, 10, 10),
            combatant("high", 15, 10, 10),
            combatant("second", 10, 10, 10),
            combatant("third", 10, 10, 10),
        ];
        let names: Vec<String> = sort_by_initiative(&list)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["high", "first", "second", "third"]);
    }

    #[test]
    fn test_defeated_and_bloodied() {
        assert!(combatant("x", 0, 0, 10).is_defeated());
        assert!(!combatant("x", 0, 1, 10).is_defeated());
        assert!(combatant("x", 0, 5, 10).is_bloodied());
        assert!(combatant("x", 0, 4, 10).is_bloodied());
        assert!(!combatant("x", 0, 6, 10).is_bloodied());
        assert!(combatant("x", 0, 3, 7).is_bloodied());
        assert!(!combatant("x", 0, 4, 7).is_bloodied());
    }

    #[test]
    fn test_hp_percentage() {
        assert_eq!(combatant("x", 0, 10, 10).hp_percentage(), 100);
        assert_eq!(combatant("x", 0, 1, 3).hp_percentage(), 33);
        assert_eq!(combatant("x", 0, 2, 3).hp_percentage(), 67);
        assert_eq!(combatant("x", 0, 0, 0).hp_percentage(), 0);
    }

    #[test]
    fn test_set_hp_clamps() {
        let mut c = combatant("x", 0, 5, 10);
        c.set_hp(-4);
        assert_eq!(c.current_hp, 0);
        c.set_hp(25);
        assert_eq!(c.current_hp, 10);
        c.set_hp(7);
        assert_eq!(c.current_hp, 7);
    }

    #[test]
    fn test_from_character() {
        let character = Character::create(NewCharacter {
            name: "Lyra".to_string(),
            class: "Rogue".to_string(),
            level: 5,
            max_hp: 33,
            current_hp: Some(20),
            armor_class: 15,
            dex_modifier: 4,
            avatar_seed: None,
        })
        .unwrap();
        let draft = NewCombatant::from_character(&character, 17);
        assert_eq!(draft.entity_id, character.id);
        assert_eq!(draft.current_hp, 20);
        assert_eq!(draft.dex_modifier, Some(4));
        assert!(draft.is_player);
        let c = draft.into_combatant().unwrap();
        assert!(!c.is_active);
        assert_eq!(c.kind, CombatantKind::Character);
    }

    #[test]
    fn test_from_monster_disambiguates_names() {
        let goblin = builtin_monsters().remove(0);
        let mut existing = Vec::new();
        for _ in 0..3 {
            let c = NewCombatant::from_monster(&goblin, 10, &existing)
                .into_combatant()
                .unwrap();
            existing.push(c);
        }
        let names: Vec<&str> = existing.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Goblin", "Goblin 2", "Goblin 3"]);
        assert!(existing.iter().all(|c| !c.is_player && c.max_hp == 7));
    }

    #[test]
    fn test_from_monster_skips_used_suffixes() {
        let goblin = builtin_monsters().remove(0);
        let mut existing = Vec::new();
        for _ in 0..3 {
            let c = NewCombatant::from_monster(&goblin, 10, &existing)
                .into_combatant()
                .unwrap();
            existing.push(c);
        }
        existing.remove(1);

        let next = NewCombatant::from_monster(&goblin, 10, &existing);
        assert_eq!(next.name, "Goblin 4");
    }

    #[test]
    fn test_validate_dex_modifier_range() {
        let mut c = combatant("x", 0, 5, 10);
        c.dex_modifier = Some(10);
        assert!(c.validate().is_ok());
        c.dex_modifier = Some(i32::MAX);
        assert!(matches!(
            c.validate(),
            Err(ValidationError::OutOfRange { field: "dex modifier", .. })
        ));
        c.dex_modifier = Some(-6);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_into_combatant_validates() {
        let mut draft = NewCombatant::from_monster(&builtin_monsters()[0], 3, &[]);
        draft.current_hp = draft.max_hp + 1;
        assert!(draft.into_combatant().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let c = combatant("Goblin", 14, 7, 7);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "monster");
        assert_eq!(json["isActive"], false);
        assert_eq!(json["currentHp"], 7);
        assert!(json.get("notes").is_none());
        let back: Combatant = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
