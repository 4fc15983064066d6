//! Monster templates
//!
//! Monsters are immutable stat blocks. Adding one to combat instantiates a
//! combatant; the template itself is never touched by combat.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{check_range, check_text, ValidationError};
use crate::dice::parse_dice_notation;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Creature category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterType {
    Aberration,
    Beast,
    Celestial,
    Construct,
    Dragon,
    Elemental,
    Fey,
    Fiend,
    Giant,
    Humanoid,
    Monstrosity,
    Ooze,
    Plant,
    Undead,
}

impl MonsterType {
    pub const ALL: [MonsterType; 14] = [
        MonsterType::Aberration,
        MonsterType::Beast,
        MonsterType::Celestial,
        MonsterType::Construct,
        MonsterType::Dragon,
        MonsterType::Elemental,
        MonsterType::Fey,
        MonsterType::Fiend,
        MonsterType::Giant,
        MonsterType::Humanoid,
        MonsterType::Monstrosity,
        MonsterType::Ooze,
        MonsterType::Plant,
        MonsterType::Undead,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            MonsterType::Aberration => "aberration",
            MonsterType::Beast => "beast",
            MonsterType::Celestial => "celestial",
            MonsterType::Construct => "construct",
            MonsterType::Dragon => "dragon",
            MonsterType::Elemental => "elemental",
            MonsterType::Fey => "fey",
            MonsterType::Fiend => "fiend",
            MonsterType::Giant => "giant",
            MonsterType::Humanoid => "humanoid",
            MonsterType::Monstrosity => "monstrosity",
            MonsterType::Ooze => "ooze",
            MonsterType::Plant => "plant",
            MonsterType::Undead => "undead",
        }
    }
}

impl FromStr for MonsterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MonsterType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("Unknown monster type: {}", s.trim()))
    }
}

impl fmt::Display for MonsterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creature size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterSize {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl FromStr for MonsterSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(MonsterSize::Tiny),
            "small" => Ok(MonsterSize::Small),
            "medium" => Ok(MonsterSize::Medium),
            "large" => Ok(MonsterSize::Large),
            "huge" => Ok(MonsterSize::Huge),
            "gargantuan" => Ok(MonsterSize::Gargantuan),
            other => Err(format!("Unknown monster size: {}", other)),
        }
    }
}

impl fmt::Display for MonsterSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonsterSize::Tiny => "tiny",
            MonsterSize::Small => "small",
            MonsterSize::Medium => "medium",
            MonsterSize::Large => "large",
            MonsterSize::Huge => "huge",
            MonsterSize::Gargantuan => "gargantuan",
        };
        f.write_str(s)
    }
}

/// A special ability or attack in a stat block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterAbility {
    pub name: String,
    pub description: String,
    /// Damage notation, e.g. "2d6+2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
    /// Usage limit, e.g. "Recharge 5-6" or "1/day"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

/// A monster stat block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monster {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MonsterType,
    pub armor_class: u32,
    pub hit_points: u32,
    /// Default attack damage notation
    pub damage: String,
    #[serde(default)]
    pub abilities: Vec<MonsterAbility>,
    pub challenge_rating: f64,
    #[serde(default)]
    pub size: MonsterSize,
    /// Walking speed in feet
    pub speed: u32,
    pub avatar_seed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Form data for a custom monster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMonster {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MonsterType,
    pub armor_class: u32,
    pub hit_points: u32,
    pub damage: String,
    #[serde(default)]
    pub abilities: Vec<MonsterAbility>,
    pub challenge_rating: f64,
    #[serde(default)]
    pub size: MonsterSize,
    pub speed: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl Monster {
    /// Validate form data and build a monster with a fresh id
    pub fn create(draft: NewMonster) -> Result<Self, ValidationError> {
        let name = check_text("name", &draft.name, MAX_NAME_LEN)?;
        let monster = Self {
            id: Uuid::new_v4(),
            avatar_seed: name.clone(),
            name,
            kind: draft.kind,
            armor_class: draft.armor_class,
            hit_points: draft.hit_points,
            damage: draft.damage.trim().to_string(),
            abilities: draft.abilities,
            challenge_rating: draft.challenge_rating,
            size: draft.size,
            speed: draft.speed,
            description: draft
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        };
        monster.validate()?;
        Ok(monster)
    }

    /// Check every field constraint
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("name", &self.name, MAX_NAME_LEN)?;
        check_range("armor class", self.armor_class as i64, 1, 30)?;
        parse_dice_notation(&self.damage).map_err(|source| ValidationError::Dice {
            field: "damage",
            source,
        })?;
        if !self.challenge_rating.is_finite()
            || self.challenge_rating < 0.0
            || self.challenge_rating > 30.0
        {
            return Err(ValidationError::ChallengeRating(self.challenge_rating));
        }
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::TooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_LEN,
                });
            }
        }
        for ability in &self.abilities {
            check_text("ability name", &ability.name, MAX_NAME_LEN)?;
            if let Some(damage) = &ability.damage {
                parse_dice_notation(damage).map_err(|source| ValidationError::Dice {
                    field: "ability damage",
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Challenge rating as printed in stat blocks ("1/4", "2")
    pub fn challenge_display(&self) -> String {
        match self.challenge_rating {
            cr if cr == 0.125 => "1/8".to_string(),
            cr if cr == 0.25 => "1/4".to_string(),
            cr if cr == 0.5 => "1/2".to_string(),
            cr if cr.fract() == 0.0 => format!("{}", cr as u32),
            cr => format!("{}", cr),
        }
    }
}

fn ability(name: &str, description: &str, damage: Option<&str>, usage: Option<&str>) -> MonsterAbility {
    MonsterAbility {
        name: name.to_string(),
        description: description.to_string(),
        damage: damage.map(str::to_string),
        usage: usage.map(str::to_string),
    }
}

#[allow(clippy::too_many_arguments)]
fn stock(
    id: u128,
    name: &str,
    kind: MonsterType,
    armor_class: u32,
    hit_points: u32,
    damage: &str,
    challenge_rating: f64,
    size: MonsterSize,
    speed: u32,
    abilities: Vec<MonsterAbility>,
    description: &str,
) -> Monster {
    Monster {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        kind,
        armor_class,
        hit_points,
        damage: damage.to_string(),
        abilities,
        challenge_rating,
        size,
        speed,
        avatar_seed: name.to_lowercase(),
        description: Some(description.to_string()),
    }
}

/// The stock bestiary shipped with the tracker
///
/// Ids are fixed so combatants created from these monsters keep a valid
/// back-reference across sessions.
pub fn builtin_monsters() -> Vec<Monster> {
    vec![
        stock(
            0x6d6f6e73_7465_4000_8000_000000000001,
            "Goblin",
            MonsterType::Humanoid,
            15,
            7,
            "1d6+2",
            0.25,
            MonsterSize::Small,
            30,
            vec![ability(
                "Nimble Escape",
                "Can take the Disengage or Hide action as a bonus action.",
                None,
                None,
            )],
            "A small, black-hearted humanoid that lairs in caves and ruins.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000002,
            "Orc",
            MonsterType::Humanoid,
            13,
            15,
            "1d12+3",
            0.5,
            MonsterSize::Medium,
            30,
            vec![ability(
                "Aggressive",
                "As a bonus action, moves up to its speed toward a hostile creature it can see.",
                None,
                None,
            )],
            "A savage raider driven by a lust for slaughter.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000003,
            "Skeleton",
            MonsterType::Undead,
            13,
            13,
            "1d6+2",
            0.25,
            MonsterSize::Medium,
            30,
            vec![ability(
                "Shortbow",
                "Ranged weapon attack, range 80/320 ft.",
                Some("1d6+2"),
                None,
            )],
            "Animated bones bound to a necromancer's will.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000004,
            "Zombie",
            MonsterType::Undead,
            8,
            22,
            "1d6+1",
            0.25,
            MonsterSize::Medium,
            20,
            vec![ability(
                "Undead Fortitude",
                "When reduced to 0 HP by non-radiant damage, makes a Constitution save to drop to 1 HP instead.",
                None,
                None,
            )],
            "A shambling corpse that hungers for the living.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000005,
            "Wolf",
            MonsterType::Beast,
            13,
            11,
            "2d4+2",
            0.25,
            MonsterSize::Medium,
            40,
            vec![ability(
                "Pack Tactics",
                "Advantage on attack rolls when an ally is within 5 feet of the target.",
                None,
                None,
            )],
            "A cunning predator that hunts in packs.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000006,
            "Bandit",
            MonsterType::Humanoid,
            12,
            11,
            "1d6+1",
            0.125,
            MonsterSize::Medium,
            30,
            vec![ability(
                "Light Crossbow",
                "Ranged weapon attack, range 80/320 ft.",
                Some("1d8+1"),
                None,
            )],
            "A highway robber looking for easy coin.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000007,
            "Ogre",
            MonsterType::Giant,
            11,
            59,
            "2d8+4",
            2.0,
            MonsterSize::Large,
            40,
            vec![ability(
                "Javelin",
                "Ranged weapon attack, range 30/120 ft.",
                Some("2d6+4"),
                None,
            )],
            "A hulking brute with a short temper and an endless appetite.",
        ),
        stock(
            0x6d6f6e73_7465_4000_8000_000000000008,
            "Young Red Dragon",
            MonsterType::Dragon,
            18,
            178,
            "2d10+6",
            10.0,
            MonsterSize::Large,
            40,
            vec![
                ability(
                    "Fire Breath",
                    "Exhales fire in a 30-foot cone. Dexterity save for half damage.",
                    Some("16d6"),
                    Some("Recharge 5-6"),
                ),
                ability(
                    "Multiattack",
                    "Makes three attacks: one with its bite and two with its claws.",
                    None,
                    None,
                ),
            ],
            "An arrogant wyrmling already hoarding treasure and grudges.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceError;

    fn draft() -> NewMonster {
        NewMonster {
            name: "Cave Bear".to_string(),
            kind: MonsterType::Beast,
            armor_class: 12,
            hit_points: 42,
            damage: "2d6+4".to_string(),
            abilities: vec![],
            challenge_rating: 2.0,
            size: MonsterSize::Large,
            speed: 40,
            description: Some("   ".to_string()),
        }
    }

    #[test]
    fn test_create_monster() {
        let m = Monster::create(draft()).unwrap();
        assert_eq!(m.name, "Cave Bear");
        assert_eq!(m.description, None);
        assert_eq!(m.avatar_seed, "Cave Bear");
    }

    #[test]
    fn test_create_rejects_bad_damage() {
        let mut d = draft();
        d.damage = "lots".to_string();
        assert!(matches!(
            Monster::create(d),
            Err(ValidationError::Dice { field: "damage", .. })
        ));
    }

    #[test]
    fn test_create_rejects_oversized_damage_modifier() {
        let mut d = draft();
        d.damage = "1d6+2147483647".to_string();
        assert!(matches!(
            Monster::create(d),
            Err(ValidationError::Dice {
                field: "damage",
                source: DiceError::ModifierTooLarge(_),
            })
        ));
    }

    #[test]
    fn test_create_rejects_bad_cr() {
        let mut d = draft();
        d.challenge_rating = -1.0;
        assert!(Monster::create(d).is_err());
        let mut d = draft();
        d.challenge_rating = f64::NAN;
        assert!(Monster::create(d).is_err());
    }

    #[test]
    fn test_builtins_are_valid() {
        let monsters = builtin_monsters();
        assert!(!monsters.is_empty());
        for m in &monsters {
            m.validate().unwrap_or_else(|e| panic!("{} invalid: {}", m.name, e));
        }
        let goblin = monsters.iter().find(|m| m.name == "Goblin").unwrap();
        assert_eq!(goblin.id, builtin_monsters()[0].id);
    }

    #[test]
    fn test_type_and_size_parsing() {
        assert_eq!("Undead".parse::<MonsterType>(), Ok(MonsterType::Undead));
        assert!("robot".parse::<MonsterType>().is_err());
        assert_eq!("HUGE".parse::<MonsterSize>(), Ok(MonsterSize::Huge));
    }

    #[test]
    fn test_serde_type_field() {
        let m = Monster::create(draft()).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "beast");
        assert_eq!(json["size"], "large");
        assert_eq!(json["challengeRating"], 2.0);
    }

    #[test]
    fn test_challenge_display() {
        let mut m = Monster::create(draft()).unwrap();
        assert_eq!(m.challenge_display(), "2");
        m.challenge_rating = 0.25;
        assert_eq!(m.challenge_display(), "1/4");
        m.challenge_rating = 0.125;
        assert_eq!(m.challenge_display(), "1/8");
    }
}
