//! Player characters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_hp, check_range, check_text, ConditionSet, ValidationError};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_CLASS_LEN: usize = 30;

/// A player character on the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub class: String,
    /// 1-20
    pub level: u32,
    pub max_hp: u32,
    /// Always within 0..=max_hp
    pub current_hp: u32,
    /// 1-30
    pub armor_class: u32,
    pub dex_modifier: i32,
    /// Seed for the generated avatar image
    pub avatar_seed: String,
    #[serde(default)]
    pub conditions: ConditionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form data for a new character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCharacter {
    pub name: String,
    pub class: String,
    pub level: u32,
    pub max_hp: u32,
    /// Defaults to max_hp
    #[serde(default)]
    pub current_hp: Option<u32>,
    pub armor_class: u32,
    #[serde(default)]
    pub dex_modifier: i32,
    /// Defaults to the character name
    #[serde(default)]
    pub avatar_seed: Option<String>,
}

/// Partial update of a character; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterUpdate {
    pub name: Option<String>,
    pub class: Option<String>,
    pub level: Option<u32>,
    pub max_hp: Option<u32>,
    pub current_hp: Option<u32>,
    pub armor_class: Option<u32>,
    pub dex_modifier: Option<i32>,
    pub avatar_seed: Option<String>,
}

impl Character {
    /// Validate form data and build a character with a fresh id
    pub fn create(draft: NewCharacter) -> Result<Self, ValidationError> {
        let name = check_text("name", &draft.name, MAX_NAME_LEN)?;
        let now = Utc::now();
        let character = Self {
            id: Uuid::new_v4(),
            avatar_seed: draft
                .avatar_seed
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| name.clone()),
            name,
            class: check_text("class", &draft.class, MAX_CLASS_LEN)?,
            level: draft.level,
            max_hp: draft.max_hp,
            current_hp: draft.current_hp.unwrap_or(draft.max_hp),
            armor_class: draft.armor_class,
            dex_modifier: draft.dex_modifier,
            conditions: ConditionSet::new(),
            created_at: now,
            updated_at: now,
        };
        character.validate()?;
        Ok(character)
    }

    /// Check every field constraint
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("name", &self.name, MAX_NAME_LEN)?;
        check_text("class", &self.class, MAX_CLASS_LEN)?;
        check_range("level", self.level as i64, 1, 20)?;
        check_range("max HP", self.max_hp as i64, 1, 999)?;
        check_hp(self.current_hp, self.max_hp)?;
        check_range("armor class", self.armor_class as i64, 1, 30)?;
        check_range("dex modifier", self.dex_modifier as i64, -5, 10)?;
        Ok(())
    }

    /// Apply a partial update; the character is untouched if the result is invalid
    ///
    /// Lowering max HP below current HP pulls current HP down with it.
    pub fn apply(&mut self, update: CharacterUpdate) -> Result<(), ValidationError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = check_text("name", &name, MAX_NAME_LEN)?;
        }
        if let Some(class) = update.class {
            next.class = check_text("class", &class, MAX_CLASS_LEN)?;
        }
        if let Some(level) = update.level {
            next.level = level;
        }
        if let Some(max_hp) = update.max_hp {
            next.max_hp = max_hp;
            if update.current_hp.is_none() {
                next.current_hp = next.current_hp.min(max_hp);
            }
        }
        if let Some(current_hp) = update.current_hp {
            next.current_hp = current_hp;
        }
        if let Some(ac) = update.armor_class {
            next.armor_class = ac;
        }
        if let Some(dex) = update.dex_modifier {
            next.dex_modifier = dex;
        }
        if let Some(seed) = update.avatar_seed {
            next.avatar_seed = seed;
        }

        next.validate()?;
        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
