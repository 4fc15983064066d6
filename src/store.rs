//! Game store
//!
//! `GameStore` owns the full application state (roster, encounter, custom
//! monsters) together with a storage backend. State is hydrated through the
//! migration pipeline on open and written back after every successful
//! mutation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::combat::{CombatError, CombatState};
use crate::dice::roll_initiative;
use crate::entities::{
    builtin_monsters, Character, CharacterUpdate, Condition, Monster, NewCharacter, NewCombatant,
    NewMonster, ValidationError,
};
use crate::persist::{
    migrate_state, ExportData, ImportError, StateStorage, StorageError, CURRENT_VERSION,
};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("character not found: {0}")]
    CharacterNotFound(Uuid),

    #[error("monster not found: {0}")]
    MonsterNotFound(Uuid),

    #[error("built-in monster '{0}' cannot be removed")]
    BuiltinMonster(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything that is persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub characters: Vec<Character>,
    #[serde(flatten)]
    pub combat: CombatState,
    pub custom_monsters: Vec<Monster>,
    pub version: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            characters: Vec::new(),
            combat: CombatState::new(),
            custom_monsters: Vec::new(),
            version: CURRENT_VERSION,
        }
    }
}

impl GameState {
    /// Build state from a migrated payload
    ///
    /// Entries that fail validation are dropped with a warning; an
    /// encounter that cannot be restored is reset.
    pub fn hydrate(payload: Value) -> Self {
        let decoded: GameState = match serde_json::from_value(payload) {
            Ok(state) => state,
            Err(e) => {
                warn!("Stored state could not be decoded ({}); starting fresh", e);
                return Self::default();
            }
        };

        let mut characters = decoded.characters;
        characters.retain(|c| match c.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping stored character '{}': {}", c.name, e);
                false
            }
        });

        let mut custom_monsters = decoded.custom_monsters;
        custom_monsters.retain(|m| match m.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping stored monster '{}': {}", m.name, e);
                false
            }
        });

        let combat = CombatState::restore(
            decoded.combat.combatants().to_vec(),
            decoded.combat.round(),
            decoded.combat.is_in_combat(),
        )
        .unwrap_or_else(|e| {
            warn!("Stored encounter is invalid ({}); clearing it", e);
            CombatState::new()
        });

        Self {
            characters,
            combat,
            custom_monsters,
            version: CURRENT_VERSION,
        }
    }
}

/// On-disk envelope
#[derive(Debug, Serialize)]
pub struct PersistedState<'a> {
    pub state: &'a GameState,
    pub version: u32,
}

/// Owns the game state and keeps its storage in sync
pub struct GameStore {
    state: GameState,
    storage: Box<dyn StateStorage>,
}

impl fmt::Debug for GameStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl GameStore {
    /// Open a store, hydrating whatever the backend holds
    ///
    /// Unreadable or corrupt content gives an empty state; only a failing
    /// backend read is an error.
    pub fn open(storage: Box<dyn StateStorage>) -> Result<Self, StoreError> {
        let raw = match storage.load()? {
            Some(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Stored state is not valid JSON ({}); starting fresh", e);
                    None
                }
            },
            None => None,
        };

        let mut migrated = migrate_state(raw);
        let payload = migrated
            .get_mut("state")
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(Default::default()));
        let state = GameState::hydrate(payload);

        info!(
            "Loaded {} characters, {} combatants, {} custom monsters",
            state.characters.len(),
            state.combat.combatants().len(),
            state.custom_monsters.len()
        );
        Ok(Self { state, storage })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn characters(&self) -> &[Character] {
        &self.state.characters
    }

    pub fn combat(&self) -> &CombatState {
        &self.state.combat
    }

    pub fn custom_monsters(&self) -> &[Monster] {
        &self.state.custom_monsters
    }

    /// Write the current state to storage
    pub fn save(&self) -> Result<(), StoreError> {
        let envelope = PersistedState {
            state: &self.state,
            version: CURRENT_VERSION,
        };
        let text = serde_json::to_string(&envelope).map_err(StorageError::from)?;
        self.storage.save(&text)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("Failed to persist game state: {}", e);
        }
    }

    /// Run a mutation; persist on success, log on failure
    fn mutate<T, E>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut GameState) -> Result<T, E>,
    ) -> Result<T, StoreError>
    where
        StoreError: From<E>,
    {
        match op(&mut self.state) {
            Ok(value) => {
                debug!("{}: ok", what);
                self.persist();
                Ok(value)
            }
            Err(e) => {
                let e = StoreError::from(e);
                warn!("{} rejected: {}", what, e);
                Err(e)
            }
        }
    }

    /// Forget everything, including the stored copy
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.state = GameState::default();
        self.storage.clear()?;
        info!("Game state reset");
        Ok(())
    }

    // Characters

    pub fn character(&self, id: Uuid) -> Option<&Character> {
        self.state.characters.iter().find(|c| c.id == id)
    }

    pub fn add_character(&mut self, draft: NewCharacter) -> Result<Character, StoreError> {
        self.mutate("add character", |state| {
            let character = Character::create(draft)?;
            state.characters.push(character.clone());
            Ok::<_, StoreError>(character)
        })
    }

    pub fn update_character(
        &mut self,
        id: Uuid,
        update: CharacterUpdate,
    ) -> Result<Character, StoreError> {
        self.mutate("update character", |state| {
            let character = state
                .characters
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(StoreError::CharacterNotFound(id))?;
            character.apply(update)?;
            Ok::<_, StoreError>(character.clone())
        })
    }

    /// Remove a character from the roster
    ///
    /// Combatants already drawn from the character stay in the encounter.
    pub fn remove_character(&mut self, id: Uuid) -> Result<Character, StoreError> {
        self.mutate("remove character", |state| {
            let index = state
                .characters
                .iter()
                .position(|c| c.id == id)
                .ok_or(StoreError::CharacterNotFound(id))?;
            Ok::<_, StoreError>(state.characters.remove(index))
        })
    }

    pub fn toggle_character_condition(
        &mut self,
        id: Uuid,
        condition: Condition,
    ) -> Result<bool, StoreError> {
        self.mutate("toggle character condition", |state| {
            let character = state
                .characters
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(StoreError::CharacterNotFound(id))?;
            let set = crate::entities::toggle_condition(&mut character.conditions, condition);
            character.touch();
            Ok::<_, StoreError>(set)
        })
    }

    // Monsters

    /// Built-in bestiary followed by custom monsters
    pub fn all_monsters(&self) -> Vec<Monster> {
        let mut monsters = builtin_monsters();
        monsters.extend(self.state.custom_monsters.iter().cloned());
        monsters
    }

    pub fn find_monster(&self, id: Uuid) -> Option<Monster> {
        self.all_monsters().into_iter().find(|m| m.id == id)
    }

    pub fn add_custom_monster(&mut self, draft: NewMonster) -> Result<Monster, StoreError> {
        self.mutate("add monster", |state| {
            let monster = Monster::create(draft)?;
            state.custom_monsters.push(monster.clone());
            Ok::<_, StoreError>(monster)
        })
    }

    pub fn remove_custom_monster(&mut self, id: Uuid) -> Result<Monster, StoreError> {
        if let Some(builtin) = builtin_monsters().into_iter().find(|m| m.id == id) {
            warn!("Refusing to remove built-in monster {}", builtin.name);
            return Err(StoreError::BuiltinMonster(builtin.name));
        }
        self.mutate("remove monster", |state| {
            let index = state
                .custom_monsters
                .iter()
                .position(|m| m.id == id)
                .ok_or(StoreError::MonsterNotFound(id))?;
            Ok::<_, StoreError>(state.custom_monsters.remove(index))
        })
    }

    // Combat

    /// Put a roster character into the encounter
    ///
    /// Without an explicit initiative, d20 + dex modifier is rolled.
    pub fn add_character_to_combat(
        &mut self,
        character_id: Uuid,
        initiative: Option<i32>,
    ) -> Result<Uuid, StoreError> {
        let character = self
            .character(character_id)
            .cloned()
            .ok_or(StoreError::CharacterNotFound(character_id))?;
        let initiative =
            initiative.unwrap_or_else(|| roll_initiative(character.dex_modifier).total);
        let draft = NewCombatant::from_character(&character, initiative);
        self.mutate("add character to combat", |state| state.combat.add(draft))
    }

    /// Put a copy of a monster into the encounter
    ///
    /// Without an explicit initiative, a plain d20 is rolled.
    pub fn add_monster_to_combat(
        &mut self,
        monster_id: Uuid,
        initiative: Option<i32>,
    ) -> Result<Uuid, StoreError> {
        let monster = self
            .find_monster(monster_id)
            .ok_or(StoreError::MonsterNotFound(monster_id))?;
        let initiative = initiative.unwrap_or_else(|| roll_initiative(0).total);
        let draft =
            NewCombatant::from_monster(&monster, initiative, self.state.combat.combatants());
        self.mutate("add monster to combat", |state| state.combat.add(draft))
    }

    pub fn remove_combatant(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.mutate("remove combatant", |state| state.combat.remove(id).map(|_| ()))
    }

    /// Advance the turn; `None` when nobody else can act
    pub fn next_turn(&mut self) -> Option<Uuid> {
        let next = self.state.combat.next_turn();
        if next.is_some() {
            self.persist();
        }
        next
    }

    /// Step the turn back; `None` when nobody else can act
    pub fn previous_turn(&mut self) -> Option<Uuid> {
        let previous = self.state.combat.previous_turn();
        if previous.is_some() {
            self.persist();
        }
        previous
    }

    pub fn roll_initiative(&mut self, id: Uuid) -> Result<i32, StoreError> {
        self.mutate("roll initiative", |state| {
            state.combat.roll_initiative(id, &mut rand::rng())
        })
    }

    pub fn roll_all_initiative(&mut self) {
        self.state.combat.roll_all_initiative(&mut rand::rng());
        self.persist();
    }

    pub fn set_initiative(&mut self, id: Uuid, value: f64) -> Result<i32, StoreError> {
        self.mutate("set initiative", |state| state.combat.set_initiative(id, value))
    }

    pub fn set_hp(&mut self, id: Uuid, hp: i64) -> Result<u32, StoreError> {
        self.mutate("set hp", |state| state.combat.set_hp(id, hp))
    }

    pub fn apply_damage(&mut self, id: Uuid, amount: u32) -> Result<u32, StoreError> {
        self.mutate("apply damage", |state| state.combat.apply_damage(id, amount))
    }

    pub fn heal(&mut self, id: Uuid, amount: u32) -> Result<u32, StoreError> {
        self.mutate("heal", |state| state.combat.heal(id, amount))
    }

    pub fn toggle_combatant_condition(
        &mut self,
        id: Uuid,
        condition: Condition,
    ) -> Result<bool, StoreError> {
        self.mutate("toggle combatant condition", |state| {
            state.combat.toggle_condition(id, condition)
        })
    }

    pub fn set_notes(&mut self, id: Uuid, notes: Option<String>) -> Result<(), StoreError> {
        self.mutate("set notes", |state| state.combat.set_notes(id, notes))
    }

    pub fn clear_combat(&mut self) {
        self.state.combat.clear();
        self.persist();
    }

    // Export / import

    pub fn export(&self) -> ExportData {
        ExportData::new(&self.state.characters, &self.state.combat)
    }

    /// Replace roster and encounter with imported data
    ///
    /// Custom monsters are kept. Nothing changes if the data is invalid.
    pub fn apply_import(&mut self, data: ExportData) -> Result<(), StoreError> {
        self.mutate("import", |state| {
            for character in &data.data.characters {
                character.validate()?;
            }
            let combat = data.combat_state()?;
            state.characters = data.data.characters;
            state.combat = combat;
            Ok::<_, StoreError>(())
        })
    }
}
