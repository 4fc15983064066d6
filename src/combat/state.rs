//! Combat state tracking
//!
//! Manages the encounter turn order:
//! - Combatants kept sorted by initiative (highest first)
//! - A single active combatant while combat is running
//! - Turn advancement that skips defeated combatants
//! - Round counting

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::CombatError;
use crate::dice::roll_initiative_with;
use crate::entities::{
    sort_by_initiative, toggle_condition, Combatant, Condition, NewCombatant, ValidationError,
};

/// Lowest initiative accepted from manual entry
pub const MIN_MANUAL_INITIATIVE: f64 = -10.0;

/// Highest initiative accepted from manual entry
pub const MAX_MANUAL_INITIATIVE: f64 = 50.0;

/// Encounter state: the ordered combatant list plus round bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatState {
    combatants: Vec<Combatant>,
    round: u32,
    is_in_combat: bool,
}

impl Default for CombatState {
    fn default() -> Self {
        Self {
            combatants: Vec::new(),
            round: 1,
            is_in_combat: false,
        }
    }
}

impl CombatState {
    /// Create an empty encounter at round 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an encounter from stored or imported data
    ///
    /// Every combatant is validated, ids must be unique, at most one may be
    /// active, and the round must be at least 1. The list is re-sorted by
    /// initiative. A running encounter with nobody active gets the first
    /// standing combatant activated; an empty one is marked not in combat.
    pub fn restore(
        combatants: Vec<Combatant>,
        round: u32,
        is_in_combat: bool,
    ) -> Result<Self, ValidationError> {
        let mut ids = HashSet::new();
        for c in &combatants {
            c.validate()?;
            if !ids.insert(c.id) {
                return Err(ValidationError::Invariant(format!(
                    "combatant id {} appears more than once",
                    c.id
                )));
            }
        }
        let active = combatants.iter().filter(|c| c.is_active).count();
        if active > 1 {
            return Err(ValidationError::Invariant(format!(
                "{} combatants are marked active; at most one is allowed",
                active
            )));
        }
        if round == 0 {
            return Err(ValidationError::Invariant(
                "round must be at least 1".to_string(),
            ));
        }

        let mut state = Self {
            combatants: sort_by_initiative(&combatants),
            round,
            is_in_combat,
        };
        if state.combatants.is_empty() {
            if state.is_in_combat {
                warn!("Restored encounter has no combatants; ending combat");
                state.is_in_combat = false;
            }
        } else if state.is_in_combat && state.active_index().is_none() {
            let first = state
                .combatants
                .iter()
                .position(|c| !c.is_defeated())
                .unwrap_or(0);
            warn!(
                "Restored encounter has no active combatant; activating {}",
                state.combatants[first].name
            );
            state.combatants[first].is_active = true;
        }
        Ok(state)
    }

    /// Combatants in turn order
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_in_combat(&self) -> bool {
        self.is_in_combat
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Get a combatant by id
    pub fn get(&self, id: Uuid) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// The combatant whose turn it is
    pub fn active(&self) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.is_active)
    }

    fn active_index(&self) -> Option<usize> {
        self.combatants.iter().position(|c| c.is_active)
    }

    fn find_mut(&mut self, id: Uuid) -> Result<&mut Combatant, CombatError> {
        self.combatants
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CombatError::NotFound(id))
    }

    fn resort(&mut self) {
        self.combatants = sort_by_initiative(&self.combatants);
    }

    /// Add a combatant to the encounter
    ///
    /// The first combatant to join becomes active and starts combat.
    pub fn add(&mut self, draft: NewCombatant) -> Result<Uuid, CombatError> {
        let mut combatant = draft.into_combatant()?;
        let id = combatant.id;

        if self.combatants.is_empty() {
            combatant.is_active = true;
            self.is_in_combat = true;
        }

        debug!(
            "Adding {} ({}) with initiative {}",
            combatant.name, combatant.kind, combatant.initiative
        );
        self.combatants.push(combatant);
        self.resort();
        Ok(id)
    }

    /// Remove a combatant from the encounter
    ///
    /// Removing the active combatant passes the turn to whoever was next in
    /// order, wrapping to the top of the list.
    pub fn remove(&mut self, id: Uuid) -> Result<Combatant, CombatError> {
        let index = self
            .combatants
            .iter()
            .position(|c| c.id == id)
            .ok_or(CombatError::NotFound(id))?;

        let removed = self.combatants.remove(index);

        if removed.is_active && !self.combatants.is_empty() {
            let next = index % self.combatants.len();
            self.combatants[next].is_active = true;
        }
        if self.combatants.is_empty() {
            self.is_in_combat = false;
        }

        debug!("Removed {} from combat", removed.name);
        Ok(removed)
    }

    /// Pass the turn to the next combatant still standing
    ///
    /// Returns the new active combatant's id, or `None` when nobody else can
    /// act. Wrapping back to the top of the order starts a new round.
    pub fn next_turn(&mut self) -> Option<Uuid> {
        let len = self.combatants.len();
        if len == 0 {
            return None;
        }

        let Some(current) = self.active_index() else {
            return self.activate_first_standing();
        };

        let mut candidate = (current + 1) % len;
        while candidate != current {
            if !self.combatants[candidate].is_defeated() {
                break;
            }
            candidate = (candidate + 1) % len;
        }

        if candidate == current {
            debug!("No other combatant can act; turn unchanged");
            return None;
        }

        self.combatants[current].is_active = false;
        self.combatants[candidate].is_active = true;

        if candidate == 0 && current != 0 {
            self.round = self.round.saturating_add(1);
            info!("Round {} begins", self.round);
        }

        Some(self.combatants[candidate].id)
    }

    /// Hand the turn back to the previous combatant still standing
    ///
    /// Stepping back past the top of the order returns to the previous
    /// round, never below round 1.
    pub fn previous_turn(&mut self) -> Option<Uuid> {
        let len = self.combatants.len();
        if len == 0 {
            return None;
        }

        let Some(current) = self.active_index() else {
            return self.activate_first_standing();
        };

        let mut candidate = (current + len - 1) % len;
        while candidate != current {
            if !self.combatants[candidate].is_defeated() {
                break;
            }
            candidate = (candidate + len - 1) % len;
        }

        if candidate == current {
            debug!("No other combatant can act; turn unchanged");
            return None;
        }

        self.combatants[current].is_active = false;
        self.combatants[candidate].is_active = true;

        if current == 0 && candidate != 0 && self.round > 1 {
            self.round -= 1;
            info!("Back to round {}", self.round);
        }

        Some(self.combatants[candidate].id)
    }

    fn activate_first_standing(&mut self) -> Option<Uuid> {
        let first = self.combatants.iter().position(|c| !c.is_defeated())?;
        self.combatants[first].is_active = true;
        self.is_in_combat = true;
        Some(self.combatants[first].id)
    }

    /// Roll a fresh initiative for one combatant and re-sort
    pub fn roll_initiative<R: Rng + ?Sized>(
        &mut self,
        id: Uuid,
        rng: &mut R,
    ) -> Result<i32, CombatError> {
        let combatant = self.find_mut(id)?;
        let roll = roll_initiative_with(rng, combatant.dex_modifier.unwrap_or(0));
        combatant.initiative = roll.total;
        debug!(
            "{} rolled initiative {} ({} {:+})",
            combatant.name, roll.total, roll.roll, roll.modifier
        );
        self.resort();
        Ok(roll.total)
    }

    /// Roll initiative for everyone and re-sort
    ///
    /// The active combatant keeps the turn; if nobody was active the new
    /// top of the order is activated.
    pub fn roll_all_initiative<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for combatant in &mut self.combatants {
            combatant.initiative =
                roll_initiative_with(rng, combatant.dex_modifier.unwrap_or(0)).total;
        }
        self.resort();

        if self.active_index().is_none() {
            if let Some(first) = self.combatants.first_mut() {
                first.is_active = true;
                self.is_in_combat = true;
            }
        }
        info!("Rolled initiative for {} combatants", self.combatants.len());
    }

    /// Set initiative by hand
    ///
    /// Accepts -10..=50 and rounds to the nearest integer. Anything else is
    /// rejected and the encounter is left unchanged.
    pub fn set_initiative(&mut self, id: Uuid, value: f64) -> Result<i32, CombatError> {
        if !value.is_finite() || !(MIN_MANUAL_INITIATIVE..=MAX_MANUAL_INITIATIVE).contains(&value)
        {
            warn!("Rejected initiative {} for combatant {}", value, id);
            return Err(CombatError::InitiativeOutOfRange(value));
        }
        let initiative = value.round() as i32;
        self.find_mut(id)?.initiative = initiative;
        self.resort();
        Ok(initiative)
    }

    /// Set current HP, clamped to 0..=max_hp
    pub fn set_hp(&mut self, id: Uuid, hp: i64) -> Result<u32, CombatError> {
        let combatant = self.find_mut(id)?;
        combatant.set_hp(hp);
        if combatant.is_defeated() {
            info!("{} is down", combatant.name);
        }
        Ok(combatant.current_hp)
    }

    /// Subtract HP (never below 0)
    pub fn apply_damage(&mut self, id: Uuid, amount: u32) -> Result<u32, CombatError> {
        let current = self.find_mut(id)?.current_hp as i64;
        self.set_hp(id, current - amount as i64)
    }

    /// Restore HP (never above max)
    pub fn heal(&mut self, id: Uuid, amount: u32) -> Result<u32, CombatError> {
        let current = self.find_mut(id)?.current_hp as i64;
        self.set_hp(id, current + amount as i64)
    }

    /// Toggle a condition; returns whether it is now set
    pub fn toggle_condition(&mut self, id: Uuid, condition: Condition) -> Result<bool, CombatError> {
        let combatant = self.find_mut(id)?;
        Ok(toggle_condition(&mut combatant.conditions, condition))
    }

    /// Replace a combatant's notes; blank text clears them
    pub fn set_notes(&mut self, id: Uuid, notes: Option<String>) -> Result<(), CombatError> {
        let combatant = self.find_mut(id)?;
        let mut next = combatant.clone();
        next.notes = notes.filter(|n| !n.trim().is_empty());
        next.validate()?;
        *combatant = next;
        Ok(())
    }

    /// End the encounter: no combatants, round 1
    pub fn clear(&mut self) {
        *self = Self::default();
        info!("Combat cleared");
    }
}
