//! End-to-end encounter scenarios through the game store

mod common;

use common::{active_name, monster, turn_order, TrackerTest};
use initrack::combat::CombatError;
use initrack::entities::Condition;
use initrack::store::StoreError;

#[test]
fn test_full_encounter() {
    let mut t = TrackerTest::start().expect("Failed to start");
    let bram = t.add_hero("Bram", 30, 2);
    let cass = t.add_hero("Cass", 22, 4);
    let goblin = monster("Goblin");

    t.store.add_character_to_combat(bram.id, Some(15)).unwrap();
    t.store.add_character_to_combat(cass.id, Some(19)).unwrap();
    let gob1 = t.store.add_monster_to_combat(goblin.id, Some(12)).unwrap();
    let gob2 = t.store.add_monster_to_combat(goblin.id, Some(8)).unwrap();

    assert_eq!(turn_order(&t.store), vec!["Cass", "Bram", "Goblin", "Goblin 2"]);
    // first to join keeps the turn after re-sorting
    assert_eq!(active_name(&t.store).as_deref(), Some("Bram"));
    assert_eq!(t.store.combat().round(), 1);

    // Bram drops the first goblin
    t.store.apply_damage(gob1, 20).unwrap();
    assert!(t.store.combat().get(gob1).unwrap().is_defeated());

    // defeated goblin is skipped
    t.store.next_turn();
    assert_eq!(active_name(&t.store).as_deref(), Some("Goblin 2"));

    // wrapping to the top starts round 2
    t.store.next_turn();
    assert_eq!(active_name(&t.store).as_deref(), Some("Cass"));
    assert_eq!(t.store.combat().round(), 2);

    // stepping back returns to round 1
    t.store.previous_turn();
    assert_eq!(active_name(&t.store).as_deref(), Some("Goblin 2"));
    assert_eq!(t.store.combat().round(), 1);

    t.store
        .toggle_combatant_condition(gob2, Condition::Frightened)
        .unwrap();
    t.store
        .set_notes(gob2, Some("Fleeing toward the cave".to_string()))
        .unwrap();

    t.reopen().unwrap();
    let survivor = t.store.combat().get(gob2).unwrap();
    assert!(survivor.conditions.contains(&Condition::Frightened));
    assert_eq!(survivor.notes.as_deref(), Some("Fleeing toward the cave"));
    assert_eq!(active_name(&t.store).as_deref(), Some("Goblin 2"));
    assert_eq!(t.store.combat().round(), 1);
}

#[test]
fn test_removing_active_passes_turn() {
    let mut t = TrackerTest::start().unwrap();
    let orc = monster("Orc");
    let first = t.store.add_monster_to_combat(orc.id, Some(20)).unwrap();
    t.store.add_monster_to_combat(orc.id, Some(10)).unwrap();
    t.store.add_monster_to_combat(orc.id, Some(5)).unwrap();

    assert_eq!(active_name(&t.store).as_deref(), Some("Orc"));
    t.store.remove_combatant(first).unwrap();
    assert_eq!(active_name(&t.store).as_deref(), Some("Orc 2"));
    assert_eq!(t.store.combat().combatants().len(), 2);
}

#[test]
fn test_rejections_leave_state_untouched() {
    let mut t = TrackerTest::start().unwrap();
    let wolf = monster("Wolf");
    let id = t.store.add_monster_to_combat(wolf.id, Some(14)).unwrap();
    let before = t.store.combat().clone();

    assert!(matches!(
        t.store.set_initiative(id, -11.0),
        Err(StoreError::Combat(CombatError::InitiativeOutOfRange(_)))
    ));
    assert!(matches!(
        t.store.set_initiative(id, f64::NAN),
        Err(StoreError::Combat(CombatError::InitiativeOutOfRange(_)))
    ));
    assert!(matches!(
        t.store.set_notes(id, Some("x".repeat(501))),
        Err(StoreError::Combat(CombatError::Validation(_)))
    ));
    assert!(matches!(
        t.store.heal(uuid::Uuid::new_v4(), 3),
        Err(StoreError::Combat(CombatError::NotFound(_)))
    ));
    assert_eq!(t.store.combat(), &before);
}

#[test]
fn test_hp_clamps() {
    let mut t = TrackerTest::start().unwrap();
    let ogre = monster("Ogre");
    let id = t.store.add_monster_to_combat(ogre.id, Some(3)).unwrap();
    let max = ogre.hit_points;

    assert_eq!(t.store.apply_damage(id, max + 50).unwrap(), 0);
    assert_eq!(t.store.heal(id, max + 50).unwrap(), max);
    assert_eq!(t.store.set_hp(id, -5).unwrap(), 0);
    assert_eq!(t.store.set_hp(id, 10).unwrap(), 10);
}

#[test]
fn test_roll_all_keeps_everyone_in_range() {
    let mut t = TrackerTest::start().unwrap();
    let hero = t.add_hero("Dara", 20, 3);
    let zombie = monster("Zombie");
    t.store.add_character_to_combat(hero.id, Some(0)).unwrap();
    t.store.add_monster_to_combat(zombie.id, Some(0)).unwrap();

    t.store.roll_all_initiative();

    let combat = t.store.combat();
    let inits: Vec<i32> = combat.combatants().iter().map(|c| c.initiative).collect();
    assert!(inits.windows(2).all(|w| w[0] >= w[1]));
    for c in combat.combatants() {
        let modifier = c.dex_modifier.unwrap_or(0);
        assert!((1 + modifier..=20 + modifier).contains(&c.initiative));
    }
    assert_eq!(combat.combatants().iter().filter(|c| c.is_active).count(), 1);
}

#[test]
fn test_clear_combat() {
    let mut t = TrackerTest::start().unwrap();
    let bandit = monster("Bandit");
    t.store.add_monster_to_combat(bandit.id, Some(11)).unwrap();
    t.store.add_monster_to_combat(bandit.id, Some(9)).unwrap();
    t.store.next_turn();
    t.store.next_turn();
    assert_eq!(t.store.combat().round(), 2);

    t.store.clear_combat();
    t.reopen().unwrap();
    assert!(t.store.combat().is_empty());
    assert_eq!(t.store.combat().round(), 1);
    assert!(!t.store.combat().is_in_combat());
}
