//! Common test utilities - TrackerTest harness backed by a temp data dir

#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use initrack::entities::{builtin_monsters, Character, Monster, NewCharacter};
use initrack::store::GameStore;
use initrack::Config;
use tempfile::TempDir;

/// A store living in its own temporary data directory
pub struct TrackerTest {
    pub dir: TempDir,
    pub config: Config,
    pub store: GameStore,
}

impl TrackerTest {
    pub fn start() -> Result<Self> {
        let dir = TempDir::new()?;
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };
        let store = config.open_store()?;
        Ok(Self { dir, config, store })
    }

    /// Drop the in-memory store and load it again from disk
    pub fn reopen(&mut self) -> Result<()> {
        self.store = self.config.open_store()?;
        Ok(())
    }

    /// Path of the persisted state file
    pub fn state_file(&self) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.json", self.config.storage_key))
    }

    /// Path inside the temp dir, for export/import files
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn add_hero(&mut self, name: &str, max_hp: u32, dex: i32) -> Character {
        self.store
            .add_character(hero(name, max_hp, dex))
            .expect("Failed to add character")
    }
}

pub fn hero(name: &str, max_hp: u32, dex: i32) -> NewCharacter {
    NewCharacter {
        name: name.to_string(),
        class: "Fighter".to_string(),
        level: 3,
        max_hp,
        current_hp: None,
        armor_class: 16,
        dex_modifier: dex,
        avatar_seed: None,
    }
}

pub fn monster(name: &str) -> Monster {
    builtin_monsters()
        .into_iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("no built-in monster named {}", name))
}

/// Combatant names in turn order
pub fn turn_order(store: &GameStore) -> Vec<String> {
    store
        .combat()
        .combatants()
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

pub fn active_name(store: &GameStore) -> Option<String> {
    store.combat().active().map(|c| c.name.clone())
}
