//! initrack - command-line combat tracker

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use initrack::dice::roll_notation;
use initrack::entities::{
    Character, CharacterUpdate, Combatant, Condition, Monster, MonsterSize, MonsterType,
    NewCharacter, NewMonster,
};
use initrack::persist::{default_export_name, export_to_file, import_file};
use initrack::store::GameStore;
use initrack::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initiative and combat tracker
#[derive(Parser, Debug)]
#[command(name = "initrack", version, about = "Track initiative, HP and conditions at the table")]
struct Cli {
    /// Config file (defaults to ./initrack.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll dice, e.g. `roll 2d6+3`
    Roll { notation: String },

    /// Manage the character roster
    #[command(subcommand)]
    Character(CharacterCommand),

    /// Browse and manage monsters
    #[command(subcommand)]
    Monster(MonsterCommand),

    /// Run the encounter
    #[command(subcommand)]
    Combat(CombatCommand),

    /// Export roster and encounter to a JSON file
    Export {
        /// Output path (defaults to initrack-export-<date>.json)
        path: Option<PathBuf>,
    },

    /// Replace roster and encounter from an export file
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum CharacterCommand {
    Add(CharacterArgs),
    List,
    Show {
        who: String,
    },
    Update {
        who: String,
        #[command(flatten)]
        changes: CharacterChanges,
    },
    Remove {
        who: String,
    },
    /// Toggle a condition on a character
    Condition {
        who: String,
        condition: Condition,
    },
}

#[derive(Args, Debug)]
struct CharacterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    class: String,
    #[arg(long, default_value_t = 1)]
    level: u32,
    #[arg(long)]
    max_hp: u32,
    #[arg(long)]
    current_hp: Option<u32>,
    #[arg(long = "ac")]
    armor_class: u32,
    #[arg(long = "dex", default_value_t = 0, allow_negative_numbers = true)]
    dex_modifier: i32,
}

#[derive(Args, Debug)]
struct CharacterChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    class: Option<String>,
    #[arg(long)]
    level: Option<u32>,
    #[arg(long)]
    max_hp: Option<u32>,
    #[arg(long)]
    current_hp: Option<u32>,
    #[arg(long = "ac")]
    armor_class: Option<u32>,
    #[arg(long = "dex", allow_negative_numbers = true)]
    dex_modifier: Option<i32>,
}

#[derive(Subcommand, Debug)]
enum MonsterCommand {
    List,
    Show {
        what: String,
    },
    /// Add a custom monster
    Add(MonsterArgs),
    /// Remove a custom monster
    Remove {
        what: String,
    },
}

#[derive(Args, Debug)]
struct MonsterArgs {
    #[arg(long)]
    name: String,
    #[arg(long = "type")]
    kind: MonsterType,
    #[arg(long = "ac")]
    armor_class: u32,
    #[arg(long = "hp")]
    hit_points: u32,
    /// Attack damage notation, e.g. 1d6+2
    #[arg(long)]
    damage: String,
    #[arg(long = "cr", default_value_t = 0.0)]
    challenge_rating: f64,
    #[arg(long, default_value_t = MonsterSize::Medium)]
    size: MonsterSize,
    #[arg(long, default_value_t = 30)]
    speed: u32,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CombatCommand {
    Show,
    AddCharacter {
        who: String,
        /// Fixed initiative; rolled when omitted
        #[arg(long, allow_negative_numbers = true)]
        initiative: Option<i32>,
    },
    AddMonster {
        what: String,
        #[arg(long, allow_negative_numbers = true)]
        initiative: Option<i32>,
        /// Number of copies to add
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    Remove {
        who: String,
    },
    Next,
    Prev,
    /// Roll initiative for one combatant, or everyone
    Roll {
        who: Option<String>,
    },
    /// Set initiative by hand (-10 to 50)
    Init {
        who: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    Hp {
        who: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Deal damage: a number or dice notation
    Damage {
        who: String,
        amount: String,
    },
    /// Heal: a number or dice notation
    Heal {
        who: String,
        amount: String,
    },
    Condition {
        who: String,
        condition: Condition,
    },
    /// Set notes; omit the text to clear them
    Notes {
        who: String,
        text: Option<String>,
    },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(
            config
                .log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!config.log_json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    if let Command::Roll { notation } = &cli.command {
        let result = roll_notation(notation)?;
        println!("{}", result);
        return Ok(());
    }

    let mut store = config.open_store().context("Failed to open game state")?;

    match cli.command {
        Command::Roll { .. } => {}
        Command::Character(cmd) => character_command(&mut store, cmd)?,
        Command::Monster(cmd) => monster_command(&mut store, cmd)?,
        Command::Combat(cmd) => combat_command(&mut store, cmd)?,
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(default_export_name(Utc::now())));
            export_to_file(&store.export(), &path)
                .await
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Command::Import { path } => {
            let data = import_file(&path, config.max_import_bytes).await?;
            let (characters, combatants) = (data.data.characters.len(), data.data.combatants.len());
            store.apply_import(data)?;
            println!(
                "Imported {} characters and {} combatants",
                characters, combatants
            );
        }
    }

    Ok(())
}

fn character_command(store: &mut GameStore, cmd: CharacterCommand) -> Result<()> {
    match cmd {
        CharacterCommand::Add(args) => {
            let character = store.add_character(NewCharacter {
                name: args.name,
                class: args.class,
                level: args.level,
                max_hp: args.max_hp,
                current_hp: args.current_hp,
                armor_class: args.armor_class,
                dex_modifier: args.dex_modifier,
                avatar_seed: None,
            })?;
            println!("Added {} ({})", character.name, short_id(character.id));
        }
        CharacterCommand::List => {
            if store.characters().is_empty() {
                println!("No characters yet");
            }
            for c in store.characters() {
                println!("{}", character_line(c));
            }
        }
        CharacterCommand::Show { who } => {
            let c = find_character(store, &who)?;
            println!("{}", character_line(c));
            println!("  id: {}", c.id);
            for condition in &c.conditions {
                let info = condition.info();
                println!("  {}: {}", info.name, info.effect);
            }
        }
        CharacterCommand::Update { who, changes } => {
            let id = find_character(store, &who)?.id;
            let c = store.update_character(
                id,
                CharacterUpdate {
                    name: changes.name,
                    class: changes.class,
                    level: changes.level,
                    max_hp: changes.max_hp,
                    current_hp: changes.current_hp,
                    armor_class: changes.armor_class,
                    dex_modifier: changes.dex_modifier,
                    avatar_seed: None,
                },
            )?;
            println!("{}", character_line(&c));
        }
        CharacterCommand::Remove { who } => {
            let id = find_character(store, &who)?.id;
            let removed = store.remove_character(id)?;
            println!("Removed {}", removed.name);
        }
        CharacterCommand::Condition { who, condition } => {
            let id = find_character(store, &who)?.id;
            let set = store.toggle_character_condition(id, condition)?;
            println!("{} {}", condition, if set { "applied" } else { "removed" });
        }
    }
    Ok(())
}

fn monster_command(store: &mut GameStore, cmd: MonsterCommand) -> Result<()> {
    match cmd {
        MonsterCommand::List => {
            for m in store.all_monsters() {
                println!(
                    "{:<22} {:<12} CR {:<4} AC {:<3} HP {}",
                    m.name,
                    m.kind,
                    m.challenge_display(),
                    m.armor_class,
                    m.hit_points
                );
            }
        }
        MonsterCommand::Show { what } => {
            let m = find_monster(store, &what)?;
            println!(
                "{} ({} {}, CR {})",
                m.name,
                m.size,
                m.kind,
                m.challenge_display()
            );
            println!(
                "  AC {}  HP {}  Speed {} ft.  Damage {}",
                m.armor_class, m.hit_points, m.speed, m.damage
            );
            if let Some(description) = &m.description {
                println!("  {}", description);
            }
            for ability in &m.abilities {
                println!("  {}: {}", ability.name, ability.description);
            }
        }
        MonsterCommand::Add(args) => {
            let monster = store.add_custom_monster(NewMonster {
                name: args.name,
                kind: args.kind,
                armor_class: args.armor_class,
                hit_points: args.hit_points,
                damage: args.damage,
                abilities: Vec::new(),
                challenge_rating: args.challenge_rating,
                size: args.size,
                speed: args.speed,
                description: args.description,
            })?;
            println!("Added {} ({})", monster.name, short_id(monster.id));
        }
        MonsterCommand::Remove { what } => {
            let id = find_monster(store, &what)?.id;
            let removed = store.remove_custom_monster(id)?;
            println!("Removed {}", removed.name);
        }
    }
    Ok(())
}

fn combat_command(store: &mut GameStore, cmd: CombatCommand) -> Result<()> {
    match cmd {
        CombatCommand::Show => print_combat(store),
        CombatCommand::AddCharacter { who, initiative } => {
            let id = find_character(store, &who)?.id;
            store.add_character_to_combat(id, initiative)?;
            print_combat(store);
        }
        CombatCommand::AddMonster {
            what,
            initiative,
            count,
        } => {
            let id = find_monster(store, &what)?.id;
            for _ in 0..count {
                store.add_monster_to_combat(id, initiative)?;
            }
            print_combat(store);
        }
        CombatCommand::Remove { who } => {
            let id = find_combatant(store, &who)?.id;
            store.remove_combatant(id)?;
            print_combat(store);
        }
        CombatCommand::Next => {
            if store.next_turn().is_none() {
                println!("Nobody else can act");
            }
            print_combat(store);
        }
        CombatCommand::Prev => {
            if store.previous_turn().is_none() {
                println!("Nobody else can act");
            }
            print_combat(store);
        }
        CombatCommand::Roll { who } => {
            match who {
                Some(who) => {
                    let id = find_combatant(store, &who)?.id;
                    store.roll_initiative(id)?;
                }
                None => store.roll_all_initiative(),
            }
            print_combat(store);
        }
        CombatCommand::Init { who, value } => {
            let id = find_combatant(store, &who)?.id;
            store.set_initiative(id, value)?;
            print_combat(store);
        }
        CombatCommand::Hp { who, value } => {
            let id = find_combatant(store, &who)?.id;
            store.set_hp(id, value)?;
            print_combat(store);
        }
        CombatCommand::Damage { who, amount } => {
            let id = find_combatant(store, &who)?.id;
            let amount = parse_amount(&amount)?;
            store.apply_damage(id, amount)?;
            print_combat(store);
        }
        CombatCommand::Heal { who, amount } => {
            let id = find_combatant(store, &who)?.id;
            let amount = parse_amount(&amount)?;
            store.heal(id, amount)?;
            print_combat(store);
        }
        CombatCommand::Condition { who, condition } => {
            let id = find_combatant(store, &who)?.id;
            let set = store.toggle_combatant_condition(id, condition)?;
            println!("{} {}", condition, if set { "applied" } else { "removed" });
        }
        CombatCommand::Notes { who, text } => {
            let id = find_combatant(store, &who)?.id;
            store.set_notes(id, text)?;
        }
        CombatCommand::Clear => {
            store.clear_combat();
            println!("Combat cleared");
        }
    }
    Ok(())
}

/// A plain number, or dice notation rolled on the spot
fn parse_amount(amount: &str) -> Result<u32> {
    if let Ok(n) = amount.trim().parse::<u32>() {
        return Ok(n);
    }
    let result = roll_notation(amount)
        .with_context(|| format!("'{}' is neither a number nor dice notation", amount))?;
    println!("{}", result);
    Ok(result.total.max(0) as u32)
}

fn print_combat(store: &GameStore) {
    let combat = store.combat();
    if combat.is_empty() {
        println!("No combatants");
        return;
    }
    println!(
        "Round {}{}",
        combat.round(),
        if combat.is_in_combat() { "" } else { " (not started)" }
    );
    for c in combat.combatants() {
        println!("{}", combatant_line(c));
    }
}

fn combatant_line(c: &Combatant) -> String {
    let marker = if c.is_active { ">" } else { " " };
    let status = if c.is_defeated() {
        " defeated"
    } else if c.is_bloodied() {
        " bloodied"
    } else {
        ""
    };
    let conditions: Vec<String> = c.conditions.iter().map(|cond| cond.to_string()).collect();
    let mut line = format!(
        "{} {:>3}  {:<20} HP {:>3}/{:<3} AC {:<2}{}",
        marker, c.initiative, c.name, c.current_hp, c.max_hp, c.armor_class, status
    );
    if !conditions.is_empty() {
        line.push_str(&format!(" [{}]", conditions.join(", ")));
    }
    if let Some(notes) = &c.notes {
        line.push_str(&format!(" - {}", notes));
    }
    line
}

fn character_line(c: &Character) -> String {
    format!(
        "{:<20} {} {:<2}  HP {}/{}  AC {}  DEX {:+}",
        c.name, c.class, c.level, c.current_hp, c.max_hp, c.armor_class, c.dex_modifier
    )
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Resolve a user query: full id, exact name (case-insensitive), or an id
/// prefix of at least 4 characters
fn resolve<'a, T>(
    items: &'a [T],
    query: &str,
    kind: &str,
    id_of: impl Fn(&T) -> Uuid,
    name_of: impl Fn(&T) -> &str,
) -> Result<&'a T> {
    let query = query.trim();
    if let Ok(id) = query.parse::<Uuid>() {
        return items
            .iter()
            .find(|&item| id_of(item) == id)
            .ok_or_else(|| anyhow!("No {} with id {}", kind, id));
    }

    let by_name: Vec<&T> = items
        .iter()
        .filter(|&item| name_of(item).eq_ignore_ascii_case(query))
        .collect();
    if let [item] = by_name.as_slice() {
        return Ok(*item);
    }
    if by_name.len() > 1 {
        bail!("'{}' matches several {}s; use the id", query, kind);
    }

    if query.len() >= 4 {
        let lowered = query.to_lowercase();
        let by_prefix: Vec<&T> = items
            .iter()
            .filter(|&item| id_of(item).to_string().starts_with(&lowered))
            .collect();
        match by_prefix.as_slice() {
            [item] => return Ok(*item),
            [] => {}
            _ => bail!("'{}' matches several {}s; use more of the id", query, kind),
        }
    }

    bail!("No {} matches '{}'", kind, query)
}

fn find_character<'a>(store: &'a GameStore, query: &str) -> Result<&'a Character> {
    resolve(store.characters(), query, "character", |c| c.id, |c| c.name.as_str())
}

fn find_combatant<'a>(store: &'a GameStore, query: &str) -> Result<&'a Combatant> {
    resolve(store.combat().combatants(), query, "combatant", |c| c.id, |c| c.name.as_str())
}

fn find_monster(store: &GameStore, query: &str) -> Result<Monster> {
    let monsters = store.all_monsters();
    resolve(&monsters, query, "monster", |m| m.id, |m| m.name.as_str()).cloned()
}
