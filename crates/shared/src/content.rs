//! Static content tables: characters, weapons, perks, enemy types, wave
//! scaling and the day/night cycle. Loaded once before any trial runs and
//! shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{CycleDurations, WaveScaling, DEFAULT_CHARACTER, DEFAULT_WEAPON};
use crate::stat::{Category, PerkEffect};

const BUILTIN_CHARACTERS: &str = include_str!("../data/characters.json");
const BUILTIN_WEAPONS: &str = include_str!("../data/weapons.json");
const BUILTIN_PERKS: &str = include_str!("../data/perks.json");
const BUILTIN_ENEMIES: &str = include_str!("../data/enemies.json");
const BUILTIN_WAVE_SCALING: &str = include_str!("../data/wave_scaling.json");
const BUILTIN_CYCLE: &str = include_str!("../data/cycle.json");

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid content: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub id: String,
    pub max_hp: f64,
    pub move_speed: f64,
    #[serde(default)]
    pub armor: f64,
    #[serde(default)]
    pub regen: f64,
    #[serde(default)]
    pub crit_chance: f64,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f64,
    #[serde(default)]
    pub dodge: f64,
    #[serde(default = "default_weapon_id")]
    pub weapon_id: String,
}

fn default_crit_multiplier() -> f64 {
    1.5
}

fn default_weapon_id() -> String {
    DEFAULT_WEAPON.to_string()
}

impl Default for CharacterDef {
    fn default() -> Self {
        Self {
            id: DEFAULT_CHARACTER.to_string(),
            max_hp: 130.0,
            move_speed: 5.0,
            armor: 5.0,
            regen: 1.2,
            crit_chance: 0.05,
            crit_multiplier: default_crit_multiplier(),
            dodge: 0.0,
            weapon_id: default_weapon_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDef {
    pub id: String,
    pub damage: f64,
    pub attack_speed: f64,
    #[serde(default = "one")]
    pub projectiles: f64,
    #[serde(default)]
    pub pierce: f64,
    #[serde(default)]
    pub range: f64,
}

fn one() -> f64 {
    1.0
}

impl Default for WeaponDef {
    fn default() -> Self {
        Self {
            id: DEFAULT_WEAPON.to_string(),
            damage: 18.0,
            attack_speed: 1.6,
            projectiles: 1.0,
            pierce: 0.0,
            range: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    /// Offer weight used when a perk does not declare its own.
    pub fn default_weight(self) -> f64 {
        match self {
            Rarity::Common => 10.0,
            Rarity::Uncommon => 5.0,
            Rarity::Rare => 2.0,
        }
    }

    pub fn score_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.2,
            Rarity::Rare => 1.5,
        }
    }
}

fn default_max_stacks() -> u32 {
    1
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerkDef {
    pub id: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    /// Characters allowed to roll this perk; empty means everyone.
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub effects: Vec<PerkEffect>,
}

impl PerkDef {
    pub fn offer_weight(&self) -> f64 {
        self.weight.unwrap_or_else(|| self.rarity.default_weight()).max(0.0)
    }

    pub fn allows_character(&self, character_id: &str) -> bool {
        self.characters.is_empty() || self.characters.iter().any(|c| c == character_id)
    }

    pub fn count_category(&self, category: Category) -> usize {
        self.effects
            .iter()
            .filter(|e| e.category() == Some(category))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDef {
    pub id: String,
    pub hp: f64,
    pub damage: f64,
    pub speed: f64,
    #[serde(default = "one")]
    pub range: f64,
    #[serde(default = "one")]
    pub attack_cooldown: f64,
    #[serde(default)]
    pub xp: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default = "one")]
    pub spawn_weight: f64,
    #[serde(default)]
    pub unlock_minute: f64,
    #[serde(default)]
    pub night_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentTables {
    pub characters: BTreeMap<String, CharacterDef>,
    pub weapons: BTreeMap<String, WeaponDef>,
    /// File order is kept: it is the tie-break order for perk selection.
    pub perks: Vec<PerkDef>,
    pub enemies: Vec<EnemyDef>,
    pub wave_scaling: WaveScaling,
    pub cycle: CycleDurations,
}

fn parse<T: DeserializeOwned>(text: &str, path: &str) -> Result<T, ContentError> {
    serde_json::from_str(text).map_err(|source| ContentError::Parse {
        path: path.to_string(),
        source,
    })
}

fn keyed<T, F: Fn(&T) -> String>(items: Vec<T>, key: F) -> BTreeMap<String, T> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

impl ContentTables {
    /// Tables compiled into the binary.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::assemble([
            (BUILTIN_CHARACTERS, "<builtin>/characters.json"),
            (BUILTIN_WEAPONS, "<builtin>/weapons.json"),
            (BUILTIN_PERKS, "<builtin>/perks.json"),
            (BUILTIN_ENEMIES, "<builtin>/enemies.json"),
            (BUILTIN_WAVE_SCALING, "<builtin>/wave_scaling.json"),
            (BUILTIN_CYCLE, "<builtin>/cycle.json"),
        ])
    }

    /// Load every table present in `dir`; a missing file falls back to the
    /// built-in table, a malformed one aborts the load.
    pub fn load_dir(dir: &Path) -> Result<Self, ContentError> {
        let read = |name: &str, builtin: &'static str| -> Result<(String, String), ContentError> {
            let path = dir.join(name);
            let shown = path.display().to_string();
            if !path.exists() {
                info!(file = %shown, "content file missing, using built-in table");
                return Ok((builtin.to_string(), format!("<builtin>/{}", name)));
            }
            let text = std::fs::read_to_string(&path).map_err(|source| ContentError::Io {
                path: shown.clone(),
                source,
            })?;
            Ok((text, shown))
        };

        let sources = [
            read("characters.json", BUILTIN_CHARACTERS)?,
            read("weapons.json", BUILTIN_WEAPONS)?,
            read("perks.json", BUILTIN_PERKS)?,
            read("enemies.json", BUILTIN_ENEMIES)?,
            read("wave_scaling.json", BUILTIN_WAVE_SCALING)?,
            read("cycle.json", BUILTIN_CYCLE)?,
        ];
        let tables = Self::assemble(
            sources
                .each_ref()
                .map(|(text, origin)| (text.as_str(), origin.as_str())),
        )?;
        info!(
            dir = %dir.display(),
            characters = tables.characters.len(),
            weapons = tables.weapons.len(),
            perks = tables.perks.len(),
            enemies = tables.enemies.len(),
            "content tables loaded"
        );
        Ok(tables)
    }

    /// Parses the six tables, in order characters, weapons, perks, enemies,
    /// wave scaling, cycle. Each entry is `(json, origin)`.
    fn assemble(sources: [(&str, &str); 6]) -> Result<Self, ContentError> {
        let [characters, weapons, perks, enemies, wave, cycle] = sources;
        let tables = Self {
            characters: keyed(parse::<Vec<CharacterDef>>(characters.0, characters.1)?, |c| {
                c.id.clone()
            }),
            weapons: keyed(parse::<Vec<WeaponDef>>(weapons.0, weapons.1)?, |w| w.id.clone()),
            perks: parse(perks.0, perks.1)?,
            enemies: parse(enemies.0, enemies.1)?,
            wave_scaling: parse(wave.0, wave.1)?,
            cycle: parse(cycle.0, cycle.1)?,
        };
        tables.validate()?;
        Ok(tables)
    }

    fn validate(&self) -> Result<(), ContentError> {
        if self.enemies.is_empty() {
            return Err(ContentError::Invalid("no enemy types defined".to_string()));
        }
        if !(self.cycle.total() > 0.0) {
            return Err(ContentError::Invalid("day/night cycle has zero length".to_string()));
        }
        Ok(())
    }

    pub fn character(&self, id: &str) -> Option<&CharacterDef> {
        self.characters.get(id)
    }

    /// The named character, else the default character, else hard defaults.
    pub fn character_or_default(&self, id: &str) -> CharacterDef {
        self.characters
            .get(id)
            .or_else(|| self.characters.get(DEFAULT_CHARACTER))
            .cloned()
            .unwrap_or_default()
    }

    pub fn weapon_or_default(&self, id: &str) -> WeaponDef {
        self.weapons
            .get(id)
            .or_else(|| self.weapons.get(DEFAULT_WEAPON))
            .cloned()
            .unwrap_or_default()
    }

    pub fn perk(&self, id: &str) -> Option<&PerkDef> {
        self.perks.iter().find(|p| p.id == id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyDef> {
        self.enemies.iter().find(|e| e.id == id)
    }
}
