use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

// Fixed simulation timestep
pub const DT: f64 = 0.1;
pub const DEFAULT_MAX_DURATION_SEC: f64 = 1800.0;
pub const DEFAULT_RUNS_PER_CONFIG: u32 = 100;
pub const CONFIG_SEED_STRIDE: u64 = 10_000;

pub const DAY_DURATION: f64 = 120.0;
pub const DUSK_DURATION: f64 = 30.0;
pub const NIGHT_DURATION: f64 = 90.0;
pub const DAWN_DURATION: f64 = 10.0;

pub const BASE_SPAWN_INTERVAL: f64 = 1.8;
pub const SPAWN_DECAY_PER_MINUTE: f64 = 0.06;
pub const MIN_SPAWN_INTERVAL: f64 = 0.25;
pub const HP_SCALING_PER_MINUTE: f64 = 1.05;
pub const DAMAGE_SCALING_PER_MINUTE: f64 = 1.03;
pub const NIGHT_MULTIPLIER: f64 = 1.12;
pub const NIGHT_SPAWN_RATE_MULTIPLIER: f64 = 1.1;
pub const MAX_ENEMIES: u32 = 250;
pub const SPAWN_DISTANCE_MIN: f64 = 14.0;
pub const SPAWN_DISTANCE_MAX: f64 = 22.0;
pub const MELEE_RANGE: f64 = 1.5;

pub const DEFAULT_CHARACTER: &str = "traqueur";
pub const DEFAULT_WEAPON: &str = "makeshift_bow";
pub const DEFAULT_PROFILE: &str = "average";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
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
    #[error("invalid batch config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Day,
    Dusk,
    Night,
    Dawn,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Day => "day",
            Phase::Dusk => "dusk",
            Phase::Night => "night",
            Phase::Dawn => "dawn",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleDurations {
    pub day: f64,
    pub dusk: f64,
    pub night: f64,
    pub dawn: f64,
}

impl Default for CycleDurations {
    fn default() -> Self {
        Self {
            day: DAY_DURATION,
            dusk: DUSK_DURATION,
            night: NIGHT_DURATION,
            dawn: DAWN_DURATION,
        }
    }
}

impl CycleDurations {
    pub fn total(&self) -> f64 {
        self.day + self.dusk + self.night + self.dawn
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveScaling {
    pub base_interval: f64,
    pub decay_per_minute: f64,
    pub min_interval: f64,
    pub hp_scaling_per_minute: f64,
    pub damage_scaling_per_minute: f64,
    pub night_multiplier: f64,
    pub night_spawn_rate_multiplier: f64,
    pub max_enemies: u32,
    pub spawn_distance_min: f64,
    pub spawn_distance_max: f64,
    pub melee_range: f64,
}

impl Default for WaveScaling {
    fn default() -> Self {
        Self {
            base_interval: BASE_SPAWN_INTERVAL,
            decay_per_minute: SPAWN_DECAY_PER_MINUTE,
            min_interval: MIN_SPAWN_INTERVAL,
            hp_scaling_per_minute: HP_SCALING_PER_MINUTE,
            damage_scaling_per_minute: DAMAGE_SCALING_PER_MINUTE,
            night_multiplier: NIGHT_MULTIPLIER,
            night_spawn_rate_multiplier: NIGHT_SPAWN_RATE_MULTIPLIER,
            max_enemies: MAX_ENEMIES,
            spawn_distance_min: SPAWN_DISTANCE_MIN,
            spawn_distance_max: SPAWN_DISTANCE_MAX,
            melee_range: MELEE_RANGE,
        }
    }
}

/// Wave-scaling fields that a run config may override by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingKey {
    BaseInterval,
    DecayPerMinute,
    MinInterval,
    HpScalingPerMinute,
    DamageScalingPerMinute,
    NightMultiplier,
    NightSpawnRateMultiplier,
    MaxEnemies,
}

impl ScalingKey {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "base_interval" => Some(Self::BaseInterval),
            "decay_per_minute" => Some(Self::DecayPerMinute),
            "min_interval" => Some(Self::MinInterval),
            "hp_scaling_per_minute" => Some(Self::HpScalingPerMinute),
            "damage_scaling_per_minute" => Some(Self::DamageScalingPerMinute),
            "night_multiplier" => Some(Self::NightMultiplier),
            "night_spawn_rate_multiplier" => Some(Self::NightSpawnRateMultiplier),
            "max_enemies" => Some(Self::MaxEnemies),
            _ => None,
        }
    }
}

impl WaveScaling {
    pub fn set(&mut self, key: ScalingKey, value: f64) {
        match key {
            ScalingKey::BaseInterval => self.base_interval = value,
            ScalingKey::DecayPerMinute => self.decay_per_minute = value,
            ScalingKey::MinInterval => self.min_interval = value,
            ScalingKey::HpScalingPerMinute => self.hp_scaling_per_minute = value,
            ScalingKey::DamageScalingPerMinute => self.damage_scaling_per_minute = value,
            ScalingKey::NightMultiplier => self.night_multiplier = value,
            ScalingKey::NightSpawnRateMultiplier => self.night_spawn_rate_multiplier = value,
            ScalingKey::MaxEnemies => self.max_enemies = value.max(0.0) as u32,
        }
    }

    /// Copy of `self` with every recognised override applied. Unknown keys are
    /// returned so the caller can report them.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> (WaveScaling, Vec<String>) {
        let mut scaled = self.clone();
        let mut unknown = Vec::new();
        for (name, &value) in overrides {
            match ScalingKey::from_name(name) {
                Some(key) => scaled.set(key, value),
                None => unknown.push(name.clone()),
            }
        }
        (scaled, unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerkStrategyKind {
    Random,
    Survival,
    Damage,
    #[default]
    Balanced,
}

impl PerkStrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PerkStrategyKind::Random => "random",
            PerkStrategyKind::Survival => "survival",
            PerkStrategyKind::Damage => "damage",
            PerkStrategyKind::Balanced => "balanced",
        }
    }
}

impl std::str::FromStr for PerkStrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "survival" => Ok(Self::Survival),
            "damage" => Ok(Self::Damage),
            "balanced" => Ok(Self::Balanced),
            other => Err(ConfigError::Invalid(format!("unknown perk strategy '{}'", other))),
        }
    }
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_character() -> String {
    DEFAULT_CHARACTER.to_string()
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_max_duration() -> f64 {
    DEFAULT_MAX_DURATION_SEC
}

fn default_runs_per_config() -> u32 {
    DEFAULT_RUNS_PER_CONFIG
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub label: String,
    #[serde(default = "default_character")]
    pub character_id: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub perk_strategy: PerkStrategyKind,
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration_sec: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub scaling_overrides: BTreeMap<String, f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            label: "baseline".to_string(),
            character_id: default_character(),
            profile: default_profile(),
            perk_strategy: PerkStrategyKind::default(),
            time_scale: default_time_scale(),
            max_duration_sec: default_max_duration(),
            seed: None,
            scaling_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub name: String,
    #[serde(default = "default_runs_per_config")]
    pub runs_per_config: u32,
    #[serde(default)]
    pub master_seed: u64,
    pub configs: Vec<RunConfig>,
}

impl BatchConfig {
    pub fn from_json(text: &str, path: &str) -> Result<Self, ConfigError> {
        let batch: BatchConfig = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        batch.validate()?;
        Ok(batch)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&text, &display)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.configs.is_empty() {
            return Err(ConfigError::Invalid(format!("batch '{}' has no configs", self.name)));
        }
        if self.runs_per_config == 0 {
            return Err(ConfigError::Invalid("runs_per_config must be at least 1".to_string()));
        }
        for config in &self.configs {
            if !(config.max_duration_sec > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "config '{}': max_duration_sec must be positive",
                    config.label
                )));
            }
            if !(config.time_scale > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "config '{}': time_scale must be positive",
                    config.label
                )));
            }
        }
        Ok(())
    }

    /// Seed of trial `trial_index` of config `config_index`. A per-config seed
    /// replaces the master seed as the base of that config's stream.
    pub fn trial_seed(&self, config_index: usize, trial_index: u32) -> u64 {
        let base = self.configs[config_index].seed.unwrap_or(self.master_seed);
        trial_seed(base, config_index, trial_index)
    }
}

pub fn trial_seed(master_seed: u64, config_index: usize, trial_index: u32) -> u64 {
    master_seed
        .wrapping_add((config_index as u64).wrapping_mul(CONFIG_SEED_STRIDE))
        .wrapping_add(trial_index as u64)
}
