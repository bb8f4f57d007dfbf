//! Per-trial player state: base stats from the character and weapon,
//! perk modifiers, complex-effect accumulators and leveling.

use std::collections::BTreeMap;

use nightfall_shared::content::{CharacterDef, PerkDef, WeaponDef};
use nightfall_shared::stat::{ComplexKind, ModifierMode, PerkEffect, StatKind};

const STAT_COUNT: usize = 10;
const PIERCE_BONUS: f64 = 0.3;
const RICOCHET_BONUS: f64 = 0.5;
const MAX_DODGE: f64 = 0.75;
const MAX_EXECUTION: f64 = 0.9;
const SECOND_WIND_HP_FRACTION: f64 = 0.5;
const MIN_MAX_HP: f64 = 1.0;

const XP_BASE: f64 = 20.0;
const XP_EXPONENT: f64 = 1.35;
const EARLY_LEVELS: u32 = 5;
const EARLY_MULT_START: f64 = 1.65;
const EARLY_MULT_END: f64 = 1.20;

fn slot(stat: &StatKind) -> Option<usize> {
    match stat {
        StatKind::Damage => Some(0),
        StatKind::AttackSpeed => Some(1),
        StatKind::MoveSpeed => Some(2),
        StatKind::MaxHp => Some(3),
        StatKind::Regen => Some(4),
        StatKind::Armor => Some(5),
        StatKind::Projectiles => Some(6),
        StatKind::Pierce => Some(7),
        StatKind::CritChance => Some(8),
        StatKind::CritMultiplier => Some(9),
        StatKind::Unknown(_) => None,
    }
}

/// XP curve before the early-game multiplier.
pub fn xp_base(level: u32) -> f64 {
    XP_BASE * (level.max(1) as f64).powf(XP_EXPONENT)
}

/// Multiplier on the first levels, 1.65 at level 1 down to 1.20 at level 5.
pub fn early_game_multiplier(level: u32) -> f64 {
    let level = level.max(1);
    if level > EARLY_LEVELS {
        return 1.0;
    }
    let t = (level - 1) as f64 / (EARLY_LEVELS - 1) as f64;
    EARLY_MULT_START + (EARLY_MULT_END - EARLY_MULT_START) * t
}

/// XP needed to go from `level` to `level + 1`.
pub fn xp_to_next(level: u32) -> f64 {
    xp_base(level) * early_game_multiplier(level)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub vampirism: f64,
    pub thorns: f64,
    pub execution: f64,
    pub dodge: f64,
    pub ignite_chance: f64,
    pub ignite_damage: f64,
    pub ricochet: f64,
    pub kill_speed_per_stack: f64,
    pub kill_speed_duration: f64,
    pub kill_speed_cap: u32,
    pub second_winds: u32,
}

#[derive(Debug, Clone)]
pub struct SimPlayer {
    base: [f64; STAT_COUNT],
    additive: [f64; STAT_COUNT],
    multiplier: [f64; STAT_COUNT],
    base_dodge: f64,
    pub effects: Effects,
    pub hp: f64,
    pub level: u32,
    pub xp: f64,
    pending_level_ups: u32,
    kill_stacks: u32,
    kill_timer: f64,
    perk_stacks: BTreeMap<String, u32>,
    pub perks_picked: Vec<String>,
}

impl SimPlayer {
    pub fn new(character: &CharacterDef, weapon: &WeaponDef) -> Self {
        let mut base = [0.0; STAT_COUNT];
        base[0] = weapon.damage;
        base[1] = weapon.attack_speed;
        base[2] = character.move_speed;
        base[3] = character.max_hp.max(MIN_MAX_HP);
        base[4] = character.regen;
        base[5] = character.armor;
        base[6] = weapon.projectiles;
        base[7] = weapon.pierce;
        base[8] = character.crit_chance;
        base[9] = character.crit_multiplier;
        Self {
            base,
            additive: [0.0; STAT_COUNT],
            multiplier: [1.0; STAT_COUNT],
            base_dodge: character.dodge,
            effects: Effects::default(),
            hp: base[3],
            level: 1,
            xp: 0.0,
            pending_level_ups: 0,
            kill_stacks: 0,
            kill_timer: 0.0,
            perk_stacks: BTreeMap::new(),
            perks_picked: Vec::new(),
        }
    }

    /// `(base + additive) * multiplier`; unknown stats read as 0.
    pub fn stat(&self, stat: &StatKind) -> f64 {
        match slot(stat) {
            Some(i) => (self.base[i] + self.additive[i]) * self.multiplier[i],
            None => 0.0,
        }
    }

    pub fn max_hp(&self) -> f64 {
        self.stat(&StatKind::MaxHp).max(MIN_MAX_HP)
    }

    pub fn hp_ratio(&self) -> f64 {
        (self.hp / self.max_hp()).clamp(0.0, 1.0)
    }

    pub fn armor(&self) -> f64 {
        self.stat(&StatKind::Armor).max(0.0)
    }

    pub fn regen(&self) -> f64 {
        self.stat(&StatKind::Regen).max(0.0)
    }

    pub fn dodge(&self) -> f64 {
        (self.base_dodge + self.effects.dodge).clamp(0.0, MAX_DODGE)
    }

    pub fn execution_threshold(&self) -> f64 {
        self.effects.execution.clamp(0.0, MAX_EXECUTION)
    }

    /// Armor turns into a damage multiplier of `100 / (100 + armor)`.
    pub fn armor_multiplier(&self) -> f64 {
        100.0 / (100.0 + self.armor())
    }

    pub fn attack_speed(&self) -> f64 {
        let buff = 1.0 + self.kill_stacks as f64 * self.effects.kill_speed_per_stack;
        self.stat(&StatKind::AttackSpeed).max(0.0) * buff
    }

    /// Expected damage per second of the current build.
    pub fn effective_dps(&self) -> f64 {
        let per_hit = self.stat(&StatKind::Damage).max(0.0);
        let crit_chance = self.stat(&StatKind::CritChance).clamp(0.0, 1.0);
        let crit_mult = self.stat(&StatKind::CritMultiplier);
        let projectiles = self.stat(&StatKind::Projectiles).max(1.0);
        let pierce = self.stat(&StatKind::Pierce).max(0.0);
        let ricochet = self.effects.ricochet.clamp(0.0, 1.0);
        per_hit
            * self.attack_speed()
            * (1.0 + crit_chance * (crit_mult - 1.0))
            * projectiles
            * (1.0 + pierce * PIERCE_BONUS)
            * (1.0 + ricochet * RICOCHET_BONUS)
            + self.effects.ignite_chance * self.effects.ignite_damage
    }

    pub fn apply_stat(&mut self, stat: &StatKind, mode: ModifierMode, value: f64) -> bool {
        let Some(i) = slot(stat) else {
            return false;
        };
        let old_max = self.max_hp();
        match mode {
            ModifierMode::Additive => self.additive[i] += value,
            ModifierMode::Multiplicative => self.multiplier[i] *= value,
        }
        if *stat == StatKind::MaxHp {
            let new_max = self.max_hp();
            self.hp = match mode {
                ModifierMode::Additive => self.hp + (new_max - old_max),
                ModifierMode::Multiplicative => self.hp * new_max / old_max,
            }
            .max(1.0)
            .min(new_max);
        }
        true
    }

    pub fn apply_complex(&mut self, action: &ComplexKind, value: f64, secondary: f64, cap: f64) -> bool {
        let fx = &mut self.effects;
        match action {
            ComplexKind::Vampirism => fx.vampirism += value,
            ComplexKind::Thorns => fx.thorns += value,
            ComplexKind::Execution => fx.execution += value,
            ComplexKind::Dodge => fx.dodge += value,
            ComplexKind::Ignite => {
                fx.ignite_chance += value;
                fx.ignite_damage = fx.ignite_damage.max(secondary);
            }
            ComplexKind::Ricochet => fx.ricochet += value,
            ComplexKind::KillSpeed => {
                fx.kill_speed_per_stack += value;
                fx.kill_speed_duration = fx.kill_speed_duration.max(secondary);
                fx.kill_speed_cap = fx.kill_speed_cap.max(cap.max(1.0) as u32);
            }
            ComplexKind::SecondWind => fx.second_winds += value.max(1.0) as u32,
            ComplexKind::Unknown(_) => return false,
        }
        true
    }

    /// Applies every effect of `perk` and records the pick.
    pub fn apply_perk(&mut self, perk: &PerkDef) {
        for effect in &perk.effects {
            match effect {
                PerkEffect::Stat { stat, mode, value } => {
                    self.apply_stat(stat, *mode, *value);
                }
                PerkEffect::Complex {
                    action,
                    value,
                    secondary,
                    cap,
                } => {
                    self.apply_complex(action, *value, *secondary, *cap);
                }
            }
        }
        *self.perk_stacks.entry(perk.id.clone()).or_insert(0) += 1;
        self.perks_picked.push(perk.id.clone());
    }

    pub fn perk_stacks(&self, perk_id: &str) -> u32 {
        self.perk_stacks.get(perk_id).copied().unwrap_or(0)
    }

    /// Adds XP and resolves as many level-ups as it pays for.
    pub fn add_xp(&mut self, amount: f64) -> u32 {
        if amount > 0.0 {
            self.xp += amount;
        }
        let mut gained = 0;
        loop {
            let needed = xp_to_next(self.level);
            if self.xp < needed {
                break;
            }
            self.xp -= needed;
            self.level += 1;
            gained += 1;
        }
        self.pending_level_ups += gained;
        gained
    }

    pub fn take_pending_level_up(&mut self) -> bool {
        if self.pending_level_ups > 0 {
            self.pending_level_ups -= 1;
            true
        } else {
            false
        }
    }

    pub fn on_kills(&mut self, kills: u64) {
        if kills == 0 || self.effects.kill_speed_per_stack <= 0.0 {
            return;
        }
        let cap = self.effects.kill_speed_cap.max(1);
        let added = kills.min(cap as u64) as u32;
        self.kill_stacks = (self.kill_stacks + added).min(cap);
        self.kill_timer = self.effects.kill_speed_duration;
    }

    pub fn decay_kill_speed(&mut self, dt: f64) {
        if self.kill_stacks == 0 {
            return;
        }
        self.kill_timer -= dt;
        if self.kill_timer <= 0.0 {
            self.kill_timer = 0.0;
            self.kill_stacks = 0;
        }
    }

    pub fn kill_stacks(&self) -> u32 {
        self.kill_stacks
    }

    pub fn heal(&mut self, amount: f64) {
        if amount > 0.0 {
            self.hp = (self.hp + amount).min(self.max_hp());
        }
    }

    /// Consumes a second wind if one is left, restoring half of max HP.
    pub fn try_second_wind(&mut self) -> bool {
        if self.effects.second_winds == 0 {
            return false;
        }
        self.effects.second_winds -= 1;
        self.hp = self.max_hp() * SECOND_WIND_HP_FRACTION;
        true
    }
}
