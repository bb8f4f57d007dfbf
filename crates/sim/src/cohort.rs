//! Enemy cohorts: identical enemies tracked as a count plus shared scaled
//! stats, with the HP of the lead enemy carried between ticks.

use nightfall_shared::config::{Phase, WaveScaling};
use nightfall_shared::content::EnemyDef;
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

const DAY_SPAWN_FACTOR: f64 = 0.8;
const DUSK_SPAWN_FACTOR: f64 = 0.65;
const NIGHT_SPAWN_FACTOR: f64 = 0.5;
const MIN_SPEED: f64 = 0.1;
const MIN_ATTACK_COOLDOWN: f64 = 0.05;
const MIN_SPAWN_INTERVAL_FLOOR: f64 = 0.01;
// Arrivals fold into an active cohort of the same type within this relative
// difference of scaled HP and damage.
const MERGE_TOLERANCE: f64 = 0.005;
const MAX_EXECUTION_THRESHOLD: f64 = 0.95;

/// Interval multiplier for a phase; `None` while spawning is paused (dawn).
pub fn phase_spawn_factor(phase: Phase, night_index: u32, night_spawn_rate: f64) -> Option<f64> {
    match phase {
        Phase::Day => Some(DAY_SPAWN_FACTOR),
        Phase::Dusk => Some(DUSK_SPAWN_FACTOR),
        Phase::Night => {
            let compounding = night_spawn_rate.max(f64::MIN_POSITIVE).powi(night_index as i32 - 1);
            Some(NIGHT_SPAWN_FACTOR / compounding)
        }
        Phase::Dawn => None,
    }
}

/// Seconds between spawns, or `None` during dawn.
pub fn spawn_interval(
    scaling: &WaveScaling,
    elapsed_minutes: f64,
    phase: Phase,
    night_index: u32,
) -> Option<f64> {
    let raw = (scaling.base_interval - scaling.decay_per_minute * elapsed_minutes)
        .max(scaling.min_interval);
    phase_spawn_factor(phase, night_index, scaling.night_spawn_rate_multiplier)
        .map(|factor| (raw * factor).max(MIN_SPAWN_INTERVAL_FLOOR))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub hp: f64,
    pub damage: f64,
}

pub fn scale_factors(
    scaling: &WaveScaling,
    elapsed_minutes: f64,
    phase: Phase,
    night_index: u32,
) -> ScaleFactors {
    let mut hp = scaling.hp_scaling_per_minute.powf(elapsed_minutes);
    let mut damage = scaling.damage_scaling_per_minute.powf(elapsed_minutes);
    if phase == Phase::Night {
        let night = scaling.night_multiplier.powi(night_index as i32 - 1);
        hp *= night;
        damage *= night;
    }
    ScaleFactors { hp, damage }
}

/// Weighted pick of an enemy type eligible at this point of the run.
pub fn choose_enemy_type(
    enemies: &[EnemyDef],
    elapsed_minutes: f64,
    phase: Phase,
    rng: &mut impl Rng,
) -> Option<usize> {
    let eligible: Vec<usize> = enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.spawn_weight > 0.0 && e.unlock_minute <= elapsed_minutes)
        .filter(|(_, e)| !e.night_only || phase == Phase::Night)
        .map(|(i, _)| i)
        .collect();
    let dist = WeightedIndex::new(eligible.iter().map(|&i| enemies[i].spawn_weight)).ok()?;
    Some(eligible[dist.sample(rng)])
}

/// Seconds an enemy needs to reach attack range from `distance`.
pub fn approach_time(def: &EnemyDef, distance: f64, melee_range: f64) -> f64 {
    let travel = if def.range > melee_range {
        distance - def.range
    } else {
        distance
    };
    travel.max(0.0) / def.speed.max(MIN_SPEED)
}

#[inline]
fn kill_hp(max_hp: f64, execution_threshold: f64) -> f64 {
    max_hp * (1.0 - execution_threshold.clamp(0.0, MAX_EXECUTION_THRESHOLD))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyCohort {
    pub type_index: usize,
    pub count: u32,
    pub max_hp: f64,
    pub damage: f64,
    pub attack_cooldown: f64,
    pub xp: f64,
    pub score: f64,
    /// Seconds until the cohort is in range; 0 means active.
    pub approach_timer: f64,
    /// Remaining HP of the lead enemy.
    pub current_hp: f64,
}

impl EnemyCohort {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.approach_timer <= 0.0
    }

    #[inline]
    pub fn dps(&self) -> f64 {
        self.count as f64 * self.damage / self.attack_cooldown.max(MIN_ATTACK_COOLDOWN)
    }

    #[inline]
    fn threat(&self) -> f64 {
        self.count as f64 * self.damage
    }

    fn matches(&self, other: &EnemyCohort) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= MERGE_TOLERANCE * a.abs().max(b.abs());
        self.type_index == other.type_index
            && close(self.max_hp, other.max_hp)
            && close(self.damage, other.damage)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageOutcome {
    pub kills: u64,
    pub xp: f64,
    pub score: f64,
    /// Damage that removed HP.
    pub applied: f64,
    /// Damage left over after every active cohort was emptied.
    pub wasted: f64,
}

impl DamageOutcome {
    pub fn merge(&mut self, other: DamageOutcome) {
        self.kills += other.kills;
        self.xp += other.xp;
        self.score += other.score;
        self.applied += other.applied;
        self.wasted += other.wasted;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Horde {
    cohorts: Vec<EnemyCohort>,
    total_spawned: u64,
    refused_spawns: u64,
    peak_enemies: u32,
    latched_dominant: Option<usize>,
}

impl Horde {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cohorts(&self) -> &[EnemyCohort] {
        &self.cohorts
    }

    pub fn active_count(&self) -> u32 {
        self.cohorts.iter().filter(|c| c.is_active()).map(|c| c.count).sum()
    }

    pub fn pending_count(&self) -> u32 {
        self.cohorts.iter().filter(|c| !c.is_active()).map(|c| c.count).sum()
    }

    pub fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    pub fn refused_spawns(&self) -> u64 {
        self.refused_spawns
    }

    pub fn peak_enemies(&self) -> u32 {
        self.peak_enemies
    }

    /// Adds one enemy as a new cohort. Refused when the field is full.
    pub fn spawn(
        &mut self,
        type_index: usize,
        def: &EnemyDef,
        scale: ScaleFactors,
        distance: f64,
        scaling: &WaveScaling,
        execution_threshold: f64,
    ) -> bool {
        let alive = self.active_count() + self.pending_count();
        if alive >= scaling.max_enemies {
            self.refused_spawns += 1;
            return false;
        }
        let max_hp = (def.hp * scale.hp).max(f64::MIN_POSITIVE);
        self.cohorts.push(EnemyCohort {
            type_index,
            count: 1,
            max_hp,
            damage: def.damage * scale.damage,
            attack_cooldown: def.attack_cooldown,
            xp: def.xp,
            score: def.score,
            approach_timer: approach_time(def, distance, scaling.melee_range),
            current_hp: kill_hp(max_hp, execution_threshold),
        });
        self.total_spawned += 1;
        self.peak_enemies = self.peak_enemies.max(alive + 1);
        true
    }

    pub fn insert(&mut self, cohort: EnemyCohort) {
        self.cohorts.push(cohort);
    }

    /// Moves approaching cohorts closer. Cohorts arriving this tick join a
    /// matching active cohort when one exists.
    pub fn advance_approach(&mut self, dt: f64) {
        let mut arrived = Vec::new();
        for (i, cohort) in self.cohorts.iter_mut().enumerate() {
            if cohort.approach_timer > 0.0 {
                cohort.approach_timer = (cohort.approach_timer - dt).max(0.0);
                if cohort.approach_timer <= 0.0 {
                    arrived.push(i);
                }
            }
        }
        for i in arrived {
            let target = (0..self.cohorts.len()).find(|&j| {
                j != i
                    && self.cohorts[j].count > 0
                    && self.cohorts[j].is_active()
                    && self.cohorts[j].matches(&self.cohorts[i])
            });
            if let Some(j) = target {
                let count = self.cohorts[i].count;
                self.cohorts[j].count += count;
                self.cohorts[i].count = 0;
            }
        }
        self.cohorts.retain(|c| c.count > 0);
    }

    /// Spends `damage` on active cohorts, lowest lead HP first. Each enemy
    /// killed resets the lead HP to the execution-adjusted max; leftovers
    /// after the last active enemy are reported as wasted.
    pub fn apply_damage(&mut self, damage: f64, execution_threshold: f64) -> DamageOutcome {
        let mut outcome = DamageOutcome::default();
        if !(damage > 0.0) {
            return outcome;
        }

        let mut order: Vec<usize> = (0..self.cohorts.len())
            .filter(|&i| self.cohorts[i].is_active() && self.cohorts[i].count > 0)
            .collect();
        order.sort_by(|&a, &b| {
            self.cohorts[a]
                .current_hp
                .partial_cmp(&self.cohorts[b].current_hp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut remaining = damage;
        'cohorts: for i in order {
            let cohort = &mut self.cohorts[i];
            while cohort.count > 0 {
                if remaining >= cohort.current_hp {
                    remaining -= cohort.current_hp;
                    outcome.applied += cohort.current_hp;
                    cohort.count -= 1;
                    outcome.kills += 1;
                    outcome.xp += cohort.xp;
                    outcome.score += cohort.score;
                    cohort.current_hp = kill_hp(cohort.max_hp, execution_threshold);
                } else {
                    cohort.current_hp -= remaining;
                    outcome.applied += remaining;
                    remaining = 0.0;
                    break 'cohorts;
                }
            }
        }
        outcome.wasted = remaining;

        self.cohorts.retain(|c| c.count > 0);
        outcome
    }

    /// Incoming damage per second from every active cohort.
    pub fn enemy_dps(&self) -> f64 {
        self.cohorts.iter().filter(|c| c.is_active()).map(|c| c.dps()).sum()
    }

    /// Type index of the active cohort with the largest `count * damage`.
    pub fn dominant_type(&self) -> Option<usize> {
        let mut best: Option<&EnemyCohort> = None;
        for cohort in self.cohorts.iter().filter(|c| c.is_active()) {
            if best.map_or(true, |b| cohort.threat() > b.threat()) {
                best = Some(cohort);
            }
        }
        best.map(|c| c.type_index)
    }

    /// Remember the current dominant type so death attribution survives the
    /// cohort emptying later in the same tick.
    pub fn latch_dominant(&mut self) {
        if let Some(idx) = self.dominant_type() {
            self.latched_dominant = Some(idx);
        }
    }

    pub fn latched_dominant(&self) -> Option<usize> {
        self.latched_dominant
    }
}
