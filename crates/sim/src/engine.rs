use nightfall_shared::config::{Phase, RunConfig, WaveScaling, DT};
use nightfall_shared::content::ContentTables;
use nightfall_shared::result::RunRecord;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::cohort::{choose_enemy_type, scale_factors, spawn_interval, DamageOutcome, Horde};
use crate::perks;
use crate::phase::PhaseClock;
use crate::player::SimPlayer;
use crate::profile::AiProfile;

const SURVIVAL_SCORE_BASE: f64 = 100.0;
const SURVIVAL_SCORE_GROWTH: f64 = 1.6;
const NO_DAMAGE_NIGHT_BONUS: f64 = 500.0;

/// Position of a trial within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialId {
    pub config_index: usize,
    pub trial_index: u32,
    pub seed: u64,
}

#[derive(Debug, Clone)]
struct Death {
    cause: String,
    night: u32,
    phase: Phase,
}

/// One play-session on a fixed timestep. Owns every piece of mutable state
/// of the trial, including its private RNG stream.
pub struct Trial<'a, R: Rng> {
    content: &'a ContentTables,
    config: &'a RunConfig,
    id: TrialId,
    profile: &'static AiProfile,
    scaling: WaveScaling,
    clock: PhaseClock,
    character_id: String,
    player: SimPlayer,
    horde: Horde,
    rng: R,
    ticks: u64,
    time: f64,
    spawn_timer: f64,
    prev_phase: Phase,
    nights_survived: u32,
    damaged_this_night: bool,
    kills: u64,
    damage_dealt: f64,
    damage_taken: f64,
    kill_score: f64,
    survival_score: f64,
    bonus_score: f64,
    second_wind_used: bool,
    death: Option<Death>,
    finished: bool,
}

impl<'a> Trial<'a, Pcg64> {
    pub fn new(content: &'a ContentTables, config: &'a RunConfig, id: TrialId) -> Self {
        Self::with_rng(content, config, id, Pcg64::seed_from_u64(id.seed))
    }
}

impl<'a, R: Rng> Trial<'a, R> {
    pub fn with_rng(content: &'a ContentTables, config: &'a RunConfig, id: TrialId, rng: R) -> Self {
        let character = content.character_or_default(&config.character_id);
        let weapon = content.weapon_or_default(&character.weapon_id);
        let (scaling, _) = content.wave_scaling.with_overrides(&config.scaling_overrides);
        let clock = PhaseClock::new(content.cycle);
        Self {
            content,
            config,
            id,
            profile: AiProfile::resolve(&config.profile),
            scaling,
            clock,
            player: SimPlayer::new(&character, &weapon),
            character_id: character.id,
            horde: Horde::new(),
            rng,
            ticks: 0,
            time: 0.0,
            spawn_timer: 0.0,
            prev_phase: clock.phase_at(0.0),
            nights_survived: 0,
            damaged_this_night: false,
            kills: 0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            kill_score: 0.0,
            survival_score: 0.0,
            bonus_score: 0.0,
            second_wind_used: false,
            death: None,
            finished: false,
        }
    }

    pub fn player(&self) -> &SimPlayer {
        &self.player
    }

    pub fn horde(&self) -> &Horde {
        &self.horde
    }

    /// Advances one tick. Returns false once the trial has ended.
    pub fn step(&mut self) -> bool {
        if self.finished {
            return false;
        }
        let dt = DT;

        let phase = self.clock.phase_at(self.time);
        let night_index = self.clock.night_index(self.time);
        self.on_phase(phase);

        let elapsed_minutes = self.time * self.config.time_scale / 60.0;
        let execution = self.player.execution_threshold();

        self.spawn_enemies(phase, night_index, elapsed_minutes, dt, execution);

        self.horde.advance_approach(dt);

        let outgoing = self.player.effective_dps() * self.profile.uptime * dt;
        let dealt = self.horde.apply_damage(outgoing, execution);
        let mut tick_xp = self.credit(dealt);

        let incoming = self.horde.enemy_dps()
            * dt
            * self.profile.skill_factor(self.horde.active_count())
            * (1.0 - self.player.dodge())
            * self.player.armor_multiplier();
        if incoming > 0.0 {
            self.horde.latch_dominant();
            if phase == Phase::Night {
                self.damaged_this_night = true;
            }
            self.player.hp -= incoming;
            self.damage_taken += incoming;
        }

        let healing = self.player.regen() * dt + self.player.effects.vampirism * dealt.applied;
        self.player.heal(healing);

        if incoming > 0.0 && self.player.effects.thorns > 0.0 {
            let reflected = self
                .horde
                .apply_damage(self.player.effects.thorns * incoming, execution);
            tick_xp += self.credit(reflected);
        }

        if self.player.hp <= 0.0 {
            if self.player.try_second_wind() {
                self.second_wind_used = true;
            } else {
                self.player.hp = 0.0;
                self.die(phase, night_index);
            }
        }

        self.player.decay_kill_speed(dt);

        if self.death.is_none() {
            self.player.add_xp(tick_xp);
            while self.player.take_pending_level_up() {
                self.level_up();
            }
        }

        self.ticks += 1;
        self.time = self.ticks as f64 * DT;
        if self.time >= self.config.max_duration_sec {
            self.finished = true;
        }
        !self.finished
    }

    /// Runs to completion and produces the trial's record.
    pub fn run(mut self) -> RunRecord {
        while self.step() {}
        self.into_record()
    }

    fn on_phase(&mut self, phase: Phase) {
        if phase == self.prev_phase {
            return;
        }
        if phase == Phase::Night {
            self.damaged_this_night = false;
        }
        // a zero-length dawn goes straight from Night to Day
        if self.prev_phase == Phase::Night {
            self.nights_survived += 1;
            self.survival_score +=
                SURVIVAL_SCORE_BASE * SURVIVAL_SCORE_GROWTH.powi(self.nights_survived as i32 - 1);
            if !self.damaged_this_night {
                self.bonus_score += NO_DAMAGE_NIGHT_BONUS;
            }
        }
        self.prev_phase = phase;
    }

    fn spawn_enemies(
        &mut self,
        phase: Phase,
        night_index: u32,
        elapsed_minutes: f64,
        dt: f64,
        execution: f64,
    ) {
        let Some(interval) = spawn_interval(&self.scaling, elapsed_minutes, phase, night_index)
        else {
            return;
        };
        let scale = scale_factors(&self.scaling, elapsed_minutes, phase, night_index);
        let content = self.content;
        self.spawn_timer += dt;
        while self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            let Some(idx) = choose_enemy_type(&content.enemies, elapsed_minutes, phase, &mut self.rng)
            else {
                continue;
            };
            let (lo, hi) = (self.scaling.spawn_distance_min, self.scaling.spawn_distance_max);
            let distance = if hi > lo { self.rng.gen_range(lo..hi) } else { lo };
            self.horde
                .spawn(idx, &content.enemies[idx], scale, distance, &self.scaling, execution);
        }
    }

    /// Books kills and damage; returns the XP earned.
    fn credit(&mut self, outcome: DamageOutcome) -> f64 {
        self.kills += outcome.kills;
        self.damage_dealt += outcome.applied;
        self.kill_score += outcome.score;
        self.player.on_kills(outcome.kills);
        outcome.xp
    }

    fn level_up(&mut self) {
        let content = self.content;
        let offer = perks::draw_offer(&content.perks, &self.player, &self.character_id, &mut self.rng);
        let hp_ratio = self.player.hp_ratio();
        if let Some(pick) = perks::choose(self.config.perk_strategy, &offer, hp_ratio, &mut self.rng) {
            self.player.apply_perk(offer[pick]);
        }
    }

    fn die(&mut self, phase: Phase, night: u32) {
        let cause = self
            .horde
            .latched_dominant()
            .and_then(|idx| self.content.enemies.get(idx))
            .map(|e| e.id.clone())
            .unwrap_or_else(|| "unknown".to_string());
        self.death = Some(Death { cause, night, phase });
        self.finished = true;
    }

    pub fn into_record(self) -> RunRecord {
        let elapsed_minutes = self.time * self.config.time_scale / 60.0;
        let end_phase = self.clock.phase_at(self.time);
        let end_night = self.clock.night_index(self.time);
        let scale = scale_factors(&self.scaling, elapsed_minutes, end_phase, end_night);
        let total_spawned = self.horde.total_spawned();
        let (death_cause, death_night, death_phase) = match self.death {
            Some(d) => (Some(d.cause), Some(d.night), Some(d.phase)),
            None => (None, None, None),
        };
        RunRecord {
            label: self.config.label.clone(),
            config_index: self.id.config_index,
            trial_index: self.id.trial_index,
            seed: self.id.seed,
            character_id: self.character_id,
            survived: death_cause.is_none(),
            duration_sec: self.time,
            nights_survived: self.nights_survived,
            level: self.player.level,
            kills: self.kills,
            damage_dealt: self.damage_dealt,
            damage_taken: self.damage_taken,
            kill_score: self.kill_score,
            survival_score: self.survival_score,
            bonus_score: self.bonus_score,
            total_score: self.kill_score + self.survival_score + self.bonus_score,
            death_cause,
            death_night,
            death_phase,
            perks_picked: self.player.perks_picked,
            second_wind_used: self.second_wind_used,
            total_spawned,
            peak_enemies: self.horde.peak_enemies(),
            pressure_ratio: total_spawned as f64 / self.kills.max(1) as f64,
            final_hp_scale: scale.hp,
            final_damage_scale: scale.damage,
        }
    }
}

/// Runs one trial end to end with its own seeded RNG.
pub fn run_trial(content: &ContentTables, config: &RunConfig, id: TrialId) -> RunRecord {
    Trial::new(content, config, id).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightfall_shared::config::PerkStrategyKind;
    use nightfall_shared::stat::{ModifierMode, StatKind};

    fn id(seed: u64) -> TrialId {
        TrialId {
            config_index: 0,
            trial_index: 0,
            seed,
        }
    }

    fn short_config(max_duration_sec: f64) -> RunConfig {
        RunConfig {
            max_duration_sec,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_record() {
        let content = ContentTables::builtin().unwrap();
        let config = short_config(600.0);
        let a = run_trial(&content, &config, id(42));
        let b = run_trial(&content, &config, id(42));
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_hp_stays_in_bounds_every_tick() {
        let content = ContentTables::builtin().unwrap();
        let config = RunConfig {
            profile: "novice".to_string(),
            max_duration_sec: 900.0,
            ..RunConfig::default()
        };
        let mut trial = Trial::new(&content, &config, id(7));
        let mut last_level = 1;
        while trial.step() {
            let p = trial.player();
            assert!(p.hp >= 0.0 && p.hp <= p.max_hp(), "hp {} max {}", p.hp, p.max_hp());
            assert!(p.level >= last_level);
            last_level = p.level;
            assert!(trial.horde().cohorts().iter().all(|c| c.count > 0));
        }
        let p = trial.player();
        assert!(p.hp >= 0.0 && p.hp <= p.max_hp());
    }

    #[test]
    fn test_time_cap_ends_trial_alive() {
        let content = ContentTables::builtin().unwrap();
        let mut config = short_config(30.0);
        config.scaling_overrides.insert("max_enemies".to_string(), 0.0);
        let record = run_trial(&content, &config, id(1));
        assert!(record.survived);
        assert!(record.duration_sec >= 30.0 && record.duration_sec < 30.0 + DT + 1e-9);
        assert_eq!(record.nights_survived, 0);
        assert!(record.death_cause.is_none());
    }

    #[test]
    fn test_overwhelmed_player_dies_with_cause() {
        let content = ContentTables::builtin().unwrap();
        let mut config = short_config(3_000.0);
        config.profile = "novice".to_string();
        config.perk_strategy = PerkStrategyKind::Random;
        config.scaling_overrides.insert("base_interval".to_string(), 0.05);
        config.scaling_overrides.insert("min_interval".to_string(), 0.05);
        config
            .scaling_overrides
            .insert("damage_scaling_per_minute".to_string(), 1.5);
        let record = run_trial(&content, &config, id(3));
        assert!(!record.survived);
        assert!(record.duration_sec < 3_000.0);
        let cause = record.death_cause.unwrap();
        assert!(content.enemy(&cause).is_some(), "cause {}", cause);
        assert!(record.death_night.is_some());
        assert!(record.pressure_ratio > 1.0);
    }

    #[test]
    fn test_first_night_credits_survival_score() {
        let content = ContentTables::builtin().unwrap();
        let mut config = short_config(260.0);
        // keep the field empty so the night passes untouched
        config.scaling_overrides.insert("max_enemies".to_string(), 0.0);
        let record = run_trial(&content, &config, id(5));
        assert_eq!(record.nights_survived, 1);
        assert!((record.survival_score - 100.0).abs() < 1e-9);
        assert!((record.bonus_score - 500.0).abs() < 1e-9);
        assert_eq!(record.kills, 0);
        assert_eq!(record.total_spawned, 0);
    }

    #[test]
    fn test_night_without_dawn_still_credited() {
        let mut content = ContentTables::builtin().unwrap();
        content.cycle.dawn = 0.0;
        let mut config = short_config(250.0);
        config.scaling_overrides.insert("max_enemies".to_string(), 0.0);
        let record = run_trial(&content, &config, id(5));
        assert_eq!(record.nights_survived, 1);
        assert!((record.survival_score - 100.0).abs() < 1e-9);
        assert!((record.bonus_score - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_player_outlasts_first_night() {
        let content = ContentTables::builtin().unwrap();
        let config = short_config(300.0);
        for seed in 0..8 {
            let record = run_trial(&content, &config, id(seed));
            assert!(
                record.nights_survived >= 1,
                "seed {} died at {:.1}s to {:?}",
                seed,
                record.duration_sec,
                record.death_cause
            );
            assert!(!record.perks_picked.is_empty());
        }
    }

    /// Builtin tables without perks, so level-ups leave stats alone and two
    /// trials on the same seed see the same horde.
    fn bare_content() -> ContentTables {
        let mut content = ContentTables::builtin().unwrap();
        content.perks.clear();
        content.characters.get_mut("traqueur").unwrap().regen = 0.0;
        content
    }

    fn unarmed_content() -> ContentTables {
        let mut content = bare_content();
        content.weapons.get_mut("makeshift_bow").unwrap().damage = 0.0;
        content
    }

    fn assert_hp_in_bounds(p: &SimPlayer) {
        assert!(p.hp >= 0.0 && p.hp <= p.max_hp(), "hp {} max {}", p.hp, p.max_hp());
    }

    #[test]
    fn test_dodge_and_armor_scale_damage_taken() {
        let content = bare_content();
        let config = short_config(90.0);
        let plain = run_trial(&content, &config, id(11));
        assert!(plain.survived);
        assert!(plain.damage_taken > 0.0);

        let mut dodgy = Trial::new(&content, &config, id(11));
        dodgy.player.effects.dodge = 0.4;
        let dodgy = dodgy.run();
        assert!(dodgy.survived);
        assert_eq!(dodgy.kills, plain.kills);
        let ratio = dodgy.damage_taken / plain.damage_taken;
        assert!((ratio - 0.6).abs() < 1e-9, "dodge ratio {}", ratio);

        let mut armored = Trial::new(&content, &config, id(11));
        armored
            .player
            .apply_stat(&StatKind::Armor, ModifierMode::Additive, 45.0);
        let armored = armored.run();
        assert!(armored.survived);
        // 5 base armor: 100/150 against 100/105
        let ratio = armored.damage_taken / plain.damage_taken;
        assert!((ratio - 105.0 / 150.0).abs() < 1e-9, "armor ratio {}", ratio);
    }

    #[test]
    fn test_vampirism_heals_from_damage_dealt() {
        let content = bare_content();
        let config = short_config(90.0);
        let mut plain = Trial::new(&content, &config, id(12));
        let mut leech = Trial::new(&content, &config, id(12));
        leech.player.effects.vampirism = 0.3;
        let mut healed = false;
        loop {
            let a = plain.step();
            let b = leech.step();
            assert_eq!(a, b);
            assert_hp_in_bounds(&plain.player);
            assert_hp_in_bounds(&leech.player);
            assert!(leech.player.hp >= plain.player.hp - 1e-9);
            healed |= leech.player.hp > plain.player.hp + 1e-9;
            if !a {
                break;
            }
        }
        assert!(healed);
        let (plain, leech) = (plain.into_record(), leech.into_record());
        assert!(plain.survived && leech.survived);
        assert_eq!(plain.damage_dealt, leech.damage_dealt);
        assert_eq!(plain.damage_taken, leech.damage_taken);
    }

    #[test]
    fn test_thorns_kills_are_credited() {
        let content = unarmed_content();
        let config = short_config(90.0);
        let plain = run_trial(&content, &config, id(13));
        assert_eq!(plain.kills, 0);
        assert_eq!(plain.damage_dealt, 0.0);
        assert_eq!(plain.level, 1);

        let mut spiky = Trial::new(&content, &config, id(13));
        spiky.player.effects.thorns = 3.0;
        while spiky.step() {
            assert_hp_in_bounds(&spiky.player);
        }
        let spiky = spiky.into_record();
        assert!(spiky.kills > 0);
        assert!(spiky.kill_score > 0.0);
        assert!(spiky.level > 1);
        assert!(spiky.damage_dealt > 0.0);
        assert!(spiky.damage_dealt <= 3.0 * spiky.damage_taken + 1e-6);
    }

    #[test]
    fn test_second_wind_restores_half_hp_once() {
        let content = unarmed_content();
        let config = short_config(300.0);
        let plain = run_trial(&content, &config, id(14));
        assert!(!plain.survived);
        assert!(!plain.second_wind_used);

        let mut revived = Trial::new(&content, &config, id(14));
        revived.player.effects.second_winds = 1;
        let mut revived_at = None;
        while revived.step() {
            assert_hp_in_bounds(&revived.player);
            if revived.second_wind_used && revived_at.is_none() {
                revived_at = Some(revived.time);
                assert_eq!(revived.player.hp, revived.player.max_hp() * 0.5);
                assert_eq!(revived.player.effects.second_winds, 0);
            }
        }
        let revived = revived.into_record();
        let revived_at = revived_at.unwrap();
        assert!((revived_at - plain.duration_sec).abs() < 1e-9);
        assert!(revived.second_wind_used);
        assert!(!revived.survived);
        assert!(revived.duration_sec > plain.duration_sec);
        assert!(revived.damage_taken > plain.damage_taken);
    }

    #[test]
    fn test_levels_pick_perks() {
        let content = ContentTables::builtin().unwrap();
        let record = run_trial(&content, &short_config(600.0), id(9));
        assert!(record.kills > 0);
        assert!(record.level > 1);
        assert_eq!(record.perks_picked.len() as u32, record.level - 1);
    }
}
