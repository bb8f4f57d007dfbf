use serde::{Deserialize, Serialize};

use crate::config::Phase;

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub label: String,
    pub config_index: usize,
    pub trial_index: u32,
    pub seed: u64,
    pub character_id: String,
    /// True when the trial reached its time cap alive.
    pub survived: bool,
    pub duration_sec: f64,
    pub nights_survived: u32,
    pub level: u32,
    pub kills: u64,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub kill_score: f64,
    pub survival_score: f64,
    pub bonus_score: f64,
    pub total_score: f64,
    pub death_cause: Option<String>,
    pub death_night: Option<u32>,
    pub death_phase: Option<Phase>,
    pub perks_picked: Vec<String>,
    pub second_wind_used: bool,
    pub total_spawned: u64,
    pub peak_enemies: u32,
    pub pressure_ratio: f64,
    pub final_hp_scale: f64,
    pub final_damage_scale: f64,
}

impl RunRecord {
    pub fn avg_dps(&self) -> f64 {
        if self.duration_sec > 0.0 {
            self.damage_dealt / self.duration_sec
        } else {
            0.0
        }
    }
}

/// Every record of a batch, config-major: config `i` owns the slice
/// `[i * runs_per_config, (i + 1) * runs_per_config)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_name: String,
    pub runs_per_config: u32,
    pub labels: Vec<String>,
    pub records: Vec<RunRecord>,
}

impl BatchResult {
    pub fn from_records(
        batch_name: String,
        runs_per_config: u32,
        labels: Vec<String>,
        records: Vec<RunRecord>,
    ) -> Self {
        Self {
            batch_name,
            runs_per_config,
            labels,
            records,
        }
    }

    pub fn n_runs(&self) -> usize {
        self.records.len()
    }

    pub fn n_configs(&self) -> usize {
        self.labels.len()
    }

    pub fn for_config(&self, config_index: usize) -> &[RunRecord] {
        let per = self.runs_per_config as usize;
        let start = (config_index * per).min(self.records.len());
        let end = (start + per).min(self.records.len());
        &self.records[start..end]
    }
}
