use rayon::prelude::*;
use tracing::{debug, info, warn};

use nightfall_shared::config::{BatchConfig, RunConfig};
use nightfall_shared::content::ContentTables;
use nightfall_shared::result::{BatchResult, RunRecord};

use crate::engine::{self, TrialId};
use crate::profile::AiProfile;

/// Ids in `config` that will silently fall back to a default during trials.
pub fn fallbacks(content: &ContentTables, config: &RunConfig) -> Vec<String> {
    let mut notes = Vec::new();
    match content.character(&config.character_id) {
        Some(character) => {
            if !content.weapons.contains_key(&character.weapon_id) {
                notes.push(format!(
                    "weapon '{}' of character '{}' not found",
                    character.weapon_id, character.id
                ));
            }
        }
        None => notes.push(format!("character '{}' not found", config.character_id)),
    }
    if AiProfile::by_name(&config.profile).is_none() {
        notes.push(format!("AI profile '{}' not found", config.profile));
    }
    let (_, unknown) = content.wave_scaling.with_overrides(&config.scaling_overrides);
    for key in unknown {
        notes.push(format!("scaling override '{}' ignored", key));
    }
    notes
}

/// Every trial of `batch`, config-major, each with its deterministic seed.
pub fn trial_ids(batch: &BatchConfig) -> Vec<TrialId> {
    (0..batch.configs.len())
        .flat_map(|config_index| {
            (0..batch.runs_per_config).map(move |trial_index| TrialId {
                config_index,
                trial_index,
                seed: batch.trial_seed(config_index, trial_index),
            })
        })
        .collect()
}

pub fn run_batch(
    content: &ContentTables,
    batch: &BatchConfig,
    n_workers: Option<usize>,
) -> anyhow::Result<BatchResult> {
    batch.validate()?;
    for config in &batch.configs {
        for note in fallbacks(content, config) {
            warn!(label = %config.label, "{}, using default", note);
        }
    }

    let n_threads = n_workers.unwrap_or_else(|| rayon::current_num_threads().min(8));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()?;

    let ids = trial_ids(batch);
    info!(
        batch = %batch.name,
        configs = batch.configs.len(),
        runs_per_config = batch.runs_per_config,
        threads = n_threads,
        "starting batch"
    );

    let records: Vec<RunRecord> = pool.install(|| {
        ids.par_iter()
            .map(|id| {
                let config = &batch.configs[id.config_index];
                let record = engine::run_trial(content, config, *id);
                debug!(
                    label = %record.label,
                    seed = record.seed,
                    nights = record.nights_survived,
                    kills = record.kills,
                    "trial finished"
                );
                record
            })
            .collect()
    });

    info!(batch = %batch.name, runs = records.len(), "batch finished");
    let labels = batch.configs.iter().map(|c| c.label.clone()).collect();
    Ok(BatchResult::from_records(
        batch.name.clone(),
        batch.runs_per_config,
        labels,
        records,
    ))
}
