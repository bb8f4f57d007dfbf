use nightfall_shared::config::{PerkStrategyKind, RunConfig};
use nightfall_sim::engine::{self, TrialId};
use nightfall_sim::runner;
use tracing::warn;

use super::load_content;

pub fn run(
    character: &str,
    profile: &str,
    strategy: PerkStrategyKind,
    seed: u64,
    max_duration: f64,
    content_dir: Option<&str>,
) -> anyhow::Result<()> {
    if !(max_duration > 0.0) {
        anyhow::bail!("--max-duration must be positive, got {}", max_duration);
    }
    let content = load_content(content_dir)?;
    let config = RunConfig {
        label: format!("{}-{}-{}", character, profile, strategy.as_str()),
        character_id: character.to_string(),
        profile: profile.to_string(),
        perk_strategy: strategy,
        max_duration_sec: max_duration,
        seed: Some(seed),
        ..RunConfig::default()
    };
    for note in runner::fallbacks(&content, &config) {
        warn!("{}, using default", note);
    }

    let id = TrialId {
        config_index: 0,
        trial_index: 0,
        seed,
    };
    let record = engine::run_trial(&content, &config, id);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
