use nightfall_shared::config::{BatchConfig, PerkStrategyKind, RunConfig};
use nightfall_shared::content::ContentTables;
use nightfall_sim::engine::{self, TrialId};
use nightfall_sim::report::build_report;
use nightfall_sim::runner::run_batch;

fn content() -> ContentTables {
    ContentTables::builtin().expect("built-in content")
}

fn config(label: &str, character: &str, strategy: PerkStrategyKind) -> RunConfig {
    RunConfig {
        label: label.to_string(),
        character_id: character.to_string(),
        perk_strategy: strategy,
        max_duration_sec: 600.0,
        ..RunConfig::default()
    }
}

fn batch() -> BatchConfig {
    BatchConfig {
        name: "integration".to_string(),
        runs_per_config: 6,
        master_seed: 4242,
        configs: vec![
            config("hunter", "traqueur", PerkStrategyKind::Balanced),
            config("tank", "colosse", PerkStrategyKind::Survival),
            config("rogue", "ombre", PerkStrategyKind::Damage),
        ],
    }
}

#[test]
fn test_single_vs_parallel_workers_identical() {
    let content = content();
    let batch = batch();
    let serial = run_batch(&content, &batch, Some(1)).unwrap();
    let parallel = run_batch(&content, &batch, Some(8)).unwrap();
    assert_eq!(serial.records, parallel.records);
}

#[test]
fn test_batch_shape_and_seeds() {
    let content = content();
    let batch = batch();
    let result = run_batch(&content, &batch, Some(4)).unwrap();
    assert_eq!(result.n_runs(), 18);
    assert_eq!(result.n_configs(), 3);
    for (ci, cfg) in batch.configs.iter().enumerate() {
        let records = result.for_config(ci);
        assert_eq!(records.len(), 6);
        for (ti, r) in records.iter().enumerate() {
            assert_eq!(r.label, cfg.label);
            assert_eq!(r.config_index, ci);
            assert_eq!(r.trial_index as usize, ti);
            assert_eq!(r.seed, 4242 + ci as u64 * 10_000 + ti as u64);
            assert!(r.duration_sec <= cfg.max_duration_sec + 0.11);
        }
    }
}

#[test]
fn test_batch_record_matches_direct_trial() {
    let content = content();
    let batch = batch();
    let result = run_batch(&content, &batch, None).unwrap();
    let id = TrialId {
        config_index: 1,
        trial_index: 3,
        seed: batch.trial_seed(1, 3),
    };
    let direct = engine::run_trial(&content, &batch.configs[1], id);
    assert_eq!(result.for_config(1)[3], direct);
}

#[test]
fn test_report_covers_every_config() {
    let content = content();
    let batch = batch();
    let result = run_batch(&content, &batch, Some(2)).unwrap();
    let report = build_report(&batch, &result);
    assert_eq!(report.batch_name, "integration");
    assert_eq!(report.total_runs, 18);
    assert_eq!(report.summaries.len(), 3);
    assert_eq!(report.comparisons.len(), 2);
    for s in &report.summaries {
        assert_eq!(s.runs, 6);
        assert!(s.nights.min <= s.nights.median && s.nights.median <= s.nights.max);
        assert!((0.0..=1.0).contains(&s.survival_rate));
        let deaths: u32 = s.death_causes.values().sum();
        let survivors = (s.survival_rate * s.runs as f64).round() as u32;
        assert_eq!(deaths + survivors, 6);
        for w in s.perk_picks.windows(2) {
            assert!(w[0].count >= w[1].count);
        }
    }
    let json = report.to_json().unwrap();
    assert!(json.contains("\"summaries\""));
    assert!(json.contains("\"timestamp\""));
}

#[test]
fn test_invalid_batch_does_not_start() {
    let content = content();
    let mut batch = batch();
    batch.configs.clear();
    assert!(run_batch(&content, &batch, Some(1)).is_err());
}
