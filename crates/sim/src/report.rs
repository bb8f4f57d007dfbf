use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use nightfall_shared::config::BatchConfig;
use nightfall_shared::result::{BatchResult, RunRecord};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Distribution {
    /// Non-finite values are dropped; an empty input yields all zeros.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut xs: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
        if xs.is_empty() {
            return Self::default();
        }
        xs.sort_by(f64::total_cmp);
        let n = xs.len();
        let median = if n % 2 == 1 {
            xs[n / 2]
        } else {
            (xs[n / 2 - 1] + xs[n / 2]) / 2.0
        };
        Self {
            mean: xs.iter().sum::<f64>() / n as f64,
            median,
            min: xs[0],
            max: xs[n - 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerkPick {
    pub perk_id: String,
    pub count: u32,
    /// Picks per trial.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub label: String,
    pub character_id: String,
    pub profile: String,
    pub perk_strategy: String,
    pub runs: usize,
    pub survival_rate: f64,
    pub nights: Distribution,
    pub score: Distribution,
    pub avg_kills: f64,
    pub avg_dps: f64,
    pub avg_damage_taken: f64,
    pub avg_level: f64,
    pub avg_pressure_ratio: f64,
    pub avg_peak_enemies: f64,
    pub second_wind_rate: f64,
    pub death_nights: BTreeMap<u32, u32>,
    pub death_causes: BTreeMap<String, u32>,
    pub perk_picks: Vec<PerkPick>,
}

/// Deltas of one config against the first config of the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub label: String,
    pub baseline: String,
    pub nights_delta: f64,
    pub score_delta: f64,
    pub pressure_delta: f64,
    pub survival_rate_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_name: String,
    pub timestamp: String,
    pub total_runs: usize,
    pub runs_per_config: u32,
    pub summaries: Vec<ConfigSummary>,
    pub comparisons: Vec<Comparison>,
}

fn average(records: &[RunRecord], f: impl Fn(&RunRecord) -> f64) -> f64 {
    if records.is_empty() {
        0.0
    } else {
        records.iter().map(f).sum::<f64>() / records.len() as f64
    }
}

pub fn summarize(batch: &BatchConfig, config_index: usize, records: &[RunRecord]) -> ConfigSummary {
    let config = &batch.configs[config_index];

    let mut death_nights = BTreeMap::new();
    let mut death_causes = BTreeMap::new();
    let mut pick_counts: BTreeMap<&str, u32> = BTreeMap::new();
    for r in records {
        if let Some(night) = r.death_night {
            *death_nights.entry(night).or_insert(0) += 1;
        }
        if let Some(cause) = &r.death_cause {
            *death_causes.entry(cause.clone()).or_insert(0) += 1;
        }
        for perk in &r.perks_picked {
            *pick_counts.entry(perk.as_str()).or_insert(0) += 1;
        }
    }

    let runs = records.len();
    let mut perk_picks: Vec<PerkPick> = pick_counts
        .into_iter()
        .map(|(id, count)| PerkPick {
            perk_id: id.to_string(),
            count,
            rate: if runs > 0 { count as f64 / runs as f64 } else { 0.0 },
        })
        .collect();
    // stable: equal counts stay in id order
    perk_picks.sort_by(|a, b| b.count.cmp(&a.count));

    ConfigSummary {
        label: config.label.clone(),
        character_id: config.character_id.clone(),
        profile: config.profile.clone(),
        perk_strategy: config.perk_strategy.as_str().to_string(),
        runs,
        survival_rate: average(records, |r| if r.survived { 1.0 } else { 0.0 }),
        nights: Distribution::from_values(records.iter().map(|r| r.nights_survived as f64)),
        score: Distribution::from_values(records.iter().map(|r| r.total_score)),
        avg_kills: average(records, |r| r.kills as f64),
        avg_dps: average(records, RunRecord::avg_dps),
        avg_damage_taken: average(records, |r| r.damage_taken),
        avg_level: average(records, |r| r.level as f64),
        avg_pressure_ratio: average(records, |r| r.pressure_ratio),
        avg_peak_enemies: average(records, |r| r.peak_enemies as f64),
        second_wind_rate: average(records, |r| if r.second_wind_used { 1.0 } else { 0.0 }),
        death_nights,
        death_causes,
        perk_picks,
    }
}

pub fn compare(baseline: &ConfigSummary, other: &ConfigSummary) -> Comparison {
    Comparison {
        label: other.label.clone(),
        baseline: baseline.label.clone(),
        nights_delta: other.nights.mean - baseline.nights.mean,
        score_delta: other.score.mean - baseline.score.mean,
        pressure_delta: other.avg_pressure_ratio - baseline.avg_pressure_ratio,
        survival_rate_delta: other.survival_rate - baseline.survival_rate,
    }
}

pub fn build_report(batch: &BatchConfig, result: &BatchResult) -> BatchReport {
    let n_configs = batch.configs.len().min(result.n_configs());
    let summaries: Vec<ConfigSummary> = (0..n_configs)
        .map(|i| summarize(batch, i, result.for_config(i)))
        .collect();
    let comparisons = match summaries.split_first() {
        Some((first, rest)) => rest.iter().map(|s| compare(first, s)).collect(),
        None => Vec::new(),
    };
    BatchReport {
        batch_name: result.batch_name.clone(),
        timestamp: Utc::now().to_rfc3339(),
        total_runs: result.n_runs(),
        runs_per_config: result.runs_per_config,
        summaries,
        comparisons,
    }
}

const TOP_PERKS: usize = 5;
const TOP_CAUSES: usize = 3;

impl BatchReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Console rendering of the report.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n========================================");
        let _ = writeln!(out, "  Batch:       {}", self.batch_name);
        let _ = writeln!(out, "  Runs:        {} ({} per config)", self.total_runs, self.runs_per_config);
        let _ = writeln!(out, "  Generated:   {}", self.timestamp);
        let _ = writeln!(out, "========================================");

        for s in &self.summaries {
            let _ = writeln!(
                out,
                "\n[{}] {} / {} / {}",
                s.label, s.character_id, s.profile, s.perk_strategy
            );
            let _ = writeln!(
                out,
                "  Nights:      mean {:.2}  median {:.1}  min {:.0}  max {:.0}",
                s.nights.mean, s.nights.median, s.nights.min, s.nights.max
            );
            let _ = writeln!(
                out,
                "  Score:       mean {:.0}  median {:.0}  min {:.0}  max {:.0}",
                s.score.mean, s.score.median, s.score.min, s.score.max
            );
            let _ = writeln!(
                out,
                "  Survival:    {:.1}%   Level {:.1}   Kills {:.0}   DPS {:.1}",
                s.survival_rate * 100.0,
                s.avg_level,
                s.avg_kills,
                s.avg_dps
            );
            let _ = writeln!(
                out,
                "  Pressure:    {:.2}   Peak enemies {:.1}   Damage taken {:.0}",
                s.avg_pressure_ratio, s.avg_peak_enemies, s.avg_damage_taken
            );
            if !s.death_nights.is_empty() {
                let nights: Vec<String> = s
                    .death_nights
                    .iter()
                    .map(|(night, n)| format!("N{night}:{n}"))
                    .collect();
                let _ = writeln!(out, "  Deaths:      {}", nights.join(" "));
            }
            if !s.death_causes.is_empty() {
                let mut causes: Vec<(&String, &u32)> = s.death_causes.iter().collect();
                causes.sort_by(|a, b| b.1.cmp(a.1));
                let causes: Vec<String> = causes
                    .iter()
                    .take(TOP_CAUSES)
                    .map(|(cause, n)| format!("{cause} ({n})"))
                    .collect();
                let _ = writeln!(out, "  Killed by:   {}", causes.join(", "));
            }
            if !s.perk_picks.is_empty() {
                let picks: Vec<String> = s
                    .perk_picks
                    .iter()
                    .take(TOP_PERKS)
                    .map(|p| format!("{} ({:.2}/run)", p.perk_id, p.rate))
                    .collect();
                let _ = writeln!(out, "  Top perks:   {}", picks.join(", "));
            }
        }

        if !self.comparisons.is_empty() {
            let _ = writeln!(out, "\nVersus {}:", self.comparisons[0].baseline);
            for c in &self.comparisons {
                let _ = writeln!(
                    out,
                    "  {:<20} nights {:+.2}  score {:+.0}  pressure {:+.2}  survival {:+.1}%",
                    c.label,
                    c.nights_delta,
                    c.score_delta,
                    c.pressure_delta,
                    c.survival_rate_delta * 100.0
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightfall_shared::config::{Phase, RunConfig};

    fn record(label: &str, nights: u32, score: f64, cause: Option<&str>, perks: &[&str]) -> RunRecord {
        RunRecord {
            label: label.to_string(),
            config_index: 0,
            trial_index: 0,
            seed: 0,
            character_id: "traqueur".to_string(),
            survived: cause.is_none(),
            duration_sec: 100.0,
            nights_survived: nights,
            level: 4,
            kills: 10,
            damage_dealt: 500.0,
            damage_taken: 80.0,
            kill_score: score,
            survival_score: 0.0,
            bonus_score: 0.0,
            total_score: score,
            death_cause: cause.map(str::to_string),
            death_night: cause.map(|_| nights + 1),
            death_phase: cause.map(|_| Phase::Night),
            perks_picked: perks.iter().map(|p| p.to_string()).collect(),
            second_wind_used: false,
            total_spawned: 20,
            peak_enemies: 6,
            pressure_ratio: 2.0,
            final_hp_scale: 1.0,
            final_damage_scale: 1.0,
        }
    }

    fn batch(labels: &[&str], runs: u32) -> BatchConfig {
        BatchConfig {
            name: "report".to_string(),
            runs_per_config: runs,
            master_seed: 0,
            configs: labels
                .iter()
                .map(|l| RunConfig {
                    label: l.to_string(),
                    ..RunConfig::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_distribution_even_and_odd() {
        let d = Distribution::from_values([3.0, 1.0, 2.0]);
        assert_eq!(d.median, 2.0);
        assert_eq!(d.mean, 2.0);
        let d = Distribution::from_values([4.0, 1.0, 2.0, 3.0]);
        assert_eq!(d.median, 2.5);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert_eq!(Distribution::from_values(Vec::new()), Distribution::default());
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record("a", 1, 100.0, Some("runner"), &["swift", "armor"]),
            record("a", 2, 300.0, Some("runner"), &["swift"]),
            record("a", 3, 500.0, None, &["armor", "swift"]),
        ];
        let s = summarize(&batch(&["a"], 3), 0, &records);
        assert_eq!(s.runs, 3);
        assert_eq!(s.nights.mean, 2.0);
        assert_eq!(s.score.median, 300.0);
        assert!((s.survival_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.death_causes.get("runner"), Some(&2));
        assert_eq!(s.death_nights.get(&2), Some(&1));
        assert_eq!(s.death_nights.get(&3), Some(&1));
        assert_eq!(s.perk_picks[0].perk_id, "swift");
        assert_eq!(s.perk_picks[0].count, 3);
        assert_eq!(s.perk_picks[1].perk_id, "armor");
        assert_eq!(s.avg_dps, 5.0);
    }

    #[test]
    fn test_report_compares_against_first_config() {
        let b = batch(&["base", "tuned"], 2);
        let records = vec![
            record("base", 1, 100.0, Some("brute"), &[]),
            record("base", 3, 300.0, Some("brute"), &[]),
            record("tuned", 4, 600.0, None, &[]),
            record("tuned", 4, 600.0, None, &[]),
        ];
        let result = BatchResult::from_records(
            "report".to_string(),
            2,
            vec!["base".to_string(), "tuned".to_string()],
            records,
        );
        let report = build_report(&b, &result);
        assert_eq!(report.total_runs, 4);
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.comparisons.len(), 1);
        let c = &report.comparisons[0];
        assert_eq!(c.baseline, "base");
        assert_eq!(c.nights_delta, 2.0);
        assert_eq!(c.score_delta, 400.0);
        assert_eq!(c.survival_rate_delta, 1.0);

        let text = report.render_summary();
        assert!(text.contains("[tuned]"));
        assert!(text.contains("Versus base"));
        let json = report.to_json().unwrap();
        let back: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summaries, report.summaries);
    }
}
