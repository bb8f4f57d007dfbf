use std::path::Path;

use anyhow::Context;
use nightfall_shared::config::BatchConfig;
use nightfall_sim::{report, runner};

use super::load_content;
use crate::output;

pub fn run(
    batch_path: &str,
    content_dir: Option<&str>,
    workers: usize,
    seed: Option<u64>,
    output_path: Option<&str>,
    records_path: Option<&str>,
) -> anyhow::Result<()> {
    let mut batch = BatchConfig::load(Path::new(batch_path))
        .with_context(|| format!("loading batch {}", batch_path))?;
    if let Some(seed) = seed {
        batch.master_seed = seed;
    }
    let content = load_content(content_dir)?;
    let n_workers = if workers == 0 { None } else { Some(workers) };

    println!(
        "Running {} configs x {} trials (master seed {})...",
        batch.configs.len(),
        batch.runs_per_config,
        batch.master_seed,
    );

    let start = std::time::Instant::now();
    let result = runner::run_batch(&content, &batch, n_workers)?;
    let elapsed = start.elapsed();

    let report = report::build_report(&batch, &result);
    output::print_report(&report, elapsed);

    if let Some(path) = output_path {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("writing report to {}", path))?;
        println!("Report written to {}", path);
    }
    if let Some(path) = records_path {
        std::fs::write(path, serde_json::to_string_pretty(&result.records)?)
            .with_context(|| format!("writing records to {}", path))?;
        println!("Records written to {}", path);
    }
    Ok(())
}
