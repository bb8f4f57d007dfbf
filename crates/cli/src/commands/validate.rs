use std::path::Path;

use anyhow::Context;
use nightfall_shared::config::BatchConfig;
use nightfall_sim::runner;

use super::load_content;

pub fn run(batch_path: &str, content_dir: Option<&str>) -> anyhow::Result<()> {
    println!("Validating batch: {}", batch_path);
    let batch = BatchConfig::load(Path::new(batch_path))
        .with_context(|| format!("loading batch {}", batch_path))?;
    println!(
        "  [PASS] Parsed '{}': {} configs x {} trials",
        batch.name,
        batch.configs.len(),
        batch.runs_per_config
    );

    let content = load_content(content_dir)?;
    println!(
        "  [PASS] Content: {} characters, {} weapons, {} perks, {} enemies",
        content.characters.len(),
        content.weapons.len(),
        content.perks.len(),
        content.enemies.len()
    );

    let mut fallbacks = 0;
    for config in &batch.configs {
        let notes = runner::fallbacks(&content, config);
        if notes.is_empty() {
            println!("  [PASS] {}", config.label);
        }
        for note in &notes {
            println!("  [WARN] {}: {}, default will be used", config.label, note);
        }
        fallbacks += notes.len();
    }

    if fallbacks == 0 {
        println!("\nAll validation checks passed!");
    } else {
        println!("\n{} id(s) will fall back to defaults.", fallbacks);
    }
    Ok(())
}
