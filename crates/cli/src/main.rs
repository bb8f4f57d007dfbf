mod commands;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nightfall_shared::config::PerkStrategyKind;

#[derive(Parser)]
#[command(name = "nightfall", about = "Nightfall balance simulator CLI")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every config of a batch file and report the statistics
    Run {
        /// Path to the batch JSON file
        batch: String,
        /// Directory with content tables (built-in tables when omitted)
        #[arg(long)]
        content: Option<String>,
        /// Number of parallel workers (0 = auto)
        #[arg(long, default_value = "0")]
        workers: usize,
        /// Override the batch master seed
        #[arg(long)]
        seed: Option<u64>,
        /// Write the JSON report to this file
        #[arg(long)]
        output: Option<String>,
        /// Write every raw run record to this file
        #[arg(long)]
        records: Option<String>,
    },
    /// Run a single trial and print its record as JSON
    Trial {
        #[arg(long, default_value = "traqueur")]
        character: String,
        #[arg(long, default_value = "average")]
        profile: String,
        #[arg(long, default_value = "balanced")]
        strategy: PerkStrategyKind,
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Simulated seconds before the trial is stopped
        #[arg(long, default_value = "1800")]
        max_duration: f64,
        #[arg(long)]
        content: Option<String>,
    },
    /// Check a batch file against the content tables
    Validate {
        /// Path to the batch JSON file
        batch: String,
        #[arg(long)]
        content: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            batch,
            content,
            workers,
            seed,
            output,
            records,
        } => commands::run::run(
            &batch,
            content.as_deref(),
            workers,
            seed,
            output.as_deref(),
            records.as_deref(),
        ),
        Commands::Trial {
            character,
            profile,
            strategy,
            seed,
            max_duration,
            content,
        } => commands::trial::run(
            &character,
            &profile,
            strategy,
            seed,
            max_duration,
            content.as_deref(),
        ),
        Commands::Validate { batch, content } => {
            commands::validate::run(&batch, content.as_deref())
        }
    }
}
