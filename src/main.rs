use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epigrid::manager::Manager;
use std::path::PathBuf;

/// Simulate disease spread among agents wandering a toroidal grid.
///
/// Each simulation directory holds a `config.toml` and one `run-NNNN`
/// directory per independent run. Runs are extended one trajectory file at a
/// time and can be resumed from their checkpoint.
#[derive(Debug, Parser)]
#[command(version, about, long_about)]
struct Args {
    /// Directory containing `config.toml` and the run directories.
    #[arg(long, value_name = "DIR")]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed a new population and simulate its first trajectory file.
    Create,

    /// Append one trajectory file to a run, starting from its checkpoint.
    Resume {
        /// Index of the run (the `NNNN` in `run-NNNN`).
        #[arg(long)]
        run_idx: usize,
    },

    /// Summarize prevalence and crowding of every run into `results.msgpack`.
    Analyze,

    /// Log the tick and number of infected agents stored in each checkpoint.
    Status,

    /// Delete trajectory files, keeping checkpoints and results.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    log::debug!("{args:#?}");

    let mgr = Manager::new(&args.sim_dir)
        .with_context(|| format!("failed to open simulation in {:?}", args.sim_dir))?;

    match args.command {
        Command::Create => mgr.create_run().context("failed to create run")?,
        Command::Resume { run_idx } => mgr
            .resume_run(run_idx)
            .with_context(|| format!("failed to resume run {run_idx}"))?,
        Command::Analyze => mgr.analyze_sim().context("failed to analyze runs")?,
        Command::Status => mgr.report_sim().context("failed to report runs")?,
        Command::Clean => mgr.clean_sim().context("failed to clean runs")?,
    }

    Ok(())
}
