//! Self-play orchestrator binary.
//!
//! Spawns the worker fleet against the current production model and
//! streams training samples into the replay buffer for one window.

use clap::Parser;

#[derive(Parser)]
#[command(about = "run one self-play window")]
struct Args {
    /// window length in minutes (overrides SELF_PLAY_DURATION_MS)
    #[arg(long)]
    minutes: Option<u64>,
    /// worker count (overrides NUM_WORKERS)
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gomokuzero::log();
    gomokuzero::kys();
    gomokuzero::brb();
    let args = Args::parse();
    let mut settings = gomokuzero::config::Settings::load();
    if let Some(minutes) = args.minutes {
        settings.selfplay_duration_ms = minutes * 60_000;
    }
    if let Some(workers) = args.workers {
        settings.num_workers = workers;
    }
    let report = gomokuzero::selfplay::Pool::new(settings).run().await?;
    log::info!(
        "window complete: {} games, {} samples",
        report.games,
        report.samples
    );
    Ok(())
}
