//! Arena gating binary.
//!
//! Plays the candidate against the production model and promotes the
//! winner when the gate clears.

use clap::Parser;

#[derive(Parser)]
#[command(about = "gate the candidate model against prod")]
struct Args {
    /// scheduled game count (overrides ARENA_GAMES)
    #[arg(long)]
    games: Option<usize>,
    /// report only, never promote
    #[arg(long)]
    no_promote: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gomokuzero::log();
    gomokuzero::kys();
    let args = Args::parse();
    let mut settings = gomokuzero::config::Settings::load();
    if let Some(games) = args.games {
        settings.arena_games = games;
    }
    if args.no_promote {
        settings.promote = false;
    }
    let gate = gomokuzero::arena::Gate::new(settings);
    let report = tokio::task::spawn_blocking(move || gate.run()).await??;
    log::info!(
        "gate {}: winrate {:.3} over {} games",
        if report.promoted { "promoted" } else { "kept prod" },
        report.winrate,
        report.games
    );
    Ok(())
}
