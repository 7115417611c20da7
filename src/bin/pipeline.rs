//! Pipeline controller binary.
//!
//! Cycles self-play, the external distillation driver, the arena gate,
//! and the publish stages until stopped.

use clap::Parser;

#[derive(Parser)]
#[command(about = "run the training pipeline")]
struct Args {
    /// cycle count; zero loops forever (overrides PIPELINE_CYCLES)
    #[arg(long)]
    cycles: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gomokuzero::log();
    gomokuzero::kys();
    gomokuzero::brb();
    let args = Args::parse();
    let mut settings = gomokuzero::config::Settings::load();
    if let Some(cycles) = args.cycles {
        settings.pipeline_cycles = cycles;
    }
    gomokuzero::pipeline::Cycle::new(settings).run().await
}
