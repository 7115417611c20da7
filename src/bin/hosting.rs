//! Inference server binary.
//!
//! Serves POST /get-move, GET /health, and the Swap2 helpers, reloading
//! the model when the store changes on disk or upstream.

use clap::Parser;

#[derive(Parser)]
#[command(about = "serve the inference endpoint")]
struct Args {
    /// listen address (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    gomokuzero::log();
    let args = Args::parse();
    let mut settings = gomokuzero::config::Settings::load();
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    gomokuzero::hosting::Server::run(settings).await
}
