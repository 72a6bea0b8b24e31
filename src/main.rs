mod actions;
mod api;
mod cli;
mod export;
mod logging;
mod model;
mod orchestrator;
mod poller;
mod state;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
mod uploads;
mod view;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_one_shot = args.command.is_some();

    match cli::run(args).await {
        Ok(()) => {
            // One-shot commands may leave idle pooled connections behind.
            if is_one_shot {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}
