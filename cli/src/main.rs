//! siteship - entry point

use std::error::Error;

use clap::Parser;
use colored::Colorize;

use siteship::app::options::Cli;
use siteship::app::run::run;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if e.should_print() {
            eprintln!("{} {}", "error:".red().bold(), e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", "caused by:".dimmed(), cause);
                source = cause.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
