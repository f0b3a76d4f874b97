//! evpoll CLI - read battery state from connected vehicles

use clap::Parser;

use evpoll::cli::{self, Cli, Commands, GlobalOptions};
use evpoll::error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins over --debug
    let level = if cli.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Status { vehicle } => cli::status::run(&opts, vehicle.as_deref()).await,
        Commands::Login => cli::login::run().await,
        Commands::Version => {
            println!("evpoll version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
