//! Main entry point for the Tutoring Platform CLI.

use anyhow::Result;
use clap::Parser;
use tutor_platform::{batch, cli, server, settings::Settings, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::Cli::parse();

    // Execute the requested command
    match args.command {
        cli::Commands::Serve { addr, config } => {
            let mut settings = Settings::load_from(config.as_deref())?;
            telemetry::init(&settings.logging)?;
            if let Some(addr) = addr {
                settings.server.host = addr.ip().to_string();
                settings.server.port = addr.port();
            }
            server::serve(&settings).await
        }
        cli::Commands::Run { config } => {
            let settings = Settings::load()?;
            telemetry::init(&settings.logging)?;
            batch::run(config, settings).await
        }
    }
}
