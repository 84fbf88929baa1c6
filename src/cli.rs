//! Command-line interface definitions using clap derive API.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Tutoring Platform CLI
#[derive(Parser)]
#[command(name = "tutor-cli")]
#[command(about = "An adaptive tutoring orchestration platform")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to; overrides the configured host and port
        #[arg(long)]
        addr: Option<SocketAddr>,

        /// Settings file layered over the bundled defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Replay a tutoring session from a configuration file
    Run {
        /// Path to the session configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn serve_accepts_addr_and_config_overrides() {
        let cli = Cli::parse_from([
            "tutor-cli",
            "serve",
            "--addr",
            "0.0.0.0:9000",
            "--config",
            "deploy.toml",
        ]);
        match cli.command {
            Commands::Serve { addr, config } => {
                assert_eq!(addr.unwrap().port(), 9000);
                assert_eq!(config.unwrap(), PathBuf::from("deploy.toml"));
            }
            Commands::Run { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn serve_defaults_to_configured_listen_address() {
        let cli = Cli::parse_from(["tutor-cli", "serve"]);
        match cli.command {
            Commands::Serve { addr, config } => {
                assert!(addr.is_none());
                assert!(config.is_none());
            }
            Commands::Run { .. } => panic!("parsed the wrong subcommand"),
        }
    }
}
