//! Command line interface
//!
//! - `serve`: run the HTTP API
//! - `migrate`: manage the PostgreSQL schema

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// Avatar Directory - user directory with a content-addressed avatar cache
#[derive(Parser)]
#[command(name = "avatar-directory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,

    /// Run or revert database migrations
    Migrate(migrate::MigrateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["avatar-directory", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));
    }

    #[test]
    fn test_parse_migrate_revert() {
        let cli = Cli::try_parse_from(["avatar-directory", "migrate", "revert"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Migrate(migrate::MigrateArgs {
                action: migrate::MigrateAction::Revert
            })
        ));
    }

    #[test]
    fn test_migrate_defaults_to_run() {
        let cli = Cli::try_parse_from(["avatar-directory", "migrate"]).unwrap();
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate command");
        };
        assert!(matches!(args.action, migrate::MigrateAction::Run));
    }
}
