//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::*;

/// Dochazka - attendance records and monthly reports
#[derive(Parser)]
#[command(name = "dochazka")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server until Ctrl+C (default)
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Record a badge swipe
    Punch {
        /// Card number of the badge
        card_number: i64,
        /// Time of the swipe, "YYYY-MM-DD HH:MM[:SS]"; defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_punch() {
        let cli = Cli::try_parse_from(["dochazka", "punch", "42", "--at", "2024-03-01 08:00"])
            .unwrap();
        match cli.command {
            Some(Commands::Punch { card_number, at }) => {
                assert_eq!(card_number, 42);
                assert_eq!(at.as_deref(), Some("2024-03-01 08:00"));
            }
            _ => panic!("expected punch"),
        }
    }

    #[test]
    fn test_daemon_alias() {
        let cli = Cli::try_parse_from(["dochazka", "daemon"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));

        let cli = Cli::try_parse_from(["dochazka"]).unwrap();
        assert!(cli.command.is_none());
    }
}
