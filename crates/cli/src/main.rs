//! AI-IQ CLI - operator tools for the bot backend.
//!
//! # Usage
//!
//! ```bash
//! # Obtain a token (password from AIQ_PASSWORD)
//! export AIQ_TOKEN=$(aiq-cli login -u admin)
//!
//! # List users that ran out of credits
//! aiq-cli users --filter no-credits
//!
//! # Grant credits
//! aiq-cli credits add <user-id> 10 --reason "support ticket"
//! aiq-cli credits bulk-add --users id1,id2 25
//!
//! # Commands
//! aiq-cli commands list
//! aiq-cli commands toggle <command-id>
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aiq_core::CreditFilter;

mod commands;

#[derive(Parser)]
#[command(name = "aiq-cli")]
#[command(author, version, about = "AI-IQ bot operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a bearer token
    Login {
        /// Admin username
        #[arg(short, long)]
        username: String,
    },
    /// List users
    Users {
        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<u32>,

        /// Balance filter (`no-credits`, `low-credits`, `high-credits`)
        #[arg(short, long, value_parser = parse_filter, default_value = "all")]
        filter: CreditFilter,
    },
    /// Adjust user credits
    Credits {
        #[command(subcommand)]
        action: CreditsAction,
    },
    /// Manage bot commands
    Commands {
        #[command(subcommand)]
        action: CommandsAction,
    },
}

#[derive(Subcommand)]
enum CreditsAction {
    /// Add credits to one user (negative amounts deduct)
    Add {
        /// User id
        user_id: String,

        /// Non-zero whole number
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// Reason recorded in the ledger
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// Grant the same amount to several users
    BulkAdd {
        /// Comma separated user ids
        #[arg(short, long)]
        users: String,

        /// Non-zero whole number
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// Reason recorded in the ledger
        #[arg(short, long, default_value = "")]
        reason: String,
    },
}

#[derive(Subcommand)]
enum CommandsAction {
    /// List every command
    List,
    /// Activate or deactivate a command
    Toggle {
        /// Command id
        id: String,
    },
}

fn parse_filter(raw: &str) -> Result<CreditFilter, String> {
    raw.parse()
}

/// Log filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

fn log_filter(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries listings and the login token.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Login { username } => commands::auth::login(&username).await?,
        Commands::Users { page, filter } => commands::users::list(page, filter).await?,
        Commands::Credits { action } => match action {
            CreditsAction::Add {
                user_id,
                amount,
                reason,
            } => commands::credits::add(&user_id, &amount, &reason).await?,
            CreditsAction::BulkAdd {
                users,
                amount,
                reason,
            } => commands::credits::bulk_add(&users, &amount, &reason).await?,
        },
        Commands::Commands { action } => match action {
            CommandsAction::List => commands::bot_commands::list().await?,
            CommandsAction::Toggle { id } => commands::bot_commands::toggle(&id).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_amount_is_accepted() {
        let cli = Cli::try_parse_from(["aiq-cli", "credits", "add", "u1", "-5"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_info_is_logged_without_rust_log() {
        let filter = log_filter(None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

        let filter = log_filter(Some("aiq_cli=loud"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

        let filter = log_filter(Some("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!(parse_filter("low-credits"), Ok(CreditFilter::LowCredits));
        assert!(parse_filter("lots").is_err());
    }
}
