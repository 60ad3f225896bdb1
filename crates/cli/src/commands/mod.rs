//! Subcommand implementations.
//!
//! # Environment Variables
//!
//! - `BOT_API_URL` - Bot backend REST API base URL (default: <http://localhost:5000/api>)
//! - `BOT_API_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `AIQ_TOKEN` - Bearer token for every command except `login`
//! - `AIQ_PASSWORD` - Password for `login`

pub mod auth;
pub mod bot_commands;
pub mod credits;
pub mod users;

use thiserror::Error;

use aiq_admin::api::{ApiError, ApiToken, BotApiClient};
use aiq_admin::config::{BotApiConfig, ConfigError};
use aiq_core::forms::FormError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Backend settings are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend call failed.
    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),

    /// Arguments failed validation.
    #[error("Invalid input: {0}")]
    Input(#[from] FormError),
}

/// Build a backend client from the environment.
pub fn client() -> Result<BotApiClient, CliError> {
    dotenvy::dotenv().ok();
    let config = BotApiConfig::from_env()?;
    Ok(BotApiClient::new(&config)?)
}

/// Read the bearer token from `AIQ_TOKEN`.
pub fn token() -> Result<ApiToken, CliError> {
    std::env::var("AIQ_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(ApiToken::new)
        .ok_or(CliError::MissingEnvVar("AIQ_TOKEN"))
}
