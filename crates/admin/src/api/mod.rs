//! Bot backend REST API.
//!
//! # Architecture
//!
//! - [`BotApi`] is the seam every screen talks to
//! - [`BotApiClient`] implements it over HTTPS with `reqwest`
//! - [`CachedApi`] decorates any `BotApi` with a `moka` query cache keyed by
//!   query parameters, invalidated after successful mutations
//!
//! # Authentication
//!
//! Every call except `login` carries the admin's bearer token. A 401 from
//! any call surfaces as [`ApiError::Unauthorized`]; the web layer reacts by
//! clearing the session and redirecting to the login page.

pub mod cache;
pub mod cached;
pub mod client;
pub mod types;

pub use cache::{CachedValue, QueryCache, QueryKey, Resource};
pub use cached::CachedApi;
pub use client::{BotApiClient, encode_segment};
pub use types::{ApiToken, LoginSuccess, UserQuery};

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use aiq_core::forms::{BulkCreditGrant, CommandDraft, CreditAdjustment};
use aiq_core::{
    Admin, Command, CommandId, CreditStats, CreditTransaction, DashboardStats, Page, User, UserId,
};

/// Page size of the user listing.
pub const USERS_PAGE_SIZE: u32 = 10;
/// Page size of the credit ledger.
pub const TRANSACTIONS_PAGE_SIZE: u32 = 20;

/// Errors that can occur when calling the bot backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token or the credentials.
    #[error("Unauthorized")]
    Unauthorized {
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The backend answered with a non-success status.
    #[error("Bot API returned {status}{}", format_message(.message))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

fn format_message(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Whether the backend rejected the session token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether the backend could not answer at all: transport failure or 5xx.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Message suitable for showing next to the form that triggered the call.
    ///
    /// Prefers the backend's own message; falls back to a generic text so
    /// transport details never reach the page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized {
                message: Some(message),
            }
            | Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Unauthorized { message: None } => "Your session has expired".to_string(),
            Self::Status { status, .. } => format!("Request failed ({status})"),
            Self::Http(_) => "The bot server could not be reached".to_string(),
            Self::Parse(_) | Self::InvalidUrl(_) => {
                "The bot server sent an unexpected response".to_string()
            }
        }
    }
}

/// Operations the dashboard performs against the bot backend.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, username: &str, password: &SecretString)
    -> Result<LoginSuccess, ApiError>;

    /// Look up the admin the token belongs to.
    async fn current_admin(&self, token: &ApiToken) -> Result<Admin, ApiError>;

    /// Aggregate counts and time series.
    async fn dashboard(&self, token: &ApiToken) -> Result<DashboardStats, ApiError>;

    /// One page of users, optionally filtered by balance.
    async fn list_users(&self, token: &ApiToken, query: &UserQuery)
    -> Result<Page<User>, ApiError>;

    /// Add (or, with a negative amount, deduct) credits for one user.
    async fn adjust_user_credits(
        &self,
        token: &ApiToken,
        user_id: &UserId,
        adjustment: &CreditAdjustment,
    ) -> Result<(), ApiError>;

    /// One page of the credit ledger, newest first.
    async fn list_transactions(
        &self,
        token: &ApiToken,
        page: u32,
    ) -> Result<Page<CreditTransaction>, ApiError>;

    /// Ledger aggregates.
    async fn credit_stats(&self, token: &ApiToken) -> Result<CreditStats, ApiError>;

    /// Grant the same amount to several users.
    async fn bulk_add_credits(
        &self,
        token: &ApiToken,
        grant: &BulkCreditGrant,
    ) -> Result<(), ApiError>;

    /// Every configured command.
    async fn list_commands(&self, token: &ApiToken) -> Result<Vec<Command>, ApiError>;

    /// Create a command.
    async fn create_command(&self, token: &ApiToken, draft: &CommandDraft)
    -> Result<(), ApiError>;

    /// Replace a command's text, category and description.
    async fn update_command(
        &self,
        token: &ApiToken,
        id: &CommandId,
        draft: &CommandDraft,
    ) -> Result<(), ApiError>;

    /// Flip a command's active flag.
    async fn toggle_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError>;

    /// Remove a command.
    async fn delete_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError>;
}
