//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check (no auth)
//!
//! # Auth
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Exchange credentials for a backend token
//! POST /auth/logout                - Logout
//!
//! # Dashboard
//! GET  /                           - Stats overview (refreshes every 30s)
//!
//! # Users
//! GET  /users                      - User listing (?page=&credit_filter=)
//! POST /users/{id}/credits         - Add or deduct credits for one user
//!
//! # Credits
//! GET  /credits                    - Ledger and stats (?page=)
//! POST /credits/bulk-add           - Grant credits to several users
//!
//! # Commands
//! GET  /commands                   - Commands by category (?edit=)
//! POST /commands                   - Create command
//! POST /commands/{id}              - Update command
//! POST /commands/{id}/toggle       - Flip active flag
//! POST /commands/{id}/delete       - Delete command
//! ```
//!
//! Mutations answer with a redirect on success. On failure the page is
//! rendered again with the message next to the form that was submitted.

pub mod auth;
pub mod commands;
pub mod credits;
pub mod dashboard;
pub mod users;

use askama::Template;
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};

use crate::api::ApiError;
use crate::error::AppError;
use crate::state::AppState;

/// Build the admin router (without middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(users::router())
        .merge(credits::router())
        .merge(commands::router())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Render a page, logging template failures.
fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Render a page that reports a rejected form submission.
fn render_rejected(template: &impl Template) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, render(template)).into_response()
}

/// Turn a failed backend mutation into a message for the page.
///
/// An expired token is not a form error: it propagates so the session
/// ends and the admin is sent to the login page.
fn inline_error(err: ApiError) -> Result<String, AppError> {
    if err.is_unauthorized() {
        return Err(err.into());
    }
    tracing::warn!(error = %err, "Bot API rejected mutation");
    Ok(err.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_error_keeps_backend_message() {
        let message = inline_error(ApiError::Status {
            status: 400,
            message: Some("User not found".to_string()),
        });
        assert_eq!(message.ok().as_deref(), Some("User not found"));
    }

    #[test]
    fn test_inline_error_propagates_unauthorized() {
        let result = inline_error(ApiError::Unauthorized { message: None });
        assert!(matches!(
            result,
            Err(AppError::Api(ApiError::Unauthorized { .. }))
        ));
    }
}
