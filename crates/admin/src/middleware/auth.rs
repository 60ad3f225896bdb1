//! Authentication middleware and extractors for admin.
//!
//! Provides the extractor guarding every dashboard page, the session
//! helpers used by login and logout, and the middleware that logs an
//! admin out once the backend stops accepting their token.

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::error::set_sentry_user;
use crate::models::{AdminSession, session_keys};

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Extractor that requires admin authentication.
///
/// If the admin is not logged in, redirects to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(session): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", session.admin.display_name())
/// }
/// ```
pub struct RequireAdminAuth(pub AdminSession);

/// Error returned when admin authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The session layer is missing from the stack.
    SessionUnavailable,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::SessionUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::SessionUnavailable)?;

        let admin: AdminSession = session
            .get(session_keys::ADMIN_SESSION)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::RedirectToLogin)?;

        set_sentry_user(admin.admin.id.as_str(), &admin.admin.username);
        Ok(Self(admin))
    }
}

/// Response marker: the backend rejected the session's token.
///
/// Attached by `AppError` and acted on by [`expire_session_on_unauthorized`].
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Flush the session when a handler reports an expired token.
///
/// Runs inside the session layer so the flushed state is persisted and the
/// cookie is cleared on the same response that redirects to the login page.
pub async fn expire_session_on_unauthorized(
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if response.extensions().get::<SessionExpired>().is_some() {
        match session.flush().await {
            Ok(()) => info!("Backend rejected session token, admin logged out"),
            Err(e) => warn!(error = %e, "Failed to flush expired session"),
        }
    }

    response
}

/// Helper to store the logged-in admin in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_admin_session(
    session: &Session,
    admin: &AdminSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::ADMIN_SESSION, admin).await
}

/// Helper to clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_admin_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Queue a notice for the next rendered page.
///
/// Flash notices are cosmetic; a failure to store one is logged and ignored.
pub async fn set_flash(session: &Session, message: impl Into<String>) {
    if let Err(e) = session.insert(session_keys::FLASH, message.into()).await {
        warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the queued notice, if any.
pub async fn take_flash(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
