//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::api::ApiError;
use crate::middleware::{LOGIN_PATH, SessionExpired};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bot backend call failed.
    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // An expired token ends the session rather than failing the page
        if let Self::Api(ApiError::Unauthorized { .. }) = self {
            let mut response = Redirect::to(LOGIN_PATH).into_response();
            response.extensions_mut().insert(SessionExpired);
            return response;
        }

        // Log server errors with Sentry
        if matches!(self, Self::Api(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Api(ApiError::Status { status: 404, .. }) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Api(_) => StatusCode::BAD_GATEWAY,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Api(err) => format!("Bot API error: {}", err.user_message()),
            Self::NotFound(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Attach the logged-in admin to Sentry events of the current request.
///
/// `NewSentryLayer` binds a fresh hub to every request, so the user set here
/// is dropped with the request and never reaches another admin's events.
pub fn set_sentry_user(admin_id: &str, username: &str) {
    sentry::Hub::current().configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_sentry_user_stays_on_the_request_hub() {
        let events = sentry::test::with_captured_events(|| {
            let request_hub = Arc::new(sentry::Hub::new_from_top(sentry::Hub::current()));
            sentry::Hub::run(request_hub, || {
                set_sentry_user("a1", "nok");
                sentry::capture_message("during request", sentry::Level::Info);
            });
            sentry::capture_message("another request", sentry::Level::Info);
        });

        assert_eq!(events.len(), 2);
        let username = |i: usize| events[i].user.as_ref().and_then(|u| u.username.clone());
        assert_eq!(username(0).as_deref(), Some("nok"));
        assert_eq!(username(1), None);
    }

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("command c1".to_string());
        assert_eq!(err.to_string(), "Not found: command c1");

        let err = AppError::Internal("session: store unavailable".to_string());
        assert_eq!(err.to_string(), "Internal error: session: store unavailable");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Status {
                status: 500,
                message: None
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Status {
                status: 404,
                message: None
            })),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_unauthorized_api_error_redirects_and_marks_response() {
        let response = AppError::Api(ApiError::Unauthorized { message: None }).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").map(|v| v.as_bytes()),
            Some(LOGIN_PATH.as_bytes())
        );
        assert!(response.extensions().get::<SessionExpired>().is_some());
    }
}
