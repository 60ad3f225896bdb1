//! Authentication route handlers for admin.
//!
//! Username and password are exchanged with the bot backend for a bearer
//! token; the token and the admin profile are kept in the session.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::ApiError;
use crate::error::{AppError, set_sentry_user};
use crate::filters;
use crate::middleware::{LOGIN_PATH, clear_admin_session, set_admin_session, take_flash};
use crate::models::{AdminSession, session_keys};
use crate::state::AppState;

use super::{render, render_rejected};

/// Message shown when the backend gives no reason for a failed login.
const LOGIN_FAILED: &str = "Login failed";

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPageTemplate {
    username: String,
    error: Option<String>,
    notice: Option<String>,
}

/// Login form input.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

/// Render the login page.
///
/// GET /auth/login
async fn login_page(session: Session) -> Response {
    let logged_in = session
        .get::<AdminSession>(session_keys::ADMIN_SESSION)
        .await
        .ok()
        .flatten()
        .is_some();
    if logged_in {
        return Redirect::to("/").into_response();
    }

    render(&LoginPageTemplate {
        username: String::new(),
        error: None,
        notice: take_flash(&session).await,
    })
    .into_response()
}

/// Exchange credentials for a session.
///
/// POST /auth/login
#[instrument(skip(state, session, form), fields(username = %form.username))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    if username.is_empty() || form.password.is_empty() {
        return Ok(render_rejected(&LoginPageTemplate {
            username,
            error: Some("Username and password are required".to_string()),
            notice: None,
        }));
    }

    let password = SecretString::from(form.password);
    match state.api().login(&username, &password).await {
        Ok(success) => {
            set_sentry_user(success.admin.id.as_str(), &success.admin.username);
            info!(admin_id = %success.admin.id, "Admin logged in");
            set_admin_session(
                &session,
                &AdminSession {
                    admin: success.admin,
                    token: success.token,
                },
            )
            .await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            warn!(error = %err, "Login rejected");
            Ok(render_rejected(&LoginPageTemplate {
                username,
                error: Some(login_error_message(&err)),
                notice: None,
            }))
        }
    }
}

/// Backend's reason for a failed login, or a generic one.
fn login_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized {
            message: Some(message),
        }
        | ApiError::Status {
            message: Some(message),
            ..
        } => message.clone(),
        ApiError::Unauthorized { message: None } | ApiError::Status { message: None, .. } => {
            LOGIN_FAILED.to_string()
        }
        other => other.user_message(),
    }
}

/// Logout and clear session.
///
/// POST /auth/logout
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_admin_session(&session).await {
        warn!(error = %e, "Failed to clear session on logout");
    }

    Redirect::to(LOGIN_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_message() {
        let err = ApiError::Unauthorized {
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(login_error_message(&err), "Invalid credentials");

        let err = ApiError::Unauthorized { message: None };
        assert_eq!(login_error_message(&err), LOGIN_FAILED);

        let err = ApiError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(login_error_message(&err), LOGIN_FAILED);
    }

    #[test]
    fn test_login_form_debug_redacts_password() {
        let form = LoginForm {
            username: "nok".to_string(),
            password: "hunter2".to_string(),
        };
        let debug_output = format!("{form:?}");
        assert!(debug_output.contains("nok"));
        assert!(!debug_output.contains("hunter2"));
    }
}
