//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Session expiry (flush the session when the backend rejects the token)

pub mod auth;
pub mod session;

pub use auth::{
    AdminAuthRejection, LOGIN_PATH, RequireAdminAuth, SessionExpired, clear_admin_session,
    expire_session_on_unauthorized, set_admin_session, set_flash, take_flash,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
