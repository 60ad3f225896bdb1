//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use aiq_core::Admin;

use crate::api::ApiToken;

/// Session-stored admin identity.
///
/// Holds the profile returned by the backend at login and the bearer token
/// every backend call is made with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    /// Profile of the logged-in admin.
    pub admin: Admin,
    /// Backend bearer token.
    pub token: ApiToken,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const ADMIN_SESSION: &str = "admin_session";

    /// One-shot notice shown on the next rendered page.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aiq_core::{AdminId, AdminRole};

    #[test]
    fn test_session_round_trips_token() {
        let session = AdminSession {
            admin: Admin {
                id: AdminId::new("a1"),
                username: "nok".to_string(),
                name: "Nok".to_string(),
                email: "nok@example.com".to_string(),
                role: AdminRole::SuperAdmin,
                created_at: None,
            },
            token: ApiToken::new("tok"),
        };

        let stored = serde_json::to_value(&session).unwrap();
        assert_eq!(stored["token"], "tok");

        let restored: AdminSession = serde_json::from_value(stored).unwrap();
        assert_eq!(restored.token.expose_secret(), "tok");
        assert_eq!(restored.admin.role, AdminRole::SuperAdmin);
    }
}
