//! Request and response shapes of the bot backend.

use serde::{Deserialize, Serialize};

use aiq_core::{Admin, CreditFilter, CreditTransaction, Pagination, User};

use super::USERS_PAGE_SIZE;

/// Bearer token issued by `POST /auth/login`.
///
/// Stored in the admin's session and attached to every backend call.
/// `Debug` is redacted so the token never lands in logs.
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: ApiToken,
    pub admin: Admin,
}

/// Parameters of the user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserQuery {
    pub page: u32,
    pub limit: u32,
    pub filter: CreditFilter,
}

impl UserQuery {
    /// Standard page of the user screen.
    #[must_use]
    pub const fn page(page: u32, filter: CreditFilter) -> Self {
        Self {
            page,
            limit: USERS_PAGE_SIZE,
            filter,
        }
    }

    /// Query-string pairs in the backend's naming.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(filter) = self.filter.query_value() {
            params.push(("creditFilter", filter.to_string()));
        }
        params
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of `POST /auth/login`.
///
/// Some backend versions omit the admin; the client then asks `/auth/me`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub admin: Option<Admin>,
}

/// Response of `GET /auth/me`, either wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CurrentAdminResponse {
    Wrapped { admin: Admin },
    Bare(Admin),
}

impl CurrentAdminResponse {
    pub fn into_admin(self) -> Admin {
        match self {
            Self::Wrapped { admin } | Self::Bare(admin) => admin,
        }
    }
}

/// Response of `GET /admin/users`.
#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Response of `GET /admin/credits/transactions`.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<CreditTransaction>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Error body the backend sends with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = ApiToken::new("eyJhbGciOiJIUzI1NiJ9.secret");
        let debug_output = format!("{token:?}");
        assert!(!debug_output.contains("secret"));
        assert_eq!(token.expose_secret(), "eyJhbGciOiJIUzI1NiJ9.secret");
    }

    #[test]
    fn test_user_query_params_skip_all_filter() {
        let params = UserQuery::page(2, CreditFilter::All).to_params();
        assert_eq!(
            params,
            vec![("page", "2".to_string()), ("limit", "10".to_string())]
        );

        let params = UserQuery::page(1, CreditFilter::NoCredits).to_params();
        assert!(params.contains(&("creditFilter", "no-credits".to_string())));
    }

    #[test]
    fn test_current_admin_response_shapes() {
        let wrapped: CurrentAdminResponse = serde_json::from_value(json!({
            "admin": { "_id": "a1", "username": "nok" }
        }))
        .unwrap();
        assert_eq!(wrapped.into_admin().username, "nok");

        let bare: CurrentAdminResponse =
            serde_json::from_value(json!({ "id": "a2", "username": "ploy" })).unwrap();
        assert_eq!(bare.into_admin().id.as_str(), "a2");
    }

    #[test]
    fn test_users_response_defaults_pagination() {
        let response: UsersResponse = serde_json::from_value(json!({ "users": [] })).unwrap();
        assert!(response.users.is_empty());
        assert_eq!(response.pagination.page, 1);
    }
}
