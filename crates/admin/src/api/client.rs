//! Bot backend REST client.
//!
//! Thin `reqwest` wrapper: builds endpoint URLs below the configured API
//! prefix, attaches the bearer token and maps statuses onto [`ApiError`].
//! No retries and no backoff; each call is awaited individually.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use aiq_core::forms::{BulkCreditGrant, CommandDraft, CreditAdjustment};
use aiq_core::{
    Admin, Command, CommandId, CreditStats, CreditTransaction, DashboardStats, Page, User, UserId,
};

use super::types::{
    CurrentAdminResponse, ErrorBody, LoginRequest, LoginResponse, TransactionsResponse,
    UsersResponse,
};
use super::{ApiError, ApiToken, BotApi, LoginSuccess, TRANSACTIONS_PAGE_SIZE, UserQuery};
use crate::config::BotApiConfig;

/// Client for the bot backend REST API.
#[derive(Clone)]
pub struct BotApiClient {
    inner: Arc<BotApiClientInner>,
}

struct BotApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl BotApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BotApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(BotApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The API prefix every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint path with optional query parameters.
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: Option<&ApiToken>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &ApiToken,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, params)?;
        let response = self.request(Method::GET, url, Some(token)).send().await?;
        decode(check_status(response).await?).await
    }

    /// Send a mutation and discard the response body.
    async fn send<B: Serialize + Sync>(
        &self,
        token: &ApiToken,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(path, &[])?;
        let mut builder = self.request(method, url, Some(token));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

/// Map non-success statuses onto `ApiError`.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized { message });
    }

    debug!(status = status.as_u16(), ?message, "Bot API error response");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl BotApi for BotApiClient {
    #[instrument(skip(self, password))]
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginSuccess, ApiError> {
        let url = self.endpoint("auth/login", &[])?;
        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };
        let response = self
            .request(Method::POST, url, None)
            .json(&body)
            .send()
            .await?;
        let login: LoginResponse = decode(check_status(response).await?).await?;

        let token = ApiToken::new(login.token);
        let admin = match login.admin {
            Some(admin) => admin,
            None => self.current_admin(&token).await?,
        };
        Ok(LoginSuccess { token, admin })
    }

    #[instrument(skip(self, token))]
    async fn current_admin(&self, token: &ApiToken) -> Result<Admin, ApiError> {
        let response: CurrentAdminResponse = self.get_json(token, "auth/me", &[]).await?;
        Ok(response.into_admin())
    }

    #[instrument(skip(self, token))]
    async fn dashboard(&self, token: &ApiToken) -> Result<DashboardStats, ApiError> {
        self.get_json(token, "admin/dashboard", &[]).await
    }

    #[instrument(skip(self, token))]
    async fn list_users(
        &self,
        token: &ApiToken,
        query: &UserQuery,
    ) -> Result<Page<User>, ApiError> {
        let response: UsersResponse = self
            .get_json(token, "admin/users", &query.to_params())
            .await?;
        Ok(Page::new(response.users, response.pagination))
    }

    #[instrument(skip(self, token), fields(user_id = %user_id, amount = adjustment.amount))]
    async fn adjust_user_credits(
        &self,
        token: &ApiToken,
        user_id: &UserId,
        adjustment: &CreditAdjustment,
    ) -> Result<(), ApiError> {
        let path = format!("admin/credits/add/{}", encode_segment(user_id.as_str()));
        self.send(token, Method::POST, &path, Some(adjustment)).await
    }

    #[instrument(skip(self, token))]
    async fn list_transactions(
        &self,
        token: &ApiToken,
        page: u32,
    ) -> Result<Page<CreditTransaction>, ApiError> {
        let params = [
            ("page", page.to_string()),
            ("limit", TRANSACTIONS_PAGE_SIZE.to_string()),
        ];
        let response: TransactionsResponse = self
            .get_json(token, "admin/credits/transactions", &params)
            .await?;
        Ok(Page::new(response.transactions, response.pagination))
    }

    #[instrument(skip(self, token))]
    async fn credit_stats(&self, token: &ApiToken) -> Result<CreditStats, ApiError> {
        self.get_json(token, "admin/credits/stats", &[]).await
    }

    #[instrument(skip(self, token, grant), fields(users = grant.user_ids.len(), amount = grant.amount))]
    async fn bulk_add_credits(
        &self,
        token: &ApiToken,
        grant: &BulkCreditGrant,
    ) -> Result<(), ApiError> {
        self.send(token, Method::POST, "admin/credits/bulk-add", Some(grant))
            .await
    }

    #[instrument(skip(self, token))]
    async fn list_commands(&self, token: &ApiToken) -> Result<Vec<Command>, ApiError> {
        self.get_json(token, "admin/commands", &[]).await
    }

    #[instrument(skip(self, token))]
    async fn create_command(
        &self,
        token: &ApiToken,
        draft: &CommandDraft,
    ) -> Result<(), ApiError> {
        self.send(token, Method::POST, "admin/commands", Some(draft))
            .await
    }

    #[instrument(skip(self, token), fields(command_id = %id))]
    async fn update_command(
        &self,
        token: &ApiToken,
        id: &CommandId,
        draft: &CommandDraft,
    ) -> Result<(), ApiError> {
        let path = format!("admin/commands/{}", encode_segment(id.as_str()));
        self.send(token, Method::PUT, &path, Some(draft)).await
    }

    #[instrument(skip(self, token), fields(command_id = %id))]
    async fn toggle_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError> {
        let path = format!(
            "admin/commands/{}/toggle-active",
            encode_segment(id.as_str())
        );
        self.send::<()>(token, Method::PATCH, &path, None).await
    }

    #[instrument(skip(self, token), fields(command_id = %id))]
    async fn delete_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError> {
        let path = format!("admin/commands/{}", encode_segment(id.as_str()));
        self.send::<()>(token, Method::DELETE, &path, None).await
    }
}

/// Percent-encode an id for use as a single path segment.
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
