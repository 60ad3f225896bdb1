//! Integration tests for the AI-IQ admin dashboard.
//!
//! The full router (sessions, auth extractor, query cache and templates) is
//! driven in-process with `tower::ServiceExt::oneshot`. The bot backend is
//! replaced by [`MockBackend`], an in-memory implementation of
//! [`BotApi`] that records every call so tests can assert on the exact
//! number of backend requests.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p aiq-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use secrecy::{ExposeSecret, SecretString};
use tower::ServiceExt;

use aiq_admin::api::{ApiError, ApiToken, BotApi, CachedApi, LoginSuccess, QueryCache, UserQuery};
use aiq_admin::config::{AdminConfig, BotApiConfig, CacheConfig};
use aiq_admin::middleware::SESSION_COOKIE_NAME;
use aiq_admin::state::AppState;
use aiq_core::forms::{BulkCreditGrant, CommandDraft, CreditAdjustment};
use aiq_core::{
    Admin, AdminId, AdminRole, Command, CommandId, CreditFilter, CreditStats, CreditTransaction,
    DashboardCreditStats, DashboardStats, Page, Pagination, Ref, TransactionId, TransactionType,
    User, UserId,
};

/// Username accepted by [`MockBackend::login`].
pub const ADMIN_USERNAME: &str = "admin";
/// Password accepted by [`MockBackend::login`].
pub const ADMIN_PASSWORD: &str = "secret";
/// Token issued on a successful login.
pub const ADMIN_TOKEN: &str = "test-token";

// ============================================================================
// Mock backend
// ============================================================================

/// In-memory bot backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<BackendState>>,
}

#[derive(Default)]
struct BackendState {
    users: Vec<User>,
    commands: Vec<Command>,
    transactions: Vec<CreditTransaction>,
    calls: Vec<&'static str>,
    tokens_revoked: bool,
    next_id: u32,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn credit(&mut self, user_id: &UserId, amount: i64, reason: &str) -> Result<(), ApiError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| &u.id == user_id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: Some("User not found".to_string()),
            })?;
        user.credits += amount;

        let id = self.next_id("tx");
        self.transactions.insert(
            0,
            CreditTransaction {
                id: TransactionId::new(id),
                user: Ref::Id(user_id.clone()),
                amount,
                kind: TransactionType::AdminAdd,
                reason: reason.to_string(),
                added_by_admin: Some(Ref::Id(AdminId::new("a1"))),
                created_at: None,
            },
        );
        Ok(())
    }
}

impl MockBackend {
    /// Backend seeded with a few users and commands.
    #[must_use]
    pub fn seeded() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state();
            state.users = vec![
                user("u1", "Somchai", 0),
                user("u2", "Malee", 3),
                user("u3", "Anan", 40),
                user("u4", "Pim", 120),
            ];
            state.commands = vec![
                command("c1", "/help", "general", true),
                command("c2", "/weather", "tools", true),
                command("c3", "/legacy", "", false),
            ];
        }
        backend
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and check its token; `None` for unauthenticated calls.
    fn record(
        &self,
        call: &'static str,
        token: Option<&ApiToken>,
    ) -> Result<MutexGuard<'_, BackendState>, ApiError> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(token) = token
            && (state.tokens_revoked || token.expose_secret() != ADMIN_TOKEN)
        {
            return Err(ApiError::Unauthorized {
                message: Some("Invalid token".to_string()),
            });
        }
        Ok(state)
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    /// Number of calls to one operation.
    #[must_use]
    pub fn count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == call).count()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    /// Make every token-bearing call answer 401 from now on.
    pub fn revoke_tokens(&self) {
        self.state().tokens_revoked = true;
    }

    /// Current balance of a user.
    #[must_use]
    pub fn credits_of(&self, id: &str) -> Option<i64> {
        self.state()
            .users
            .iter()
            .find(|u| u.id.as_str() == id)
            .map(|u| u.credits)
    }

    /// Current state of a command.
    #[must_use]
    pub fn command(&self, id: &str) -> Option<Command> {
        self.state()
            .commands
            .iter()
            .find(|c| c.id.as_str() == id)
            .cloned()
    }
}

fn user(id: &str, name: &str, credits: i64) -> User {
    User {
        id: UserId::new(id),
        line_user_id: format!("U{id}"),
        display_name: name.to_string(),
        credits,
        interaction_count: 0,
        last_interaction: None,
        first_interaction: None,
        credits_used: None,
        credits_received: None,
    }
}

fn command(id: &str, text: &str, category: &str, is_active: bool) -> Command {
    Command {
        id: CommandId::new(id),
        text: text.to_string(),
        category: category.to_string(),
        description: None,
        is_active,
        created_at: None,
        updated_at: None,
    }
}

fn admin() -> Admin {
    Admin {
        id: AdminId::new("a1"),
        username: ADMIN_USERNAME.to_string(),
        name: "Test Admin".to_string(),
        email: String::new(),
        role: AdminRole::SuperAdmin,
        created_at: None,
    }
}

const fn matches_filter(filter: CreditFilter, credits: i64) -> bool {
    match filter {
        CreditFilter::All => true,
        CreditFilter::NoCredits => credits <= 0,
        CreditFilter::LowCredits => credits > 0 && credits <= CreditFilter::LOW_CREDIT_THRESHOLD,
        CreditFilter::HighCredits => credits > CreditFilter::HIGH_CREDIT_THRESHOLD,
    }
}

fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> Page<T> {
    let limit = limit.max(1);
    let total = items.len();
    let pages = u32::try_from(total.div_ceil(limit as usize))
        .unwrap_or(u32::MAX)
        .max(1);
    let data = items
        .iter()
        .skip((page.saturating_sub(1) * limit) as usize)
        .take(limit as usize)
        .cloned()
        .collect();
    Page::new(
        data,
        Pagination {
            total: total as u64,
            page,
            pages,
        },
    )
}

#[async_trait]
impl BotApi for MockBackend {
    async fn login(&self, username: &str, password: &SecretString) -> Result<LoginSuccess, ApiError> {
        let _state = self.record("login", None)?;
        if username == ADMIN_USERNAME && password.expose_secret() == ADMIN_PASSWORD {
            Ok(LoginSuccess {
                token: ApiToken::new(ADMIN_TOKEN),
                admin: admin(),
            })
        } else {
            Err(ApiError::Unauthorized {
                message: Some("Invalid credentials".to_string()),
            })
        }
    }

    async fn current_admin(&self, token: &ApiToken) -> Result<Admin, ApiError> {
        let _state = self.record("current_admin", Some(token))?;
        Ok(admin())
    }

    async fn dashboard(&self, token: &ApiToken) -> Result<DashboardStats, ApiError> {
        let state = self.record("dashboard", Some(token))?;
        Ok(DashboardStats {
            total_users: i64::try_from(state.users.len()).unwrap_or(i64::MAX),
            credit_stats: DashboardCreditStats {
                total_credits: state.users.iter().map(|u| u.credits).sum(),
                users_with_no_credits: i64::try_from(
                    state.users.iter().filter(|u| u.credits <= 0).count(),
                )
                .unwrap_or(i64::MAX),
                ..DashboardCreditStats::default()
            },
            ..DashboardStats::default()
        })
    }

    async fn list_users(
        &self,
        token: &ApiToken,
        query: &UserQuery,
    ) -> Result<Page<User>, ApiError> {
        let state = self.record("list_users", Some(token))?;
        let matching: Vec<User> = state
            .users
            .iter()
            .filter(|u| matches_filter(query.filter, u.credits))
            .cloned()
            .collect();
        Ok(paginate(&matching, query.page, query.limit))
    }

    async fn adjust_user_credits(
        &self,
        token: &ApiToken,
        user_id: &UserId,
        adjustment: &CreditAdjustment,
    ) -> Result<(), ApiError> {
        let mut state = self.record("adjust_user_credits", Some(token))?;
        state.credit(user_id, adjustment.amount, &adjustment.reason)
    }

    async fn list_transactions(
        &self,
        token: &ApiToken,
        page: u32,
    ) -> Result<Page<CreditTransaction>, ApiError> {
        let state = self.record("list_transactions", Some(token))?;
        Ok(paginate(
            &state.transactions,
            page,
            aiq_admin::api::TRANSACTIONS_PAGE_SIZE,
        ))
    }

    async fn credit_stats(&self, token: &ApiToken) -> Result<CreditStats, ApiError> {
        let state = self.record("credit_stats", Some(token))?;
        Ok(CreditStats {
            total_credits: state.users.iter().map(|u| u.credits).sum(),
            added_by_admin: state.transactions.iter().map(|t| t.amount).sum(),
            ..CreditStats::default()
        })
    }

    async fn bulk_add_credits(
        &self,
        token: &ApiToken,
        grant: &BulkCreditGrant,
    ) -> Result<(), ApiError> {
        let mut state = self.record("bulk_add_credits", Some(token))?;
        for user_id in &grant.user_ids {
            state.credit(user_id, grant.amount, &grant.reason)?;
        }
        Ok(())
    }

    async fn list_commands(&self, token: &ApiToken) -> Result<Vec<Command>, ApiError> {
        let state = self.record("list_commands", Some(token))?;
        Ok(state.commands.clone())
    }

    async fn create_command(&self, token: &ApiToken, draft: &CommandDraft) -> Result<(), ApiError> {
        let mut state = self.record("create_command", Some(token))?;
        if state.commands.iter().any(|c| c.text == draft.text) {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Command already exists".to_string()),
            });
        }
        let id = state.next_id("c");
        let mut created = command(&id, &draft.text, &draft.category, true);
        created.description = Some(draft.description.clone());
        state.commands.push(created);
        Ok(())
    }

    async fn update_command(
        &self,
        token: &ApiToken,
        id: &CommandId,
        draft: &CommandDraft,
    ) -> Result<(), ApiError> {
        let mut state = self.record("update_command", Some(token))?;
        let command = find_command(&mut state, id)?;
        command.text.clone_from(&draft.text);
        command.category.clone_from(&draft.category);
        command.description = Some(draft.description.clone());
        Ok(())
    }

    async fn toggle_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError> {
        let mut state = self.record("toggle_command", Some(token))?;
        let command = find_command(&mut state, id)?;
        command.is_active = !command.is_active;
        Ok(())
    }

    async fn delete_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError> {
        let mut state = self.record("delete_command", Some(token))?;
        find_command(&mut state, id)?;
        state.commands.retain(|c| &c.id != id);
        Ok(())
    }
}

fn find_command<'a>(
    state: &'a mut BackendState,
    id: &CommandId,
) -> Result<&'a mut Command, ApiError> {
    state
        .commands
        .iter_mut()
        .find(|c| &c.id == id)
        .ok_or_else(|| ApiError::Status {
            status: 404,
            message: Some("Command not found".to_string()),
        })
}

// ============================================================================
// Test application
// ============================================================================

/// Configuration for an in-process dashboard over plain HTTP.
#[must_use]
pub fn test_config() -> AdminConfig {
    AdminConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3001".to_string(),
        bot_api: BotApiConfig::default(),
        cache: CacheConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// The dashboard router wired to a [`MockBackend`] through the real query cache.
pub struct TestApp {
    pub router: Router,
    pub backend: MockBackend,
}

impl TestApp {
    /// App over a seeded backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(MockBackend::seeded())
    }

    #[must_use]
    pub fn with_backend(backend: MockBackend) -> Self {
        let config = test_config();
        let api = CachedApi::new(backend.clone(), QueryCache::new(config.cache));
        let state = AppState::with_api(config, Arc::new(api));
        Self {
            router: aiq_admin::app(state),
            backend,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// GET a path, optionally with a session cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(build_request("GET", path, cookie, None)).await
    }

    /// POST a url-encoded form, optionally with a session cookie.
    pub async fn post_form(&self, path: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(build_request("POST", path, cookie, Some(form))).await
    }

    /// Log in with the seeded credentials and return the session cookie.
    ///
    /// Returns `None` if the login did not establish a session.
    pub async fn login(&self) -> Option<String> {
        let form = format!("username={ADMIN_USERNAME}&password={ADMIN_PASSWORD}");
        let response = self.post_form("/auth/login", &form, None).await;
        session_cookie(&response)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn build_request(
    method: &str,
    path: &str,
    cookie: Option<&str>,
    form: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match form {
        Some(form) => {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            Body::from(form.to_string())
        }
        None => Body::empty(),
    };
    builder
        .body(body)
        .unwrap_or_else(|_| Request::new(Body::empty()))
}

/// `name=value` pair of the session cookie set by a response.
#[must_use]
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string)
}

/// `Location` header of a redirect.
#[must_use]
pub fn location<B>(response: &Response<B>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

/// Collect a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    match response.into_body().collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(_) => String::new(),
    }
}
