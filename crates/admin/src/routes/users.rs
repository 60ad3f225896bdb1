//! User listing and per-user credit adjustment.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use aiq_core::forms::CreditAdjustment;
use aiq_core::{CreditFilter, Page, User, UserId, normalize_page};

use crate::{
    api::{UserQuery, encode_segment},
    components::PagerView,
    error::AppError,
    filters,
    middleware::{RequireAdminAuth, set_flash, take_flash},
    models::AdminSession,
    state::AppState,
};

use super::dashboard::AdminUserView;
use super::{inline_error, render, render_rejected};

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub page: Option<u32>,
    pub credit_filter: Option<String>,
}

/// Per-user credit form input.
#[derive(Debug, Deserialize)]
pub struct CreditAdjustForm {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub reason: String,
    pub page: Option<u32>,
    pub credit_filter: Option<String>,
}

/// Filter tab above the table.
#[derive(Debug, Clone)]
pub struct FilterTab {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// User row view for templates.
#[derive(Debug, Clone)]
pub struct UserView {
    pub id: String,
    pub display_name: String,
    pub line_user_id: String,
    pub credits: i64,
    pub balance_class: &'static str,
    pub interaction_count: i64,
    pub last_interaction: String,
    pub credits_used: Option<i64>,
    pub credits_received: Option<i64>,
    /// Target of this row's credit form.
    pub credits_action: String,
    /// Values of this row's credit form.
    pub form: AdjustFormState,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            display_name: if user.display_name.trim().is_empty() {
                "(no name)".to_string()
            } else {
                user.display_name.clone()
            },
            line_user_id: user.line_user_id.clone(),
            credits: user.credits,
            balance_class: balance_class(user.credits),
            interaction_count: user.interaction_count,
            last_interaction: format_time(user.last_interaction),
            credits_used: user.credits_used,
            credits_received: user.credits_received,
            credits_action: format!("/users/{}/credits", encode_segment(user.id.as_str())),
            form: AdjustFormState::default(),
        }
    }
}

/// Values of a row's credit form; filled when a submission was rejected.
#[derive(Debug, Clone, Default)]
pub struct AdjustFormState {
    pub amount: String,
    pub reason: String,
    pub error: Option<String>,
}

/// Users list page template.
#[derive(Template)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<String>,
    pub filter: &'static str,
    pub tabs: Vec<FilterTab>,
    pub users: Vec<UserView>,
    pub pager: PagerView,
    pub page: u32,
    /// Rejection for a user that is not on the current page.
    pub error: Option<String>,
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/{id}/credits", post(adjust_credits))
}

/// Lenient filter parsing: unknown values show everyone.
fn parse_filter(raw: Option<&str>) -> CreditFilter {
    raw.and_then(|f| f.parse().ok()).unwrap_or_default()
}

fn listing_href(page: u32, filter: CreditFilter) -> String {
    match filter.query_value() {
        Some(value) => format!("/users?page={page}&credit_filter={value}"),
        None => format!("/users?page={page}"),
    }
}

/// CSS class for a balance.
const fn balance_class(credits: i64) -> &'static str {
    if credits <= 0 {
        "balance-empty"
    } else if credits <= CreditFilter::LOW_CREDIT_THRESHOLD {
        "balance-low"
    } else if credits > CreditFilter::HIGH_CREDIT_THRESHOLD {
        "balance-high"
    } else {
        "balance-ok"
    }
}

pub(crate) fn format_time(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || "-".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn page_template(
    auth: &AdminSession,
    users: &Page<User>,
    filter: CreditFilter,
    flash: Option<String>,
    rejected: Option<(&UserId, AdjustFormState)>,
) -> UsersIndexTemplate {
    let tabs = CreditFilter::ALL
        .into_iter()
        .map(|f| FilterTab {
            label: f.label(),
            href: listing_href(1, f),
            active: f == filter,
        })
        .collect();

    let mut rows: Vec<UserView> = users.data.iter().map(UserView::from).collect();
    let mut error = None;
    if let Some((user_id, state)) = rejected {
        match rows.iter_mut().find(|row| row.id == user_id.as_str()) {
            Some(row) => row.form = state,
            None => error = state.error,
        }
    }

    UsersIndexTemplate {
        admin_user: AdminUserView::from(&auth.admin),
        current_path: "/users".to_string(),
        flash,
        filter: filter.as_str(),
        tabs,
        users: rows,
        pager: PagerView::new(&users.pagination, |p| listing_href(p, filter)),
        page: users.pagination.page,
        error,
    }
}

/// Users list page handler.
///
/// GET /users
#[instrument(skip(auth, state, session))]
pub async fn index(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<UsersQuery>,
) -> Result<Response, AppError> {
    let filter = parse_filter(query.credit_filter.as_deref());
    let page = normalize_page(query.page);

    let users = state
        .api()
        .list_users(&auth.token, &UserQuery::page(page, filter))
        .await?;

    let flash = take_flash(&session).await;
    Ok(render(&page_template(&auth, &users, filter, flash, None)).into_response())
}

/// Add or deduct credits for one user.
///
/// POST /users/{id}/credits
#[instrument(
    skip(auth, state, session, form),
    fields(admin = %auth.admin.username, user_id = %id)
)]
pub async fn adjust_credits(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<CreditAdjustForm>,
) -> Result<Response, AppError> {
    let filter = parse_filter(form.credit_filter.as_deref());
    let page = normalize_page(form.page);
    let user_id = UserId::new(id);

    let error = match CreditAdjustment::parse(&form.amount, &form.reason) {
        Ok(adjustment) => {
            match state
                .api()
                .adjust_user_credits(&auth.token, &user_id, &adjustment)
                .await
            {
                Ok(()) => {
                    info!(amount = adjustment.amount, "Adjusted user credits");
                    let verb = if adjustment.amount > 0 {
                        "Added"
                    } else {
                        "Deducted"
                    };
                    set_flash(
                        &session,
                        format!(
                            "{verb} {} credits for user {user_id}",
                            adjustment.amount.unsigned_abs()
                        ),
                    )
                    .await;
                    return Ok(Redirect::to(&listing_href(page, filter)).into_response());
                }
                Err(err) => inline_error(err)?,
            }
        }
        Err(err) => err.to_string(),
    };

    let users = state
        .api()
        .list_users(&auth.token, &UserQuery::page(page, filter))
        .await?;
    let rejected = AdjustFormState {
        amount: form.amount,
        reason: form.reason,
        error: Some(error),
    };
    Ok(render_rejected(&page_template(
        &auth,
        &users,
        filter,
        None,
        Some((&user_id, rejected)),
    )))
}
