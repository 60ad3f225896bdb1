//! Dashboard route handler.

use askama::Template;
use axum::{
    Router,
    extract::State,
    response::Html,
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use aiq_core::{Admin, AdminRole, DashboardStats};

use crate::{
    components::BarSeries,
    error::AppError,
    filters,
    middleware::{RequireAdminAuth, take_flash},
    state::AppState,
};

use super::render;

/// Seconds between automatic reloads of the dashboard.
pub const REFRESH_SECS: u32 = 30;

/// Admin user view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub username: String,
    pub is_super_admin: bool,
}

impl From<&Admin> for AdminUserView {
    fn from(admin: &Admin) -> Self {
        Self {
            name: admin.display_name().to_string(),
            username: admin.username.clone(),
            is_super_admin: admin.role == AdminRole::SuperAdmin,
        }
    }
}

/// Headline numbers.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub total_users: i64,
    pub total_credits: i64,
    pub credits_used_today: i64,
    pub total_interactions: i64,
    pub avg_processing_ms: String,
    pub users_with_no_credits: i64,
    pub users_with_low_credits: i64,
}

impl From<&DashboardStats> for DashboardMetrics {
    fn from(stats: &DashboardStats) -> Self {
        Self {
            total_users: stats.total_users,
            total_credits: stats.credit_stats.total_credits,
            credits_used_today: stats.credit_stats.credits_used_today,
            total_interactions: stats.total_interactions,
            avg_processing_ms: format!("{:.0}", stats.avg_processing_time.max(0.0)),
            users_with_no_credits: stats.credit_stats.users_with_no_credits,
            users_with_low_credits: stats.credit_stats.users_with_low_credits,
        }
    }
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<String>,
    pub refresh_secs: u32,
    pub metrics: DashboardMetrics,
    pub series: Vec<BarSeries>,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Dashboard page handler.
///
/// GET /
#[instrument(skip(auth, state, session))]
pub async fn dashboard(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let stats = state.api().dashboard(&auth.token).await?;

    let series = vec![
        BarSeries::new("Daily active users", &stats.daily_users),
        BarSeries::new("New users", &stats.new_users),
        BarSeries::new("Daily credit usage", &stats.credit_stats.daily_credit_usage),
    ];

    let template = DashboardTemplate {
        admin_user: AdminUserView::from(&auth.admin),
        current_path: "/".to_string(),
        flash: take_flash(&session).await,
        refresh_secs: REFRESH_SECS,
        metrics: DashboardMetrics::from(&stats),
        series,
    };

    Ok(render(&template))
}
