//! Credit ledger, credit stats and bulk grants.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use aiq_core::forms::BulkCreditGrant;
use aiq_core::{AdminRef, CreditStats, CreditTransaction, Ref, UserRef, normalize_page};

use crate::{
    components::PagerView,
    error::AppError,
    filters,
    middleware::{RequireAdminAuth, set_flash, take_flash},
    models::AdminSession,
    state::AppState,
};

use super::dashboard::AdminUserView;
use super::users::format_time;
use super::{inline_error, render, render_rejected};

/// Ledger query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CreditsQuery {
    pub page: Option<u32>,
}

/// Bulk grant form input.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BulkGrantForm {
    #[serde(default)]
    pub user_ids: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub reason: String,
}

/// Ledger row view for templates.
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub created_at: String,
    pub user_name: String,
    pub user_line_id: Option<String>,
    pub amount: String,
    pub amount_class: &'static str,
    pub type_label: &'static str,
    pub reason: String,
    pub admin_name: String,
}

impl From<&CreditTransaction> for TransactionView {
    fn from(tx: &CreditTransaction) -> Self {
        let (user_name, user_line_id) = user_columns(&tx.user);
        Self {
            created_at: format_time(tx.created_at),
            user_name,
            user_line_id,
            amount: signed(tx.amount),
            amount_class: if tx.amount < 0 {
                "amount-negative"
            } else {
                "amount-positive"
            },
            type_label: tx.kind.label(),
            reason: if tx.reason.is_empty() {
                "-".to_string()
            } else {
                tx.reason.clone()
            },
            admin_name: admin_column(tx.added_by_admin.as_ref()),
        }
    }
}

/// Name and LINE id of the user, or the raw id when unpopulated.
fn user_columns(user: &UserRef) -> (String, Option<String>) {
    match user {
        Ref::Populated(user) => {
            let name = if user.display_name.trim().is_empty() {
                user.id.to_string()
            } else {
                user.display_name.clone()
            };
            let line_id = (!user.line_user_id.is_empty()).then(|| user.line_user_id.clone());
            (name, line_id)
        }
        Ref::Id(id) => (id.to_string(), None),
    }
}

fn admin_column(admin: Option<&AdminRef>) -> String {
    match admin {
        Some(Ref::Populated(admin)) => admin.display_name().to_string(),
        Some(Ref::Id(id)) => id.to_string(),
        None => "-".to_string(),
    }
}

/// `5` → `+5`, `-3` → `-3`.
fn signed(amount: i64) -> String {
    if amount > 0 {
        format!("+{amount}")
    } else {
        amount.to_string()
    }
}

/// Credits page template.
#[derive(Template)]
#[template(path = "credits/index.html")]
pub struct CreditsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<String>,
    pub stats: CreditStats,
    pub transactions: Vec<TransactionView>,
    pub pager: PagerView,
    pub form: BulkGrantForm,
    pub error: Option<String>,
}

/// Build the credits router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/credits", get(index))
        .route("/credits/bulk-add", post(bulk_add))
}

fn ledger_href(page: u32) -> String {
    format!("/credits?page={page}")
}

async fn page_template(
    state: &AppState,
    auth: &AdminSession,
    page: u32,
    flash: Option<String>,
    form: BulkGrantForm,
    error: Option<String>,
) -> Result<CreditsIndexTemplate, AppError> {
    let stats = state.api().credit_stats(&auth.token).await?;
    let ledger = state.api().list_transactions(&auth.token, page).await?;

    Ok(CreditsIndexTemplate {
        admin_user: AdminUserView::from(&auth.admin),
        current_path: "/credits".to_string(),
        flash,
        stats,
        transactions: ledger.data.iter().map(TransactionView::from).collect(),
        pager: PagerView::new(&ledger.pagination, ledger_href),
        form,
        error,
    })
}

/// Credits page handler.
///
/// GET /credits
#[instrument(skip(auth, state, session))]
pub async fn index(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CreditsQuery>,
) -> Result<Response, AppError> {
    let flash = take_flash(&session).await;
    let template = page_template(
        &state,
        &auth,
        normalize_page(query.page),
        flash,
        BulkGrantForm::default(),
        None,
    )
    .await?;
    Ok(render(&template).into_response())
}

/// Grant the same amount to several users.
///
/// POST /credits/bulk-add
#[instrument(skip(auth, state, session, form), fields(admin = %auth.admin.username))]
pub async fn bulk_add(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<BulkGrantForm>,
) -> Result<Response, AppError> {
    let error = match BulkCreditGrant::parse(&form.user_ids, &form.amount, &form.reason) {
        Ok(grant) => match state.api().bulk_add_credits(&auth.token, &grant).await {
            Ok(()) => {
                info!(
                    users = grant.user_ids.len(),
                    amount = grant.amount,
                    "Bulk credit grant"
                );
                set_flash(
                    &session,
                    format!(
                        "Granted {} credits to {} users",
                        grant.amount,
                        grant.user_ids.len()
                    ),
                )
                .await;
                return Ok(Redirect::to("/credits").into_response());
            }
            Err(err) => inline_error(err)?,
        },
        Err(err) => err.to_string(),
    };

    let template = page_template(&state, &auth, 1, None, form, Some(error)).await?;
    Ok(render_rejected(&template))
}

#[cfg(test)]
mod tests {
    use aiq_core::{Admin, AdminId, AdminRole, TransactionId, TransactionType, User, UserId};

    use super::*;

    fn transaction(user: UserRef, amount: i64, admin: Option<AdminRef>) -> CreditTransaction {
        CreditTransaction {
            id: TransactionId::new("t1"),
            user,
            amount,
            kind: TransactionType::AdminAdd,
            reason: String::new(),
            added_by_admin: admin,
            created_at: None,
        }
    }

    #[test]
    fn test_signed_amounts() {
        assert_eq!(signed(5), "+5");
        assert_eq!(signed(-3), "-3");
        assert_eq!(signed(0), "0");
    }

    #[test]
    fn test_populated_references() {
        let user = User {
            id: UserId::new("u1"),
            line_user_id: "U123".to_string(),
            display_name: "Somchai".to_string(),
            credits: 0,
            interaction_count: 0,
            last_interaction: None,
            first_interaction: None,
            credits_used: None,
            credits_received: None,
        };
        let admin = Admin {
            id: AdminId::new("a1"),
            username: "nok".to_string(),
            name: "Nok".to_string(),
            email: String::new(),
            role: AdminRole::Admin,
            created_at: None,
        };
        let view = TransactionView::from(&transaction(
            Ref::Populated(Box::new(user)),
            10,
            Some(Ref::Populated(Box::new(admin))),
        ));

        assert_eq!(view.user_name, "Somchai");
        assert_eq!(view.user_line_id.as_deref(), Some("U123"));
        assert_eq!(view.amount, "+10");
        assert_eq!(view.amount_class, "amount-positive");
        assert_eq!(view.type_label, "Admin");
        assert_eq!(view.admin_name, "Nok");
        assert_eq!(view.reason, "-");
    }

    #[test]
    fn test_bare_references_show_ids() {
        let view = TransactionView::from(&transaction(Ref::Id(UserId::new("u9")), -2, None));
        assert_eq!(view.user_name, "u9");
        assert!(view.user_line_id.is_none());
        assert_eq!(view.amount_class, "amount-negative");
        assert_eq!(view.admin_name, "-");
    }
}
