//! Credit adjustment commands.
//!
//! # Usage
//!
//! ```bash
//! # Deduct 5 credits from one user
//! aiq-cli credits add 65f1c2... -- -5 --reason "refund reversal"
//!
//! # Grant 20 credits to several users
//! aiq-cli credits bulk-add --users 65f1c2...,65f1c3... 20
//! ```

use aiq_admin::api::BotApi;
use aiq_core::UserId;
use aiq_core::forms::{BulkCreditGrant, CreditAdjustment};

use super::{CliError, client, token};

/// Add (or deduct) credits for one user.
#[allow(clippy::print_stdout)]
pub async fn add(user_id: &str, amount: &str, reason: &str) -> Result<(), CliError> {
    let adjustment = CreditAdjustment::parse(amount, reason)?;
    let user_id = UserId::new(user_id.trim());

    client()?
        .adjust_user_credits(&token()?, &user_id, &adjustment)
        .await?;

    println!(
        "Applied {:+} credits to {} ({})",
        adjustment.amount,
        user_id,
        adjustment.reason
    );
    Ok(())
}

/// Grant the same amount to several users.
#[allow(clippy::print_stdout)]
pub async fn bulk_add(user_ids: &str, amount: &str, reason: &str) -> Result<(), CliError> {
    let grant = BulkCreditGrant::parse(user_ids, amount, reason)?;

    client()?.bulk_add_credits(&token()?, &grant).await?;

    println!(
        "Granted {} credits to {} users ({})",
        grant.amount,
        grant.user_ids.len(),
        grant.reason
    );
    Ok(())
}
