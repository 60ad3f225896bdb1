//! Validation of operator input.
//!
//! The web forms and the CLI both funnel raw strings through these
//! constructors, so an invalid submission never produces a backend request.
//! The validated values serialize directly into the backend request bodies.

use serde::Serialize;

use crate::types::UserId;

/// Reason recorded when a positive per-user adjustment has no reason.
pub const DEFAULT_ADD_REASON: &str = "Credits added by admin";
/// Reason recorded when a negative per-user adjustment has no reason.
pub const DEFAULT_DEDUCT_REASON: &str = "Credits deducted by admin";
/// Reason recorded when a bulk grant has no reason.
pub const DEFAULT_BULK_REASON: &str = "Bulk credit grant";

/// Errors raised while validating operator input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// The amount is not a whole number.
    #[error("amount must be a whole number (got '{0}')")]
    InvalidAmount(String),
    /// The amount is zero.
    #[error("amount must not be zero")]
    ZeroAmount,
    /// A bulk grant without any recipient.
    #[error("enter at least one user id")]
    NoRecipients,
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Parse a signed, non-zero credit amount.
///
/// # Errors
///
/// Returns `FormError::InvalidAmount` for non-numeric input and
/// `FormError::ZeroAmount` for zero.
pub fn parse_amount(raw: &str) -> Result<i64, FormError> {
    let trimmed = raw.trim();
    let amount = trimmed
        .parse::<i64>()
        .map_err(|_| FormError::InvalidAmount(trimmed.to_owned()))?;
    if amount == 0 {
        return Err(FormError::ZeroAmount);
    }
    Ok(amount)
}

fn reason_or(reason: &str, fallback: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        fallback.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// A validated credit adjustment for a single user.
///
/// Body of `POST /admin/credits/add/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditAdjustment {
    /// Signed delta; negative deducts.
    pub amount: i64,
    pub reason: String,
}

impl CreditAdjustment {
    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns `FormError` when the amount is not a non-zero integer.
    pub fn parse(amount: &str, reason: &str) -> Result<Self, FormError> {
        let amount = parse_amount(amount)?;
        let fallback = if amount > 0 {
            DEFAULT_ADD_REASON
        } else {
            DEFAULT_DEDUCT_REASON
        };
        Ok(Self {
            amount,
            reason: reason_or(reason, fallback),
        })
    }
}

/// A validated grant to several users at once.
///
/// Body of `POST /admin/credits/bulk-add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreditGrant {
    pub user_ids: Vec<UserId>,
    pub amount: i64,
    pub reason: String,
}

impl BulkCreditGrant {
    /// Validate raw form input.
    ///
    /// `user_ids` is a comma separated list; entries are trimmed and blanks
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `FormError::NoRecipients` when no id remains, or an amount error.
    pub fn parse(user_ids: &str, amount: &str, reason: &str) -> Result<Self, FormError> {
        let user_ids = split_user_ids(user_ids);
        if user_ids.is_empty() {
            return Err(FormError::NoRecipients);
        }
        let amount = parse_amount(amount)?;
        Ok(Self {
            user_ids,
            amount,
            reason: reason_or(reason, DEFAULT_BULK_REASON),
        })
    }
}

/// Split a comma separated id list, trimming entries and dropping blanks.
#[must_use]
pub fn split_user_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(UserId::from)
        .collect()
}

/// A validated command definition for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDraft {
    pub text: String,
    pub category: String,
    pub description: String,
}

impl CommandDraft {
    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns `FormError::MissingField` when text or category is blank.
    pub fn parse(text: &str, category: &str, description: &str) -> Result<Self, FormError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FormError::MissingField("command text"));
        }
        let category = category.trim();
        if category.is_empty() {
            return Err(FormError::MissingField("category"));
        }
        Ok(Self {
            text: text.to_owned(),
            category: category.to_owned(),
            description: description.trim().to_owned(),
        })
    }
}
