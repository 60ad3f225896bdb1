//! Records mirrored from the bot backend.
//!
//! Field names follow the backend's camelCase JSON. Every field except the id
//! is tolerant of absence: list endpoints populate references with a subset
//! of fields, and the dashboard renders whatever is there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AdminId, CommandId, TransactionId, UserId};
use super::status::{AdminRole, TransactionType};

/// A chat-platform user known to the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Identifier on the LINE messaging platform.
    #[serde(default)]
    pub line_user_id: String,
    #[serde(default)]
    pub display_name: String,
    /// Current balance. Owned by the backend; the dashboard only requests deltas.
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub interaction_count: i64,
    #[serde(default, with = "timestamp")]
    pub last_interaction: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub first_interaction: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_received: Option<i64>,
}

/// A dashboard operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id", alias = "id")]
    pub id: AdminId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: AdminRole,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Admin {
    /// Name to show in the UI, falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// A configured bot trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(rename = "_id")]
    pub id: CommandId,
    /// Trigger text, e.g. `/help`.
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Either a populated record or the bare id the backend left unpopulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T, Id> {
    Populated(Box<T>),
    Id(Id),
}

impl<T, Id> Ref<T, Id> {
    /// The populated record, if any.
    #[must_use]
    pub fn populated(&self) -> Option<&T> {
        match self {
            Self::Populated(record) => Some(record),
            Self::Id(_) => None,
        }
    }
}

/// User reference on a ledger entry.
pub type UserRef = Ref<User, UserId>;

/// Acting admin reference on a ledger entry.
pub type AdminRef = Ref<Admin, AdminId>;

/// One append-only credit ledger entry, generated by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    #[serde(rename = "_id")]
    pub id: TransactionId,
    pub user: UserRef,
    /// Signed delta: negative when credits were spent.
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by_admin: Option<AdminRef>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A single point of a daily time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Day label as produced by the backend (`YYYY-MM-DD`).
    pub date: String,
    pub count: i64,
}

/// Credit aggregates shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardCreditStats {
    pub total_credits: i64,
    pub credits_used_today: i64,
    pub users_with_no_credits: i64,
    pub users_with_low_credits: i64,
    pub daily_credit_usage: Vec<SeriesPoint>,
}

/// Aggregate counts and time series, recomputed server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_interactions: i64,
    pub daily_users: Vec<SeriesPoint>,
    pub new_users: Vec<SeriesPoint>,
    /// Mean bot response time in milliseconds.
    pub avg_processing_time: f64,
    pub credit_stats: DashboardCreditStats,
}

/// Ledger aggregates shown above the transaction table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreditStats {
    pub total_credits: i64,
    pub total_used: i64,
    pub added_by_admin: i64,
    pub used_today: i64,
}

/// Lenient (de)serialization for optional backend timestamps.
///
/// A missing, null or unparsable value becomes `None`.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}
