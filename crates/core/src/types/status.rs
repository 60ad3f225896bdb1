//! Enumerations shared with the bot backend.

use serde::{Deserialize, Serialize};

/// Kind of a credit ledger entry.
///
/// The backend writes `use` when the bot spends a user's credit, `admin_add`
/// for manual adjustments, `payment` for purchases and `gift` for promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Use,
    AdminAdd,
    Payment,
    Gift,
}

impl TransactionType {
    /// Wire value as sent by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Use => "use",
            Self::AdminAdd => "admin_add",
            Self::Payment => "payment",
            Self::Gift => "gift",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Use => "Usage",
            Self::AdminAdd => "Admin",
            Self::Payment => "Payment",
            Self::Gift => "Gift",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// Day-to-day operator.
    #[default]
    Admin,
    /// Operator who can also manage other admins on the backend.
    SuperAdmin,
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::SuperAdmin => write!(f, "superadmin"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::SuperAdmin),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// Balance bucket used to filter the user listing.
///
/// `All` is the absence of a filter and is never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CreditFilter {
    #[default]
    All,
    /// Balance is zero.
    NoCredits,
    /// Balance at or below [`CreditFilter::LOW_CREDIT_THRESHOLD`].
    LowCredits,
    /// Balance above [`CreditFilter::HIGH_CREDIT_THRESHOLD`].
    HighCredits,
}

impl CreditFilter {
    /// Upper bound (inclusive) of the low-credit bucket.
    pub const LOW_CREDIT_THRESHOLD: i64 = 5;
    /// Lower bound (exclusive) of the high-credit bucket.
    pub const HIGH_CREDIT_THRESHOLD: i64 = 50;

    /// Every filter, in display order.
    pub const ALL: [Self; 4] = [
        Self::All,
        Self::NoCredits,
        Self::LowCredits,
        Self::HighCredits,
    ];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::NoCredits => "no-credits",
            Self::LowCredits => "low-credits",
            Self::HighCredits => "high-credits",
        }
    }

    /// Value to send as `creditFilter`, or `None` when unfiltered.
    #[must_use]
    pub const fn query_value(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            other => Some(other.as_str()),
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All users",
            Self::NoCredits => "Out of credits",
            Self::LowCredits => "Low credits (≤5)",
            Self::HighCredits => "High credits (>50)",
        }
    }
}

impl std::fmt::Display for CreditFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CreditFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("invalid credit filter: {s}"))
    }
}
