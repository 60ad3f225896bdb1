//! Core types for the AI-IQ admin dashboard.
//!
//! This module provides type-safe wrappers for the records served by the bot
//! backend.

pub mod entities;
pub mod id;
pub mod pagination;
pub mod status;

pub use entities::{
    Admin, AdminRef, Command, CreditStats, CreditTransaction, DashboardCreditStats,
    DashboardStats, Ref, SeriesPoint, User, UserRef,
};
pub use id::*;
pub use pagination::{Page, Pagination, normalize_page};
pub use status::*;
