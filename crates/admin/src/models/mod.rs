//! Session-side models for the admin dashboard.

pub mod session;

pub use session::{AdminSession, keys as session_keys};
