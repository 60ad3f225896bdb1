//! AI-IQ Core - Shared types library.
//!
//! This crate provides the types shared by the admin dashboard and the CLI:
//! - `admin` - Server-rendered administration dashboard
//! - `cli` - Command-line tools for operators
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no HTTP
//! clients. Every entity mirrors a record owned by the bot backend; nothing
//! here is authoritative.
//!
//! # Modules
//!
//! - [`types`] - Entity records, id newtypes, enums and pagination envelopes
//! - [`forms`] - Validation of operator input before it reaches the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod forms;
pub mod types;

pub use types::*;
