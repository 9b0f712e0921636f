//! HackShop Core - Shared domain types.
//!
//! This crate provides common types used across all HackShop components:
//! - `server` - The shop web application (storefront, profile, back office)
//! - `cli` - Command-line tools for migrations, seeding and lab resets
//! - `integration-tests` - End-to-end checks against a running server
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database encoding lives behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
