//! Session-related types.
//!
//! Types stored in the session for authentication state and flash messages.

use serde::{Deserialize, Serialize};

use hackshop_core::AdminId;

/// Session-stored admin identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: AdminId,
    pub username: String,
}

/// Severity of a flash message; doubles as its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Session keys.
pub mod keys {
    /// Logged-in shopper's user id.
    pub const USER_ID: &str = "user_id";

    /// Logged-in back office account.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Pending flash messages.
    pub const FLASHES: &str = "_flashes";
}
