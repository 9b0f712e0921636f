//! Shipping addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hackshop_core::{AddressId, UserId};

/// A saved shipping address.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub receiver: String,
    pub phone: String,
    pub addressname: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted address fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub addressname: String,
}

impl AddressForm {
    /// Trimmed copy with every field required to be non-empty.
    #[must_use]
    pub fn validated(&self) -> Option<Self> {
        let form = Self {
            receiver: self.receiver.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            addressname: self.addressname.trim().to_owned(),
        };
        (!form.receiver.is_empty() && !form.phone.is_empty() && !form.addressname.is_empty())
            .then_some(form)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_trims_fields() {
        let form = AddressForm {
            receiver: " Alice ".into(),
            phone: "13800000000".into(),
            addressname: " 1 Lab Road ".into(),
        };
        let clean = form.validated().unwrap();
        assert_eq!(clean.receiver, "Alice");
        assert_eq!(clean.addressname, "1 Lab Road");
    }

    #[test]
    fn test_validated_rejects_blank_field() {
        let form = AddressForm {
            receiver: "Alice".into(),
            phone: "  ".into(),
            addressname: "1 Lab Road".into(),
        };
        assert!(form.validated().is_none());
    }
}
