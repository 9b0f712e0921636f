//! Status enums for orders, goods and vouchers.
//!
//! Goods and vouchers keep the single-character codes used by the schema
//! (`CHAR(1)`), orders map onto the `order_status` Postgres enum.

use serde::{Deserialize, Serialize};

/// Order payment/fulfilment status.
///
/// Lifecycle: `pending -> paid -> shipped -> completed`, with `cancelled`
/// reachable from any state through the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Paid,
        Self::Shipped,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Storage code (`pending`, `paid`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Display label and badge CSS class.
    #[must_use]
    pub const fn meta(&self) -> (&'static str, &'static str) {
        match self {
            Self::Pending => ("Pending payment", "pending"),
            Self::Paid => ("Paid", "active"),
            Self::Shipped => ("Shipped", "pending"),
            Self::Completed => ("Completed", "active"),
            Self::Cancelled => ("Cancelled", "inactive"),
        }
    }

    /// Label and class for a raw status string.
    ///
    /// Unknown or empty values render as pending.
    #[must_use]
    pub fn meta_for(raw: &str) -> (&'static str, &'static str) {
        raw.parse::<Self>().unwrap_or_default().meta()
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.meta().0
    }

    /// Badge CSS class.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.meta().1
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Whether a product is listed in the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GoodsStatus {
    /// Code `'0'`: visible and purchasable.
    #[default]
    #[serde(rename = "0")]
    OnSale,
    /// Code `'1'`: hidden; also used as the soft-delete marker.
    #[serde(rename = "1")]
    OffSale,
}

impl GoodsStatus {
    /// Storage code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OnSale => "0",
            Self::OffSale => "1",
        }
    }

    /// The opposite status.
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::OnSale => Self::OffSale,
            Self::OffSale => Self::OnSale,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OnSale => "On sale",
            Self::OffSale => "Off sale",
        }
    }

    /// Parse a status code, returning `None` for anything but `0`/`1`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::OnSale),
            "1" => Some(Self::OffSale),
            _ => None,
        }
    }
}

impl TryFrom<String> for GoodsStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value).ok_or_else(|| format!("invalid goods status: {value}"))
    }
}

/// Whether a voucher code has been redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VoucherStatus {
    /// Code `'0'`.
    #[default]
    #[serde(rename = "0")]
    Unused,
    /// Code `'1'`.
    #[serde(rename = "1")]
    Used,
}

impl VoucherStatus {
    /// Storage code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unused => "0",
            Self::Used => "1",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unused => "Unused",
            Self::Used => "Used",
        }
    }
}

impl TryFrom<String> for VoucherStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "0" => Ok(Self::Unused),
            "1" => Ok(Self::Used),
            _ => Err(format!("invalid voucher status: {value}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_order_status_meta() {
        assert_eq!(OrderStatus::Paid.meta(), ("Paid", "active"));
        assert_eq!(OrderStatus::Shipped.css_class(), "pending");
        assert_eq!(OrderStatus::Cancelled.css_class(), "inactive");
    }

    #[test]
    fn test_unknown_status_falls_back_to_pending() {
        let pending = OrderStatus::Pending.meta();
        assert_eq!(OrderStatus::meta_for("refunded"), pending);
        assert_eq!(OrderStatus::meta_for(""), pending);
        assert_eq!(OrderStatus::meta_for("PAID"), OrderStatus::Paid.meta());
    }

    #[test]
    fn test_goods_status_codes() {
        assert_eq!(GoodsStatus::from_code("0"), Some(GoodsStatus::OnSale));
        assert_eq!(GoodsStatus::from_code("1"), Some(GoodsStatus::OffSale));
        assert_eq!(GoodsStatus::from_code("2"), None);
        assert_eq!(GoodsStatus::OnSale.toggled(), GoodsStatus::OffSale);
        assert!(GoodsStatus::try_from("x".to_string()).is_err());
    }

    #[test]
    fn test_voucher_status_codes() {
        assert_eq!(
            VoucherStatus::try_from("1".to_string()),
            Ok(VoucherStatus::Used)
        );
        assert_eq!(VoucherStatus::Unused.code(), "0");
    }
}
