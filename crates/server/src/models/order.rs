//! Orders and order lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use hackshop_core::{AddressId, GoodsId, OrderId, OrderItemId, OrderStatus, Price, UserId};

/// An order header.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub generatetime: Option<DateTime<Utc>>,
    pub payment_status: OrderStatus,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub user_id: Option<UserId>,
    pub address_id: Option<AddressId>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub const fn total(&self) -> Price {
        Price::new(self.total_amount)
    }

    /// Placement time as `YYYY-MM-DD HH:MM`, empty when unknown.
    #[must_use]
    pub fn placed_at(&self) -> String {
        self.generatetime
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// An order line joined with its product.
#[derive(Debug, Clone, FromRow)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub goods_id: GoodsId,
    pub goodsname: Option<String>,
    pub mainimg: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl OrderLine {
    #[must_use]
    pub fn name(&self) -> &str {
        self.goodsname.as_deref().unwrap_or("Unknown")
    }
}

/// Order with its owner and first line, for the back office lists.
#[derive(Debug, Clone, FromRow)]
pub struct OrderSummary {
    #[sqlx(flatten)]
    pub order: Order,
    pub username: Option<String>,
    pub first_goodsname: Option<String>,
    pub first_quantity: Option<i32>,
    pub total_quantity: i64,
}

impl OrderSummary {
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }

    /// `"{name} x{qty}"` for the first line, empty for an order without lines.
    #[must_use]
    pub fn first_line(&self) -> String {
        match (&self.first_goodsname, self.first_quantity) {
            (Some(name), Some(qty)) => format!("{name} x{qty}"),
            (None, Some(qty)) => format!(" x{qty}"),
            _ => String::new(),
        }
    }
}

/// Headline numbers for the back office dashboard.
#[derive(Debug, Clone, Default)]
pub struct DashboardStats {
    pub total_sales: Decimal,
    pub order_count: i64,
    pub user_count: i64,
    pub goods_count: i64,
}

/// Result of paying for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid { total: Decimal },
    InsufficientBalance,
    InsufficientStock { goodsname: String },
}

/// One row of the hand-written order detail query.
///
/// Every column is selected as text so the row shape is independent of the
/// joined tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetailRow {
    pub id: Option<String>,
    pub order_number: Option<String>,
    pub generatetime: Option<String>,
    pub total_amount: Option<String>,
    pub user_id: Option<String>,
    pub receiver: Option<String>,
    pub phone: Option<String>,
    pub addressname: Option<String>,
    pub goodsname: Option<String>,
    pub unit_price: Option<String>,
    pub quantity: Option<String>,
}

/// A product line inside the order detail fragment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DetailProduct {
    pub name: String,
    pub price: String,
    pub quantity: String,
}

/// Context handed to the order detail fragment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderDetail {
    pub id: String,
    pub products: Vec<DetailProduct>,
    pub total: String,
    pub date: String,
    pub shipping_info: String,
}

impl OrderDetail {
    /// Fold joined rows into one detail; `None` when there are no rows.
    ///
    /// Header and address come from the first row. Rows without a product
    /// name are left out of the product list.
    #[must_use]
    pub fn from_rows(rows: Vec<OrderDetailRow>) -> Option<Self> {
        let first = rows.first()?.clone();

        let receiver = first.receiver.unwrap_or_default();
        let phone = first.phone.unwrap_or_default();
        let addressname = first.addressname.unwrap_or_default();
        let shipping_info = if receiver.is_empty() && phone.is_empty() && addressname.is_empty() {
            String::new()
        } else {
            format!("{receiver}, {phone}, {addressname}")
        };

        let products = rows
            .into_iter()
            .filter_map(|row| {
                let name = row.goodsname.filter(|n| !n.is_empty())?;
                Some(DetailProduct {
                    name,
                    price: row.unit_price.unwrap_or_default(),
                    quantity: row.quantity.unwrap_or_default(),
                })
            })
            .collect();

        Some(Self {
            id: first.order_number.unwrap_or_default(),
            products,
            total: first.total_amount.unwrap_or_default(),
            date: first.generatetime.unwrap_or_default(),
            shipping_info,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(goodsname: Option<&str>) -> OrderDetailRow {
        OrderDetailRow {
            id: Some("abc".into()),
            order_number: Some("202610190000000001123456".into()),
            generatetime: Some("2026-10-19".into()),
            total_amount: Some("99.00".into()),
            user_id: Some("1".into()),
            receiver: Some("Alice".into()),
            phone: Some("13800000000".into()),
            addressname: Some("1 Lab Road".into()),
            goodsname: goodsname.map(String::from),
            unit_price: Some("49.50".into()),
            quantity: Some("2".into()),
        }
    }

    #[test]
    fn test_from_rows_empty() {
        assert!(OrderDetail::from_rows(Vec::new()).is_none());
    }

    #[test]
    fn test_from_rows_collects_products() {
        let detail = OrderDetail::from_rows(vec![row(Some("Mug")), row(None), row(Some("Cap"))])
            .unwrap();
        assert_eq!(detail.id, "202610190000000001123456");
        assert_eq!(detail.products.len(), 2);
        assert_eq!(detail.products[1].name, "Cap");
        assert_eq!(detail.shipping_info, "Alice, 13800000000, 1 Lab Road");
    }

    #[test]
    fn test_from_rows_without_address() {
        let mut r = row(Some("Mug"));
        r.receiver = None;
        r.phone = None;
        r.addressname = None;
        let detail = OrderDetail::from_rows(vec![r]).unwrap();
        assert_eq!(detail.shipping_info, "");
    }
}
