//! Shopping cart rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use hackshop_core::{CartItemId, GoodsId, Price, UserId};

/// A raw cart row. One row per (user, goods); quantity accumulates.
#[derive(Debug, Clone, FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub goods_id: GoodsId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Cart row joined with its product, as shown on the cart page.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub id: CartItemId,
    pub goods_id: GoodsId,
    pub quantity: i32,
    pub goodsname: String,
    pub mainimg: String,
    pub price: Decimal,
    pub stock: i32,
}

impl CartLine {
    #[must_use]
    pub fn subtotal(&self) -> Price {
        Price::new(self.price * Decimal::from(self.quantity))
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::new(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtotal() {
        let line = CartLine {
            id: CartItemId::new(1),
            goods_id: GoodsId::new(2),
            quantity: 3,
            goodsname: "Lab Mug".into(),
            mainimg: String::new(),
            price: Decimal::new(1250, 2),
            stock: 10,
        };
        assert_eq!(line.subtotal().to_string(), "¥37.50");
    }
}
