//! Domain models for the shop.
//!
//! Row types derive `sqlx::FromRow` and are loaded with runtime-checked
//! queries; view-only projections live next to the routes that render them.

pub mod address;
pub mod admin;
pub mod cart;
pub mod goods;
pub mod mail;
pub mod order;
pub mod session;
pub mod user;
pub mod voucher;

pub use address::{Address, AddressForm};
pub use admin::Admin;
pub use cart::{CartItem, CartLine};
pub use goods::{DEFAULT_IMAGE_URL, Goods, GoodsFilter, GoodsImage, GoodsSpec, NewGoods};
pub use mail::{MailLog, MailView};
pub use order::{
    DashboardStats, DetailProduct, Order, OrderDetail, OrderDetailRow, OrderLine, OrderSummary,
    PaymentOutcome,
};
pub use session::{CurrentAdmin, FlashLevel, FlashMessage};
pub use user::User;
pub use voucher::{RedeemOutcome, Voucher};

/// Page window over a counted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based current page, clamped into range.
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Build a window for `requested` page over `total` rows.
    #[must_use]
    pub fn new(requested: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let total_pages = (total + per_page - 1) / per_page;
        let page = requested.clamp(1, total_pages.max(1));
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }

    /// Row offset for `LIMIT/OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn prev_page(&self) -> i64 {
        self.page - 1
    }

    #[must_use]
    pub const fn next_page(&self) -> i64 {
        self.page + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset(), 10);
        assert!(p.has_prev());
        assert!(p.has_next());
    }

    #[test]
    fn test_pagination_clamps_out_of_range() {
        let p = Pagination::new(99, 20, 41);
        assert_eq!(p.page, 3);
        assert!(!p.has_next());

        let empty = Pagination::new(5, 10, 0);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.offset(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_prev());
    }
}
