//! Catalogue items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use hackshop_core::{GoodsId, GoodsImageId, GoodsSpecId, GoodsStatus, Price};

/// Image used when a product is created without an upload.
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1523275335684-37898b6baf30?w=800";

/// A product.
#[derive(Debug, Clone, FromRow)]
pub struct Goods {
    pub id: GoodsId,
    pub goodsname: String,
    pub category: String,
    pub mainimg: String,
    pub content: String,
    pub stock: i32,
    pub price: Decimal,
    #[sqlx(try_from = "String")]
    pub status: GoodsStatus,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub original_price: Option<Decimal>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub sales_count: i32,
    pub slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goods {
    #[must_use]
    pub const fn display_price(&self) -> Price {
        Price::new(self.price)
    }

    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.status == GoodsStatus::OnSale
    }
}

/// Gallery image for a product.
#[derive(Debug, Clone, FromRow)]
pub struct GoodsImage {
    pub id: GoodsImageId,
    pub goods_id: GoodsId,
    pub url: String,
    pub is_main: bool,
    pub sort_order: i32,
}

/// Name/value specification row for a product.
#[derive(Debug, Clone, FromRow)]
pub struct GoodsSpec {
    pub id: GoodsSpecId,
    pub goods_id: GoodsId,
    pub name: String,
    pub value: String,
    pub sort_order: i32,
}

/// Fields for inserting or updating a product.
#[derive(Debug, Clone)]
pub struct NewGoods {
    pub goodsname: String,
    pub category: String,
    pub mainimg: String,
    pub content: String,
    pub stock: i32,
    pub price: Decimal,
    pub status: GoodsStatus,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub original_price: Option<Decimal>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub sales_count: i32,
    pub slug: Option<String>,
}

impl NewGoods {
    /// Minimal product with catalogue defaults for the optional columns.
    #[must_use]
    pub fn basic(goodsname: String, category: String, price: Decimal, stock: i32) -> Self {
        Self {
            goodsname,
            category,
            mainimg: DEFAULT_IMAGE_URL.to_owned(),
            content: String::new(),
            stock,
            price,
            status: GoodsStatus::OnSale,
            brand: None,
            model: None,
            original_price: None,
            rating_avg: 0.0,
            rating_count: 0,
            sales_count: 0,
            slug: None,
        }
    }
}

/// Back office product list filter.
#[derive(Debug, Clone, Default)]
pub struct GoodsFilter {
    /// Matched against name and category, case-insensitively.
    pub keyword: Option<String>,
    pub status: Option<GoodsStatus>,
}
