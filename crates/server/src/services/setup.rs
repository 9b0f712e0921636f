//! One-shot lab initialisation from `product.json`.
//!
//! `product.json` is a JSON array of products with optional gallery images
//! and specification rows. Numbers may be given as JSON numbers or numeric
//! strings. After a successful run the file is renamed to
//! `product.json.lock`, which disables the setup page.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use hackshop_core::GoodsStatus;

use crate::db::RepositoryError;
use crate::db::admins::upsert_admin;
use crate::db::goods::{insert_goods, insert_image, insert_spec, slug_exists};
use crate::models::NewGoods;

/// Default back office account created by setup.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Errors from the setup run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid product.json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A gallery image in `product.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogueImage {
    pub url: Option<String>,
    pub is_main: Value,
    pub sort_order: Value,
}

/// A specification row in `product.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogueSpec {
    pub name: Option<String>,
    pub value: Option<String>,
    pub sort_order: Value,
}

/// A product in `product.json`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogueProduct {
    pub goodsname: Option<String>,
    pub category: Option<String>,
    pub mainimg: Option<String>,
    pub content: Option<String>,
    pub stock: Value,
    pub price: Value,
    pub status: Value,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub original_price: Value,
    pub rating_avg: Value,
    pub rating_count: Value,
    pub sales_count: Value,
    pub slug: Option<String>,
    pub images: Vec<CatalogueImage>,
    pub specs: Vec<CatalogueSpec>,
}

impl CatalogueProduct {
    /// Trimmed slug, `None` when blank.
    #[must_use]
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The insertable row, with zeros and empty strings for missing fields.
    #[must_use]
    pub fn to_new_goods(&self) -> NewGoods {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        NewGoods {
            goodsname: text(&self.goodsname),
            category: text(&self.category),
            mainimg: text(&self.mainimg),
            content: text(&self.content),
            stock: as_i32(&self.stock),
            price: as_decimal(&self.price).unwrap_or(Decimal::ZERO),
            status: as_text(&self.status)
                .and_then(|s| GoodsStatus::from_code(&s))
                .unwrap_or(GoodsStatus::OnSale),
            brand: self.brand.clone(),
            model: self.model.clone(),
            original_price: as_decimal(&self.original_price),
            rating_avg: as_f64(&self.rating_avg).unwrap_or(0.0),
            rating_count: as_i32(&self.rating_count),
            sales_count: as_i32(&self.sales_count),
            slug: self.slug().map(str::to_owned),
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => as_f64(other).and_then(Decimal::from_f64),
    }
    .map(|d| d.round_dp(2))
}

#[allow(clippy::cast_possible_truncation)]
fn as_i32(value: &Value) -> i32 {
    as_f64(value).filter(|f| f.is_finite()).map_or(0, |f| f as i32)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Parse the contents of `product.json`.
///
/// # Errors
///
/// Returns `SetupError::Parse` if the text is not a JSON array of objects.
pub fn parse_catalogue(json: &str) -> Result<Vec<CatalogueProduct>, SetupError> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a catalogue file.
///
/// # Errors
///
/// Returns `SetupError::Read` or `SetupError::Parse`.
pub async fn load_catalogue(path: &Path) -> Result<Vec<CatalogueProduct>, SetupError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SetupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_catalogue(&json)
}

/// What a setup run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetupReport {
    pub admin_created: bool,
    pub imported: usize,
    pub skipped: usize,
}

/// Create or reset the admin and import the catalogue in one transaction.
///
/// Products whose slug already exists are skipped.
///
/// # Errors
///
/// Returns `SetupError::Repository` or `SetupError::Database` if a write
/// fails; the transaction is rolled back.
pub async fn run_setup(
    pool: &PgPool,
    admin_username: &str,
    admin_password: &str,
    catalogue: &[CatalogueProduct],
) -> Result<SetupReport, SetupError> {
    let mut tx = pool.begin().await?;
    let (_, admin_created) = upsert_admin(&mut *tx, admin_username, admin_password).await?;

    let mut report = SetupReport {
        admin_created,
        ..SetupReport::default()
    };

    for product in catalogue {
        let taken = match product.slug() {
            Some(slug) => slug_exists(&mut *tx, slug).await?,
            None => false,
        };
        if taken {
            report.skipped += 1;
            continue;
        }

        let goods_id = insert_goods(&mut *tx, &product.to_new_goods()).await?;
        for image in &product.images {
            insert_image(
                &mut *tx,
                goods_id,
                image.url.as_deref().unwrap_or_default(),
                truthy(&image.is_main),
                as_i32(&image.sort_order),
            )
            .await?;
        }
        for spec in &product.specs {
            insert_spec(
                &mut *tx,
                goods_id,
                spec.name.as_deref().unwrap_or_default(),
                spec.value.as_deref().unwrap_or_default(),
                as_i32(&spec.sort_order),
            )
            .await?;
        }
        report.imported += 1;
    }

    tx.commit().await?;
    Ok(report)
}

/// File-system view of the setup page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupState {
    pub has_product_json: bool,
    pub is_locked: bool,
    pub can_init: bool,
}

impl SetupState {
    /// Inspect the catalogue file and its lock.
    pub async fn probe(product_json: &Path, lock: &Path) -> Self {
        let has_product_json = tokio::fs::try_exists(product_json).await.unwrap_or(false);
        let has_lock = tokio::fs::try_exists(lock).await.unwrap_or(false);
        Self::from_flags(has_product_json, has_lock)
    }

    #[must_use]
    pub const fn from_flags(has_product_json: bool, has_lock: bool) -> Self {
        Self {
            has_product_json,
            is_locked: has_lock || !has_product_json,
            can_init: has_product_json && !has_lock,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalogue_with_missing_fields() {
        let products = parse_catalogue(
            r#"[
                {"goodsname": "Lamp", "category": "Home", "price": "19.90", "stock": 5,
                 "slug": " lamp ", "images": [{"url": "/a.jpg", "is_main": 1}],
                 "specs": [{"name": "Color", "value": "Red", "sort_order": "2"}]},
                {"goodsname": "Bare"}
            ]"#,
        )
        .unwrap();
        assert_eq!(products.len(), 2);

        let lamp = products[0].to_new_goods();
        assert_eq!(lamp.price, Decimal::new(1990, 2));
        assert_eq!(lamp.stock, 5);
        assert_eq!(lamp.slug.as_deref(), Some("lamp"));
        assert!(truthy(&products[0].images[0].is_main));
        assert_eq!(as_i32(&products[0].specs[0].sort_order), 2);

        let bare = products[1].to_new_goods();
        assert_eq!(bare.category, "");
        assert_eq!(bare.price, Decimal::ZERO);
        assert_eq!(bare.stock, 0);
        assert_eq!(bare.status, GoodsStatus::OnSale);
        assert_eq!(bare.original_price, None);
        assert!(bare.slug.is_none());
    }

    #[test]
    fn test_parse_catalogue_rejects_non_array() {
        assert!(matches!(
            parse_catalogue(r#"{"goodsname": "x"}"#),
            Err(SetupError::Parse(_))
        ));
    }

    #[test]
    fn test_status_accepts_number() {
        let p: CatalogueProduct = serde_json::from_str(r#"{"status": 1}"#).unwrap();
        assert_eq!(p.to_new_goods().status, GoodsStatus::OffSale);
    }

    #[test]
    fn test_setup_state_flags() {
        assert_eq!(
            SetupState::from_flags(true, false),
            SetupState {
                has_product_json: true,
                is_locked: false,
                can_init: true
            }
        );
        assert!(SetupState::from_flags(false, false).is_locked);
        assert!(!SetupState::from_flags(true, true).can_init);
    }
}
