//! Spreadsheet product import and the downloadable template.
//!
//! The first worksheet is read. Row one is a header naming the columns;
//! column order does not matter and unknown columns are ignored.

use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;

use calamine::{Data, Reader, Xlsx};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_xlsxwriter::Workbook;
use sqlx::PgPool;
use thiserror::Error;

use hackshop_core::GoodsStatus;

use crate::db::RepositoryError;
use crate::db::goods::insert_goods;
use crate::models::{DEFAULT_IMAGE_URL, NewGoods};

/// Columns of the import template, in order.
pub const TEMPLATE_HEADERS: [&str; 7] = [
    "goodsname",
    "category",
    "price",
    "stock",
    "status",
    "mainimg",
    "content",
];

/// Longest body echoed back when an import fails.
pub const PREVIEW_CHARS: usize = 5000;

/// Errors from reading or storing an import workbook.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("not a readable xlsx workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("workbook has no worksheet")]
    NoSheet,

    #[error("worksheet is empty")]
    Empty,

    #[error("could not build template: {0}")]
    Template(#[from] rust_xlsxwriter::XlsxError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read the first worksheet into trimmed text cells.
///
/// # Errors
///
/// Returns `ImportError::Workbook` for bytes that are not an xlsx file,
/// `ImportError::NoSheet` or `ImportError::Empty` for a workbook with nothing
/// to read.
pub fn read_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(ImportError::NoSheet)??;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_owned(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.as_f64().to_string(),
    }
}

/// Turn sheet rows into products.
///
/// Rows without a name or category are skipped. An unreadable price or
/// stock becomes zero; a blank image falls back to the default image and an
/// unknown status means on sale.
#[must_use]
pub fn map_rows(rows: &[Vec<String>]) -> Vec<NewGoods> {
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };
    let columns: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim(), idx))
        .collect();

    body.iter()
        .filter_map(|row| {
            let field = |name: &str| cell(&columns, row, name);

            let goodsname = field("goodsname");
            let category = field("category");
            if goodsname.is_empty() || category.is_empty() {
                return None;
            }

            let mut goods = NewGoods::basic(
                goodsname.to_owned(),
                category.to_owned(),
                parse_price(field("price")),
                parse_stock(field("stock")),
            );
            let mainimg = field("mainimg");
            if !mainimg.is_empty() {
                mainimg.clone_into(&mut goods.mainimg);
            }
            field("content").clone_into(&mut goods.content);
            goods.status = GoodsStatus::from_code(field("status")).unwrap_or(GoodsStatus::OnSale);
            Some(goods)
        })
        .collect()
}

fn cell<'r>(columns: &HashMap<&str, usize>, row: &'r [String], name: &str) -> &'r str {
    columns
        .get(name)
        .and_then(|idx| row.get(*idx))
        .map_or("", |s| s.trim())
}

/// A price cell as a two-place decimal; zero when unreadable.
#[must_use]
pub fn parse_price(raw: &str) -> Decimal {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(Decimal::from_f64))
        .map_or(Decimal::ZERO, |d| d.round_dp(2))
}

/// A stock cell as a whole number; fractions are truncated, junk is zero.
#[must_use]
pub fn parse_stock(raw: &str) -> i32 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i32>() {
        return n;
    }
    #[allow(clippy::cast_possible_truncation)]
    let stock = raw
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map_or(0, |f| f.trunc() as i32);
    stock
}

/// Insert every product in one transaction; returns how many went in.
///
/// # Errors
///
/// Returns `ImportError::Repository` or `ImportError::Database` if any
/// insert fails; nothing is kept in that case.
pub async fn import_goods(pool: &PgPool, goods: &[NewGoods]) -> Result<usize, ImportError> {
    let mut tx = pool.begin().await?;
    for item in goods {
        insert_goods(&mut *tx, item).await?;
    }
    tx.commit().await?;
    Ok(goods.len())
}

/// The first [`PREVIEW_CHARS`] characters of a fetched body, lossily decoded.
#[must_use]
pub fn body_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(PREVIEW_CHARS)
        .collect()
}

/// Build the template workbook: the header row and two sample rows.
///
/// # Errors
///
/// Returns `ImportError::Template` if the workbook cannot be written.
pub fn template_xlsx() -> Result<Vec<u8>, ImportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("products")?;

    for (col, header) in (0u16..).zip(TEMPLATE_HEADERS) {
        sheet.write_string(0, col, header)?;
    }

    let samples = [
        ("Sample Product A", "Electronics", 1999.99, 100.0, "Sample content A"),
        ("Sample Product B", "Office", 2999.00, 50.0, "Sample content B"),
    ];
    for (row, (name, category, price, stock, content)) in (1u32..).zip(samples) {
        sheet.write_string(row, 0, name)?;
        sheet.write_string(row, 1, category)?;
        sheet.write_number(row, 2, price)?;
        sheet.write_number(row, 3, stock)?;
        sheet.write_string(row, 4, GoodsStatus::OnSale.code())?;
        sheet.write_string(row, 5, DEFAULT_IMAGE_URL)?;
        sheet.write_string(row, 6, content)?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| (*c).to_owned()).collect())
            .collect()
    }

    #[test]
    fn test_map_rows_uses_header_positions() {
        let rows = sheet(&[
            &["category", "goodsname", "stock", "price"],
            &["Office", "Stapler", "12", "9.5"],
        ]);
        let goods = map_rows(&rows);
        assert_eq!(goods.len(), 1);
        assert_eq!(goods[0].goodsname, "Stapler");
        assert_eq!(goods[0].category, "Office");
        assert_eq!(goods[0].stock, 12);
        assert_eq!(goods[0].price, Decimal::new(950, 2));
        assert_eq!(goods[0].mainimg, DEFAULT_IMAGE_URL);
        assert_eq!(goods[0].status, GoodsStatus::OnSale);
    }

    #[test]
    fn test_map_rows_skips_incomplete_rows() {
        let rows = sheet(&[
            &["goodsname", "category"],
            &["", "Office"],
            &["Pen", ""],
            &["Pen", "Office"],
            &["Short row"],
        ]);
        assert_eq!(map_rows(&rows).len(), 1);
    }

    #[test]
    fn test_map_rows_numeric_fallbacks() {
        let rows = sheet(&[
            &["goodsname", "category", "price", "stock", "status"],
            &["Mug", "Kitchen", "cheap", "lots", "1"],
            &["Cup", "Kitchen", "3.999", "7.9", "x"],
        ]);
        let goods = map_rows(&rows);
        assert_eq!(goods[0].price, Decimal::ZERO);
        assert_eq!(goods[0].stock, 0);
        assert_eq!(goods[0].status, GoodsStatus::OffSale);
        assert_eq!(goods[1].price, Decimal::new(400, 2));
        assert_eq!(goods[1].stock, 7);
        assert_eq!(goods[1].status, GoodsStatus::OnSale);
    }

    #[test]
    fn test_map_rows_header_only() {
        assert!(map_rows(&sheet(&[&["goodsname", "category"]])).is_empty());
        assert!(map_rows(&[]).is_empty());
    }

    #[test]
    fn test_template_reads_back() {
        let bytes = template_xlsx().unwrap();
        let rows = read_sheet(&bytes).unwrap();
        assert_eq!(rows[0], TEMPLATE_HEADERS.map(String::from).to_vec());

        let goods = map_rows(&rows);
        assert_eq!(goods.len(), 2);
        assert_eq!(goods[0].goodsname, "Sample Product A");
        assert_eq!(goods[0].price, Decimal::new(199_999, 2));
        assert_eq!(goods[1].stock, 50);
    }

    #[test]
    fn test_read_sheet_rejects_non_xlsx() {
        assert!(matches!(
            read_sheet(b"<html>not a workbook</html>"),
            Err(ImportError::Workbook(_))
        ));
    }

    #[test]
    fn test_body_preview_is_bounded() {
        let body = "a".repeat(PREVIEW_CHARS + 10);
        assert_eq!(body_preview(body.as_bytes()).len(), PREVIEW_CHARS);
        assert_eq!(body_preview(b"root:x:0:0"), "root:x:0:0");
    }
}
