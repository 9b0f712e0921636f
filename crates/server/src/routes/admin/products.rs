//! Back office product management.
//!
//! Add and edit are multipart posts from the modals on the product list,
//! so an image can ride along with the fields.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hackshop_core::{GoodsId, GoodsStatus};

use super::{AdminLayout, filter_suffix};
use crate::db::{GoodsRepository, RepositoryError};
use crate::error::Result;
use crate::extract::non_blank;
use crate::filters;
use crate::middleware::{Flashes, RequireAdmin, flash_failure, push_flash};
use crate::models::{DEFAULT_IMAGE_URL, FlashLevel, Goods, GoodsFilter, NewGoods, Pagination};
use crate::services::ids::parse_positive_int;
use crate::services::import::{parse_price, parse_stock};
use crate::services::uploads::{save_upload, upload_url};
use crate::state::AppState;

const PER_PAGE: i64 = 20;
const LIST_URL: &str = "/admin/products";

// =============================================================================
// List
// =============================================================================

/// Product list filters. `batch_url` pre-fills the import dialog.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub page: Option<String>,
    pub keyword: Option<String>,
    pub status: Option<String>,
    pub batch_url: Option<String>,
}

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub layout: AdminLayout,
    pub goods: Vec<Goods>,
    pub pagination: Pagination,
    pub keyword: String,
    pub status: String,
    pub batch_url: String,
    pub page_suffix: String,
}

/// Paginated product list with keyword and status filters.
#[instrument(skip(state, admin, flashes))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Flashes(flashes): Flashes,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse> {
    let filter = GoodsFilter {
        keyword: non_blank(query.keyword.as_deref()).map(str::to_owned),
        status: query.status.as_deref().and_then(GoodsStatus::from_code),
    };
    let (goods, pagination) = GoodsRepository::new(state.pool())
        .admin_page(
            &filter,
            parse_positive_int(query.page.as_deref(), 1),
            PER_PAGE,
        )
        .await?;

    let keyword = filter.keyword.unwrap_or_default();
    let status = filter.status.map(|s| s.code().to_owned()).unwrap_or_default();
    Ok(ProductsTemplate {
        layout: AdminLayout::new(admin, flashes, "products"),
        goods,
        pagination,
        page_suffix: filter_suffix(&[("keyword", keyword.as_str()), ("status", status.as_str())]),
        keyword,
        status,
        batch_url: query.batch_url.unwrap_or_default(),
    })
}

// =============================================================================
// Add / Edit
// =============================================================================

/// Fields of the add and edit modals.
#[derive(Debug, Default)]
struct ProductFields {
    goodsname: String,
    category: String,
    price: String,
    stock: String,
    status: String,
    content: String,
    /// Client file name and bytes of a non-empty image upload.
    image: Option<(String, Vec<u8>)>,
}

impl ProductFields {
    async fn read(mut multipart: Multipart) -> std::result::Result<Self, MultipartError> {
        let mut fields = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "image" {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                if !filename.is_empty() && !bytes.is_empty() {
                    fields.image = Some((filename, bytes.to_vec()));
                }
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "goodsname" => fields.goodsname = value,
                "category" => fields.category = value,
                "price" => fields.price = value,
                "stock" => fields.stock = value,
                "status" => fields.status = value,
                "content" => fields.content = value,
                _ => {}
            }
        }
        Ok(fields)
    }

    /// Name and category are required; everything else has a fallback.
    fn to_new_goods(&self, default_status: GoodsStatus) -> Option<NewGoods> {
        let name = non_blank(Some(self.goodsname.as_str()))?;
        let category = non_blank(Some(self.category.as_str()))?;

        let mut goods = NewGoods::basic(
            name.to_owned(),
            category.to_owned(),
            parse_price(&self.price),
            parse_stock(&self.stock),
        );
        goods.status = GoodsStatus::from_code(self.status.trim()).unwrap_or(default_status);
        goods.content = self.content.trim().to_owned();
        Some(goods)
    }
}

const FIELDS_REQUIRED: &str = "Please fill in product name and category";

/// Store the uploaded image, if any, and return its public URL.
async fn store_image(state: &AppState, fields: &ProductFields) -> std::io::Result<Option<String>> {
    match &fields.image {
        Some((filename, bytes)) => {
            let stored = save_upload(&state.config().upload_dir, filename, bytes).await?;
            Ok(Some(upload_url(&stored)))
        }
        None => Ok(None),
    }
}

/// Create a product from the add modal.
#[instrument(skip(state, session, _admin, multipart))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    multipart: Multipart,
) -> Redirect {
    let fields = match ProductFields::read(multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            flash_failure(&session, "product form", &e).await;
            return Redirect::to(LIST_URL);
        }
    };
    let Some(mut goods) = fields.to_new_goods(GoodsStatus::OnSale) else {
        push_flash(&session, FlashLevel::Error, FIELDS_REQUIRED).await;
        return Redirect::to(LIST_URL);
    };

    match store_image(&state, &fields).await {
        Ok(url) => goods.mainimg = url.unwrap_or_else(|| DEFAULT_IMAGE_URL.to_owned()),
        Err(e) => {
            flash_failure(&session, "product image upload", &e).await;
            return Redirect::to(LIST_URL);
        }
    }

    match GoodsRepository::new(state.pool()).create(&goods).await {
        Ok(id) => {
            tracing::info!(goods_id = %id, name = %goods.goodsname, "product created");
            push_flash(&session, FlashLevel::Success, "Product added").await;
        }
        Err(e) => flash_failure(&session, "product create", &e).await,
    }
    Redirect::to(LIST_URL)
}

/// Update a product from the edit modal. The image is kept unless a new one
/// is uploaded.
#[instrument(skip(state, session, _admin, multipart))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Redirect {
    let id = GoodsId::new(id);
    let repo = GoodsRepository::new(state.pool());

    let existing = match repo.get(id).await {
        Ok(Some(goods)) => goods,
        Ok(None) => {
            push_flash(&session, FlashLevel::Error, "Product not found").await;
            return Redirect::to(LIST_URL);
        }
        Err(e) => {
            flash_failure(&session, "product lookup", &e).await;
            return Redirect::to(LIST_URL);
        }
    };

    let fields = match ProductFields::read(multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            flash_failure(&session, "product form", &e).await;
            return Redirect::to(LIST_URL);
        }
    };
    let Some(goods) = fields.to_new_goods(existing.status) else {
        push_flash(&session, FlashLevel::Error, FIELDS_REQUIRED).await;
        return Redirect::to(LIST_URL);
    };

    let image = match store_image(&state, &fields).await {
        Ok(url) => url,
        Err(e) => {
            flash_failure(&session, "product image upload", &e).await;
            return Redirect::to(LIST_URL);
        }
    };

    match repo.update(id, &goods, image.as_deref()).await {
        Ok(()) => {
            tracing::info!(goods_id = %id, "product updated");
            push_flash(&session, FlashLevel::Success, "Product updated").await;
        }
        Err(RepositoryError::NotFound) => {
            push_flash(&session, FlashLevel::Error, "Product not found").await;
        }
        Err(e) => flash_failure(&session, "product update", &e).await,
    }
    Redirect::to(LIST_URL)
}

// =============================================================================
// Status
// =============================================================================

/// Flip a product between on sale and off sale.
#[instrument(skip(state, session, _admin))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Redirect {
    let id = GoodsId::new(id);
    let repo = GoodsRepository::new(state.pool());

    let goods = match repo.get(id).await {
        Ok(Some(goods)) => goods,
        Ok(None) => {
            push_flash(&session, FlashLevel::Error, "Product not found").await;
            return Redirect::to(LIST_URL);
        }
        Err(e) => {
            flash_failure(&session, "product lookup", &e).await;
            return Redirect::to(LIST_URL);
        }
    };

    let status = goods.status.toggled();
    match repo.set_status(id, status).await {
        Ok(()) => {
            push_flash(
                &session,
                FlashLevel::Success,
                format!("{} is now {}", goods.goodsname, status.label()),
            )
            .await;
        }
        Err(e) => flash_failure(&session, "product toggle", &e).await,
    }
    Redirect::to(LIST_URL)
}

/// "Delete" a product by taking it off sale; order history keeps its rows.
#[instrument(skip(state, session, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Redirect {
    match GoodsRepository::new(state.pool())
        .set_status(GoodsId::new(id), GoodsStatus::OffSale)
        .await
    {
        Ok(()) => {
            tracing::info!(goods_id = id, "product taken off sale");
            push_flash(&session, FlashLevel::Success, "Product removed from sale").await;
        }
        Err(RepositoryError::NotFound) => {
            push_flash(&session, FlashLevel::Error, "Product not found").await;
        }
        Err(e) => flash_failure(&session, "product delete", &e).await,
    }
    Redirect::to(LIST_URL)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn fields(name: &str, category: &str) -> ProductFields {
        ProductFields {
            goodsname: name.to_owned(),
            category: category.to_owned(),
            price: "19.90".to_owned(),
            stock: "7".to_owned(),
            ..ProductFields::default()
        }
    }

    #[test]
    fn test_name_and_category_required() {
        assert!(fields("", "Books").to_new_goods(GoodsStatus::OnSale).is_none());
        assert!(fields("Lamp", "  ").to_new_goods(GoodsStatus::OnSale).is_none());
    }

    #[test]
    fn test_fields_map_to_new_goods() {
        let goods = fields(" Lamp ", "Home")
            .to_new_goods(GoodsStatus::OffSale)
            .unwrap();
        assert_eq!(goods.goodsname, "Lamp");
        assert_eq!(goods.price, Decimal::new(1990, 2));
        assert_eq!(goods.stock, 7);
        // No status field falls back to the caller's default.
        assert_eq!(goods.status, GoodsStatus::OffSale);
        assert_eq!(goods.mainimg, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn test_explicit_status_wins() {
        let mut f = fields("Lamp", "Home");
        f.status = GoodsStatus::OffSale.code().to_owned();
        let goods = f.to_new_goods(GoodsStatus::OnSale);
        assert_eq!(goods.map(|g| g.status), Some(GoodsStatus::OffSale));
    }
}
