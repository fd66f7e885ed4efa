//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::shop::Product;
use crate::state::AppState;

/// Products per page when the client does not ask.
const DEFAULT_PER_PAGE: u32 = 24;

/// Upper bound on page size.
const MAX_PER_PAGE: u32 = 100;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    /// `(page, per_page, take, skip)`. Pages are 1-based.
    fn window(&self) -> (u32, u32, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let skip = i64::from(page - 1) * i64::from(per_page);
        (page, per_page, i64::from(per_page), skip)
    }
}

/// A page of products.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub has_more: bool,
}

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ProductPage>> {
    let (page, per_page, take, skip) = query.window();
    let list = state.shop().products(take, skip).await?;

    let shown = skip.saturating_add(i64::try_from(list.items.len()).unwrap_or(i64::MAX));
    Ok(Json(ProductPage {
        has_more: shown < list.total_items,
        items: list.items,
        page,
        per_page,
        total_items: list.total_items,
    }))
}

/// Show one product with its variants.
#[instrument(skip(state), fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(state.shop().product(&slug).await?))
}
