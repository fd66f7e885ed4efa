//! Cart route handlers.
//!
//! The cart is local: it lives in the session and only reaches the engine
//! when checkout starts. Adding a line resolves the variant through the
//! cached product lookup so the line carries the engine's name, price and
//! image.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use quayside_core::{Cart, CartLine, CurrencyCode, VariantId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::session::{load_cart, save_cart};
use crate::shop::{Product, ProductVariant};
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub variant_id: VariantId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub unit_price_minor: i64,
    pub line_total: String,
    pub line_total_minor: i64,
    pub image: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub total_minor: i64,
    pub currency: CurrencyCode,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let total = cart.total();
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| {
                    let line_total = line.line_total();
                    CartLineView {
                        variant_id: line.variant_id.clone(),
                        name: line.name.clone(),
                        quantity: line.quantity,
                        unit_price: line.unit_price.display(),
                        unit_price_minor: line.unit_price.minor,
                        line_total: line_total.display(),
                        line_total_minor: line_total.minor,
                        image: line.image.clone(),
                    }
                })
                .collect(),
            total: total.display(),
            total_minor: total.minor,
            currency: total.currency,
            item_count: cart.item_count(),
        }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_slug: String,
    pub variant_id: VariantId,
    pub quantity: Option<u32>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCart {
    pub variant_id: VariantId,
    pub quantity: i64,
}

/// Remove line request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    pub variant_id: VariantId,
}

/// Build a cart line from the engine's view of a variant.
fn cart_line(product: &Product, variant: &ProductVariant, quantity: u32) -> CartLine {
    let name = if variant.name.is_empty() || variant.name == product.name {
        product.name.clone()
    } else {
        format!("{} - {}", product.name, variant.name)
    };
    CartLine {
        product_id: product.id.clone(),
        variant_id: variant.id.clone(),
        name,
        unit_price: variant.unit_price(),
        quantity,
        image: product.featured_asset.as_ref().map(|a| a.preview.clone()),
    }
}

/// Show the cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    let cart = load_cart(&session).await;
    Json(CartView::from(&cart))
}

/// Add a variant to the cart.
#[instrument(skip(state, session), fields(variant_id = %body.variant_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddToCart>,
) -> Result<Json<CartView>> {
    let product = state.shop().product(&body.product_slug).await?;
    let variant = product.variant(&body.variant_id).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Variant {} does not belong to {}",
            body.variant_id, body.product_slug
        ))
    })?;

    let mut cart = load_cart(&session).await;
    cart.add(cart_line(&product, variant, body.quantity.unwrap_or(1)))?;
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", body.variant_id.as_str())]));
    Ok(Json(CartView::from(&cart)))
}

/// Set a line's quantity. Zero or less removes the line.
#[instrument(skip(session), fields(variant_id = %body.variant_id))]
pub async fn update(session: Session, Json(body): Json<UpdateCart>) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    if !cart.set_quantity(&body.variant_id, body.quantity)? {
        return Err(AppError::NotFound(format!(
            "cart line for variant {}",
            body.variant_id
        )));
    }
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Remove a line.
#[instrument(skip(session), fields(variant_id = %body.variant_id))]
pub async fn remove(
    session: Session,
    Json(body): Json<RemoveFromCart>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    if cart.remove(&body.variant_id).is_some() {
        save_cart(&session, &cart).await?;
    }
    Ok(Json(CartView::from(&cart)))
}
