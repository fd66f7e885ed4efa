//! Domain types for the Shop API.
//!
//! These are the explicit response shapes the storefront selects in its
//! queries, validated by serde at the API boundary. Monetary fields are integer
//! minor units, as the engine reports them.

use serde::{Deserialize, Serialize};

use quayside_core::{
    CurrencyCode, CustomerId, ErrorResult, Money, OrderCode, OrderId, OrderLineId, OrderState,
    PaymentState, ProductId, ShippingMethodId, VariantId,
};

// =============================================================================
// Mutation Results
// =============================================================================

/// The union every engine mutation returns: the success type or an
/// `ErrorResult`.
///
/// Error results are tried first; success types never carry `errorCode`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MutationResult<T> {
    Err(ErrorResult),
    Ok(T),
}

impl<T> MutationResult<T> {
    /// Convert into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error result.
    pub fn into_result(self) -> Result<T, ErrorResult> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// The engine's order, as selected by the `OrderFields` fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub code: OrderCode,
    pub state: OrderState,
    pub active: bool,
    pub currency_code: CurrencyCode,
    pub total_quantity: i64,
    pub sub_total: i64,
    pub sub_total_with_tax: i64,
    pub shipping: i64,
    pub shipping_with_tax: i64,
    pub total: i64,
    pub total_with_tax: i64,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_lines: Vec<ShippingLine>,
    #[serde(default)]
    pub payments: Option<Vec<Payment>>,
    pub customer: Option<OrderCustomer>,
    pub shipping_address: Option<OrderAddress>,
}

impl Order {
    /// Whether the order has at least one line.
    #[must_use]
    pub fn has_lines(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Tax-inclusive grand total as computed by the engine.
    #[must_use]
    pub const fn total_with_tax(&self) -> Money {
        Money::from_minor(self.total_with_tax, self.currency_code)
    }

    /// Pre-tax grand total as computed by the engine.
    #[must_use]
    pub const fn total_before_tax(&self) -> Money {
        Money::from_minor(self.total, self.currency_code)
    }

    /// The first authorized or settled payment, if any.
    #[must_use]
    pub fn secured_payment(&self) -> Option<&Payment> {
        self.payments
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|p| p.state.is_secured())
    }

    /// Quantity ordered for a variant across all lines.
    #[must_use]
    pub fn quantity_of(&self, variant_id: &VariantId) -> i64 {
        self.lines
            .iter()
            .filter(|l| &l.product_variant.id == variant_id)
            .map(|l| l.quantity)
            .sum()
    }
}

/// A line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: OrderLineId,
    pub quantity: i64,
    pub unit_price_with_tax: i64,
    pub line_price_with_tax: i64,
    pub product_variant: OrderLineVariant,
    pub featured_asset: Option<Asset>,
}

/// Variant reference on an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineVariant {
    pub id: VariantId,
    pub name: String,
}

/// Shipping line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingLine {
    pub price_with_tax: i64,
    pub shipping_method: ShippingLineMethod,
}

/// Shipping method reference on a shipping line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLineMethod {
    pub id: ShippingMethodId,
    pub name: String,
}

/// Payment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub state: PaymentState,
    pub method: String,
    pub amount: i64,
    pub transaction_id: Option<String>,
}

/// Customer attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub id: CustomerId,
    pub email_address: String,
}

/// Shipping address as stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAddress {
    pub full_name: Option<String>,
    pub street_line1: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
}

/// A shipping method the engine considers eligible for the active order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub id: ShippingMethodId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub price_with_tax: i64,
}

// =============================================================================
// Mutation Inputs
// =============================================================================

/// Shipping address input (`CreateAddressInput`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub full_name: String,
    pub street_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_line2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub postal_code: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Guest customer details (`CreateCustomerInput`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
}

/// Payment input (`PaymentInput`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentInput {
    pub method: String,
    pub metadata: serde_json::Value,
}

// =============================================================================
// Catalogue Types
// =============================================================================

/// Product image asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub preview: String,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: VariantId,
    pub name: String,
    pub sku: String,
    pub price_with_tax: i64,
    pub currency_code: CurrencyCode,
    pub stock_level: String,
}

impl ProductVariant {
    /// Tax-inclusive unit price.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        Money::from_minor(self.price_with_tax, self.currency_code)
    }
}

/// A product with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub featured_asset: Option<Asset>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Find a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }
}

/// A page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductList {
    pub items: Vec<Product>,
    pub total_items: i64,
}

// =============================================================================
// Customer Types
// =============================================================================

/// The logged-in user returned by `login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub identifier: String,
}

/// The session's customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}
