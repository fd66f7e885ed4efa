//! The local shopping cart.
//!
//! This is the only model Quayside owns. It lives in the visitor's session
//! until checkout begins, at which point its lines are pushed to the engine's
//! active order in insertion order.
//!
//! Invariants:
//! - every line has `quantity > 0` (setting a quantity to zero removes the line)
//! - lines are keyed uniquely by [`VariantId`]
//! - all lines share one currency

use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};
use super::price::{CurrencyCode, Money};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {max}, got {got}")]
    InvalidQuantity { got: i64, max: u32 },
    #[error("cart is priced in {cart}, cannot add a line priced in {line}")]
    CurrencyMismatch {
        cart: CurrencyCode,
        line: CurrencyCode,
    },
    #[error("duplicate line for variant {0}")]
    DuplicateVariant(VariantId),
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub image: Option<String>,
}

impl CartLine {
    /// `unit_price × quantity`, saturating at the numeric bounds.
    #[must_use]
    pub fn line_total(&self) -> Money {
        Money::from_minor(
            self.unit_price
                .minor
                .saturating_mul(i64::from(self.quantity)),
            self.unit_price.currency,
        )
    }
}

/// An ordered set of cart lines keyed by variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCart")]
pub struct Cart {
    lines: Vec<CartLine>,
}

/// Unvalidated shape used when reading a cart back out of the session.
#[derive(Deserialize)]
struct RawCart {
    #[serde(default)]
    lines: Vec<CartLine>,
}

impl TryFrom<RawCart> for Cart {
    type Error = CartError;

    fn try_from(raw: RawCart) -> Result<Self, Self::Error> {
        let mut cart = Self::new();
        for line in raw.lines {
            if cart.get(&line.variant_id).is_some() {
                return Err(CartError::DuplicateVariant(line.variant_id));
            }
            if line.quantity == 0 {
                continue;
            }
            cart.check_currency(line.unit_price.currency)?;
            cart.lines.push(line);
        }
        Ok(cart)
    }
}

impl Cart {
    /// Largest quantity a single line may hold.
    pub const MAX_LINE_QUANTITY: u32 = 999;

    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up the line for a variant.
    #[must_use]
    pub fn get(&self, variant_id: &VariantId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.variant_id == variant_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Currency of the cart, if it has any lines.
    #[must_use]
    pub fn currency(&self) -> Option<CurrencyCode> {
        self.lines.first().map(|l| l.unit_price.currency)
    }

    /// Add a line, merging with an existing line for the same variant.
    ///
    /// On merge the quantities are summed and the name, price and image are
    /// refreshed from the incoming line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if the line (or the merged
    /// total) is outside `1..=MAX_LINE_QUANTITY`, and
    /// [`CartError::CurrencyMismatch`] if the price is in another currency.
    pub fn add(&mut self, line: CartLine) -> Result<(), CartError> {
        validate_quantity(i64::from(line.quantity))?;

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == line.variant_id)
        {
            let merged = i64::from(existing.quantity) + i64::from(line.quantity);
            let quantity = validate_quantity(merged)?;
            if existing.unit_price.currency != line.unit_price.currency {
                return Err(CartError::CurrencyMismatch {
                    cart: existing.unit_price.currency,
                    line: line.unit_price.currency,
                });
            }
            *existing = CartLine { quantity, ..line };
            return Ok(());
        }

        self.check_currency(line.unit_price.currency)?;
        self.lines.push(line);
        Ok(())
    }

    /// Set the quantity for a variant. A quantity of zero or less removes the
    /// line.
    ///
    /// Returns `false` if the variant is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` exceeds
    /// `MAX_LINE_QUANTITY`.
    pub fn set_quantity(&mut self, variant_id: &VariantId, quantity: i64) -> Result<bool, CartError> {
        if quantity <= 0 {
            return Ok(self.remove(variant_id).is_some());
        }
        let quantity = validate_quantity(quantity)?;
        match self.lines.iter_mut().find(|l| &l.variant_id == variant_id) {
            Some(line) => {
                line.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a variant's line.
    pub fn remove(&mut self, variant_id: &VariantId) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| &l.variant_id == variant_id)?;
        Some(self.lines.remove(index))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `unit_price × quantity` over all lines.
    ///
    /// An empty cart totals zero in the default currency.
    #[must_use]
    pub fn total(&self) -> Money {
        let currency = self.currency().unwrap_or_default();
        let minor = self
            .lines
            .iter()
            .fold(0_i64, |acc, l| acc.saturating_add(l.line_total().minor));
        Money::from_minor(minor, currency)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
    }

    fn check_currency(&self, currency: CurrencyCode) -> Result<(), CartError> {
        match self.currency() {
            Some(cart) if cart != currency => Err(CartError::CurrencyMismatch {
                cart,
                line: currency,
            }),
            _ => Ok(()),
        }
    }
}

fn validate_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=Cart::MAX_LINE_QUANTITY).contains(q))
        .ok_or(CartError::InvalidQuantity {
            got: quantity,
            max: Cart::MAX_LINE_QUANTITY,
        })
}
