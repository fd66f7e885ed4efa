//! Checkout order reconciliation.
//!
//! Drives the engine's active order from the local cart through shipping
//! address, shipping method, payment and confirmation. The engine is the
//! source of truth: every step re-queries the active order before acting and
//! tolerates the order's stage having advanced for reasons outside this
//! client's control (another tab, an engine side effect).
//!
//! # Steps
//!
//! 1. [`Checkout::prepare_order`] - reuse or populate the active order
//! 2. [`Checkout::set_shipping_address`] - attach guest details and address
//! 3. [`Checkout::shipping_options`] - eligible methods, or `NoneEligible`
//! 4. [`Checkout::choose_shipping`] - apply a method (soft-succeeds on a
//!    stage mismatch)
//! 5. [`Checkout::begin_payment`] - create or reuse a payment intent for the
//!    engine's total
//! 6. [`Checkout::complete_payment`] - attach the payment and clear the cart
//!
//! Failures are [`CheckoutError`]s, classified by [`CheckoutError::class`].

mod error;
#[cfg(test)]
mod testing;

pub use error::{CheckoutError, ErrorClass, LineWarning};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use quayside_core::{
    Cart, CartLine, ErrorCode, ErrorResult, Money, OrderCode, OrderState, PaymentIntentId,
    ShippingMethodId,
};

use crate::payment::{IntentRequest, IntentStatus, PaymentProvider};
use crate::shop::{
    AddressInput, CustomerInput, MutationResult, Order, PaymentInput, ShippingQuote, ShopApi,
    ShopError, ShopSession,
};

/// Result of [`Checkout::prepare_order`].
#[derive(Debug, Clone)]
pub struct PreparedOrder {
    pub order: Order,
    /// The active order already had lines and was used as-is.
    pub reused: bool,
    /// Cart lines the engine refused.
    pub warnings: Vec<LineWarning>,
    /// Code of a terminal order that was abandoned for a fresh one.
    pub discarded: Option<OrderCode>,
}

/// Result of [`Checkout::shipping_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingOptions {
    Available(Vec<ShippingQuote>),
    /// The engine has no method applicable to this order, usually missing
    /// zone or shipping method configuration.
    NoneEligible,
}

/// Result of [`Checkout::choose_shipping`].
#[derive(Debug, Clone)]
pub struct ShippingOutcome {
    /// The order as it stands after the attempt.
    pub order: Order,
    /// False when the order had already moved past the shipping stage.
    pub method_applied: bool,
}

/// A payment intent awaiting confirmation, kept in the storefront session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub intent_id: PaymentIntentId,
    pub order_code: OrderCode,
    pub amount: Money,
    /// Incremented whenever a new intent has to be created for the same order.
    pub attempt: u32,
}

impl PendingPayment {
    /// Idempotency key for the intent: the same order, amount and attempt
    /// always map to the same intent.
    #[must_use]
    pub fn idempotency_key(order_code: &OrderCode, amount: Money, attempt: u32) -> String {
        format!("{order_code}:{}:{attempt}", amount.minor)
    }
}

/// Result of [`Checkout::begin_payment`].
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub pending: PendingPayment,
    /// Handed to the browser to confirm the intent.
    pub client_secret: Option<String>,
    pub status: IntentStatus,
    /// An existing intent was returned instead of creating one.
    pub reused: bool,
}

/// Result of [`Checkout::complete_payment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub order_code: OrderCode,
    pub total: Money,
    /// The payment had been attached by an earlier attempt.
    pub already_confirmed: bool,
}

enum LineFailure {
    Transport(ShopError),
    Rejected(ErrorResult),
}

/// One customer's checkout against the engine.
///
/// Borrows the engine client and the customer's [`ShopSession`]; the session
/// is updated in place when the engine issues a token.
pub struct Checkout<'a, S: ?Sized> {
    shop: &'a S,
    session: &'a mut ShopSession,
}

impl<'a, S: ShopApi + ?Sized> Checkout<'a, S> {
    pub const fn new(shop: &'a S, session: &'a mut ShopSession) -> Self {
        Self { shop, session }
    }

    // =========================================================================
    // Order Population
    // =========================================================================

    /// Make sure the engine's active order holds the cart.
    ///
    /// An active order that already has lines and can still be modified is
    /// reused without adding anything. A terminal active order is abandoned
    /// and a new one is populated from the cart.
    ///
    /// # Errors
    ///
    /// `EmptyCart` for an empty cart, `EmptyOrder` if no line could be
    /// added, `StaleOrder` if the engine's order can no longer be changed.
    #[instrument(skip_all, fields(lines = cart.lines().len()))]
    pub async fn prepare_order(&mut self, cart: &Cart) -> Result<PreparedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut discarded = None;
        match self.shop.active_order(self.session).await? {
            Some(order) if order.has_lines() && order.state.is_modifiable() => {
                debug!(order_code = %order.code, "Reusing active order");
                return Ok(PreparedOrder {
                    order,
                    reused: true,
                    warnings: Vec::new(),
                    discarded: None,
                });
            }
            Some(order) if order.state.is_terminal() => {
                warn!(
                    order_code = %order.code,
                    state = %order.state,
                    "Active order is already past checkout, starting a new order"
                );
                discarded = Some(order.code);
            }
            Some(order) if !order.state.is_modifiable() => {
                return Err(CheckoutError::StaleOrder {
                    code: order.code,
                    state: order.state,
                });
            }
            Some(_) | None => {}
        }

        let mut warnings = Vec::new();
        let mut transport_failure = None;

        for line in cart.lines() {
            match self.add_line(line).await {
                Ok(()) => {}
                Err(LineFailure::Rejected(err))
                    if discarded.is_some() && err.error_code.is_stage_mismatch() =>
                {
                    warn!(
                        variant_id = %line.variant_id,
                        message = %err.message,
                        "Engine refused to start a new order"
                    );
                    return Err(self.stale().await);
                }
                Err(LineFailure::Rejected(err)) => {
                    warn!(
                        variant_id = %line.variant_id,
                        code = %err.error_code,
                        message = %err.message,
                        "Engine refused cart line"
                    );
                    warnings.push(LineWarning {
                        variant_id: line.variant_id.clone(),
                        name: line.name.clone(),
                        code: Some(err.error_code),
                        message: err.message,
                    });
                }
                Err(LineFailure::Transport(err)) => {
                    warn!(variant_id = %line.variant_id, error = %err, "Failed to add cart line");
                    warnings.push(LineWarning {
                        variant_id: line.variant_id.clone(),
                        name: line.name.clone(),
                        code: None,
                        message: "The store could not be reached".to_string(),
                    });
                    if err.is_transient() {
                        transport_failure = Some(err);
                    }
                }
            }
        }

        let Some(order) = self.shop.active_order(self.session).await? else {
            return Err(empty_order(warnings, transport_failure));
        };
        if !order.state.is_modifiable() || discarded.as_ref() == Some(&order.code) {
            return Err(CheckoutError::StaleOrder {
                code: order.code,
                state: order.state,
            });
        }
        if !order.has_lines() {
            return Err(empty_order(warnings, transport_failure));
        }

        info!(
            order_code = %order.code,
            lines = order.lines.len(),
            warnings = warnings.len(),
            "Order populated from cart"
        );
        Ok(PreparedOrder {
            order,
            reused: false,
            warnings,
            discarded,
        })
    }

    /// Add one cart line, retrying once if the engine has no active order.
    async fn add_line(&mut self, line: &CartLine) -> Result<(), LineFailure> {
        let mut retried = false;
        loop {
            let result = self
                .shop
                .add_item_to_order(self.session, &line.variant_id, line.quantity)
                .await
                .map_err(LineFailure::Transport)?;

            match result {
                MutationResult::Ok(_) => return Ok(()),
                MutationResult::Err(err)
                    if err.error_code == ErrorCode::NoActiveOrderError && !retried =>
                {
                    debug!(variant_id = %line.variant_id, "No active order yet, retrying line");
                    retried = true;
                }
                MutationResult::Err(err) => return Err(LineFailure::Rejected(err)),
            }
        }
    }

    // =========================================================================
    // Address and Shipping
    // =========================================================================

    /// Attach guest details (if any) and the shipping address.
    ///
    /// Returns the re-queried order: the engine may advance its stage as a
    /// side effect of setting the address.
    ///
    /// # Errors
    ///
    /// `NoActiveOrder` / `StaleOrder` when there is no order to change,
    /// `CustomerRejected` when the guest email cannot be used.
    #[instrument(skip_all, fields(guest = guest.is_some()))]
    pub async fn set_shipping_address(
        &mut self,
        address: &AddressInput,
        guest: Option<&CustomerInput>,
    ) -> Result<Order, CheckoutError> {
        let before = self.modifiable_order().await?;

        if let Some(customer) = guest {
            match self.shop.set_customer_for_order(self.session, customer).await? {
                MutationResult::Ok(_) => {}
                MutationResult::Err(err) if err.error_code == ErrorCode::AlreadyLoggedInError => {
                    debug!("Session is logged in, keeping account customer");
                }
                MutationResult::Err(err)
                    if matches!(
                        err.error_code,
                        ErrorCode::EmailAddressConflictError | ErrorCode::GuestCheckoutError
                    ) =>
                {
                    return Err(CheckoutError::CustomerRejected(err));
                }
                MutationResult::Err(err) => return Err(self.order_rejection(err).await),
            }
        }

        if let MutationResult::Err(err) = self
            .shop
            .set_order_shipping_address(self.session, address)
            .await?
        {
            return Err(self.order_rejection(err).await);
        }

        let order = self.current_order().await?;
        if order.state != before.state {
            info!(
                order_code = %order.code,
                from = %before.state,
                to = %order.state,
                "Order stage advanced while setting shipping address"
            );
        }
        if order.state.is_terminal() {
            return Err(CheckoutError::StaleOrder {
                code: order.code,
                state: order.state,
            });
        }
        Ok(order)
    }

    /// Shipping methods the engine considers eligible for the active order.
    ///
    /// # Errors
    ///
    /// `NoActiveOrder` if the session has no order. No eligible methods is
    /// not an error.
    #[instrument(skip_all)]
    pub async fn shipping_options(&mut self) -> Result<ShippingOptions, CheckoutError> {
        let order = self.current_order().await?;
        let quotes = self.shop.eligible_shipping_methods(self.session).await?;

        if quotes.is_empty() {
            warn!(
                order_code = %order.code,
                "No eligible shipping methods, check the engine's zone and shipping method setup"
            );
            return Ok(ShippingOptions::NoneEligible);
        }
        Ok(ShippingOptions::Available(quotes))
    }

    /// Apply a shipping method.
    ///
    /// If the order has already moved past the shipping stage the method is
    /// left as it is and the current order is returned, so the flow can
    /// continue to payment with the engine's current totals.
    ///
    /// # Errors
    ///
    /// `IneligibleShippingMethod` if the method does not apply to the order,
    /// `NoActiveOrder` if the session has no order, `StaleOrder` if it is
    /// already past checkout.
    #[instrument(skip_all, fields(method_id = %method_id))]
    pub async fn choose_shipping(
        &mut self,
        method_id: &ShippingMethodId,
    ) -> Result<ShippingOutcome, CheckoutError> {
        let before = self.current_order().await?;
        if before.state.is_terminal() {
            return Err(CheckoutError::StaleOrder {
                code: before.code,
                state: before.state,
            });
        }

        match self
            .shop
            .set_order_shipping_method(self.session, method_id)
            .await?
        {
            MutationResult::Ok(order) => Ok(ShippingOutcome {
                order,
                method_applied: true,
            }),
            MutationResult::Err(err) if err.error_code.is_stage_mismatch() => {
                let order = self.current_order().await?;
                info!(
                    order_code = %order.code,
                    state = %order.state,
                    "Order already past shipping stage, continuing with current totals"
                );
                Ok(ShippingOutcome {
                    order,
                    method_applied: false,
                })
            }
            MutationResult::Err(err)
                if err.error_code == ErrorCode::IneligibleShippingMethodError =>
            {
                Err(CheckoutError::IneligibleShippingMethod(err))
            }
            MutationResult::Err(err) if err.error_code == ErrorCode::NoActiveOrderError => {
                Err(CheckoutError::NoActiveOrder)
            }
            MutationResult::Err(err) => Err(CheckoutError::Rejected(err)),
        }
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Create, or reuse, a payment intent for the order's engine-computed
    /// total.
    ///
    /// A pending intent for the same order code and amount is reused while
    /// the browser can still confirm it.
    ///
    /// # Errors
    ///
    /// `NoActiveOrder` / `StaleOrder` / `EmptyOrder` for an order that
    /// cannot be paid, `ZeroTotal` when there is nothing to charge.
    #[instrument(skip_all)]
    pub async fn begin_payment<P: PaymentProvider + ?Sized>(
        &mut self,
        payments: &P,
        pending: Option<&PendingPayment>,
    ) -> Result<PaymentSession, CheckoutError> {
        let order = self.current_order().await?;
        if order.state.is_terminal() {
            return Err(CheckoutError::StaleOrder {
                code: order.code,
                state: order.state,
            });
        }
        if !order.has_lines() {
            return Err(CheckoutError::EmptyOrder {
                warnings: Vec::new(),
            });
        }

        let amount = order.total_with_tax();
        if amount.minor <= 0 {
            return Err(CheckoutError::ZeroTotal);
        }

        let mut attempt = 1;
        if let Some(pending) = pending.filter(|p| p.order_code == order.code) {
            if pending.amount == amount {
                let intent = payments.retrieve_intent(&pending.intent_id).await?;
                if intent.status.is_reusable() || intent.status.is_paid() {
                    debug!(intent_id = %intent.id, status = ?intent.status, "Reusing payment intent");
                    return Ok(PaymentSession {
                        pending: pending.clone(),
                        client_secret: intent.client_secret,
                        status: intent.status,
                        reused: true,
                    });
                }
            } else {
                info!(
                    order_code = %order.code,
                    previous = %pending.amount,
                    current = %amount,
                    "Order total changed since payment started"
                );
            }
            attempt = pending.attempt.saturating_add(1);
        }

        let request = IntentRequest {
            amount,
            order_code: order.code.clone(),
            idempotency_key: PendingPayment::idempotency_key(&order.code, amount, attempt),
        };
        let intent = payments.create_intent(&request).await?;

        Ok(PaymentSession {
            pending: PendingPayment {
                intent_id: intent.id,
                order_code: order.code,
                amount,
                attempt,
            },
            client_secret: intent.client_secret,
            status: intent.status,
            reused: false,
        })
    }

    /// Attach a confirmed payment to the order and clear the cart.
    ///
    /// Safe to call again after a partial failure: an order that already
    /// carries a settled or authorized payment is confirmed without charging
    /// again.
    ///
    /// # Errors
    ///
    /// `PaymentDeclined` / `PaymentCanceled` / `PaymentPending` from the
    /// intent's status, `PaymentMismatch` / `StaleOrder` / `AmountMismatch`
    /// when the intent and the order disagree.
    #[instrument(
        skip_all,
        fields(order_code = %pending.order_code, intent_id = %pending.intent_id)
    )]
    pub async fn complete_payment<P: PaymentProvider + ?Sized>(
        &mut self,
        payments: &P,
        pending: &PendingPayment,
        cart: &mut Cart,
    ) -> Result<Confirmation, CheckoutError> {
        let intent = payments.retrieve_intent(&pending.intent_id).await?;

        if intent.order_code() != Some(pending.order_code.as_str()) {
            warn!(found = ?intent.order_code(), "Payment intent belongs to another order");
            return Err(CheckoutError::PaymentMismatch {
                expected: pending.order_code.clone(),
            });
        }

        match intent.status {
            status if status.is_paid() => {}
            IntentStatus::RequiresPaymentMethod => {
                return Err(intent.decline_message().map_or(
                    CheckoutError::PaymentPending,
                    |message| CheckoutError::PaymentDeclined {
                        message: message.to_string(),
                    },
                ));
            }
            IntentStatus::Canceled => return Err(CheckoutError::PaymentCanceled),
            _ => return Err(CheckoutError::PaymentPending),
        }

        let paid = Money::from_minor(intent.amount, pending.amount.currency);

        let order = match self.shop.active_order(self.session).await? {
            Some(order) if order.code == pending.order_code => order,
            Some(order) => {
                if let Some(confirmation) = self.confirm_existing(pending, cart).await? {
                    return Ok(confirmation);
                }
                return Err(CheckoutError::StaleOrder {
                    code: order.code,
                    state: order.state,
                });
            }
            None => {
                return self
                    .confirm_existing(pending, cart)
                    .await?
                    .ok_or(CheckoutError::NoActiveOrder);
            }
        };

        if order.secured_payment().is_some() {
            let total = order.total_with_tax();
            return Ok(finish(order.code, total, true, cart));
        }

        let total = order.total_with_tax();
        if total != paid {
            warn!(paid = %paid, total = %total, "Order total differs from payment intent");
            return Err(CheckoutError::AmountMismatch {
                expected: paid,
                actual: total,
            });
        }

        if order.state != OrderState::ArrangingPayment {
            match self
                .shop
                .transition_order_to_state(self.session, &OrderState::ArrangingPayment)
                .await?
            {
                MutationResult::Ok(order) => {
                    debug!(state = %order.state, "Order moved to payment stage");
                }
                MutationResult::Err(err) if err.error_code == ErrorCode::NoActiveOrderError => {
                    return self
                        .confirm_existing(pending, cart)
                        .await?
                        .ok_or(CheckoutError::NoActiveOrder);
                }
                MutationResult::Err(err) => return Err(self.order_rejection(err).await),
            }
        }

        let input = PaymentInput {
            method: payments.method_code().to_string(),
            metadata: serde_json::json!({ "paymentIntentId": intent.id }),
        };

        match self.shop.add_payment_to_order(self.session, &input).await? {
            MutationResult::Ok(order) => {
                if order.secured_payment().is_none() {
                    warn!(state = %order.state, "Payment attached but order is not secured");
                    return Err(CheckoutError::PaymentNotSecured);
                }
                info!(order_code = %order.code, total = %total, "Order confirmed");
                Ok(finish(order.code, total, false, cart))
            }
            MutationResult::Err(err)
                if matches!(
                    err.error_code,
                    ErrorCode::PaymentDeclinedError | ErrorCode::PaymentFailedError
                ) =>
            {
                warn!(code = %err.error_code, message = %err.message, "Engine rejected payment");
                Err(CheckoutError::PaymentDeclined {
                    message: err.message,
                })
            }
            MutationResult::Err(err)
                if matches!(
                    err.error_code,
                    ErrorCode::NoActiveOrderError | ErrorCode::OrderPaymentStateError
                ) =>
            {
                match self.confirm_existing(pending, cart).await? {
                    Some(confirmation) => Ok(confirmation),
                    None => Err(self.order_rejection(err).await),
                }
            }
            MutationResult::Err(err) => Err(CheckoutError::Rejected(err)),
        }
    }

    /// Confirm an order whose payment was attached by an earlier attempt.
    async fn confirm_existing(
        &mut self,
        pending: &PendingPayment,
        cart: &mut Cart,
    ) -> Result<Option<Confirmation>, CheckoutError> {
        let Some(order) = self
            .shop
            .order_by_code(self.session, &pending.order_code)
            .await?
        else {
            return Ok(None);
        };

        if order.secured_payment().is_none() {
            return Ok(None);
        }
        info!(order_code = %order.code, "Order already carries a secured payment");
        let total = order.total_with_tax();
        Ok(Some(finish(order.code, total, true, cart)))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn current_order(&mut self) -> Result<Order, CheckoutError> {
        self.shop
            .active_order(self.session)
            .await?
            .ok_or(CheckoutError::NoActiveOrder)
    }

    async fn modifiable_order(&mut self) -> Result<Order, CheckoutError> {
        let order = self.current_order().await?;
        if !order.state.is_modifiable() {
            return Err(CheckoutError::StaleOrder {
                code: order.code,
                state: order.state,
            });
        }
        Ok(order)
    }

    /// Describe the active order as stale, or absent.
    async fn stale(&mut self) -> CheckoutError {
        match self.shop.active_order(self.session).await {
            Ok(Some(order)) => CheckoutError::StaleOrder {
                code: order.code,
                state: order.state,
            },
            Ok(None) => CheckoutError::NoActiveOrder,
            Err(e) => CheckoutError::Shop(e),
        }
    }

    /// Map an order mutation's error result.
    async fn order_rejection(&mut self, err: ErrorResult) -> CheckoutError {
        if err.error_code == ErrorCode::NoActiveOrderError {
            return CheckoutError::NoActiveOrder;
        }
        if err.error_code.is_stage_mismatch() || err.error_code == ErrorCode::OrderPaymentStateError
        {
            debug!(code = %err.error_code, message = %err.message, "Order stage mismatch");
            return self.stale().await;
        }
        CheckoutError::Rejected(err)
    }
}

fn empty_order(warnings: Vec<LineWarning>, transport_failure: Option<ShopError>) -> CheckoutError {
    match transport_failure {
        Some(err) => CheckoutError::Shop(err),
        None => CheckoutError::EmptyOrder { warnings },
    }
}

fn finish(order_code: OrderCode, total: Money, already_confirmed: bool, cart: &mut Cart) -> Confirmation {
    cart.clear();
    Confirmation {
        order_code,
        total,
        already_confirmed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::testing::{FakePayments, FakeShop};
    use super::*;
    use quayside_core::{CartLine, CurrencyCode, ProductId, VariantId};

    fn line(variant: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(format!("P-{variant}")),
            variant_id: VariantId::new(variant),
            name: format!("Variant {variant}"),
            unit_price: Money::from_minor(price, CurrencyCode::USD),
            quantity,
            image: None,
        }
    }

    fn cart(lines: &[CartLine]) -> Cart {
        let mut cart = Cart::new();
        for l in lines {
            cart.add(l.clone()).unwrap();
        }
        cart
    }

    fn address() -> AddressInput {
        AddressInput {
            full_name: "Ada Lovelace".to_string(),
            street_line1: "12 Analytical Row".to_string(),
            street_line2: None,
            city: "London".to_string(),
            province: None,
            postal_code: "N1 9GU".to_string(),
            country_code: "GB".to_string(),
            phone_number: None,
        }
    }

    fn guest(email: &str) -> CustomerInput {
        CustomerInput {
            email_address: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn test_prepare_populates_in_cart_order() {
        let shop = FakeShop::new();
        let mut session = ShopSession::default();
        let cart = cart(&[line("A", 1000, 2), line("B", 250, 1)]);

        let prepared = Checkout::new(&shop, &mut session)
            .prepare_order(&cart)
            .await
            .unwrap();

        assert!(!prepared.reused);
        assert!(prepared.warnings.is_empty());
        let variants: Vec<_> = prepared
            .order
            .lines
            .iter()
            .map(|l| l.product_variant.id.as_str())
            .collect();
        assert_eq!(variants, ["A", "B"]);
        assert_eq!(prepared.order.quantity_of(&VariantId::new("A")), 2);
    }

    #[tokio::test]
    async fn test_prepare_twice_adds_nothing() {
        let shop = FakeShop::new();
        let mut session = ShopSession::default();
        let cart = cart(&[line("A", 1000, 2)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        checkout.prepare_order(&cart).await.unwrap();
        let again = checkout.prepare_order(&cart).await.unwrap();

        assert!(again.reused);
        assert_eq!(again.order.quantity_of(&VariantId::new("A")), 2);
        assert_eq!(shop.with(|s| s.add_item_calls), 1);
    }

    #[tokio::test]
    async fn test_prepare_records_refused_lines_and_continues() {
        let shop = FakeShop::new();
        shop.with(|s| s.rejected_variants.push(VariantId::new("B")));
        let mut session = ShopSession::default();
        let cart = cart(&[line("A", 1000, 1), line("B", 500, 1), line("C", 300, 1)]);

        let prepared = Checkout::new(&shop, &mut session)
            .prepare_order(&cart)
            .await
            .unwrap();

        assert_eq!(prepared.order.lines.len(), 2);
        assert_eq!(prepared.warnings.len(), 1);
        assert_eq!(prepared.warnings[0].variant_id.as_str(), "B");
        assert_eq!(
            prepared.warnings[0].code,
            Some(ErrorCode::InsufficientStockError)
        );
    }

    #[tokio::test]
    async fn test_prepare_all_lines_refused() {
        let shop = FakeShop::new();
        shop.with(|s| s.rejected_variants.push(VariantId::new("A")));
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .prepare_order(&cart(&[line("A", 1000, 1)]))
            .await
            .unwrap_err();

        match err {
            CheckoutError::EmptyOrder { warnings } => assert_eq!(warnings.len(), 1),
            other => panic!("expected EmptyOrder, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prepare_empty_cart() {
        let shop = FakeShop::new();
        let mut session = ShopSession::default();
        let err = Checkout::new(&shop, &mut session)
            .prepare_order(&Cart::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(err.class(), ErrorClass::Terminal);
    }

    #[tokio::test]
    async fn test_prepare_replaces_terminal_order() {
        let shop = FakeShop::new();
        let old_code = shop.seed_order(OrderState::PaymentSettled, &[("A", 1)]);
        shop.with(|s| s.no_active_order_once = true);
        let mut session = ShopSession::default();
        let cart = cart(&[line("A", 1000, 2)]);

        let prepared = Checkout::new(&shop, &mut session)
            .prepare_order(&cart)
            .await
            .unwrap();

        assert_eq!(prepared.discarded, Some(old_code.clone()));
        assert_ne!(prepared.order.code, old_code);
        assert_eq!(prepared.order.quantity_of(&VariantId::new("A")), 2);
        // one refused attempt, one retry
        assert_eq!(shop.with(|s| s.add_item_calls), 2);
    }

    #[tokio::test]
    async fn test_prepare_unmodifiable_order_is_stale() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::Modifying, &[("A", 1)]);
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .prepare_order(&cart(&[line("A", 1000, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::StaleOrder { .. }));
        assert_eq!(err.class(), ErrorClass::Recoverable);
    }

    #[tokio::test]
    async fn test_set_address_returns_advanced_stage() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        shop.with(|s| s.advance_on_address = true);
        let mut session = ShopSession::default();

        let order = Checkout::new(&shop, &mut session)
            .set_shipping_address(&address(), Some(&guest("ada@example.com")))
            .await
            .unwrap();

        assert_eq!(order.state, OrderState::ArrangingPayment);
        assert_eq!(
            order.customer.unwrap().email_address,
            "ada@example.com".to_string()
        );
    }

    #[tokio::test]
    async fn test_set_address_ignores_already_logged_in() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        shop.with(|s| s.logged_in = true);
        let mut session = ShopSession::default();

        let order = Checkout::new(&shop, &mut session)
            .set_shipping_address(&address(), Some(&guest("ada@example.com")))
            .await
            .unwrap();

        assert_eq!(
            order.shipping_address.unwrap().city.as_deref(),
            Some("London")
        );
    }

    #[tokio::test]
    async fn test_set_address_email_conflict() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .set_shipping_address(&address(), Some(&guest(FakeShop::TAKEN_EMAIL)))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::CustomerRejected(_)));
    }

    #[tokio::test]
    async fn test_set_address_without_order() {
        let shop = FakeShop::new();
        let mut session = ShopSession::default();
        let err = Checkout::new(&shop, &mut session)
            .set_shipping_address(&address(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NoActiveOrder));
    }

    #[tokio::test]
    async fn test_no_eligible_shipping_methods() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        shop.with(|s| s.quotes.clear());
        let mut session = ShopSession::default();

        let options = Checkout::new(&shop, &mut session)
            .shipping_options()
            .await
            .unwrap();

        assert_eq!(options, ShippingOptions::NoneEligible);
    }

    #[tokio::test]
    async fn test_ineligible_shipping_method() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .choose_shipping(&ShippingMethodId::new("freight"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::IneligibleShippingMethod(_)));
        assert_eq!(err.class(), ErrorClass::Terminal);
    }

    #[tokio::test]
    async fn test_shipping_stage_mismatch_still_reaches_payment() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::ArrangingPayment, &[("A", 2)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut checkout = Checkout::new(&shop, &mut session);

        let outcome = checkout
            .choose_shipping(&ShippingMethodId::new(FakeShop::STANDARD_METHOD))
            .await
            .unwrap();
        assert!(!outcome.method_applied);
        assert_eq!(outcome.order.state, OrderState::ArrangingPayment);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        assert_eq!(payment.pending.amount, outcome.order.total_with_tax());
    }

    #[tokio::test]
    async fn test_full_checkout_charges_engine_total() {
        let shop = FakeShop::new();
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 2)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let prepared = checkout.prepare_order(&cart).await.unwrap();
        checkout
            .set_shipping_address(&address(), Some(&guest("ada@example.com")))
            .await
            .unwrap();

        let ShippingOptions::Available(quotes) = checkout.shipping_options().await.unwrap() else {
            panic!("expected shipping quotes");
        };
        let outcome = checkout.choose_shipping(&quotes[0].id).await.unwrap();
        assert!(outcome.method_applied);
        assert_eq!(outcome.order.total_with_tax, 2500);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        assert_eq!(payment.pending.amount.minor, 2500);
        assert_eq!(payments.with(|p| p.requests[0].amount.minor), 2500);
        assert!(payment.client_secret.is_some());

        payments.set_status(&payment.pending.intent_id, IntentStatus::Succeeded, None);
        let confirmation = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert!(!confirmation.already_confirmed);
        assert_eq!(confirmation.order_code, prepared.order.code);
        assert_eq!(
            confirmation.order_code,
            shop.with(|s| s.last_payment_order.clone()).unwrap()
        );
        assert_eq!(confirmation.total.minor, 2500);
    }

    #[tokio::test]
    async fn test_begin_payment_reuses_pending_intent() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut checkout = Checkout::new(&shop, &mut session);

        let first = checkout.begin_payment(&payments, None).await.unwrap();
        let second = checkout
            .begin_payment(&payments, Some(&first.pending))
            .await
            .unwrap();

        assert!(second.reused);
        assert_eq!(second.pending.intent_id, first.pending.intent_id);
        assert_eq!(payments.with(|p| p.requests.len()), 1);
    }

    #[tokio::test]
    async fn test_begin_payment_new_intent_when_total_changes() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut checkout = Checkout::new(&shop, &mut session);

        let first = checkout.begin_payment(&payments, None).await.unwrap();
        shop.seed_order(OrderState::AddingItems, &[("A", 3)]);
        let second = checkout
            .begin_payment(&payments, Some(&first.pending))
            .await
            .unwrap();

        assert!(!second.reused);
        assert_ne!(second.pending.intent_id, first.pending.intent_id);
        assert_eq!(second.pending.attempt, 2);
        assert_eq!(second.pending.amount.minor, 3000);
    }

    #[tokio::test]
    async fn test_begin_payment_zero_total() {
        let shop = FakeShop::new();
        shop.with(|s| {
            s.prices.insert(VariantId::new("FREE"), 0);
        });
        shop.seed_order(OrderState::AddingItems, &[("FREE", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .begin_payment(&payments, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ZeroTotal));
        assert!(payments.with(|p| p.requests.is_empty()));
    }

    #[tokio::test]
    async fn test_declined_intent_keeps_cart() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(
            &payment.pending.intent_id,
            IntentStatus::RequiresPaymentMethod,
            Some("Your card was declined."),
        );

        let err = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap_err();

        match &err {
            CheckoutError::PaymentDeclined { message } => {
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("expected PaymentDeclined, got {other:?}"),
        }
        assert_eq!(err.class(), ErrorClass::Terminal);
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_processing_intent_is_transient() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Processing, None);

        let err = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentPending));
        assert_eq!(err.class(), ErrorClass::Transient);
        assert_eq!(shop.with(|s| s.payment_calls), 0);
    }

    #[tokio::test]
    async fn test_engine_decline_is_terminal() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        shop.with(|s| s.decline_payment = true);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Succeeded, None);

        let err = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentDeclined { .. }));
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_complete_payment_is_idempotent() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Succeeded, None);

        let first = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap();
        let mut stale_cart = self::cart(&[line("A", 1000, 1)]);
        let second = checkout
            .complete_payment(&payments, &payment.pending, &mut stale_cart)
            .await
            .unwrap();

        assert_eq!(first.order_code, second.order_code);
        assert!(second.already_confirmed);
        assert!(stale_cart.is_empty());
        assert_eq!(shop.with(|s| s.payment_calls), 1);
    }

    #[tokio::test]
    async fn test_intent_for_other_order_is_rejected() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Succeeded, None);
        let mut forged = payment.pending.clone();
        forged.order_code = OrderCode::new("SOMEONE-ELSE");

        let err = checkout
            .complete_payment(&payments, &forged, &mut cart)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentMismatch { .. }));
        assert_eq!(err.class(), ErrorClass::Recoverable);
    }

    #[tokio::test]
    async fn test_prepare_unreachable_line_is_skipped() {
        let shop = FakeShop::new();
        shop.with(|s| s.unreachable_variants.push(VariantId::new("B")));
        let mut session = ShopSession::default();
        let cart = cart(&[line("A", 1000, 1), line("B", 500, 1), line("C", 300, 1)]);

        let prepared = Checkout::new(&shop, &mut session)
            .prepare_order(&cart)
            .await
            .unwrap();

        let variants: Vec<_> = prepared
            .order
            .lines
            .iter()
            .map(|l| l.product_variant.id.as_str())
            .collect();
        assert_eq!(variants, ["A", "C"]);
        assert_eq!(prepared.warnings.len(), 1);
        assert_eq!(prepared.warnings[0].variant_id.as_str(), "B");
        assert_eq!(prepared.warnings[0].code, None);
        assert_eq!(shop.with(|s| s.add_item_calls), 3);
    }

    #[tokio::test]
    async fn test_prepare_unreachable_engine_is_transient() {
        let shop = FakeShop::new();
        shop.with(|s| s.unreachable_variants.push(VariantId::new("A")));
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .prepare_order(&cart(&[line("A", 1000, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Shop(ShopError::Status { status: 503, .. })));
        assert_eq!(err.class(), ErrorClass::Transient);
        // no automatic retry
        assert_eq!(shop.with(|s| s.add_item_calls), 1);
    }

    #[tokio::test]
    async fn test_prepare_refused_and_unreachable_lines_is_transient() {
        let shop = FakeShop::new();
        shop.with(|s| {
            s.rejected_variants.push(VariantId::new("A"));
            s.unreachable_variants.push(VariantId::new("B"));
        });
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .prepare_order(&cart(&[line("A", 1000, 1), line("B", 500, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Shop(_)));
        assert_eq!(err.class(), ErrorClass::Transient);
    }

    #[tokio::test]
    async fn test_prepare_refused_fresh_start_is_stale() {
        let shop = FakeShop::new();
        let old_code = shop.seed_order(OrderState::PaymentSettled, &[("A", 1)]);
        shop.with(|s| s.refuse_new_order = true);
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .prepare_order(&cart(&[line("A", 1000, 1), line("B", 500, 1)]))
            .await
            .unwrap_err();

        match &err {
            CheckoutError::StaleOrder { code, state } => {
                assert_eq!(code, &old_code);
                assert_eq!(state, &OrderState::PaymentSettled);
            }
            other => panic!("expected StaleOrder, got {other:?}"),
        }
        assert_eq!(err.class(), ErrorClass::Recoverable);
        // gives up on the first refusal
        assert_eq!(shop.with(|s| s.add_item_calls), 1);
    }

    #[tokio::test]
    async fn test_choose_shipping_without_order() {
        let shop = FakeShop::new();
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .choose_shipping(&ShippingMethodId::new(FakeShop::STANDARD_METHOD))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::NoActiveOrder));
        assert_eq!(shop.with(|s| s.shipping_method_calls), 0);
    }

    #[tokio::test]
    async fn test_choose_shipping_on_finished_order_is_stale() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::PaymentSettled, &[("A", 1)]);
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .choose_shipping(&ShippingMethodId::new(FakeShop::STANDARD_METHOD))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::StaleOrder { .. }));
        assert_eq!(shop.with(|s| s.shipping_method_calls), 0);
    }

    #[tokio::test]
    async fn test_shipping_mutation_timeout_is_transient() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        shop.with(|s| s.shipping_method_unreachable = true);
        let mut session = ShopSession::default();

        let err = Checkout::new(&shop, &mut session)
            .choose_shipping(&ShippingMethodId::new(FakeShop::STANDARD_METHOD))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Shop(_)));
        assert_eq!(err.class(), ErrorClass::Transient);
        assert_eq!(shop.with(|s| s.shipping_method_calls), 1);
    }

    #[tokio::test]
    async fn test_canceled_intent_is_terminal() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Canceled, None);

        let err = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentCanceled));
        assert_eq!(err.class(), ErrorClass::Terminal);
        assert!(!cart.is_empty());
        assert_eq!(shop.with(|s| s.payment_calls), 0);
    }

    #[tokio::test]
    async fn test_order_total_changed_after_payment() {
        let shop = FakeShop::new();
        shop.seed_order(OrderState::AddingItems, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Succeeded, None);
        // another tab grew the order after the card was charged
        shop.seed_order(OrderState::AddingItems, &[("A", 3)]);

        let err = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap_err();

        match err {
            CheckoutError::AmountMismatch { expected, actual } => {
                assert_eq!(expected.minor, 1000);
                assert_eq!(actual.minor, 3000);
            }
            other => panic!("expected AmountMismatch, got {other:?}"),
        }
        assert!(!cart.is_empty());
        assert_eq!(shop.with(|s| s.payment_calls), 0);
    }

    #[tokio::test]
    async fn test_complete_payment_already_attached() {
        let shop = FakeShop::new();
        let code = shop.seed_order(OrderState::ArrangingPayment, &[("A", 1)]);
        let payments = FakePayments::new();
        let mut session = ShopSession::default();
        let mut cart = cart(&[line("A", 1000, 1)]);
        let mut checkout = Checkout::new(&shop, &mut session);

        let payment = checkout.begin_payment(&payments, None).await.unwrap();
        payments.set_status(&payment.pending.intent_id, IntentStatus::Succeeded, None);
        // a webhook attached the payment before the customer came back
        shop.with(|s| {
            let order = s.active.as_mut().unwrap();
            order.payments = Some(vec![crate::shop::Payment {
                id: "PAY1".to_string(),
                state: quayside_core::PaymentState::Authorized,
                method: "stripe".to_string(),
                amount: order.total_with_tax,
                transaction_id: Some(payment.pending.intent_id.to_string()),
            }]);
        });

        let confirmation = checkout
            .complete_payment(&payments, &payment.pending, &mut cart)
            .await
            .unwrap();

        assert!(confirmation.already_confirmed);
        assert_eq!(confirmation.order_code, code);
        assert_eq!(confirmation.total.minor, 1000);
        assert!(cart.is_empty());
        assert_eq!(shop.with(|s| s.payment_calls), 0);
    }

    #[test]
    fn test_idempotency_key() {
        let key = PendingPayment::idempotency_key(
            &OrderCode::new("AB12CD"),
            Money::from_minor(2500, CurrencyCode::USD),
            1,
        );
        assert_eq!(key, "AB12CD:2500:1");
    }
}
