//! In-memory engine and payment provider for checkout tests.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use quayside_core::{
    CurrencyCode, CustomerId, ErrorCode, ErrorResult, OrderCode, OrderId, OrderLineId, OrderState,
    PaymentIntentId, PaymentState, ShippingMethodId, VariantId,
};

use crate::payment::{
    IntentRequest, IntentStatus, LastPaymentError, ORDER_CODE_METADATA_KEY, PaymentError,
    PaymentIntent, PaymentProvider,
};
use crate::shop::{
    AddressInput, CustomerInput, MutationResult, Order, OrderAddress, OrderCustomer, OrderLine,
    OrderLineVariant, Payment, PaymentInput, ShippingLine, ShippingLineMethod, ShippingQuote,
    ShopApi, ShopError, ShopSession,
};

const DEFAULT_PRICE: i64 = 1000;

/// Engine state the fake exposes to tests.
#[derive(Default)]
pub struct EngineState {
    pub active: Option<Order>,
    pub archived: Vec<Order>,
    pub quotes: Vec<ShippingQuote>,
    pub prices: HashMap<VariantId, i64>,
    pub rejected_variants: Vec<VariantId>,
    /// `addItemToOrder` for these variants fails in transport (HTTP 503).
    pub unreachable_variants: Vec<VariantId>,
    /// Refuse to open a new order while a terminal one is still active.
    pub refuse_new_order: bool,
    /// `setOrderShippingMethod` fails in transport (HTTP 503).
    pub shipping_method_unreachable: bool,
    /// Answer the next `addItemToOrder` with `NO_ACTIVE_ORDER_ERROR`.
    pub no_active_order_once: bool,
    /// Move the order to `ArrangingPayment` when the address is set.
    pub advance_on_address: bool,
    pub decline_payment: bool,
    pub logged_in: bool,
    pub orders_created: usize,
    pub add_item_calls: usize,
    pub shipping_method_calls: usize,
    pub payment_calls: usize,
    pub last_payment_order: Option<OrderCode>,
}

pub struct FakeShop {
    state: Mutex<EngineState>,
}

fn rejected(code: ErrorCode, message: &str) -> Result<MutationResult<Order>, ShopError> {
    Ok(MutationResult::Err(ErrorResult::new(code, message)))
}

fn no_active_order() -> Result<MutationResult<Order>, ShopError> {
    rejected(ErrorCode::NoActiveOrderError, "There is no active Order")
}

fn unavailable() -> Result<MutationResult<Order>, ShopError> {
    Err(ShopError::Status {
        status: 503,
        body: "Service Unavailable".to_string(),
    })
}

fn empty_order(n: usize) -> Order {
    Order {
        id: OrderId::new(n.to_string()),
        code: OrderCode::new(format!("ORD{n}")),
        state: OrderState::AddingItems,
        active: true,
        currency_code: CurrencyCode::USD,
        total_quantity: 0,
        sub_total: 0,
        sub_total_with_tax: 0,
        shipping: 0,
        shipping_with_tax: 0,
        total: 0,
        total_with_tax: 0,
        lines: Vec::new(),
        shipping_lines: Vec::new(),
        payments: Some(Vec::new()),
        customer: None,
        shipping_address: None,
    }
}

/// Tax-free totals: line prices plus shipping.
fn recompute(order: &mut Order) {
    order.sub_total = order.lines.iter().map(|l| l.line_price_with_tax).sum();
    order.sub_total_with_tax = order.sub_total;
    order.total_quantity = order.lines.iter().map(|l| l.quantity).sum();
    order.total = order.sub_total + order.shipping;
    order.total_with_tax = order.sub_total_with_tax + order.shipping_with_tax;
}

impl EngineState {
    fn price(&self, variant_id: &VariantId) -> i64 {
        self.prices.get(variant_id).copied().unwrap_or(DEFAULT_PRICE)
    }

    fn push_line(&self, order: &mut Order, variant_id: &VariantId, quantity: i64) {
        let price = self.price(variant_id);
        if let Some(line) = order
            .lines
            .iter_mut()
            .find(|l| &l.product_variant.id == variant_id)
        {
            line.quantity += quantity;
            line.line_price_with_tax = line.unit_price_with_tax * line.quantity;
        } else {
            order.lines.push(OrderLine {
                id: OrderLineId::new(format!("L{}", order.lines.len() + 1)),
                quantity,
                unit_price_with_tax: price,
                line_price_with_tax: price * quantity,
                product_variant: OrderLineVariant {
                    id: variant_id.clone(),
                    name: format!("Variant {variant_id}"),
                },
                featured_asset: None,
            });
        }
        recompute(order);
    }
}

impl FakeShop {
    pub const STANDARD_METHOD: &'static str = "standard";
    pub const TAKEN_EMAIL: &'static str = "taken@example.com";

    pub fn new() -> Self {
        let state = EngineState {
            quotes: vec![ShippingQuote {
                id: ShippingMethodId::new(Self::STANDARD_METHOD),
                code: "standard-shipping".to_string(),
                name: "Standard Shipping".to_string(),
                description: String::new(),
                price: 500,
                price_with_tax: 500,
            }],
            ..EngineState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Replace the active order's contents, keeping its code if one exists.
    pub fn seed_order(&self, state: OrderState, lines: &[(&str, i64)]) -> OrderCode {
        self.with(|s| {
            let mut order = match s.active.take() {
                Some(existing) => Order {
                    lines: Vec::new(),
                    ..existing
                },
                None => {
                    s.orders_created += 1;
                    empty_order(s.orders_created)
                }
            };
            for (variant, quantity) in lines {
                s.push_line(&mut order, &VariantId::new(*variant), *quantity);
            }
            order.state = state;
            let code = order.code.clone();
            s.active = Some(order);
            code
        })
    }
}

#[async_trait]
impl ShopApi for FakeShop {
    async fn active_order(&self, _session: &mut ShopSession) -> Result<Option<Order>, ShopError> {
        Ok(self.with(|s| s.active.clone()))
    }

    async fn order_by_code(
        &self,
        _session: &mut ShopSession,
        code: &OrderCode,
    ) -> Result<Option<Order>, ShopError> {
        Ok(self.with(|s| {
            s.active
                .iter()
                .chain(s.archived.iter())
                .find(|o| &o.code == code)
                .cloned()
        }))
    }

    async fn add_item_to_order(
        &self,
        _session: &mut ShopSession,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<MutationResult<Order>, ShopError> {
        self.with(|s| {
            s.add_item_calls += 1;
            if s.no_active_order_once {
                s.no_active_order_once = false;
                return no_active_order();
            }
            if s.unreachable_variants.contains(variant_id) {
                return unavailable();
            }
            if s.rejected_variants.contains(variant_id) {
                return rejected(
                    ErrorCode::InsufficientStockError,
                    "Only 0 items were added to the order due to insufficient stock",
                );
            }
            if s.refuse_new_order && s.active.as_ref().is_some_and(|o| o.state.is_terminal()) {
                return rejected(
                    ErrorCode::OrderModificationError,
                    "Order contents may only be modified when in the AddingItems state",
                );
            }
            if s.active.as_ref().is_some_and(|o| o.state.is_terminal()) {
                let finished = s.active.take().unwrap();
                s.archived.push(finished);
            }
            if s.active.as_ref().is_some_and(|o| !o.state.is_modifiable()) {
                return rejected(
                    ErrorCode::OrderModificationError,
                    "Order contents may only be modified when in the AddingItems state",
                );
            }

            let mut order = match s.active.take() {
                Some(order) => order,
                None => {
                    s.orders_created += 1;
                    empty_order(s.orders_created)
                }
            };
            s.push_line(&mut order, variant_id, i64::from(quantity));
            s.active = Some(order.clone());
            Ok(MutationResult::Ok(order))
        })
    }

    async fn set_customer_for_order(
        &self,
        _session: &mut ShopSession,
        customer: &CustomerInput,
    ) -> Result<MutationResult<Order>, ShopError> {
        self.with(|s| {
            if s.logged_in {
                return rejected(
                    ErrorCode::AlreadyLoggedInError,
                    "Cannot set a Customer for the Order when already logged in",
                );
            }
            if customer.email_address == Self::TAKEN_EMAIL {
                return rejected(
                    ErrorCode::EmailAddressConflictError,
                    "The email address is not available.",
                );
            }
            let Some(order) = s.active.as_mut() else {
                return no_active_order();
            };
            order.customer = Some(OrderCustomer {
                id: CustomerId::new("C1"),
                email_address: customer.email_address.clone(),
            });
            Ok(MutationResult::Ok(order.clone()))
        })
    }

    async fn set_order_shipping_address(
        &self,
        _session: &mut ShopSession,
        address: &AddressInput,
    ) -> Result<MutationResult<Order>, ShopError> {
        self.with(|s| {
            let advance = s.advance_on_address;
            let Some(order) = s.active.as_mut() else {
                return no_active_order();
            };
            if !order.state.is_modifiable() {
                return rejected(
                    ErrorCode::OrderModificationError,
                    "Order contents may only be modified when in the AddingItems state",
                );
            }
            order.shipping_address = Some(OrderAddress {
                full_name: Some(address.full_name.clone()),
                street_line1: Some(address.street_line1.clone()),
                city: Some(address.city.clone()),
                postal_code: Some(address.postal_code.clone()),
                country_code: Some(address.country_code.clone()),
            });
            if advance {
                order.state = OrderState::ArrangingPayment;
            }
            Ok(MutationResult::Ok(order.clone()))
        })
    }

    async fn eligible_shipping_methods(
        &self,
        _session: &mut ShopSession,
    ) -> Result<Vec<ShippingQuote>, ShopError> {
        Ok(self.with(|s| s.quotes.clone()))
    }

    async fn set_order_shipping_method(
        &self,
        _session: &mut ShopSession,
        method_id: &ShippingMethodId,
    ) -> Result<MutationResult<Order>, ShopError> {
        self.with(|s| {
            s.shipping_method_calls += 1;
            if s.shipping_method_unreachable {
                return unavailable();
            }
            let quote = s.quotes.iter().find(|q| &q.id == method_id).cloned();
            let Some(order) = s.active.as_mut() else {
                return no_active_order();
            };
            if order.state != OrderState::AddingItems {
                return rejected(
                    ErrorCode::OrderModificationError,
                    "Order contents may only be modified when in the AddingItems state",
                );
            }
            let Some(quote) = quote else {
                return rejected(
                    ErrorCode::IneligibleShippingMethodError,
                    "This Order is not eligible for the selected ShippingMethod",
                );
            };
            order.shipping = quote.price;
            order.shipping_with_tax = quote.price_with_tax;
            order.shipping_lines = vec![ShippingLine {
                price_with_tax: quote.price_with_tax,
                shipping_method: ShippingLineMethod {
                    id: quote.id,
                    name: quote.name,
                },
            }];
            recompute(order);
            Ok(MutationResult::Ok(order.clone()))
        })
    }

    async fn transition_order_to_state(
        &self,
        _session: &mut ShopSession,
        state: &OrderState,
    ) -> Result<MutationResult<Order>, ShopError> {
        self.with(|s| {
            let Some(order) = s.active.as_mut() else {
                return no_active_order();
            };
            order.state = state.clone();
            Ok(MutationResult::Ok(order.clone()))
        })
    }

    async fn add_payment_to_order(
        &self,
        _session: &mut ShopSession,
        input: &PaymentInput,
    ) -> Result<MutationResult<Order>, ShopError> {
        self.with(|s| {
            s.payment_calls += 1;
            let decline = s.decline_payment;
            let Some(order) = s.active.as_mut() else {
                return no_active_order();
            };
            if order.state != OrderState::ArrangingPayment {
                return rejected(
                    ErrorCode::OrderPaymentStateError,
                    "A Payment may only be added when Order is in \"ArrangingPayment\" state",
                );
            }
            if decline {
                return rejected(ErrorCode::PaymentDeclinedError, "The payment was declined");
            }

            let mut order = s.active.take().unwrap();
            order.payments.get_or_insert_with(Vec::new).push(Payment {
                id: "PAY1".to_string(),
                state: PaymentState::Settled,
                method: input.method.clone(),
                amount: order.total_with_tax,
                transaction_id: input.metadata["paymentIntentId"]
                    .as_str()
                    .map(str::to_string),
            });
            order.state = OrderState::PaymentSettled;
            order.active = false;
            s.last_payment_order = Some(order.code.clone());
            s.archived.push(order.clone());
            Ok(MutationResult::Ok(order))
        })
    }
}

// =============================================================================
// Payment Provider
// =============================================================================

#[derive(Default)]
pub struct ProviderState {
    pub intents: HashMap<PaymentIntentId, PaymentIntent>,
    pub keys: HashMap<String, PaymentIntentId>,
    pub requests: Vec<IntentRequest>,
}

pub struct FakePayments {
    state: Mutex<ProviderState>,
}

impl FakePayments {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ProviderState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Simulate the browser confirming (or failing) an intent.
    pub fn set_status(&self, id: &PaymentIntentId, status: IntentStatus, error: Option<&str>) {
        self.with(|p| {
            let intent = p.intents.get_mut(id).unwrap();
            intent.status = status;
            intent.last_payment_error = error.map(|message| LastPaymentError {
                message: Some(message.to_string()),
                code: Some("card_declined".to_string()),
            });
        });
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        Ok(self.with(|p| {
            p.requests.push(request.clone());
            if let Some(id) = p.keys.get(&request.idempotency_key) {
                return p.intents[id].clone();
            }
            let id = PaymentIntentId::new(format!("pi_{}", p.intents.len() + 1));
            let intent = PaymentIntent {
                id: id.clone(),
                amount: request.amount.minor,
                currency: request.amount.currency.code().to_ascii_lowercase(),
                status: IntentStatus::RequiresPaymentMethod,
                client_secret: Some(format!("{id}_secret")),
                metadata: HashMap::from([(
                    ORDER_CODE_METADATA_KEY.to_string(),
                    request.order_code.to_string(),
                )]),
                last_payment_error: None,
            };
            p.keys.insert(request.idempotency_key.clone(), id.clone());
            p.intents.insert(id, intent.clone());
            intent
        }))
    }

    async fn retrieve_intent(&self, id: &PaymentIntentId) -> Result<PaymentIntent, PaymentError> {
        self.with(|p| {
            p.intents.get(id).cloned().ok_or_else(|| PaymentError::Api {
                status: 404,
                message: format!("No such payment_intent: '{id}'"),
            })
        })
    }

    fn method_code(&self) -> &str {
        "stripe"
    }
}
