//! Checkout route handlers.
//!
//! Each handler loads the engine session token from the storefront session,
//! runs one checkout step, and writes the token back whether or not the step
//! succeeded (the engine may have issued a new one on the way).

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use quayside_core::{Email, Money, OrderCode, ShippingMethodId};

use crate::checkout::{
    Checkout, CheckoutError, Confirmation, LineWarning, PendingPayment, ShippingOptions,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalCustomer;
use crate::middleware::session::{
    clear_pending_payment, load_cart, load_checkout_details, load_pending_payment,
    load_shop_session, reset_checkout, save_cart, save_checkout_details, save_pending_payment,
    save_shop_session,
};
use crate::models::CheckoutDetails;
use crate::payment::IntentStatus;
use crate::shop::{AddressInput, CustomerInput, Order, ShippingQuote};
use crate::state::AppState;

/// The engine order after the cart has been pushed into it.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub reused: bool,
    pub warnings: Vec<LineWarning>,
    pub discarded: Option<OrderCode>,
    /// Address entered on an earlier attempt, for pre-filling the form.
    pub saved_details: Option<CheckoutDetails>,
}

/// Shipping address request body.
///
/// Guest details are required only when no customer is logged in.
#[derive(Debug, Deserialize)]
pub struct AddressForm {
    pub address: AddressInput,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Eligible shipping methods.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShippingView {
    Available { methods: Vec<ShippingQuote> },
    NoShippingAvailable,
}

impl From<ShippingOptions> for ShippingView {
    fn from(options: ShippingOptions) -> Self {
        match options {
            ShippingOptions::Available(methods) => Self::Available { methods },
            ShippingOptions::NoneEligible => Self::NoShippingAvailable,
        }
    }
}

/// Shipping method request body.
#[derive(Debug, Deserialize)]
pub struct ChooseShipping {
    pub method_id: ShippingMethodId,
}

/// The order after choosing shipping.
#[derive(Debug, Serialize)]
pub struct ShippingChoiceView {
    pub order: Order,
    pub method_applied: bool,
}

/// What the browser needs to confirm the payment.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub order_code: OrderCode,
    pub amount: Money,
    pub client_secret: Option<String>,
    pub publishable_key: String,
    pub status: IntentStatus,
    pub reused: bool,
}

/// Build the guest customer input from the form.
fn guest_input(form: &AddressForm) -> Result<CustomerInput> {
    let email = form
        .email
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Email is required for guest checkout".to_string()))?;
    let email = Email::parse(email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (first_name, last_name) = match (&form.first_name, &form.last_name) {
        (Some(first), Some(last)) => (first.clone(), last.clone()),
        _ => split_name(&form.address.full_name),
    };

    Ok(CustomerInput {
        email_address: email.as_str().to_string(),
        first_name,
        last_name,
    })
}

/// Split a full name into first and last names at the last space.
fn split_name(full_name: &str) -> (String, String) {
    let full_name = full_name.trim();
    full_name.rsplit_once(' ').map_or_else(
        || (full_name.to_string(), String::new()),
        |(first, last)| (first.trim().to_string(), last.to_string()),
    )
}

/// Push the cart into the engine's active order.
#[instrument(skip(state, session))]
pub async fn order(State(state): State<AppState>, session: Session) -> Result<Json<OrderView>> {
    let cart = load_cart(&session).await;
    let mut shop_session = load_shop_session(&session).await?;

    let result = Checkout::new(state.shop(), &mut shop_session)
        .prepare_order(&cart)
        .await;
    save_shop_session(&session, &shop_session).await?;
    let prepared = result?;

    if prepared.discarded.is_some() {
        clear_pending_payment(&session).await?;
    }

    Ok(Json(OrderView {
        order: prepared.order,
        reused: prepared.reused,
        warnings: prepared.warnings,
        discarded: prepared.discarded,
        saved_details: load_checkout_details(&session).await?,
    }))
}

/// Set the shipping address, and the guest customer when nobody is logged in.
#[instrument(skip(state, session, customer, form))]
pub async fn address(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Json(form): Json<AddressForm>,
) -> Result<Json<Order>> {
    let guest = match customer {
        Some(_) => None,
        None => Some(guest_input(&form)?),
    };

    let details = CheckoutDetails {
        address: form.address,
        guest,
    };
    save_checkout_details(&session, &details).await?;

    let mut shop_session = load_shop_session(&session).await?;
    let result = Checkout::new(state.shop(), &mut shop_session)
        .set_shipping_address(&details.address, details.guest.as_ref())
        .await;
    save_shop_session(&session, &shop_session).await?;

    Ok(Json(result?))
}

/// List shipping methods the engine considers eligible.
///
/// Having none is a normal outcome, not an error.
#[instrument(skip(state, session))]
pub async fn shipping_options(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ShippingView>> {
    let mut shop_session = load_shop_session(&session).await?;
    let result = Checkout::new(state.shop(), &mut shop_session)
        .shipping_options()
        .await;
    save_shop_session(&session, &shop_session).await?;

    Ok(Json(result?.into()))
}

/// Apply a shipping method.
#[instrument(skip(state, session), fields(method_id = %body.method_id))]
pub async fn choose_shipping(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ChooseShipping>,
) -> Result<Json<ShippingChoiceView>> {
    let mut shop_session = load_shop_session(&session).await?;
    let result = Checkout::new(state.shop(), &mut shop_session)
        .choose_shipping(&body.method_id)
        .await;
    save_shop_session(&session, &shop_session).await?;
    let outcome = result?;

    add_breadcrumb(
        "checkout",
        "Shipping method chosen",
        Some(&[("method_id", body.method_id.as_str())]),
    );
    Ok(Json(ShippingChoiceView {
        order: outcome.order,
        method_applied: outcome.method_applied,
    }))
}

/// Create a payment intent for the order's current total, or reuse the
/// pending one.
#[instrument(skip(state, session))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PaymentView>> {
    let pending = load_pending_payment(&session).await?;
    let mut shop_session = load_shop_session(&session).await?;

    let result = Checkout::new(state.shop(), &mut shop_session)
        .begin_payment(state.payments(), pending.as_ref())
        .await;
    save_shop_session(&session, &shop_session).await?;
    let started = result?;

    save_pending_payment(&session, &started.pending).await?;
    add_breadcrumb(
        "checkout",
        "Payment started",
        Some(&[("order_code", started.pending.order_code.as_str())]),
    );

    Ok(Json(PaymentView {
        order_code: started.pending.order_code,
        amount: started.pending.amount,
        client_secret: started.client_secret,
        publishable_key: state.config().payment.publishable_key.clone(),
        status: started.status,
        reused: started.reused,
    }))
}

/// Attach the paid intent to the order and clear the cart.
#[instrument(skip(state, session))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Confirmation>> {
    let pending: PendingPayment = load_pending_payment(&session)
        .await?
        .ok_or_else(|| AppError::BadRequest("No payment in progress".to_string()))?;
    let mut cart = load_cart(&session).await;
    let mut shop_session = load_shop_session(&session).await?;

    let result = Checkout::new(state.shop(), &mut shop_session)
        .complete_payment(state.payments(), &pending, &mut cart)
        .await;
    save_shop_session(&session, &shop_session).await?;

    let confirmation = match result {
        Ok(confirmation) => confirmation,
        Err(err @ CheckoutError::PaymentMismatch { .. }) => {
            // The intent can never complete this order.
            clear_pending_payment(&session).await?;
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    save_cart(&session, &cart).await?;
    clear_pending_payment(&session).await?;

    info!(
        order_code = %confirmation.order_code,
        total = %confirmation.total,
        already_confirmed = confirmation.already_confirmed,
        "Order confirmed"
    );
    Ok(Json(confirmation))
}

/// Response for a checkout reset.
#[derive(Debug, Serialize)]
pub struct ResetView {
    pub reset: bool,
}

/// Drop the engine session and pending payment so checkout starts over with
/// a fresh order. The cart is kept.
#[instrument(skip(session))]
pub async fn reset(session: Session) -> Result<Json<ResetView>> {
    reset_checkout(&session).await?;
    Ok(Json(ResetView { reset: true }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn address() -> AddressInput {
        AddressInput {
            full_name: "Ada Lovelace".to_string(),
            street_line1: "12 Quay St".to_string(),
            street_line2: None,
            city: "London".to_string(),
            province: None,
            postal_code: "E1 6AN".to_string(),
            country_code: "GB".to_string(),
            phone_number: None,
        }
    }

    #[test]
    fn test_guest_input_splits_full_name() {
        let form = AddressForm {
            address: address(),
            email: Some("ada@example.com".to_string()),
            first_name: None,
            last_name: None,
        };
        let guest = guest_input(&form).unwrap();
        assert_eq!(guest.email_address, "ada@example.com");
        assert_eq!(guest.first_name, "Ada");
        assert_eq!(guest.last_name, "Lovelace");
    }

    #[test]
    fn test_guest_input_requires_email() {
        let form = AddressForm {
            address: address(),
            email: None,
            first_name: None,
            last_name: None,
        };
        assert!(matches!(guest_input(&form), Err(AppError::BadRequest(_))));

        let form = AddressForm {
            email: Some("not-an-email".to_string()),
            ..form
        };
        assert!(matches!(guest_input(&form), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_split_single_name() {
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(
            split_name(" Mary Ann Evans "),
            ("Mary Ann".to_string(), "Evans".to_string())
        );
    }

    #[test]
    fn test_shipping_view_serialization() {
        let json = serde_json::to_value(ShippingView::from(ShippingOptions::NoneEligible)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "no_shipping_available"}));

        let json = serde_json::to_value(ShippingView::from(ShippingOptions::Available(vec![])))
            .unwrap();
        assert_eq!(json["status"], "available");
        assert!(json["methods"].as_array().unwrap().is_empty());
    }
}
