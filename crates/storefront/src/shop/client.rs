//! Shop API client implementation.
//!
//! Uses `graphql_client` request framing with `reqwest` 0.13 for HTTP.
//! Caches catalogue reads using `moka` (5-minute TTL). Order operations are
//! never cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use tracing::{debug, instrument};

use quayside_core::{ErrorCode, ErrorResult, OrderCode, OrderState, ShippingMethodId, VariantId};

use super::cache::CacheValue;
use super::queries::{
    ActiveCustomer, ActiveOrder, AddItemToOrder, AddPaymentToOrder, EligibleShippingMethods,
    GetProductBySlug, GetProducts, Login, Logout, OrderByCode, SetCustomerForOrder,
    SetOrderShippingAddress, SetOrderShippingMethod, TransitionOrderToState, active_customer,
    active_order, add_item_to_order, add_payment_to_order, eligible_shipping_methods,
    get_product_by_slug, get_products, login, logout, order_by_code, set_customer_for_order,
    set_order_shipping_address, set_order_shipping_method, transition_order_to_state,
};
use super::types::{
    AddressInput, CurrentUser, Customer, CustomerInput, MutationResult, Order, PaymentInput,
    Product, ProductList, ShippingQuote,
};
use super::{GraphQLError, GraphQLErrorLocation, ShopApi, ShopError, ShopSession};
use crate::config::ShopApiConfig;

/// Response header carrying a new or refreshed session token.
pub const AUTH_TOKEN_HEADER: &str = "vendure-auth-token";

/// Request header selecting the sales channel.
pub const CHANNEL_TOKEN_HEADER: &str = "vendure-token";

// =============================================================================
// ShopClient
// =============================================================================

/// Client for the commerce engine's Shop API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct ShopClient {
    inner: Arc<ShopClientInner>,
}

struct ShopClientInner {
    client: reqwest::Client,
    endpoint: String,
    channel_token: Option<String>,
    cache: Cache<String, CacheValue>,
}

impl ShopClient {
    /// Create a new Shop API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ShopApiConfig) -> Result<Self, ShopError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(ShopClientInner {
                client,
                endpoint: config.api_url.clone(),
                channel_token: config.channel_token.clone(),
                cache,
            }),
        })
    }

    /// Execute a GraphQL operation.
    ///
    /// Sends the session's bearer token when present and stores any token
    /// the engine returns back into the session.
    async fn execute<Q: GraphQLQuery>(
        &self,
        session: Option<&mut ShopSession>,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopError>
    where
        Q::Variables: serde::Serialize,
    {
        let request_body = Q::build_query(variables);
        let operation = request_body.operation_name;

        let mut request = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body);

        if let Some(channel) = &self.inner.channel_token {
            request = request.header(CHANNEL_TOKEN_HEADER, channel);
        }
        if let Some(token) = session.as_ref().and_then(|s| s.token()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if let Some(session) = session
            && let Some(token) = response
                .headers()
                .get(AUTH_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
        {
            if session.token() != Some(token) {
                debug!(operation, "Engine issued session token");
            }
            session.set_token(token);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                operation,
                status = %status,
                body = %truncate(&response_text, 500),
                "Shop API returned non-success status"
            );
            return Err(ShopError::Status {
                status: status.as_u16(),
                body: truncate(&response_text, 200),
            });
        }

        decode::<Q::ResponseData>(operation, &response_text)
    }

    // =========================================================================
    // Catalogue Methods
    // =========================================================================

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn product(&self, slug: &str) -> Result<Product, ShopError> {
        let cache_key = format!("product:{slug}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data = self
            .execute::<GetProductBySlug>(
                None,
                get_product_by_slug::Variables {
                    slug: slug.to_string(),
                },
            )
            .await?;

        let product = data
            .product
            .ok_or_else(|| ShopError::NotFound(format!("Product not found: {slug}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, take: i64, skip: i64) -> Result<ProductList, ShopError> {
        let cache_key = format!("products:{take}:{skip}");

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let data = self
            .execute::<GetProducts>(
                None,
                get_products::Variables {
                    options: get_products::ProductListOptions { take, skip },
                },
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(data.products.clone()))
            .await;

        Ok(data.products)
    }

    /// Round-trip a minimal uncached query for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ShopError> {
        self.execute::<GetProducts>(
            None,
            get_products::Variables {
                options: get_products::ProductListOptions { take: 1, skip: 0 },
            },
        )
        .await
        .map(|_| ())
    }

    // =========================================================================
    // Customer Methods
    // =========================================================================

    /// Log a customer in against the session.
    ///
    /// On success the engine re-issues the session token; any guest active
    /// order is merged into the customer's order by the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. Bad credentials come back as
    /// the error branch of the result.
    #[instrument(skip(self, session, password), fields(email = %email))]
    pub async fn login(
        &self,
        session: &mut ShopSession,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<MutationResult<CurrentUser>, ShopError> {
        let data = self
            .execute::<Login>(
                Some(session),
                login::Variables {
                    username: email.to_string(),
                    password: password.to_string(),
                    remember_me,
                },
            )
            .await?;
        Ok(data.login)
    }

    /// End the customer's engine session.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &mut ShopSession) -> Result<bool, ShopError> {
        let data = self
            .execute::<Logout>(Some(session), logout::Variables)
            .await?;
        Ok(data.logout.success)
    }

    /// The logged-in customer, if the session is authenticated.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn active_customer(
        &self,
        session: &mut ShopSession,
    ) -> Result<Option<Customer>, ShopError> {
        let data = self
            .execute::<ActiveCustomer>(Some(session), active_customer::Variables)
            .await?;
        Ok(data.active_customer)
    }
}

#[async_trait]
impl ShopApi for ShopClient {
    #[instrument(skip(self, session))]
    async fn active_order(&self, session: &mut ShopSession) -> Result<Option<Order>, ShopError> {
        let data = self
            .execute::<ActiveOrder>(Some(session), active_order::Variables)
            .await?;
        Ok(data.active_order)
    }

    #[instrument(skip(self, session), fields(code = %code))]
    async fn order_by_code(
        &self,
        session: &mut ShopSession,
        code: &OrderCode,
    ) -> Result<Option<Order>, ShopError> {
        let data = self
            .execute::<OrderByCode>(
                Some(session),
                order_by_code::Variables {
                    code: code.to_string(),
                },
            )
            .await?;
        Ok(data.order_by_code)
    }

    #[instrument(skip(self, session), fields(variant_id = %variant_id))]
    async fn add_item_to_order(
        &self,
        session: &mut ShopSession,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<MutationResult<Order>, ShopError> {
        let data = self
            .execute::<AddItemToOrder>(
                Some(session),
                add_item_to_order::Variables {
                    product_variant_id: variant_id.to_string(),
                    quantity: i64::from(quantity),
                },
            )
            .await?;
        Ok(data.add_item_to_order)
    }

    #[instrument(skip(self, session, customer))]
    async fn set_customer_for_order(
        &self,
        session: &mut ShopSession,
        customer: &CustomerInput,
    ) -> Result<MutationResult<Order>, ShopError> {
        let data = self
            .execute::<SetCustomerForOrder>(
                Some(session),
                set_customer_for_order::Variables {
                    input: customer.clone(),
                },
            )
            .await?;
        Ok(data.set_customer_for_order)
    }

    #[instrument(skip(self, session, address))]
    async fn set_order_shipping_address(
        &self,
        session: &mut ShopSession,
        address: &AddressInput,
    ) -> Result<MutationResult<Order>, ShopError> {
        let data = self
            .execute::<SetOrderShippingAddress>(
                Some(session),
                set_order_shipping_address::Variables {
                    input: address.clone(),
                },
            )
            .await?;
        Ok(data.set_order_shipping_address)
    }

    #[instrument(skip(self, session))]
    async fn eligible_shipping_methods(
        &self,
        session: &mut ShopSession,
    ) -> Result<Vec<ShippingQuote>, ShopError> {
        let data = self
            .execute::<EligibleShippingMethods>(Some(session), eligible_shipping_methods::Variables)
            .await?;
        Ok(data.eligible_shipping_methods)
    }

    #[instrument(skip(self, session), fields(method_id = %method_id))]
    async fn set_order_shipping_method(
        &self,
        session: &mut ShopSession,
        method_id: &ShippingMethodId,
    ) -> Result<MutationResult<Order>, ShopError> {
        let data = self
            .execute::<SetOrderShippingMethod>(
                Some(session),
                set_order_shipping_method::Variables {
                    shipping_method_id: vec![method_id.to_string()],
                },
            )
            .await?;
        Ok(data.set_order_shipping_method)
    }

    #[instrument(skip(self, session), fields(state = %state.as_str()))]
    async fn transition_order_to_state(
        &self,
        session: &mut ShopSession,
        state: &OrderState,
    ) -> Result<MutationResult<Order>, ShopError> {
        let data = self
            .execute::<TransitionOrderToState>(
                Some(session),
                transition_order_to_state::Variables {
                    state: state.as_str().to_string(),
                },
            )
            .await?;
        Ok(data.transition_order_to_state.unwrap_or_else(|| {
            MutationResult::Err(ErrorResult::new(
                ErrorCode::NoActiveOrderError,
                "There is no active order for this session",
            ))
        }))
    }

    #[instrument(skip(self, session, input), fields(method = %input.method))]
    async fn add_payment_to_order(
        &self,
        session: &mut ShopSession,
        input: &PaymentInput,
    ) -> Result<MutationResult<Order>, ShopError> {
        let data = self
            .execute::<AddPaymentToOrder>(
                Some(session),
                add_payment_to_order::Variables {
                    input: input.clone(),
                },
            )
            .await?;
        Ok(data.add_payment_to_order)
    }
}

/// Decode a GraphQL response body, surfacing GraphQL errors.
fn decode<T>(operation: &str, body: &str) -> Result<T, ShopError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let response: Response<T> = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                operation,
                error = %e,
                body = %truncate(body, 500),
                "Failed to parse Shop API response"
            );
            return Err(ShopError::Parse(e));
        }
    };

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        debug!(operation, errors = ?errors, "GraphQL errors in response");
        return Err(ShopError::GraphQL(
            errors.into_iter().map(convert_graphql_error).collect(),
        ));
    }

    response.data.ok_or_else(|| {
        tracing::error!(
            operation,
            body = %truncate(body, 500),
            "Shop API response has no data and no errors"
        );
        ShopError::GraphQL(vec![GraphQLError::message("No data in response")])
    })
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
