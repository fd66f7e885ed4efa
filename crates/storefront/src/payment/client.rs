//! Payment provider REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use quayside_core::PaymentIntentId;

use super::{
    IntentRequest, ORDER_CODE_METADATA_KEY, PaymentError, PaymentIntent, PaymentProvider,
};
use crate::config::PaymentConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for the payment provider's payment-intents API.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    api_url: String,
    secret_key: SecretString,
    method_code: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(PaymentClientInner {
                client,
                api_url: config.api_url.clone(),
                secret_key: config.secret_key.clone(),
                method_code: config.method_code.clone(),
            }),
        })
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.inner.api_url)
    }

    /// Decode a provider response, turning error statuses into `PaymentError::Api`.
    async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!(status = %status, message = %message, "Payment provider rejected request");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PaymentProvider for PaymentClient {
    #[instrument(
        skip(self, request),
        fields(order_code = %request.order_code, amount = request.amount.minor)
    )]
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        let currency = request.amount.currency.code().to_ascii_lowercase();
        let metadata_key = format!("metadata[{ORDER_CODE_METADATA_KEY}]");
        let form = [
            ("amount", request.amount.minor.to_string()),
            ("currency", currency),
            (metadata_key.as_str(), request.order_code.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .inner
            .client
            .post(self.intents_url())
            .bearer_auth(self.inner.secret_key.expose_secret())
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await?;

        let intent = Self::read_intent(response).await?;
        tracing::info!(intent_id = %intent.id, status = ?intent.status, "Payment intent created");
        Ok(intent)
    }

    #[instrument(skip(self), fields(intent_id = %id))]
    async fn retrieve_intent(&self, id: &PaymentIntentId) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .inner
            .client
            .get(format!("{}/{}", self.intents_url(), id))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        Self::read_intent(response).await
    }

    fn method_code(&self) -> &str {
        &self.inner.method_code
    }
}
