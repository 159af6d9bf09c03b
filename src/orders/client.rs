//! Orders API client
//!
//! One async method per documented endpoint. Every call goes through the
//! same pipeline:
//! - Pre-flight validation for mutating requests (nothing is sent on failure)
//! - The local request budget, when enabled
//! - HTTP 429 handling with the server's `retry-after` hint, capped
//! - Exponential backoff for transient failures
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal_macros::dec;
//! use sdigital_orders::orders::{CreateOrderRequest, OrdersClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrdersClient::new("sk_test_key")?;
//!
//!     let request = CreateOrderRequest::on_ramp("USD", dec!(1000), "USDC_ETH", "rec_123");
//!     let order = client.create_order(&request).await?;
//!     println!("Order {} is {}", order.id, order.status);
//!
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::auth::Credentials;
use super::transport::{HttpTransport, Transport};
use super::types::*;
use crate::common::{
    poll_until, retry_with_backoff, with_rate_limit_retry, PollConfig, Pollable, RateLimitPolicy,
    RateLimitTier, RateLimiter, RateLimiterConfig, RetryPolicy,
};
use crate::error::{Error, Result, ValidationErrors};
use crate::validation::{
    validate_any_transaction_hash, validate_order, validate_recipient, validate_recipient_update,
    validate_wire_identifier, AmountLimits, CATEGORY_ID, CATEGORY_TRANSACTION_HASH,
};

/// Sandbox base URL
pub const API_BASE_URL: &str = "https://sandbox.api.orders.sdigital2.com/v1";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Backoff for transient failures
    pub retry: RetryPolicy,
    /// Handling of HTTP 429
    pub rate_limit: RateLimitPolicy,
    /// Budget for the `wait_for_*` helpers
    pub poll: PollConfig,
    /// Accepted order amount range
    pub amount_limits: AmountLimits,
    /// Local request budget; `None` disables it
    pub rate_limiter: Option<RateLimiterConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitPolicy::default(),
            poll: PollConfig::default(),
            amount_limits: AmountLimits::default(),
            rate_limiter: Some(RateLimiterConfig::default()),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitPolicy) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_amount_limits(mut self, limits: AmountLimits) -> Self {
        self.amount_limits = limits;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiterConfig>) -> Self {
        self.rate_limiter = limiter;
        self
    }
}

/// Orders API client
///
/// Cheap to clone; clones share the transport and the local rate limiter.
#[derive(Clone)]
pub struct OrdersClient {
    transport: Arc<dyn Transport>,
    /// SHA-256 fingerprint of the API key, used as the rate limiter key
    key_id: String,
    config: ClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl std::fmt::Debug for OrdersClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersClient")
            .field("key_id", &self.key_id)
            .field("config", &self.config)
            .finish()
    }
}

impl OrdersClient {
    /// Create a client for the sandbox with default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(api_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let credentials = Credentials::new(api_key);
        let transport = HttpTransport::new(&config.base_url, credentials.clone(), config.timeout)?;
        Ok(Self::with_transport(Arc::new(transport), &credentials, config))
    }

    /// Create a client over any [`Transport`]
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        credentials: &Credentials,
        config: ClientConfig,
    ) -> Self {
        let rate_limiter = config.rate_limiter.clone().map(RateLimiter::new);
        Self {
            transport,
            key_id: credentials.fingerprint(),
            config,
            rate_limiter,
        }
    }

    /// Share one request budget between several clients
    pub fn with_shared_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// Send one logical request with the local budget, 429 handling and backoff
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        tier: RateLimitTier,
    ) -> Result<Value> {
        let transport = self.transport.as_ref();
        let limiter = self.rate_limiter.as_ref();
        let key_id = self.key_id.as_str();
        let rate_limit = &self.config.rate_limit;
        let body = body.as_ref();

        retry_with_backoff(&self.config.retry, || {
            let method = method.clone();
            async move {
                with_rate_limit_retry(rate_limit, move || {
                    let method = method.clone();
                    async move {
                        if let Some(limiter) = limiter {
                            limiter.acquire_request(key_id, tier).await;
                        }
                        transport.send(method, path, body).await
                    }
                })
                .await
            }
        })
        .await
    }

    /// Send and decode the `data` member of the success envelope
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        tier: RateLimitTier,
    ) -> Result<T> {
        let value = self.execute(method, path, body, tier).await?;
        decode_data(value)
    }

    /// Verify the API key (`GET /users`)
    pub async fn check_auth(&self) -> Result<User> {
        self.request(Method::GET, "/users", None, RateLimitTier::General)
            .await
    }

    /// Validate and create an order (`POST /orders`)
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        validate_order(request, &self.config.amount_limits).into_result()?;

        let body = serde_json::to_value(request)?;
        let order: Order = self
            .request(Method::POST, "/orders", Some(body), RateLimitTier::OrderCreation)
            .await?;

        tracing::info!(order_id = %order.id, status = %order.status, "Order created");
        Ok(order)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.request(Method::GET, "/orders", None, RateLimitTier::General)
            .await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let path = resource_path("/orders", order_id)?;
        self.request(Method::GET, &path, None, RateLimitTier::General)
            .await
    }

    /// Confirm an order with the on-chain transaction hash of the deposit
    pub async fn confirm_order(&self, order_id: &str, transaction_hash: &str) -> Result<Order> {
        let path = format!("{}/confirm", resource_path("/orders", order_id)?);

        let mut errors = ValidationErrors::new();
        errors.extend(
            CATEGORY_TRANSACTION_HASH,
            validate_any_transaction_hash(transaction_hash),
        );
        errors.into_result()?;

        let body = serde_json::to_value(ConfirmOrderRequest::new(transaction_hash))?;
        let order: Order = self
            .request(Method::PUT, &path, Some(body), RateLimitTier::Confirmation)
            .await?;

        tracing::info!(order_id = %order.id, status = %order.status, "Order confirmed");
        Ok(order)
    }

    /// Request the IMAD/OMAD wire identifiers of a fiat order.
    ///
    /// Both codes are absent until the funds are detected; that is not an
    /// error. Use [`OrdersClient::wait_for_payment_identifiers`] to poll.
    pub async fn request_payment_identifiers(&self, order_id: &str) -> Result<PaymentIdentifiers> {
        let path = format!("{}/payment_identifiers", resource_path("/orders", order_id)?);
        let identifiers: PaymentIdentifiers = self
            .request(Method::PUT, &path, None, RateLimitTier::PaymentIdentifiers)
            .await?;

        for (name, code) in [("imad", &identifiers.imad), ("omad", &identifiers.omad)] {
            if let Some(code) = code.as_deref().filter(|c| !c.is_empty()) {
                if !validate_wire_identifier(code).is_empty() {
                    tracing::warn!(order_id, field = name, "Unexpected wire identifier format");
                }
            }
        }
        Ok(identifiers)
    }

    /// Daily order totals
    pub async fn orders_summary(&self, date: NaiveDate) -> Result<OrderSummary> {
        let path = format!("/orders/summary?date={}", date.format("%Y-%m-%d"));
        self.request(Method::GET, &path, None, RateLimitTier::General)
            .await
    }

    /// Validate and register a recipient (`POST /recipients`)
    pub async fn create_recipient(&self, request: &CreateRecipientRequest) -> Result<Recipient> {
        validate_recipient(request).into_result()?;

        let body = serde_json::to_value(request)?;
        let recipient: Recipient = self
            .request(Method::POST, "/recipients", Some(body), RateLimitTier::General)
            .await?;

        tracing::info!(recipient_id = %recipient.id, "Recipient created");
        Ok(recipient)
    }

    pub async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        self.request(Method::GET, "/recipients", None, RateLimitTier::General)
            .await
    }

    pub async fn get_recipient(&self, recipient_id: &str) -> Result<Recipient> {
        let path = resource_path("/recipients", recipient_id)?;
        self.request(Method::GET, &path, None, RateLimitTier::General)
            .await
    }

    /// Partial update; only the supplied parts are validated and sent
    pub async fn update_recipient(
        &self,
        recipient_id: &str,
        update: &UpdateRecipientRequest,
    ) -> Result<Recipient> {
        let path = resource_path("/recipients", recipient_id)?;
        validate_recipient_update(update).into_result()?;

        let body = serde_json::to_value(update)?;
        self.request(Method::PATCH, &path, Some(body), RateLimitTier::General)
            .await
    }

    pub async fn delete_recipient(&self, recipient_id: &str) -> Result<()> {
        let path = resource_path("/recipients", recipient_id)?;
        self.execute(Method::DELETE, &path, None, RateLimitTier::General)
            .await?;
        tracing::info!(recipient_id, "Recipient deleted");
        Ok(())
    }

    /// Poll an order until it reaches `target`.
    ///
    /// An order that already completed also ends the wait. A cancelled
    /// order fails with [`Error::PollCancelled`] unless `target` is
    /// `cancelled`.
    pub async fn wait_for_order_status(&self, order_id: &str, target: OrderStatus) -> Result<Order> {
        poll_until(
            &self.config.poll,
            || self.get_order(order_id),
            |order: &Order| order.status == target || order.status == OrderStatus::Completed,
        )
        .await
    }

    /// Poll until both IMAD and OMAD are assigned.
    ///
    /// While the codes are missing the order itself is fetched too, so a
    /// cancelled order fails with [`Error::PollCancelled`].
    pub async fn wait_for_payment_identifiers(&self, order_id: &str) -> Result<PaymentIdentifiers> {
        let progress = poll_until(
            &self.config.poll,
            || async move {
                let identifiers = self.request_payment_identifiers(order_id).await?;
                let order_status = if identifiers.is_complete() {
                    None
                } else {
                    Some(self.get_order(order_id).await?.status)
                };
                Ok::<_, Error>(IdentifiersProgress {
                    identifiers,
                    order_status,
                })
            },
            |progress: &IdentifiersProgress| progress.identifiers.is_complete(),
        )
        .await?;
        Ok(progress.identifiers)
    }
}

impl Pollable for Order {
    fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    fn describe(&self) -> String {
        format!("order {} status={}", self.id, self.status)
    }
}

/// Identifiers plus the order status seen while they were missing
struct IdentifiersProgress {
    identifiers: PaymentIdentifiers,
    order_status: Option<OrderStatus>,
}

impl Pollable for IdentifiersProgress {
    fn is_cancelled(&self) -> bool {
        self.order_status == Some(OrderStatus::Cancelled)
    }

    fn describe(&self) -> String {
        let state = |code: &Option<String>| if code.is_some() { "set" } else { "missing" };
        let mut description = format!(
            "payment identifiers imad={} omad={}",
            state(&self.identifiers.imad),
            state(&self.identifiers.omad)
        );
        if let Some(status) = &self.order_status {
            description.push_str(&format!(" order status={}", status));
        }
        description
    }
}

fn decode_data<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value::<DataEnvelope<T>>(value)
        .map(|envelope| envelope.data)
        .map_err(|e| Error::InvalidResponse(format!("unexpected response shape: {}", e)))
}

/// `{prefix}/{id}`, rejecting ids that would change the path.
///
/// `.` and `..` are dot segments that the URL parser resolves away.
fn resource_path(prefix: &str, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '?', '#']) {
        let mut errors = ValidationErrors::new();
        errors.extend(CATEGORY_ID, vec![format!("Invalid resource id {:?}", id)]);
        return Err(Error::Validation(errors));
    }
    Ok(format!("{}/{}", prefix, id))
}
