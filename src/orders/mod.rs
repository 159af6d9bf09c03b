//! Orders API Library
//!
//! Typed client for the fiat/crypto orders API: orders, recipients and wire
//! payment identifiers.
//!
//! # Features
//!
//! - **Typed models**: Orders, recipients and payment identifiers with
//!   open-set currencies and statuses
//! - **Pre-flight validation**: Documented rules are checked locally first
//! - **Retry with Exponential Backoff**: Transient failures are retried
//! - **Rate Limit Handling**: `retry-after` is honoured with a capped retry count
//! - **Polling**: Wait for order status changes and IMAD/OMAD assignment
//!
//! # Quick Start
//!
//! ```no_run
//! use rust_decimal_macros::dec;
//! use sdigital_orders::orders::{CreateOrderRequest, OrderStatus, OrdersClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrdersClient::new("your_api_key")?;
//!
//!     // Off-ramp: 500 USDC on Ethereum paid out as USD
//!     let request = CreateOrderRequest::off_ramp("USDC_ETH", dec!(500), "USD", "rec_fiat_1");
//!     let order = client.create_order(&request).await?;
//!
//!     let order = client
//!         .wait_for_order_status(&order.id, OrderStatus::Completed)
//!         .await?;
//!     let ids = client.wait_for_payment_identifiers(&order.id).await?;
//!     println!("IMAD {:?} OMAD {:?}", ids.imad, ids.omad);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! use std::time::Duration;
//! use sdigital_orders::common::{PollConfig, RetryPolicy};
//! use sdigital_orders::orders::{ClientConfig, OrdersClient};
//!
//! let config = ClientConfig::default()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_retry(RetryPolicy::default().with_max_attempts(5))
//!     .with_poll(PollConfig::default().with_interval(Duration::from_secs(10)));
//!
//! let client = OrdersClient::with_config("api_key", config).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`auth`]: API key handling and masking
//! - [`transport`]: Single-request HTTP transport
//! - [`types`]: Request and response type definitions
//! - [`client`]: Main API client implementation

pub mod auth;
pub mod client;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use auth::Credentials;
pub use client::{ClientConfig, OrdersClient, API_BASE_URL};
pub use transport::{HttpTransport, Transport};

// Re-export commonly used types
pub use types::{
    BankDetails, BusinessDetails, ComplianceInfo, CreateOrderRequest, CreateRecipientRequest,
    Currency, Network, Order, OrderDirection, OrderEndpoint, OrderStatus, OrderSummary,
    PaymentIdentifiers, Recipient, RecipientDetails, UpdateRecipientRequest, User,
};
