//! sdigital Orders Client
//!
//! Typed client for the sdigital fiat/crypto orders API. Converts between
//! fiat currency (USD, BRL, MXN) and stablecoins on Ethereum and Tron,
//! manages recipients, and retrieves wire-transfer payment identifiers.
//!
//! The crate is layered:
//! - [`orders`]: models, HTTP transport and the API client
//! - [`validation`]: pre-flight checks mirroring the documented rules
//! - [`common`]: retry, 429 handling, polling and a local request budget
//! - [`config`]: JSON file configuration for the command-line tool
//!
//! ## Example
//! ```no_run
//! use sdigital_orders::OrdersClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrdersClient::new("api_key")?;
//!     let user = client.check_auth().await?;
//!     println!("Authenticated as {:?}", user.email);
//!
//!     for order in client.list_orders().await? {
//!         println!("{} {}", order.id, order.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod orders;
pub mod validation;

pub use config::AppConfig;
pub use error::{Error, ErrorKind, Result, ValidationErrors};
pub use orders::{ClientConfig, Credentials, OrdersClient};
