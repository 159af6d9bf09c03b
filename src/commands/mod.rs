//! Command implementations

pub mod orders;
pub mod recipients;

use anyhow::{Context, Result};
use sdigital_orders::{AppConfig, OrdersClient};
use serde::Serialize;
use tracing::info;

/// Everything a command needs to build a client
pub struct CommandContext {
    pub config: AppConfig,
    pub api_key: String,
}

impl CommandContext {
    pub fn client(&self) -> Result<OrdersClient> {
        let client_config = self.config.to_client_config();
        info!("Using API at {}", client_config.base_url);
        OrdersClient::with_config(self.api_key.clone(), client_config)
            .context("Failed to create orders client")
    }
}

/// Pretty-print a response to stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Check the API key against `GET /users`
pub fn whoami(ctx: &CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let rt = tokio::runtime::Runtime::new()?;

    let user = rt
        .block_on(client.check_auth())
        .context("Authentication check failed")?;
    info!("API key accepted");
    print_json(&user)
}
