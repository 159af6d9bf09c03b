//! Recipients commands

use anyhow::{Context, Result};
use clap::Subcommand;
use sdigital_orders::orders::CreateRecipientRequest;
use tracing::info;

use super::{print_json, CommandContext};

#[derive(Subcommand, Debug)]
pub enum RecipientsCommand {
    /// List recipients
    List,

    /// Show one recipient
    Get { id: String },

    /// Register a crypto wallet recipient
    CreateCrypto {
        /// Token symbol: USDC_ETH, USDT_ETH or USDT_TRX
        #[arg(long)]
        token: String,

        /// Wallet address on the token's network
        #[arg(long)]
        address: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a recipient
    Delete { id: String },
}

pub fn run(ctx: &CommandContext, command: RecipientsCommand) -> Result<()> {
    let client = ctx.client()?;
    let rt = tokio::runtime::Runtime::new()?;

    match command {
        RecipientsCommand::List => {
            let recipients = rt.block_on(client.list_recipients())?;
            info!("Fetched {} recipients", recipients.len());
            print_json(&recipients)
        }
        RecipientsCommand::Get { id } => {
            let recipient = rt
                .block_on(client.get_recipient(&id))
                .with_context(|| format!("Failed to fetch recipient {}", id))?;
            print_json(&recipient)
        }
        RecipientsCommand::CreateCrypto {
            token,
            address,
            name,
        } => {
            let mut request = CreateRecipientRequest::crypto(token, address);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            let recipient = rt
                .block_on(client.create_recipient(&request))
                .context("Failed to create recipient")?;
            print_json(&recipient)
        }
        RecipientsCommand::Delete { id } => {
            rt.block_on(client.delete_recipient(&id))
                .with_context(|| format!("Failed to delete recipient {}", id))?;
            println!("Deleted recipient {}", id);
            Ok(())
        }
    }
}
