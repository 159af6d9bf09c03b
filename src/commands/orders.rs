//! Orders commands

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Subcommand, ValueEnum};
use rust_decimal::Decimal;
use sdigital_orders::orders::{ComplianceInfo, CreateOrderRequest, OrderEndpoint, OrderStatus};
use tracing::info;

use super::{print_json, CommandContext};

/// Side of the order that carries the amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AmountSide {
    From,
    To,
}

#[derive(Subcommand, Debug)]
pub enum OrdersCommand {
    /// List orders
    List,

    /// Show one order
    Get { id: String },

    /// Create an order
    Create {
        /// Source currency, e.g. USD or USDC_ETH
        #[arg(long)]
        from: String,

        /// Destination currency
        #[arg(long)]
        to: String,

        /// Order amount
        #[arg(long)]
        amount: Decimal,

        /// Which side the amount applies to
        #[arg(long, value_enum, default_value = "from")]
        amount_side: AmountSide,

        /// Recipient receiving the funds
        #[arg(long)]
        recipient: String,

        /// Funds are sent on behalf of a third party
        #[arg(long)]
        third_party: bool,

        #[arg(long)]
        purpose: Option<String>,

        #[arg(long)]
        invoice_url: Option<String>,

        #[arg(long)]
        sender_name: Option<String>,

        /// Last four digits of the sender's bank account (USD wires)
        #[arg(long)]
        sender_account_last4: Option<String>,
    },

    /// Confirm an order with the deposit transaction hash
    Confirm {
        id: String,

        #[arg(long)]
        tx_hash: String,
    },

    /// Request IMAD/OMAD for a fiat order
    PaymentIds {
        id: String,

        /// Poll until both identifiers are assigned
        #[arg(long)]
        wait: bool,
    },

    /// Daily order totals
    Summary {
        /// Date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Poll an order until it reaches a status
    Wait {
        id: String,

        /// Target status, e.g. completed
        #[arg(long, default_value = "completed")]
        status: String,
    },
}

pub fn run(ctx: &CommandContext, command: OrdersCommand) -> Result<()> {
    let client = ctx.client()?;

    // Create a tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;

    match command {
        OrdersCommand::List => {
            let orders = rt.block_on(client.list_orders())?;
            info!("Fetched {} orders", orders.len());
            print_json(&orders)
        }
        OrdersCommand::Get { id } => {
            let order = rt
                .block_on(client.get_order(&id))
                .with_context(|| format!("Failed to fetch order {}", id))?;
            print_json(&order)
        }
        OrdersCommand::Create {
            from,
            to,
            amount,
            amount_side,
            recipient,
            third_party,
            purpose,
            invoice_url,
            sender_name,
            sender_account_last4,
        } => {
            let (from, to) = match amount_side {
                AmountSide::From => (
                    OrderEndpoint::new(from).with_amount(amount),
                    OrderEndpoint::new(to),
                ),
                AmountSide::To => (
                    OrderEndpoint::new(from),
                    OrderEndpoint::new(to).with_amount(amount),
                ),
            };
            let mut request = CreateOrderRequest::new(from, to.with_recipient(recipient));
            if third_party {
                request = request.third_party(ComplianceInfo {
                    purpose_of_payment: purpose,
                    invoice_file_url: invoice_url,
                    sender_legal_name: sender_name,
                    sender_bank_account_last_4: sender_account_last4,
                });
            } else if purpose.is_some()
                || invoice_url.is_some()
                || sender_name.is_some()
                || sender_account_last4.is_some()
            {
                bail!("Compliance fields require --third-party");
            }

            let order = rt
                .block_on(client.create_order(&request))
                .context("Failed to create order")?;
            print_json(&order)
        }
        OrdersCommand::Confirm { id, tx_hash } => {
            let order = rt
                .block_on(client.confirm_order(&id, &tx_hash))
                .with_context(|| format!("Failed to confirm order {}", id))?;
            print_json(&order)
        }
        OrdersCommand::PaymentIds { id, wait } => {
            let identifiers = if wait {
                info!("Waiting for payment identifiers of {}", id);
                rt.block_on(client.wait_for_payment_identifiers(&id))?
            } else {
                rt.block_on(client.request_payment_identifiers(&id))?
            };
            if identifiers.is_pending() {
                info!("Funds not detected yet; no identifiers assigned");
            }
            print_json(&identifiers)
        }
        OrdersCommand::Summary { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let summary = rt.block_on(client.orders_summary(date))?;
            print_json(&summary)
        }
        OrdersCommand::Wait { id, status } => {
            let target = OrderStatus::from(status);
            if !target.is_known() {
                bail!("Unknown order status: {}", target);
            }
            info!("Waiting for order {} to reach {}", id, target);
            let order = rt.block_on(client.wait_for_order_status(&id, target))?;
            print_json(&order)
        }
    }
}
