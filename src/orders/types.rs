//! Types and models for the orders API
//!
//! Request and response bodies for orders, recipients and payment
//! identifiers. Open-ended string sets (currencies, statuses) deserialize
//! unknown values into an `Other`/`Unknown` variant instead of failing.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Blockchain network a crypto currency settles on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Tron,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Ethereum => write!(f, "ethereum"),
            Network::Tron => write!(f, "tron"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" | "erc20" => Ok(Network::Ethereum),
            "tron" | "trx" | "trc20" => Ok(Network::Tron),
            other => Err(format!("Unsupported network: {}", other)),
        }
    }
}

/// Currency code accepted by the API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    Usd,
    Brl,
    Mxn,
    UsdcEth,
    UsdtEth,
    UsdtTrx,
    /// Code this client does not know about
    Other(String),
}

impl Currency {
    pub const FIAT: [Currency; 3] = [Currency::Usd, Currency::Brl, Currency::Mxn];
    pub const CRYPTO: [Currency; 3] = [Currency::UsdcEth, Currency::UsdtEth, Currency::UsdtTrx];

    pub fn code(&self) -> &str {
        match self {
            Currency::Usd => "USD",
            Currency::Brl => "BRL",
            Currency::Mxn => "MXN",
            Currency::UsdcEth => "USDC_ETH",
            Currency::UsdtEth => "USDT_ETH",
            Currency::UsdtTrx => "USDT_TRX",
            Currency::Other(code) => code,
        }
    }

    pub fn is_fiat(&self) -> bool {
        matches!(self, Currency::Usd | Currency::Brl | Currency::Mxn)
    }

    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            Currency::UsdcEth | Currency::UsdtEth | Currency::UsdtTrx
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Currency::Other(_))
    }

    /// Settlement network for crypto currencies
    pub fn network(&self) -> Option<Network> {
        match self {
            Currency::UsdcEth | Currency::UsdtEth => Some(Network::Ethereum),
            Currency::UsdtTrx => Some(Network::Tron),
            _ => None,
        }
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Currency::Usd,
            "BRL" => Currency::Brl,
            "MXN" => Currency::Mxn,
            "USDC_ETH" => Currency::UsdcEth,
            "USDT_ETH" => Currency::UsdtEth,
            "USDT_TRX" => Currency::UsdtTrx,
            _ => Currency::Other(code),
        }
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Currency::from(code.to_string())
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Order direction, derived from which side is fiat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// fiat -> crypto
    OnRamp,
    /// crypto -> fiat
    OffRamp,
}

/// Order status
///
/// Treated as an open set: statuses this client does not recognise land in
/// [`OrderStatus::Unknown`] and are logged rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Created,
    AwaitingFunds,
    InComplianceReview,
    ProcessingPayment,
    ProcessingSettlement,
    Completed,
    Cancelled,
    Unknown(String),
}

static OFF_RAMP_LIFECYCLE: [OrderStatus; 4] = [
    OrderStatus::Created,
    OrderStatus::InComplianceReview,
    OrderStatus::ProcessingPayment,
    OrderStatus::Completed,
];

static ON_RAMP_LIFECYCLE: [OrderStatus; 5] = [
    OrderStatus::Created,
    OrderStatus::AwaitingFunds,
    OrderStatus::InComplianceReview,
    OrderStatus::ProcessingSettlement,
    OrderStatus::Completed,
];

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::AwaitingFunds => "awaiting_funds",
            OrderStatus::InComplianceReview => "in_compliance_review",
            OrderStatus::ProcessingPayment => "processing_payment",
            OrderStatus::ProcessingSettlement => "processing_settlement",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown(s) => s,
        }
    }

    /// `completed` and `cancelled` end the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, OrderStatus::Unknown(_))
    }

    /// Documented happy path for a direction, `cancelled` excluded
    pub fn lifecycle(direction: OrderDirection) -> &'static [OrderStatus] {
        match direction {
            OrderDirection::OnRamp => &ON_RAMP_LIFECYCLE,
            OrderDirection::OffRamp => &OFF_RAMP_LIFECYCLE,
        }
    }

    /// Whether the service may move an order from `self` to `next`.
    ///
    /// Forward moves along the lifecycle are allowed (the service may skip
    /// intermediate states between polls), `cancelled` is reachable from any
    /// non-terminal state, and unknown statuses never block.
    pub fn can_transition_to(&self, next: &OrderStatus, direction: OrderDirection) -> bool {
        if self.is_terminal() {
            return false;
        }
        if !self.is_known() || !next.is_known() {
            return true;
        }
        if *next == OrderStatus::Cancelled {
            return true;
        }
        let lifecycle = Self::lifecycle(direction);
        match (
            lifecycle.iter().position(|s| s == self),
            lifecycle.iter().position(|s| s == next),
        ) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => OrderStatus::Created,
            "awaiting_funds" => OrderStatus::AwaitingFunds,
            "in_compliance_review" => OrderStatus::InComplianceReview,
            "processing_payment" => OrderStatus::ProcessingPayment,
            "processing_settlement" => OrderStatus::ProcessingSettlement,
            "completed" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => {
                tracing::warn!(status = %s, "Unrecognised order status");
                OrderStatus::Unknown(s)
            }
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        OrderStatus::from(s.to_string())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEndpoint {
    pub currency: Currency,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    /// Only meaningful on the `to` side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
}

impl OrderEndpoint {
    pub fn new(currency: impl Into<Currency>) -> Self {
        Self {
            currency: currency.into(),
            amount: None,
            recipient_id: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }
}

/// Compliance fields required on third-party orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_of_payment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_legal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_bank_account_last_4: Option<String>,
}

/// Request to create a new order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub from: OrderEndpoint,
    pub to: OrderEndpoint,
    #[serde(default)]
    pub is_third_party: bool,
    #[serde(flatten)]
    pub compliance: ComplianceInfo,
}

impl CreateOrderRequest {
    pub fn new(from: OrderEndpoint, to: OrderEndpoint) -> Self {
        Self {
            from,
            to,
            is_third_party: false,
            compliance: ComplianceInfo::default(),
        }
    }

    /// Fiat -> crypto, amount given on the fiat side
    pub fn on_ramp(
        fiat: impl Into<Currency>,
        amount: Decimal,
        crypto: impl Into<Currency>,
        recipient_id: impl Into<String>,
    ) -> Self {
        Self::new(
            OrderEndpoint::new(fiat).with_amount(amount),
            OrderEndpoint::new(crypto).with_recipient(recipient_id),
        )
    }

    /// Crypto -> fiat, amount given on the crypto side
    pub fn off_ramp(
        crypto: impl Into<Currency>,
        amount: Decimal,
        fiat: impl Into<Currency>,
        recipient_id: impl Into<String>,
    ) -> Self {
        Self::new(
            OrderEndpoint::new(crypto).with_amount(amount),
            OrderEndpoint::new(fiat).with_recipient(recipient_id),
        )
    }

    pub fn third_party(mut self, compliance: ComplianceInfo) -> Self {
        self.is_third_party = true;
        self.compliance = compliance;
        self
    }

    pub fn direction(&self) -> Option<OrderDirection> {
        direction_of(&self.from.currency, &self.to.currency)
    }
}

fn direction_of(from: &Currency, to: &Currency) -> Option<OrderDirection> {
    match (from.is_fiat(), to.is_fiat()) {
        (true, false) if to.is_crypto() => Some(OrderDirection::OnRamp),
        (false, true) if from.is_crypto() => Some(OrderDirection::OffRamp),
        _ => None,
    }
}

/// An order as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub from: OrderEndpoint,
    pub to: OrderEndpoint,
    #[serde(default)]
    pub is_third_party: bool,
    #[serde(flatten)]
    pub compliance: ComplianceInfo,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn direction(&self) -> Option<OrderDirection> {
        direction_of(&self.from.currency, &self.to.currency)
    }

    pub fn recipient_id(&self) -> Option<&str> {
        self.to.recipient_id.as_deref()
    }

    /// Orders with a fiat destination settle by wire and receive IMAD/OMAD
    pub fn is_fiat_payout(&self) -> bool {
        self.to.currency.is_fiat()
    }
}

/// Body of `PUT /orders/{id}/confirm`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrderRequest {
    pub transaction_hash: String,
}

impl ConfirmOrderRequest {
    pub fn new(transaction_hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: transaction_hash.into(),
        }
    }
}

/// Wire transfer tracking codes for a fiat order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIdentifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PaymentIdentifiers {
    fn present(code: &Option<String>) -> bool {
        code.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Both IMAD and OMAD have been assigned
    pub fn is_complete(&self) -> bool {
        Self::present(&self.imad) && Self::present(&self.omad)
    }

    /// Neither code assigned yet; funds not detected
    pub fn is_pending(&self) -> bool {
        !Self::present(&self.imad) && !Self::present(&self.omad)
    }
}

/// Business that owns a fiat destination account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Bank account details
///
/// `Debug` masks the account number.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swift_code: Option<String>,
    /// ISO country code, e.g. "USA"
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_holder_name: Option<String>,
}

impl BankDetails {
    pub fn masked_account_number(&self) -> String {
        mask_tail(&self.account_number)
    }

    pub fn is_us(&self) -> bool {
        matches!(
            self.country.to_ascii_uppercase().as_str(),
            "USA" | "US" | "UNITED STATES"
        )
    }
}

impl fmt::Debug for BankDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankDetails")
            .field("bank_name", &self.bank_name)
            .field("account_number", &self.masked_account_number())
            .field("routing_number", &self.routing_number)
            .field("swift_code", &self.swift_code)
            .field("country", &self.country)
            .field("account_holder_name", &self.account_holder_name)
            .finish()
    }
}

/// Keep only the last four characters visible
pub(crate) fn mask_tail(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

/// Type-specific recipient data, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecipientDetails {
    Crypto {
        /// Token symbol, e.g. "USDC_ETH"
        token: Currency,
        address: String,
    },
    Fiat {
        currency: Currency,
        business_details: BusinessDetails,
        bank_details: BankDetails,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intermediary_bank_details: Option<BankDetails>,
    },
}

impl RecipientDetails {
    pub fn is_crypto(&self) -> bool {
        matches!(self, RecipientDetails::Crypto { .. })
    }
}

/// A registered payee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: RecipientDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to register a recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRecipientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: RecipientDetails,
}

impl CreateRecipientRequest {
    pub fn crypto(token: impl Into<Currency>, address: impl Into<String>) -> Self {
        Self {
            name: None,
            details: RecipientDetails::Crypto {
                token: token.into(),
                address: address.into(),
            },
        }
    }

    pub fn fiat(
        currency: impl Into<Currency>,
        business_details: BusinessDetails,
        bank_details: BankDetails,
    ) -> Self {
        Self {
            name: None,
            details: RecipientDetails::Fiat {
                currency: currency.into(),
                business_details,
                bank_details,
                intermediary_bank_details: None,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_intermediary_bank(mut self, bank: BankDetails) -> Self {
        if let RecipientDetails::Fiat {
            intermediary_bank_details,
            ..
        } = &mut self.details
        {
            *intermediary_bank_details = Some(bank);
        }
        self
    }
}

/// Partial update for `PATCH /recipients/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecipientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Crypto recipients only; validated against `network`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip)]
    pub network: Option<Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_details: Option<BusinessDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediary_bank_details: Option<BankDetails>,
}

impl UpdateRecipientRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.business_details.is_none()
            && self.bank_details.is_none()
            && self.intermediary_bank_details.is_none()
    }
}

/// Account behind the API key (`GET /users`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Daily order totals (`GET /orders/summary?date=YYYY-MM-DD`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub by_status: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Success envelope `{"data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}
