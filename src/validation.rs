//! Pre-flight request validation
//!
//! Pure checks mirroring the documented server rules, run before every
//! mutating call so obviously bad requests never leave the process. Each
//! validator returns human-readable messages; an empty list means valid.
//! The composite validators group messages by category the same way the
//! server's `fields` error map does.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ValidationErrors;
use crate::orders::types::{
    BankDetails, CreateOrderRequest, CreateRecipientRequest, Currency, Network,
    RecipientDetails, UpdateRecipientRequest,
};

pub const CATEGORY_CURRENCY: &str = "currency";
pub const CATEGORY_AMOUNT: &str = "amount";
pub const CATEGORY_THIRD_PARTY: &str = "thirdParty";
pub const CATEGORY_ADDRESS: &str = "address";
pub const CATEGORY_BANK: &str = "bankDetails";
pub const CATEGORY_INTERMEDIARY_BANK: &str = "intermediaryBankDetails";
pub const CATEGORY_TRANSACTION_HASH: &str = "transactionHash";
pub const CATEGORY_ID: &str = "id";

/// Accepted order amount range: `min < amount <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountLimits {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for AmountLimits {
    fn default() -> Self {
        Self {
            min: Decimal::ZERO,
            max: dec!(1_000_000),
        }
    }
}

impl AmountLimits {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }
}

/// Exactly one side must be fiat and the other crypto
pub fn validate_currency_pair(from: &Currency, to: &Currency) -> Vec<String> {
    let mut errors = Vec::new();
    for currency in [from, to] {
        if !currency.is_known() {
            errors.push(format!("Unsupported currency: {}", currency));
        }
    }
    if !errors.is_empty() {
        return errors;
    }

    if from.is_fiat() && to.is_fiat() {
        errors.push(format!(
            "Cannot convert between two fiat currencies ({} -> {})",
            from, to
        ));
    } else if from.is_crypto() && to.is_crypto() {
        errors.push(format!(
            "Cannot convert between two crypto currencies ({} -> {})",
            from, to
        ));
    }
    errors
}

/// Exactly one of the two amounts must be set, and within `limits`
pub fn validate_amounts(
    from_amount: Option<Decimal>,
    to_amount: Option<Decimal>,
    limits: &AmountLimits,
) -> Vec<String> {
    let amount = match (from_amount, to_amount) {
        (Some(_), Some(_)) => {
            return vec!["Specify either from.amount or to.amount, not both".to_string()]
        }
        (None, None) => return vec!["Either from.amount or to.amount is required".to_string()],
        (Some(a), None) | (None, Some(a)) => a,
    };

    if amount <= limits.min {
        vec![format!("Amount must be greater than {}", limits.min)]
    } else if amount > limits.max {
        vec![format!("Amount must not exceed {}", limits.max)]
    } else {
        Vec::new()
    }
}

/// Compliance fields required when `is_third_party` is set.
///
/// Every missing field is reported; checks do not short-circuit.
pub fn validate_third_party(order: &CreateOrderRequest) -> Vec<String> {
    if !order.is_third_party {
        return Vec::new();
    }

    let compliance = &order.compliance;
    let missing = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
    let mut errors = Vec::new();

    if missing(&compliance.purpose_of_payment) {
        errors.push("purpose_of_payment is required for third-party orders".to_string());
    }
    if missing(&compliance.invoice_file_url) {
        errors.push("invoice_file_url is required for third-party orders".to_string());
    }
    if missing(&compliance.sender_legal_name) {
        errors.push("sender_legal_name is required for third-party orders".to_string());
    }

    // the sender's account only exists when USD is wired in
    let usd_wire = order.from.currency == Currency::Usd;
    match compliance.sender_bank_account_last_4.as_deref() {
        Some(last4) if !last4.trim().is_empty() => {
            if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
                errors.push("sender_bank_account_last_4 must be exactly 4 digits".to_string());
            }
        }
        _ if usd_wire => errors.push(
            "sender_bank_account_last_4 is required for third-party USD wire orders".to_string(),
        ),
        _ => {}
    }

    errors
}

/// Wallet address format for a network name (`ethereum`, `tron`, ...)
pub fn validate_crypto_address(network: &str, address: &str) -> Vec<String> {
    match network.parse::<Network>() {
        Ok(network) => validate_address_for(network, address),
        Err(e) => vec![e],
    }
}

pub(crate) fn validate_address_for(network: Network, address: &str) -> Vec<String> {
    let valid = match network {
        Network::Ethereum => address
            .strip_prefix("0x")
            .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())),
        Network::Tron => address
            .strip_prefix('T')
            .is_some_and(|rest| rest.len() == 33 && rest.chars().all(|c| c.is_ascii_alphanumeric())),
    };

    if valid {
        Vec::new()
    } else {
        let expected = match network {
            Network::Ethereum => "0x followed by 40 hex characters",
            Network::Tron => "T followed by 33 alphanumeric characters",
        };
        vec![format!("Invalid {} address: expected {}", network, expected)]
    }
}

fn is_swift(code: &str) -> bool {
    let bytes = code.as_bytes();
    (bytes.len() == 8 || bytes.len() == 11)
        && bytes[..6].iter().all(u8::is_ascii_alphabetic)
        && bytes[6..].iter().all(u8::is_ascii_alphanumeric)
}

/// Account, routing and SWIFT/BIC formats. Never echoes the account number.
pub fn validate_bank_details(details: &BankDetails) -> Vec<String> {
    let mut errors = Vec::new();

    let account = details.account_number.trim();
    if !(4..=17).contains(&account.len()) || !account.chars().all(|c| c.is_ascii_digit()) {
        errors.push("Account number must be 4-17 digits".to_string());
    }

    if details.is_us() {
        match details.routing_number.as_deref() {
            Some(routing) if routing.len() == 9 && routing.chars().all(|c| c.is_ascii_digit()) => {}
            Some(_) => errors.push("US routing number must be exactly 9 digits".to_string()),
            None => errors.push("US routing number is required".to_string()),
        }
    }

    if let Some(swift) = details.swift_code.as_deref() {
        if !is_swift(swift) {
            errors.push(
                "SWIFT/BIC must be 6 letters, 2 alphanumeric characters and an optional 3 alphanumeric branch code"
                    .to_string(),
            );
        }
    }

    errors
}

/// On-chain transaction hash format: Ethereum `0x` + 64 hex, Tron 64 hex
pub fn validate_transaction_hash(network: Network, hash: &str) -> Vec<String> {
    let hex64 = |s: &str| s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit());
    let valid = match network {
        Network::Ethereum => hash.strip_prefix("0x").is_some_and(hex64),
        Network::Tron => hex64(hash),
    };
    if valid {
        Vec::new()
    } else {
        let expected = match network {
            Network::Ethereum => "66 characters starting with 0x",
            Network::Tron => "64 hex characters",
        };
        vec![format!(
            "Invalid {} transaction hash: expected {}",
            network, expected
        )]
    }
}

/// Hash format when the network is not known up front
pub fn validate_any_transaction_hash(hash: &str) -> Vec<String> {
    if validate_transaction_hash(Network::Ethereum, hash).is_empty()
        || validate_transaction_hash(Network::Tron, hash).is_empty()
    {
        Vec::new()
    } else {
        vec!["Transaction hash must be an Ethereum (0x + 64 hex) or Tron (64 hex) hash".to_string()]
    }
}

/// IMAD/OMAD: 16 alphanumeric characters starting with a 4-digit year
pub fn validate_wire_identifier(code: &str) -> Vec<String> {
    let valid = code.len() == 16
        && code.chars().all(|c| c.is_ascii_alphanumeric())
        && code[..4].chars().all(|c| c.is_ascii_digit());
    if valid {
        Vec::new()
    } else {
        vec![format!(
            "Invalid wire identifier {:?}: expected 16 alphanumeric characters (YYYYBBBBNNNNNNN)",
            code
        )]
    }
}

/// All order checks, grouped as `currency`, `amount` and `thirdParty`
pub fn validate_order(order: &CreateOrderRequest, limits: &AmountLimits) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.extend(
        CATEGORY_CURRENCY,
        validate_currency_pair(&order.from.currency, &order.to.currency),
    );
    errors.extend(
        CATEGORY_AMOUNT,
        validate_amounts(order.from.amount, order.to.amount, limits),
    );
    errors.extend(CATEGORY_THIRD_PARTY, validate_third_party(order));
    errors
}

pub fn validate_recipient(request: &CreateRecipientRequest) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    match &request.details {
        RecipientDetails::Crypto { token, address } => match token.network() {
            Some(network) => errors.extend(CATEGORY_ADDRESS, validate_address_for(network, address)),
            None => errors.extend(
                CATEGORY_CURRENCY,
                vec![format!("{} is not a supported crypto token", token)],
            ),
        },
        RecipientDetails::Fiat {
            currency,
            bank_details,
            intermediary_bank_details,
            ..
        } => {
            if !currency.is_fiat() {
                errors.extend(
                    CATEGORY_CURRENCY,
                    vec![format!("{} is not a supported fiat currency", currency)],
                );
            }
            errors.extend(CATEGORY_BANK, validate_bank_details(bank_details));
            if let Some(intermediary) = intermediary_bank_details {
                errors.extend(
                    CATEGORY_INTERMEDIARY_BANK,
                    validate_bank_details(intermediary),
                );
            }
        }
    }
    errors
}

/// Validates only the parts a partial update supplies
pub fn validate_recipient_update(update: &UpdateRecipientRequest) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if update.is_empty() {
        errors.extend("update", vec!["Update contains no fields".to_string()]);
    }
    if let Some(address) = update.address.as_deref() {
        match update.network {
            Some(network) => errors.extend(CATEGORY_ADDRESS, validate_address_for(network, address)),
            None => errors.extend(
                CATEGORY_ADDRESS,
                vec!["Network is required to validate an address update".to_string()],
            ),
        }
    }
    if let Some(bank) = &update.bank_details {
        errors.extend(CATEGORY_BANK, validate_bank_details(bank));
    }
    if let Some(bank) = &update.intermediary_bank_details {
        errors.extend(CATEGORY_INTERMEDIARY_BANK, validate_bank_details(bank));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::types::{BusinessDetails, ComplianceInfo};

    const ETH_ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
    const TRON_ADDRESS: &str = "TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7";

    fn us_bank() -> BankDetails {
        BankDetails {
            bank_name: Some("Chase".to_string()),
            account_number: "000123456789".to_string(),
            routing_number: Some("021000021".to_string()),
            swift_code: Some("CHASUS33".to_string()),
            country: "USA".to_string(),
            account_holder_name: Some("Acme LLC".to_string()),
        }
    }

    fn full_compliance() -> ComplianceInfo {
        ComplianceInfo {
            purpose_of_payment: Some("supplier invoice".to_string()),
            invoice_file_url: Some("https://files.example.com/inv-1.pdf".to_string()),
            sender_legal_name: Some("Acme Holdings Inc".to_string()),
            sender_bank_account_last_4: Some("6789".to_string()),
        }
    }

    #[test]
    fn test_same_kind_pairs_rejected() {
        for from in Currency::FIAT {
            for to in Currency::FIAT {
                assert!(!validate_currency_pair(&from, &to).is_empty(), "{from}->{to}");
            }
        }
        for from in Currency::CRYPTO {
            for to in Currency::CRYPTO {
                assert!(!validate_currency_pair(&from, &to).is_empty(), "{from}->{to}");
            }
        }
    }

    #[test]
    fn test_mixed_pairs_accepted() {
        for fiat in Currency::FIAT {
            for crypto in Currency::CRYPTO {
                assert!(validate_currency_pair(&fiat, &crypto).is_empty());
                assert!(validate_currency_pair(&crypto, &fiat).is_empty());
            }
        }
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let errors = validate_currency_pair(&Currency::from("EUR"), &Currency::UsdcEth);
        assert_eq!(errors, vec!["Unsupported currency: EUR".to_string()]);
    }

    #[test]
    fn test_amount_exclusivity() {
        let limits = AmountLimits::default();
        assert_eq!(validate_amounts(Some(dec!(10)), Some(dec!(10)), &limits).len(), 1);
        assert_eq!(validate_amounts(None, None, &limits).len(), 1);
        assert!(validate_amounts(Some(dec!(10)), None, &limits).is_empty());
        assert!(validate_amounts(None, Some(dec!(10)), &limits).is_empty());
    }

    #[test]
    fn test_amount_bounds() {
        let limits = AmountLimits::default();
        assert_eq!(validate_amounts(Some(dec!(0)), None, &limits).len(), 1);
        assert_eq!(validate_amounts(Some(dec!(-5)), None, &limits).len(), 1);
        assert!(validate_amounts(Some(dec!(1_000_000)), None, &limits).is_empty());
        assert_eq!(validate_amounts(None, Some(dec!(1_000_000.01)), &limits).len(), 1);

        let custom = AmountLimits::new(dec!(100), dec!(500));
        assert_eq!(validate_amounts(Some(dec!(100)), None, &custom).len(), 1);
        assert!(validate_amounts(Some(dec!(100.01)), None, &custom).is_empty());
        assert_eq!(validate_amounts(Some(dec!(501)), None, &custom).len(), 1);
    }

    #[test]
    fn test_third_party_complete() {
        let order = CreateOrderRequest::on_ramp("USD", dec!(1000), "USDC_ETH", "rec_1")
            .third_party(full_compliance());
        assert!(validate_third_party(&order).is_empty());
    }

    #[test]
    fn test_third_party_errors_accumulate() {
        let base = CreateOrderRequest::on_ramp("USD", dec!(1000), "USDC_ETH", "rec_1");

        let strip: [fn(&mut ComplianceInfo); 4] = [
            |c| c.purpose_of_payment = None,
            |c| c.invoice_file_url = None,
            |c| c.sender_legal_name = None,
            |c| c.sender_bank_account_last_4 = None,
        ];

        for (i, remove) in strip.iter().enumerate() {
            let mut compliance = full_compliance();
            remove(&mut compliance);
            let order = base.clone().third_party(compliance);
            assert_eq!(validate_third_party(&order).len(), 1, "field {i}");
        }

        let order = base.third_party(ComplianceInfo::default());
        assert_eq!(validate_third_party(&order).len(), 4);
    }

    #[test]
    fn test_third_party_last4_only_for_usd() {
        let mut compliance = full_compliance();
        compliance.sender_bank_account_last_4 = None;
        let order = CreateOrderRequest::on_ramp("BRL", dec!(1000), "USDT_TRX", "rec_1")
            .third_party(compliance);
        assert!(validate_third_party(&order).is_empty());
    }

    #[test]
    fn test_third_party_last4_only_when_sending_usd() {
        let mut compliance = full_compliance();
        compliance.sender_bank_account_last_4 = None;

        let off_ramp = CreateOrderRequest::off_ramp("USDC_ETH", dec!(1000), "USD", "rec_1")
            .third_party(compliance.clone());
        assert!(validate_third_party(&off_ramp).is_empty());

        let on_ramp = CreateOrderRequest::on_ramp("USD", dec!(1000), "USDC_ETH", "rec_1")
            .third_party(compliance);
        let errors = validate_third_party(&on_ramp);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("sender_bank_account_last_4"));
    }

    #[test]
    fn test_not_third_party_skips_checks() {
        let order = CreateOrderRequest::on_ramp("USD", dec!(1000), "USDC_ETH", "rec_1");
        assert!(validate_third_party(&order).is_empty());
    }

    #[test]
    fn test_ethereum_addresses() {
        assert!(validate_crypto_address("ethereum", ETH_ADDRESS).is_empty());
        // 39 and 41 hex characters
        assert_eq!(validate_crypto_address("ethereum", &ETH_ADDRESS[..41]).len(), 1);
        assert_eq!(
            validate_crypto_address("ethereum", &format!("{}a", ETH_ADDRESS)).len(),
            1
        );
        assert_eq!(validate_crypto_address("ethereum", &ETH_ADDRESS[2..]).len(), 1);
        assert_eq!(
            validate_crypto_address("ethereum", "0x742d35Cc6634C0532925a3b844Bc454e4438f44g").len(),
            1
        );
    }

    #[test]
    fn test_tron_addresses() {
        assert!(validate_crypto_address("tron", TRON_ADDRESS).is_empty());
        assert_eq!(validate_crypto_address("tron", &TRON_ADDRESS[..33]).len(), 1);
        assert_eq!(validate_crypto_address("tron", ETH_ADDRESS).len(), 1);
    }

    #[test]
    fn test_unknown_network() {
        let errors = validate_crypto_address("solana", "whatever");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Unsupported network"));
    }

    #[test]
    fn test_bank_details() {
        assert!(validate_bank_details(&us_bank()).is_empty());

        let mut bank = us_bank();
        bank.account_number = "123".to_string();
        bank.routing_number = Some("12345678".to_string());
        bank.swift_code = Some("CHAS1S33".to_string());
        let errors = validate_bank_details(&bank);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| !e.contains("123")));
    }

    #[test]
    fn test_bank_details_non_us_routing_optional() {
        let bank = BankDetails {
            account_number: "12345678".to_string(),
            swift_code: Some("BOFAMXMMXXX".to_string()),
            country: "MEX".to_string(),
            ..Default::default()
        };
        assert!(validate_bank_details(&bank).is_empty());
    }

    #[test]
    fn test_transaction_hashes() {
        let eth = format!("0x{}", "ab".repeat(32));
        let tron = "cd".repeat(32);
        assert!(validate_transaction_hash(Network::Ethereum, &eth).is_empty());
        assert!(validate_transaction_hash(Network::Tron, &tron).is_empty());
        assert_eq!(validate_transaction_hash(Network::Ethereum, &tron).len(), 1);
        assert_eq!(validate_transaction_hash(Network::Tron, &eth).len(), 1);
        assert!(validate_any_transaction_hash(&eth).is_empty());
        assert_eq!(validate_any_transaction_hash("0x1234").len(), 1);
    }

    #[test]
    fn test_wire_identifiers() {
        assert!(validate_wire_identifier("2024MMQFMP000001").is_empty());
        assert_eq!(validate_wire_identifier("24MMQFMP000001").len(), 1);
        assert_eq!(validate_wire_identifier("ABCDMMQFMP000001").len(), 1);
        assert_eq!(validate_wire_identifier("2024MMQF-P000001").len(), 1);
    }

    #[test]
    fn test_validate_order_categories() {
        let mut order = CreateOrderRequest::on_ramp("USD", dec!(1000), "BRL", "rec_1");
        order.to.amount = Some(dec!(5));
        order.is_third_party = true;

        let errors = validate_order(&order, &AmountLimits::default());
        let categories: Vec<&str> = errors.categories().collect();
        assert_eq!(categories, vec!["amount", "currency", "thirdParty"]);
        assert_eq!(errors.get("thirdParty").map(|e| e.len()), Some(4));
    }

    #[test]
    fn test_validate_order_ok() {
        let order = CreateOrderRequest::on_ramp("USD", dec!(1000), "USDC_ETH", "rec_123");
        assert!(validate_order(&order, &AmountLimits::default()).is_empty());
    }

    #[test]
    fn test_validate_recipient() {
        let ok = CreateRecipientRequest::crypto("USDT_TRX", TRON_ADDRESS);
        assert!(validate_recipient(&ok).is_empty());

        let wrong_network = CreateRecipientRequest::crypto("USDC_ETH", TRON_ADDRESS);
        assert_eq!(validate_recipient(&wrong_network).len(), 1);

        let fiat = CreateRecipientRequest::fiat(
            "USD",
            BusinessDetails {
                name: "Acme LLC".to_string(),
                ..Default::default()
            },
            us_bank(),
        )
        .with_intermediary_bank(BankDetails {
            account_number: "12".to_string(),
            country: "DEU".to_string(),
            ..Default::default()
        });
        let errors = validate_recipient(&fiat);
        assert!(errors.get(CATEGORY_BANK).is_none());
        assert_eq!(errors.get(CATEGORY_INTERMEDIARY_BANK).map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_validate_recipient_update() {
        assert!(!validate_recipient_update(&UpdateRecipientRequest::default()).is_empty());

        let update = UpdateRecipientRequest {
            address: Some(ETH_ADDRESS.to_string()),
            network: Some(Network::Ethereum),
            ..Default::default()
        };
        assert!(validate_recipient_update(&update).is_empty());

        let update = UpdateRecipientRequest {
            address: Some(ETH_ADDRESS.to_string()),
            ..Default::default()
        };
        assert_eq!(validate_recipient_update(&update).len(), 1);
    }
}
