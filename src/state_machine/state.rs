//! Account state types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Currency
// ============================================================================

/// Three-letter currency code, always stored upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code '{0}': expected three letters such as USD")]
pub struct CurrencyError(pub String);

impl Currency {
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(CurrencyError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Account
// ============================================================================

/// The account's mutable fields
///
/// Only ever replaced wholesale by the result of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Funds in the base currency. No floor is enforced.
    pub balance: Decimal,
    /// Outstanding principal of the single active loan, zero when none
    pub loan: Decimal,
    /// Reason for the active loan, empty when none
    pub loan_purpose: String,
    /// Set while a currency conversion is in flight
    pub is_loading: bool,
}

impl Account {
    pub fn has_active_loan(&self) -> bool {
        self.loan > Decimal::ZERO
    }

    /// Short state name for client notifications
    pub fn display_name(&self) -> &'static str {
        if self.is_loading {
            "converting"
        } else {
            "ready"
        }
    }
}

/// Immutable context for the account a runtime owns
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub account_id: String,
    /// Currency `balance` and `loan` are denominated in
    pub base_currency: Currency,
}

impl AccountContext {
    pub fn new(account_id: impl Into<String>, base_currency: Currency) -> Self {
        Self {
            account_id: account_id.into(),
            base_currency,
        }
    }
}
