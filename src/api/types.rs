//! API request and response types

use crate::runtime::AccountHandle;
use crate::state_machine::{Account, Outcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to deposit funds
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
    /// Defaults to the base currency
    #[serde(default)]
    pub currency: Option<String>,
    /// Hold the response until a conversion settles
    #[serde(default)]
    pub wait: bool,
}

/// Request to withdraw funds
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
}

/// Request to open a loan
#[derive(Debug, Deserialize)]
pub struct LoanRequest {
    pub amount: Decimal,
    pub purpose: String,
}

/// Account as shown to clients
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub account_id: String,
    pub base_currency: String,
    pub state: &'static str,
    #[serde(flatten)]
    pub account: Account,
}

impl AccountView {
    pub fn of(handle: &AccountHandle) -> Self {
        let context = handle.context();
        let account = handle.snapshot();
        Self {
            account_id: context.account_id.clone(),
            base_currency: context.base_currency.to_string(),
            state: account.display_name(),
            account,
        }
    }
}

/// Response for any transition
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Amount credited in the base currency, for deposits that waited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credited: Option<Decimal>,
    pub account: AccountView,
}

impl TransitionResponse {
    pub fn new(outcome: Outcome, handle: &AccountHandle) -> Self {
        Self {
            outcome,
            credited: None,
            account: AccountView::of(handle),
        }
    }

    pub fn with_credited(mut self, amount: Decimal) -> Self {
        self.credited = Some(amount);
        self
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
