//! Pure state transition function
//!
//! Every rule that changes an [`Account`] lives here. The only I/O a
//! transition can cause is described by the effects it returns.

use super::{Account, AccountContext, Effect, Event, Settlement};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// What a transition did to the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// Accepted but nothing to do (e.g. paying off a loan that does not exist)
    Unchanged,
    /// Refused by a guard; the account is untouched
    Rejected { reason: Rejection },
    /// Phase one of a foreign deposit; the credit arrives later
    ConversionStarted { conversion_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    LoanAlreadyActive,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Account,
    pub effects: Vec<Effect>,
    pub outcome: Outcome,
}

impl TransitionResult {
    pub fn new(state: Account, outcome: Outcome) -> Self {
        Self {
            new_state: state,
            effects: vec![],
            outcome,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{operation} amount must be positive, got {amount}")]
    NonPositiveAmount {
        operation: &'static str,
        amount: Decimal,
    },
    #[error("Loan purpose must not be empty")]
    EmptyLoanPurpose,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs.
pub fn transition(
    state: &Account,
    context: &AccountContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Deposits
        // ============================================================
        Event::Deposit {
            deposit_id,
            amount,
            currency,
        } => {
            require_positive("Deposit", amount)?;

            if currency == context.base_currency {
                // Also the landing leg that clears a stale loading flag
                let new_state = Account {
                    balance: state.balance + amount,
                    is_loading: false,
                    ..state.clone()
                };
                return Ok(TransitionResult::new(new_state, Outcome::Applied));
            }

            Ok(TransitionResult::new(
                converting_currency(state),
                Outcome::ConversionStarted {
                    conversion_id: deposit_id,
                },
            )
            .with_effect(Effect::ConvertCurrency {
                conversion_id: deposit_id,
                amount,
                from: currency,
                to: context.base_currency.clone(),
            }))
        }

        Event::ConvertingCurrency => {
            let outcome = if state.is_loading {
                Outcome::Unchanged
            } else {
                Outcome::Applied
            };
            Ok(TransitionResult::new(converting_currency(state), outcome))
        }

        // Applied even if a base deposit already cleared the flag: the
        // money was deposited either way.
        Event::ConversionComplete {
            conversion_id,
            converted,
        } => {
            let new_state = Account {
                balance: state.balance + converted,
                is_loading: false,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state, Outcome::Applied).with_effect(
                Effect::SettleConversion {
                    conversion_id,
                    settlement: Settlement::Credited { amount: converted },
                },
            ))
        }

        Event::ConversionFailed {
            conversion_id,
            message,
            kind,
        } => {
            let outcome = if state.is_loading {
                Outcome::Applied
            } else {
                Outcome::Unchanged
            };
            let new_state = Account {
                is_loading: false,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state, outcome)
                .with_effect(Effect::notify_error(&format!(
                    "Currency conversion failed: {message}"
                )))
                .with_effect(Effect::SettleConversion {
                    conversion_id,
                    settlement: Settlement::Failed { message, kind },
                }))
        }

        // ============================================================
        // Withdrawals
        // ============================================================
        Event::Withdraw { amount } => {
            require_positive("Withdrawal", amount)?;
            let new_state = Account {
                balance: state.balance - amount,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state, Outcome::Applied))
        }

        // ============================================================
        // Loans
        // ============================================================
        Event::RequestLoan { amount, purpose } => {
            require_positive("Loan", amount)?;
            let purpose = purpose.trim();
            if purpose.is_empty() {
                return Err(TransitionError::EmptyLoanPurpose);
            }

            if state.has_active_loan() {
                return Ok(TransitionResult::new(
                    state.clone(),
                    Outcome::Rejected {
                        reason: Rejection::LoanAlreadyActive,
                    },
                ));
            }

            let new_state = Account {
                balance: state.balance + amount,
                loan: amount,
                loan_purpose: purpose.to_string(),
                is_loading: state.is_loading,
            };
            Ok(TransitionResult::new(new_state, Outcome::Applied))
        }

        Event::PayLoan => {
            if !state.has_active_loan() {
                return Ok(TransitionResult::new(state.clone(), Outcome::Unchanged));
            }
            // Debit reads the loan before it is zeroed
            let new_state = Account {
                balance: state.balance - state.loan,
                loan: Decimal::ZERO,
                loan_purpose: String::new(),
                is_loading: state.is_loading,
            };
            Ok(TransitionResult::new(new_state, Outcome::Applied))
        }
    }
}

fn converting_currency(state: &Account) -> Account {
    Account {
        is_loading: true,
        ..state.clone()
    }
}

fn require_positive(operation: &'static str, amount: Decimal) -> Result<(), TransitionError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(TransitionError::NonPositiveAmount { operation, amount })
    }
}
