//! Events that can occur on an account

use crate::rates::RateErrorKind;
use crate::state_machine::state::Currency;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Deposit {
        /// Doubles as the conversion id when `currency` is foreign
        deposit_id: Uuid,
        amount: Decimal,
        currency: Currency,
    },
    Withdraw {
        amount: Decimal,
    },
    RequestLoan {
        amount: Decimal,
        purpose: String,
    },
    PayLoan,

    // Conversion events
    /// Marks the start of a conversion without issuing one
    #[allow(dead_code)] // Only sent by hosts that run the lookup themselves
    ConvertingCurrency,
    ConversionComplete {
        conversion_id: Uuid,
        /// Amount in the base currency
        converted: Decimal,
    },
    ConversionFailed {
        conversion_id: Uuid,
        message: String,
        kind: RateErrorKind,
    },
}

impl Event {
    pub fn deposit(amount: Decimal, currency: Currency) -> Self {
        Event::Deposit {
            deposit_id: Uuid::new_v4(),
            amount,
            currency,
        }
    }

    /// Id of the conversion this event settles
    ///
    /// Only the runtime raises these, from the lookups it started.
    pub fn settled_conversion(&self) -> Option<Uuid> {
        match self {
            Event::ConversionComplete { conversion_id, .. }
            | Event::ConversionFailed { conversion_id, .. } => Some(*conversion_id),
            _ => None,
        }
    }

    /// Name used in log fields
    pub fn name(&self) -> &'static str {
        match self {
            Event::Deposit { .. } => "deposit",
            Event::Withdraw { .. } => "withdraw",
            Event::RequestLoan { .. } => "request_loan",
            Event::PayLoan => "pay_loan",
            Event::ConvertingCurrency => "converting_currency",
            Event::ConversionComplete { .. } => "conversion_complete",
            Event::ConversionFailed { .. } => "conversion_failed",
        }
    }
}
