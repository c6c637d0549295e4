//! Effects produced by state transitions

use crate::rates::RateErrorKind;
use crate::state_machine::state::Currency;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// How an in-flight conversion ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Settlement {
    Credited { amount: Decimal },
    Failed { message: String, kind: RateErrorKind },
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Look up `amount` of `from` in `to` (spawns as background task)
    ConvertCurrency {
        conversion_id: Uuid,
        amount: Decimal,
        from: Currency,
        to: Currency,
    },

    /// Report the end of a conversion to whoever is waiting on it
    SettleConversion {
        conversion_id: Uuid,
        settlement: Settlement,
    },

    /// Notify connected clients
    NotifyClient { event_type: String, data: Value },
}

impl Effect {
    pub fn notify_error(message: &str) -> Self {
        Effect::NotifyClient {
            event_type: "error".to_string(),
            data: serde_json::json!({ "message": message }),
        }
    }
}
