//! Runtime owning one account
//!
//! A single task holds the [`Account`] and applies every transition in
//! arrival order. Currency lookups run as separate tasks whose results come
//! back as events, so other transitions keep flowing while one is in flight.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::AccountRuntime;

use crate::rates::{RateErrorKind, RateService};
use crate::state_machine::{
    Account, AccountContext, Currency, CurrencyError, Event, Outcome, Settlement, TransitionError,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use uuid::Uuid;

/// Events sent to subscribers (SSE clients)
#[derive(Debug, Clone)]
pub enum AccountEvent {
    StateChange {
        account: Account,
    },
    ConversionSettled {
        conversion_id: Uuid,
        settlement: Settlement,
    },
    Notice {
        event_type: String,
        data: Value,
    },
}

/// Request sent from a handle to the runtime
#[derive(Debug)]
pub struct Command {
    pub event: Event,
    pub reply: oneshot::Sender<Result<Outcome, TransitionError>>,
    /// Receives the settlement if the event starts a conversion
    pub settlement_tx: Option<oneshot::Sender<Settlement>>,
}

/// Errors surfaced to callers of [`AccountHandle`]
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
    #[error("Currency conversion failed ({kind:?}): {message}")]
    ConversionFailed {
        message: String,
        kind: RateErrorKind,
    },
    #[error("{event} is raised by the account runtime and cannot be submitted")]
    InternalEvent { event: &'static str },
    #[error("Account runtime is not running")]
    Closed,
}

/// Handle to interact with a running account
///
/// Cheap to clone; the runtime stops once every handle is dropped.
#[derive(Clone)]
pub struct AccountHandle {
    context: Arc<AccountContext>,
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<Account>,
    broadcast_tx: broadcast::Sender<AccountEvent>,
}

/// Start a runtime for a fresh account and return its handle
pub fn spawn<R>(context: AccountContext, rate_service: Arc<R>) -> AccountHandle
where
    R: RateService + ?Sized + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (state_tx, state_rx) = watch::channel(Account::default());
    let (broadcast_tx, _) = broadcast::channel(128);

    let handle = AccountHandle {
        context: Arc::new(context.clone()),
        command_tx,
        state_rx,
        broadcast_tx: broadcast_tx.clone(),
    };

    let account_id = context.account_id.clone();
    let runtime = AccountRuntime::new(
        context,
        Account::default(),
        rate_service,
        command_rx,
        state_tx,
        broadcast_tx,
    );
    tokio::spawn(async move {
        runtime.run().await;
        tracing::info!(account_id = %account_id, "Account runtime finished");
    });

    handle
}

impl AccountHandle {
    pub fn context(&self) -> &AccountContext {
        &self.context
    }

    /// Current account state
    pub fn snapshot(&self) -> Account {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to account updates
    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Apply an event and return what it did, without waiting for any
    /// conversion it starts
    ///
    /// Conversion results are refused; only the runtime settles conversions.
    pub async fn submit(&self, event: Event) -> Result<Outcome, AccountError> {
        self.send(event, None).await
    }

    /// Deposit `amount` of `currency` and wait until it is credited
    ///
    /// Returns the credited amount in the base currency.
    pub async fn deposit(&self, amount: Decimal, currency: &str) -> Result<Decimal, AccountError> {
        let currency: Currency = currency.parse()?;
        let (settlement_tx, settlement_rx) = oneshot::channel();

        let outcome = self
            .send(Event::deposit(amount, currency), Some(settlement_tx))
            .await?;
        let Outcome::ConversionStarted { .. } = outcome else {
            return Ok(amount);
        };

        match settlement_rx.await.map_err(|_| AccountError::Closed)? {
            Settlement::Credited { amount } => Ok(amount),
            Settlement::Failed { message, kind } => {
                Err(AccountError::ConversionFailed { message, kind })
            }
        }
    }

    pub async fn withdraw(&self, amount: Decimal) -> Result<Outcome, AccountError> {
        self.submit(Event::Withdraw { amount }).await
    }

    pub async fn request_loan(
        &self,
        amount: Decimal,
        purpose: impl Into<String>,
    ) -> Result<Outcome, AccountError> {
        self.submit(Event::RequestLoan {
            amount,
            purpose: purpose.into(),
        })
        .await
    }

    pub async fn pay_loan(&self) -> Result<Outcome, AccountError> {
        self.submit(Event::PayLoan).await
    }

    async fn send(
        &self,
        event: Event,
        settlement_tx: Option<oneshot::Sender<Settlement>>,
    ) -> Result<Outcome, AccountError> {
        if event.settled_conversion().is_some() {
            return Err(AccountError::InternalEvent {
                event: event.name(),
            });
        }

        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command {
                event,
                reply,
                settlement_tx,
            })
            .await
            .map_err(|_| AccountError::Closed)?;

        Ok(reply_rx.await.map_err(|_| AccountError::Closed)??)
    }
}
