//! Mock implementations for testing
//!
//! These mocks enable runtime testing without real I/O.

use super::{spawn, AccountEvent, AccountHandle};
use crate::rates::{RateError, RateService};
use crate::state_machine::{Account, AccountContext, Currency};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// Mock Rate Service
// ============================================================================

/// Mock rate service that returns queued results
pub struct MockRateService {
    responses: Mutex<VecDeque<Result<Decimal, RateError>>>,
    /// Record of all lookups made
    pub requests: Mutex<Vec<(Decimal, Currency, Currency)>>,
}

impl MockRateService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a converted amount
    pub fn queue_converted(&self, converted: Decimal) {
        self.responses.lock().unwrap().push_back(Ok(converted));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: RateError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<(Decimal, Currency, Currency)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockRateService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateService for MockRateService {
    async fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateError> {
        self.requests
            .lock()
            .unwrap()
            .push((amount, from.clone(), to.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RateError::network("No mock response queued")))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ============================================================================
// Gated Mock Rate Service (for in-flight testing)
// ============================================================================

/// Mock that holds every lookup until the test releases it
pub struct GatedRateService {
    inner: MockRateService,
    gate: Semaphore,
    /// Notified when a lookup starts
    pub request_started: Notify,
}

impl GatedRateService {
    pub fn new() -> Self {
        Self {
            inner: MockRateService::new(),
            gate: Semaphore::new(0),
            request_started: Notify::new(),
        }
    }

    pub fn queue_converted(&self, converted: Decimal) {
        self.inner.queue_converted(converted);
    }

    /// Let one pending lookup finish
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

impl Default for GatedRateService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateService for GatedRateService {
    async fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateError> {
        self.request_started.notify_one();
        self.gate
            .acquire()
            .await
            .map_err(|_| RateError::network("Gate closed"))?
            .forget();
        self.inner.convert(amount, from, to).await
    }

    fn name(&self) -> &'static str {
        "gated-mock"
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn test_context() -> AccountContext {
    AccountContext::new("test-account", Currency::usd())
}

pub fn spawn_test_account<R: RateService + 'static>(service: Arc<R>) -> AccountHandle {
    spawn(test_context(), service)
}

/// Wait until the account satisfies `pred`
pub async fn wait_for_state(
    handle: &AccountHandle,
    pred: impl Fn(&Account) -> bool,
    timeout: Duration,
) -> bool {
    let mut rx = handle.state_rx.clone();
    tokio::time::timeout(timeout, rx.wait_for(|a| pred(a)))
        .await
        .is_ok_and(|r| r.is_ok())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateErrorKind;
    use crate::runtime::AccountError;
    use crate::state_machine::transition::Rejection;
    use crate::state_machine::{Event, Outcome, Settlement, TransitionError};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mock_rate_service() {
        let mock = MockRateService::new();
        mock.queue_converted(dec!(92));

        let eur: Currency = "EUR".parse().unwrap();
        let converted = mock.convert(dec!(100), &eur, &Currency::usd()).await.unwrap();
        assert_eq!(converted, dec!(92));

        // Second call should fail (no more responses)
        assert!(mock.convert(dec!(1), &eur, &Currency::usd()).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_base_currency_deposit() {
        let account = spawn_test_account(Arc::new(MockRateService::new()));

        let credited = account.deposit(dec!(100), "USD").await.unwrap();
        assert_eq!(credited, dec!(100));

        let state = account.snapshot();
        assert_eq!(state.balance, dec!(100));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_foreign_deposit_waits_for_conversion() {
        let rates = Arc::new(MockRateService::new());
        rates.queue_converted(dec!(92));
        let account = spawn_test_account(rates.clone());

        let credited = account.deposit(dec!(100), "eur").await.unwrap();
        assert_eq!(credited, dec!(92));
        assert_eq!(account.snapshot().balance, dec!(92));
        assert!(!account.snapshot().is_loading);

        let requests = rates.recorded_requests();
        assert_eq!(
            requests,
            vec![(dec!(100), "EUR".parse::<Currency>().unwrap(), Currency::usd())]
        );
    }

    #[tokio::test]
    async fn test_foreign_deposit_is_two_phase() {
        let rates = Arc::new(GatedRateService::new());
        rates.queue_converted(dec!(92));
        let account = spawn_test_account(rates.clone());
        let mut events = account.subscribe();

        let outcome = account
            .submit(Event::deposit(dec!(100), "EUR".parse().unwrap()))
            .await
            .unwrap();
        let Outcome::ConversionStarted { conversion_id } = outcome.clone() else {
            panic!("Expected conversion to start, got {outcome:?}");
        };

        // Phase one is visible before the lookup returns
        rates.request_started.notified().await;
        let state = account.snapshot();
        assert!(state.is_loading);
        assert_eq!(state.balance, dec!(0));

        rates.release();
        assert!(wait_for_state(&account, |a| !a.is_loading, TIMEOUT).await);
        assert_eq!(account.snapshot().balance, dec!(92));

        // Subscribers see the settlement
        let settled = tokio::time::timeout(TIMEOUT, async {
            loop {
                match events.recv().await {
                    Ok(AccountEvent::ConversionSettled {
                        conversion_id: id,
                        settlement,
                    }) if id == conversion_id => return settlement,
                    Ok(_) => continue,
                    Err(e) => panic!("broadcast closed: {e}"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(settled, Settlement::Credited { amount: dec!(92) });
    }

    #[tokio::test]
    async fn test_conversion_failure_clears_loading() {
        let rates = Arc::new(MockRateService::new());
        rates.queue_error(RateError::http(503, "maintenance"));
        let account = spawn_test_account(rates);
        account.deposit(dec!(25), "USD").await.unwrap();

        let err = account.deposit(dec!(100), "GBP").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::ConversionFailed {
                kind: RateErrorKind::Http,
                ..
            }
        ));

        let state = account.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.balance, dec!(25));
    }

    #[tokio::test]
    async fn test_transitions_interleave_with_conversion() {
        let rates = Arc::new(GatedRateService::new());
        rates.queue_converted(dec!(92));
        let account = spawn_test_account(rates.clone());

        account
            .submit(Event::deposit(dec!(100), "EUR".parse().unwrap()))
            .await
            .unwrap();
        rates.request_started.notified().await;

        // Applied immediately while the conversion is still pending
        account.withdraw(dec!(50)).await.unwrap();
        let state = account.snapshot();
        assert_eq!(state.balance, dec!(-50));
        assert!(state.is_loading);

        rates.release();
        assert!(wait_for_state(&account, |a| !a.is_loading, TIMEOUT).await);
        assert_eq!(account.snapshot().balance, dec!(42));
    }

    #[tokio::test]
    async fn test_concurrent_conversions_share_loading_flag() {
        let rates = Arc::new(GatedRateService::new());
        rates.queue_converted(dec!(92));
        rates.queue_converted(dec!(80));
        let account = spawn_test_account(rates.clone());

        for amount in [dec!(100), dec!(90)] {
            account
                .submit(Event::deposit(amount, "EUR".parse().unwrap()))
                .await
                .unwrap();
            rates.request_started.notified().await;
        }
        assert!(account.snapshot().is_loading);

        // First to settle clears the flag while the other is still pending
        rates.release();
        assert!(wait_for_state(&account, |a| a.balance == dec!(92), TIMEOUT).await);
        assert!(!account.snapshot().is_loading);

        rates.release();
        assert!(wait_for_state(&account, |a| a.balance == dec!(172), TIMEOUT).await);
        assert!(!account.snapshot().is_loading);
    }

    #[tokio::test]
    async fn test_conversion_results_cannot_be_submitted() {
        let rates = Arc::new(GatedRateService::new());
        rates.queue_converted(dec!(92));
        let account = spawn_test_account(rates.clone());

        let err = account
            .submit(Event::ConversionComplete {
                conversion_id: Uuid::new_v4(),
                converted: dec!(-500),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccountError::InternalEvent {
                event: "conversion_complete"
            }
        ));
        assert_eq!(account.snapshot(), Account::default());

        let outcome = account
            .submit(Event::deposit(dec!(100), "EUR".parse().unwrap()))
            .await
            .unwrap();
        let Outcome::ConversionStarted { conversion_id } = outcome.clone() else {
            panic!("Expected conversion to start, got {outcome:?}");
        };
        rates.request_started.notified().await;

        // Even with the real id, a failure cannot be injected from outside
        let err = account
            .submit(Event::ConversionFailed {
                conversion_id,
                message: "forged".to_string(),
                kind: RateErrorKind::Network,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InternalEvent { .. }));
        assert!(account.snapshot().is_loading);

        rates.release();
        assert!(wait_for_state(&account, |a| !a.is_loading, TIMEOUT).await);
        assert_eq!(account.snapshot().balance, dec!(92));
    }

    #[tokio::test]
    async fn test_loan_lifecycle() {
        let account = spawn_test_account(Arc::new(MockRateService::new()));

        let outcome = account.request_loan(dec!(1000), "buy car").await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let state = account.snapshot();
        assert_eq!(state.balance, dec!(1000));
        assert_eq!(state.loan, dec!(1000));
        assert_eq!(state.loan_purpose, "buy car");

        let outcome = account.request_loan(dec!(50), "another").await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Rejected {
                reason: Rejection::LoanAlreadyActive
            }
        );
        assert_eq!(account.snapshot(), state);

        assert_eq!(account.pay_loan().await.unwrap(), Outcome::Applied);
        assert_eq!(account.snapshot(), Account::default());
        assert_eq!(account.pay_loan().await.unwrap(), Outcome::Unchanged);
    }

    #[tokio::test]
    async fn test_invalid_input_is_reported() {
        let account = spawn_test_account(Arc::new(MockRateService::new()));

        let err = account.deposit(dec!(-1), "USD").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::Transition(TransitionError::NonPositiveAmount { .. })
        ));

        let err = account.deposit(dec!(10), "dollars").await.unwrap_err();
        assert!(matches!(err, AccountError::Currency(_)));

        let err = account.request_loan(dec!(10), "").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::Transition(TransitionError::EmptyLoanPurpose)
        ));

        assert_eq!(account.snapshot(), Account::default());
    }

    #[tokio::test]
    async fn test_state_changes_are_broadcast() {
        let account = spawn_test_account(Arc::new(MockRateService::new()));
        let mut events = account.subscribe();

        account.withdraw(dec!(5)).await.unwrap();
        // No-op produces no state change
        account.pay_loan().await.unwrap();
        account.deposit(dec!(5), "USD").await.unwrap();

        let mut balances = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AccountEvent::StateChange { account } = event {
                balances.push(account.balance);
            }
        }
        assert_eq!(balances, vec![dec!(-5), dec!(0)]);
    }
}
