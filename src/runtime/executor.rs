//! Account runtime executor

use super::{AccountEvent, Command};
use crate::rates::RateService;
use crate::state_machine::{
    transition, Account, AccountContext, Effect, Event, Outcome, Settlement, TransitionError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use uuid::Uuid;

/// Runtime that owns the account and works with any rate service
pub struct AccountRuntime<R>
where
    R: RateService + ?Sized + 'static,
{
    context: AccountContext,
    state: Account,
    rate_service: Arc<R>,
    command_rx: mpsc::Receiver<Command>,
    /// Results of background conversions
    internal_tx: mpsc::Sender<Event>,
    internal_rx: mpsc::Receiver<Event>,
    state_tx: watch::Sender<Account>,
    broadcast_tx: broadcast::Sender<AccountEvent>,
    /// Lookups started by this runtime and not yet settled
    in_flight: HashSet<Uuid>,
    /// Callers waiting for a conversion to settle
    pending_settlements: HashMap<Uuid, oneshot::Sender<Settlement>>,
}

impl<R> AccountRuntime<R>
where
    R: RateService + ?Sized + 'static,
{
    pub fn new(
        context: AccountContext,
        state: Account,
        rate_service: Arc<R>,
        command_rx: mpsc::Receiver<Command>,
        state_tx: watch::Sender<Account>,
        broadcast_tx: broadcast::Sender<AccountEvent>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::channel(32);
        state_tx.send_replace(state.clone());
        Self {
            context,
            state,
            rate_service,
            command_rx,
            internal_tx,
            internal_rx,
            state_tx,
            broadcast_tx,
            in_flight: HashSet::new(),
            pending_settlements: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            account_id = %self.context.account_id,
            base_currency = %self.context.base_currency,
            "Starting account runtime"
        );

        // One event at a time; a transition is never interleaved with another
        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }
                Some(event) = self.internal_rx.recv() => {
                    self.handle_conversion_result(event);
                }
            }
        }

        if !self.in_flight.is_empty() {
            tracing::warn!(
                pending = self.in_flight.len(),
                "Account runtime stopped with conversions in flight"
            );
        }
        tracing::info!(account_id = %self.context.account_id, "Account runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        let Command {
            event,
            reply,
            settlement_tx,
        } = command;

        let result = self.process_event(event);

        if let (Ok(Outcome::ConversionStarted { conversion_id }), Some(tx)) =
            (&result, settlement_tx)
        {
            self.pending_settlements.insert(*conversion_id, tx);
        }

        // The caller may have gone away; the transition stands regardless
        let _ = reply.send(result);
    }

    /// Apply a lookup result, provided it settles a conversion still in flight
    fn handle_conversion_result(&mut self, event: Event) -> Option<Outcome> {
        let Some(conversion_id) = event.settled_conversion() else {
            tracing::error!(event = event.name(), "Unexpected event on conversion channel");
            return None;
        };
        if !self.in_flight.remove(&conversion_id) {
            tracing::warn!(%conversion_id, "Ignoring result for unknown conversion");
            return None;
        }

        match self.process_event(event) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(%conversion_id, error = %e, "Error handling conversion result");
                None
            }
        }
    }

    fn process_event(&mut self, event: Event) -> Result<Outcome, TransitionError> {
        let event_name = event.name();

        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(event = event_name, error = %e, "Transition rejected");
                return Err(e);
            }
        };

        tracing::debug!(event = event_name, outcome = ?result.outcome, "Transition applied");

        if result.new_state != self.state {
            self.state = result.new_state;
            self.state_tx.send_replace(self.state.clone());
            let _ = self.broadcast_tx.send(AccountEvent::StateChange {
                account: self.state.clone(),
            });
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        Ok(result.outcome)
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ConvertCurrency {
                conversion_id,
                amount,
                from,
                to,
            } => {
                self.in_flight.insert(conversion_id);
                let rate_service = self.rate_service.clone();
                let internal_tx = self.internal_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(%conversion_id, %amount, %from, %to, "Converting deposit (background)");

                    let event = match rate_service.convert(amount, &from, &to).await {
                        Ok(converted) => Event::ConversionComplete {
                            conversion_id,
                            converted,
                        },
                        Err(e) => Event::ConversionFailed {
                            conversion_id,
                            message: e.message,
                            kind: e.kind,
                        },
                    };

                    if internal_tx.send(event).await.is_err() {
                        tracing::warn!(%conversion_id, "Runtime gone before conversion settled");
                    }
                });
            }

            Effect::SettleConversion {
                conversion_id,
                settlement,
            } => {
                if let Some(tx) = self.pending_settlements.remove(&conversion_id) {
                    let _ = tx.send(settlement.clone());
                }
                let _ = self.broadcast_tx.send(AccountEvent::ConversionSettled {
                    conversion_id,
                    settlement,
                });
            }

            Effect::NotifyClient { event_type, data } => {
                let _ = self
                    .broadcast_tx
                    .send(AccountEvent::Notice { event_type, data });
            }
        }
    }
}
