//! Core account state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, Settlement};
pub use event::Event;
pub use state::{Account, AccountContext, Currency, CurrencyError};
pub use transition::{transition, Outcome, TransitionError};
