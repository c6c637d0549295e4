//! HTTP API for the account

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::AccountHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub account: AccountHandle,
}

impl AppState {
    pub fn new(account: AccountHandle) -> Self {
        Self { account }
    }
}
