//! Teller - single-account state authority
//!
//! A Rust backend implementing an account state machine with deposits
//! (optionally currency-converted), withdrawals and loans.

mod api;
mod rates;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use rates::RatesConfig;
use state_machine::{AccountContext, Currency};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teller=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("TELLER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let account_id = std::env::var("TELLER_ACCOUNT_ID").unwrap_or_else(|_| "primary".to_string());

    let base_currency: Currency = match std::env::var("TELLER_BASE_CURRENCY") {
        Ok(code) => code.parse()?,
        Err(_) => Currency::usd(),
    };

    let rates_config = RatesConfig::from_env();
    tracing::info!(
        url = %rates_config.base_url,
        timeout_secs = rates_config.timeout.as_secs(),
        "Rate service configured"
    );
    let rate_service = rates_config.build()?;

    // Start the account runtime
    let context = AccountContext::new(account_id, base_currency);
    tracing::info!(
        account_id = %context.account_id,
        base_currency = %context.base_currency,
        "Opening account"
    );
    let account = runtime::spawn(context, rate_service);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(account))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Teller server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
