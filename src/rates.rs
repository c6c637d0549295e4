//! Exchange-rate provider abstraction
//!
//! Converts an amount from one currency into another through an external
//! service.

mod error;
mod frankfurter;

pub use error::{RateError, RateErrorKind};
pub use frankfurter::FrankfurterService;

use crate::state_machine::Currency;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Common interface for rate providers
#[async_trait]
pub trait RateService: Send + Sync {
    /// Convert `amount` of `from` into `to`
    async fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateError>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Configuration for the rate provider
#[derive(Debug, Clone)]
pub struct RatesConfig {
    pub base_url: String,
    /// Per-request timeout; the only bound on an in-flight conversion
    pub timeout: Duration,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: frankfurter::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RatesConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparseable values fall back to the defaults
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("TELLER_RATES_URL").unwrap_or(defaults.base_url),
            timeout: lookup("TELLER_RATES_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }

    /// Build the production service, wrapped for logging
    pub fn build(&self) -> Result<Arc<dyn RateService>, RateError> {
        let service = FrankfurterService::new(&self.base_url, self.timeout)?;
        Ok(Arc::new(LoggingService::new(Arc::new(service))))
    }
}

/// Logging wrapper for rate services
pub struct LoggingService {
    inner: Arc<dyn RateService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn RateService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RateService for LoggingService {
    async fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateError> {
        let start = std::time::Instant::now();
        let result = self.inner.convert(amount, from, to).await;
        let duration = start.elapsed();

        match &result {
            Ok(converted) => {
                tracing::info!(
                    provider = self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    %amount,
                    %from,
                    %to,
                    %converted,
                    "Rate lookup completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    provider = self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    %from,
                    %to,
                    error = %e.message,
                    kind = ?e.kind,
                    "Rate lookup failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
