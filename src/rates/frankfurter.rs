//! Frankfurter exchange-rate provider
//!
//! `GET {base}/latest?amount=..&from=..&to=..` answers with the converted
//! amount under `rates.{TO}`.

use super::{RateError, RateService};
use crate::state_machine::Currency;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

/// Frankfurter service implementation
pub struct FrankfurterService {
    client: Client,
    endpoint: String,
}

impl FrankfurterService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/latest", base_url.trim_end_matches('/')),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, Decimal>,
}

#[async_trait]
impl RateService for FrankfurterService {
    async fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("amount", amount.to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RateError::http(status.as_u16(), &body));
        }

        let body: LatestResponse = response.json().await?;
        converted_amount(&body, to)
    }

    fn name(&self) -> &'static str {
        "frankfurter"
    }
}

fn converted_amount(body: &LatestResponse, to: &Currency) -> Result<Decimal, RateError> {
    let converted = body.rates.get(to.code()).copied().ok_or_else(|| {
        RateError::invalid_response(format!("Response has no rate for {to}"))
    })?;

    if converted.is_sign_negative() {
        return Err(RateError::invalid_response(format!(
            "Negative converted amount {converted}"
        )));
    }
    Ok(converted)
}
