use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::{Reply, StockLookup};
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

/// HTTP client for the product service:
/// `GET {base_url}/estoque/{product_id}/{quantity}` answering `true`,
/// `false`, or nothing. A 404 for an unknown product is also "nothing".
pub struct ProductServiceClient {
    http: reqwest::Client,
    base_url: String,
    circuit_breaker: CircuitBreaker,
}

impl ProductServiceClient {
    pub fn new(base_url: &str, timeout: Duration, breaker: CircuitBreakerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building product service HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            circuit_breaker: CircuitBreaker::new("product_service", breaker),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn fetch(&self, product_id: i64, quantity: i64) -> Result<Reply<Option<bool>>> {
        let url = format!("{}/estoque/{}/{}", self.base_url, product_id, quantity);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(Reply::Answer(None)),
            status if status.is_client_error() => return Ok(Reply::Refused(status)),
            status if !status.is_success() => bail!("product service returned {status}"),
            _ => {}
        }

        let body = response.bytes().await.context("reading stock response")?;
        if body.is_empty() {
            return Ok(Reply::Answer(None));
        }

        serde_json::from_slice::<Option<bool>>(&body)
            .map(Reply::Answer)
            .context("decoding stock answer")
    }
}

#[async_trait]
impl StockLookup for ProductServiceClient {
    #[instrument(skip(self))]
    async fn has_stock(&self, product_id: i64, quantity: i64) -> Result<Option<bool>> {
        match self.circuit_breaker.call(self.fetch(product_id, quantity)).await {
            Ok(Reply::Answer(answer)) => {
                debug!(?answer, "Stock lookup completed");
                Ok(answer)
            }
            Ok(Reply::Refused(status)) => bail!("product service refused the request: {status}"),
            Err(CircuitBreakerError::CircuitOpen) => bail!("product service circuit breaker is open"),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }
}
