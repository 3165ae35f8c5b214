use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::{CustomerLookup, Reply};
use crate::domain::customer::CustomerProfile;
use crate::domain::order::TaxpayerId;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

/// HTTP client for the customer directory: `GET {base_url}/{taxpayer_id}`.
pub struct CustomerServiceClient {
    http: reqwest::Client,
    base_url: String,
    circuit_breaker: CircuitBreaker,
}

impl CustomerServiceClient {
    pub fn new(base_url: &str, timeout: Duration, breaker: CircuitBreakerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building customer service HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            circuit_breaker: CircuitBreaker::new("customer_service", breaker),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn fetch(&self, taxpayer_id: &TaxpayerId) -> Result<Reply<Option<CustomerProfile>>> {
        let url = format!("{}/{}", self.base_url, taxpayer_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => return Ok(Reply::Answer(None)),
            status if status.is_client_error() => return Ok(Reply::Refused(status)),
            status if !status.is_success() => bail!("customer service returned {status}"),
            _ => {}
        }

        let body = response.bytes().await.context("reading customer response")?;
        if body.is_empty() {
            return Ok(Reply::Answer(None));
        }

        serde_json::from_slice::<Option<CustomerProfile>>(&body)
            .map(Reply::Answer)
            .context("decoding customer profile")
    }
}

#[async_trait]
impl CustomerLookup for CustomerServiceClient {
    #[instrument(skip(self), fields(taxpayer_id = %taxpayer_id))]
    async fn find(&self, taxpayer_id: &TaxpayerId) -> Result<Option<CustomerProfile>> {
        match self.circuit_breaker.call(self.fetch(taxpayer_id)).await {
            Ok(Reply::Answer(profile)) => {
                debug!(found = profile.is_some(), "Customer lookup completed");
                Ok(profile)
            }
            Ok(Reply::Refused(status)) => bail!("customer service refused the request: {status}"),
            Err(CircuitBreakerError::CircuitOpen) => bail!("customer service circuit breaker is open"),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CustomerServiceClient {
        CustomerServiceClient::new(
            &format!("{}/cliente/", server.uri()),
            Duration::from_millis(200),
            CircuitBreakerConfig::default(),
        )
        .unwrap()
    }

    fn cpf() -> TaxpayerId {
        TaxpayerId::parse("71622958004").unwrap()
    }

    #[tokio::test]
    async fn test_found_customer_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cliente/71622958004"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cpf": "71622958004",
                "nome": "Maria Silva",
                "enderecoLogradouro": "Rua das Flores",
                "enderecoNumero": 42,
                "enderecoSiglaEstado": "SP"
            })))
            .mount(&server)
            .await;

        let profile = client(&server).find(&cpf()).await.unwrap().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Maria Silva"));
        assert_eq!(profile.address.number, Some(42));
    }

    #[tokio::test]
    async fn test_not_found_and_empty_body_mean_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cliente/71622958004"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cliente/716.229.580-04"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client.find(&cpf()).await.unwrap().is_none());

        let punctuated = TaxpayerId::parse("716.229.580-04").unwrap();
        assert!(client.find(&punctuated).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(client(&server).find(&cpf()).await.is_err());
    }

    #[tokio::test]
    async fn test_refused_request_is_an_error_but_keeps_the_circuit_closed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = client(&server);
        for _ in 0..6 {
            assert!(client.find(&cpf()).await.is_err());
        }
        assert_eq!(client.circuit_breaker().state().await, crate::utils::CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "cpf": "71622958004" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        assert!(client(&server).find(&cpf()).await.is_err());
    }

    #[tokio::test]
    async fn test_open_circuit_skips_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = CustomerServiceClient::new(
            &format!("{}/cliente", server.uri()),
            Duration::from_millis(200),
            CircuitBreakerConfig {
                failure_threshold: 2,
                open_timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
        )
        .unwrap();

        for _ in 0..4 {
            assert!(client.find(&cpf()).await.is_err());
        }
        assert_eq!(client.circuit_breaker().state().await, crate::utils::CircuitState::Open);
    }
}
