//! Transport seam between [`GraphqlClient`](super::GraphqlClient) and the wire.

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{GraphqlRequest, GraphqlResponse};
use crate::config::GraphqlConfig;
use crate::{HarnessError, Result};

/// Longest response body quoted in an [`HarnessError::HttpStatus`]
const MAX_ERROR_BODY: usize = 512;

/// Executes one GraphQL request and returns the raw response body.
///
/// Implementations report transport failures only; GraphQL-level errors are
/// returned inside the [`GraphqlResponse`] for the client to interpret.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse>;
}

/// GraphQL over HTTP POST
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &GraphqlConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| HarnessError::Http { endpoint: config.endpoint.clone(), source })?;
        Ok(Self { http, endpoint: config.endpoint.clone() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn http_error(&self, source: reqwest::Error) -> HarnessError {
        HarnessError::Http { endpoint: self.endpoint.clone(), source }
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse> {
        debug!("POST {} ({})", self.endpoint, request.label());

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.http_error(e))?;
        trace!("HTTP {} body: {}", status, body);

        let parsed = serde_json::from_str::<GraphqlResponse>(&body);

        if !status.is_success() {
            // Servers commonly answer validation failures with 400 and an errors list
            if let Ok(parsed) = parsed {
                if !parsed.errors.is_empty() {
                    return Ok(parsed);
                }
            }
            return Err(HarnessError::HttpStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        parsed.map_err(|e| HarnessError::parse(format!("response from {}", self.endpoint), e.to_string()))
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
