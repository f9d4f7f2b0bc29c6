//! Typed GraphQL client

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::transport::{GraphqlTransport, HttpTransport};
use super::{GraphqlRequest, GraphqlResponse};
use crate::Result;
use crate::config::GraphqlConfig;

/// Sends queries and mutations and decodes their `data` into typed values.
///
/// The transport is a type parameter so tests can substitute a canned one;
/// production code uses the HTTP default.
///
/// ```rust,no_run
/// use lightcheck::{GraphqlClient, GraphqlConfig};
/// use serde_json::{Value, json};
///
/// # #[tokio::main]
/// # async fn main() -> lightcheck::Result<()> {
/// let client = GraphqlClient::new(&GraphqlConfig::default())?;
/// let data: Value = client
///     .query("query Output($universe: Int!) { dmxOutput(universe: $universe) }", json!({ "universe": 1 }))
///     .await?;
/// println!("{}", data);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GraphqlClient<T = HttpTransport> {
    transport: T,
}

impl GraphqlClient<HttpTransport> {
    /// Client for the configured HTTP endpoint.
    pub fn new(config: &GraphqlConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: GraphqlTransport> GraphqlClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a query and decode its `data`.
    pub async fn query<D: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<D> {
        self.execute(&GraphqlRequest::new(query).with_variables(variables)).await
    }

    /// Run a mutation and decode its `data`.
    ///
    /// Identical to [`GraphqlClient::query`] on the wire; kept separate so
    /// call sites read as what they do.
    pub async fn mutate<D: DeserializeOwned>(&self, mutation: &str, variables: Value) -> Result<D> {
        self.execute(&GraphqlRequest::new(mutation).with_variables(variables)).await
    }

    /// Send a prepared request and decode its `data`.
    pub async fn execute<D: DeserializeOwned>(&self, request: &GraphqlRequest) -> Result<D> {
        let label = request.label();
        let response = self.execute_raw(request).await?;
        if !response.errors.is_empty() {
            warn!("{} returned {} GraphQL error(s)", label, response.errors.len());
        }
        response.into_data(&label)
    }

    /// Send a request and return the undecoded response, errors included.
    pub async fn execute_raw(&self, request: &GraphqlRequest) -> Result<GraphqlResponse> {
        debug!("Executing {}", request.label());
        self.transport.execute(request).await
    }
}
