//! GraphQL access to the lighting server under test.
//!
//! Tests drive the server through this module and then check what it
//! transmitted with the [`crate::artnet`] capture engine:
//!
//! 1. issue a mutation that should change DMX output
//! 2. wait a few fade-engine ticks (see [`crate::config::CompareConfig::settle`])
//! 3. compare captured frames against the expected levels
//!
//! The GraphQL API numbers universes from 1; see [`crate::ApiUniverse`].

pub mod client;
pub mod lighting;
pub mod subscription;
pub mod transport;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{HarnessError, Result};

pub use client::GraphqlClient;
pub use lighting::LightingApi;
pub use subscription::SubscriptionClient;
pub use transport::{GraphqlTransport, HttpTransport};

/// A GraphQL operation as sent over HTTP or inside a subscription message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub variables: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), variables: Value::Null, operation_name: None }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Name used in logs and errors: the operation name, or the first line of the query.
    pub fn label(&self) -> String {
        match &self.operation_name {
            Some(name) => name.clone(),
            None => self.query.trim().lines().next().unwrap_or_default().trim_end_matches('{').trim().to_string(),
        }
    }
}

/// One entry of a response's `errors` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), path: None, extensions: None }
    }
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => {
                let path: Vec<String> = path
                    .iter()
                    .map(|segment| match segment {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{} (at {})", self.message, path.join("."))
            }
            _ => f.write_str(&self.message),
        }
    }
}

/// A GraphQL response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    /// Decode `data` into a typed value.
    ///
    /// Any reported error fails the whole response, even alongside partial data.
    pub fn into_data<D: DeserializeOwned>(self, operation: &str) -> Result<D> {
        if !self.errors.is_empty() {
            return Err(HarnessError::Graphql { errors: self.errors });
        }
        let data = self.data.ok_or_else(|| HarnessError::MissingData { operation: operation.to_string() })?;
        serde_json::from_value(data).map_err(|e| HarnessError::parse(operation, e.to_string()))
    }
}
