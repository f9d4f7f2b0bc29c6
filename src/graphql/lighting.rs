//! Bindings for the lighting server operations the capture tests rely on

use serde::Deserialize;
use serde_json::json;
use std::time::SystemTime;
use tracing::debug;

use super::client::GraphqlClient;
use super::transport::{GraphqlTransport, HttpTransport};
use super::GraphqlRequest;
use crate::config::GraphqlConfig;
use crate::types::{ApiUniverse, DMX_CHANNELS, DmxFrame};
use crate::{HarnessError, Result};

pub const SET_CHANNEL_VALUE: &str = "mutation SetChannelValue($universe: Int!, $channel: Int!, $value: Int!) {
  setChannelValue(universe: $universe, channel: $channel, value: $value)
}";

pub const DMX_OUTPUT: &str = "query DmxOutput($universe: Int!) {
  dmxOutput(universe: $universe)
}";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetChannelValueData {
    set_channel_value: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DmxOutputData {
    dmx_output: Vec<u8>,
}

/// Typed access to DMX output on the server.
///
/// Everything here takes [`ApiUniverse`] because the server numbers
/// universes from 1. [`LightingApi::dmx_output_frame`] converts back to the
/// wire universe so the result compares directly with captured frames.
#[derive(Debug, Clone)]
pub struct LightingApi<T = HttpTransport> {
    client: GraphqlClient<T>,
}

impl LightingApi<HttpTransport> {
    pub fn new(config: &GraphqlConfig) -> Result<Self> {
        Ok(Self::with_client(GraphqlClient::new(config)?))
    }
}

impl<T: GraphqlTransport> LightingApi<T> {
    pub fn with_client(client: GraphqlClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphqlClient<T> {
        &self.client
    }

    /// Set one 1-indexed channel. Returns the server's acknowledgement.
    pub async fn set_channel_value(&self, universe: ApiUniverse, channel: u16, value: u8) -> Result<bool> {
        debug!("Setting {} channel {} to {}", universe, channel, value);
        let request = GraphqlRequest::new(SET_CHANNEL_VALUE)
            .with_variables(json!({ "universe": universe.get(), "channel": channel, "value": value }))
            .with_operation_name("SetChannelValue");
        let data: SetChannelValueData = self.client.execute(&request).await?;
        Ok(data.set_channel_value)
    }

    /// Levels the server currently outputs for `universe`, channel 1 first.
    pub async fn dmx_output(&self, universe: ApiUniverse) -> Result<Vec<u8>> {
        let request = GraphqlRequest::new(DMX_OUTPUT)
            .with_variables(json!({ "universe": universe.get() }))
            .with_operation_name("DmxOutput");
        let data: DmxOutputData = self.client.execute(&request).await?;
        Ok(data.dmx_output)
    }

    /// Server output as an expected frame on the matching wire universe.
    ///
    /// Short outputs are zero-padded; more than 512 levels is a parse error.
    pub async fn dmx_output_frame(&self, universe: ApiUniverse) -> Result<DmxFrame> {
        let levels = self.dmx_output(universe).await?;
        if levels.len() > DMX_CHANNELS {
            return Err(HarnessError::parse(
                "DmxOutput",
                format!("{} levels reported for {}, expected at most {}", levels.len(), universe, DMX_CHANNELS),
            ));
        }

        let mut channels = [0u8; DMX_CHANNELS];
        channels[..levels.len()].copy_from_slice(&levels);
        Ok(DmxFrame::new(universe.wire(), 0, channels, SystemTime::now()))
    }
}
