//! Art-Net capture and GraphQL test harness for lighting-control servers.
//!
//! Lightcheck verifies what a lighting server actually puts on the wire. Tests
//! change lighting state through the server's GraphQL API, capture the Art-Net
//! DMX frames it broadcasts, and compare them against the expected levels with
//! a per-channel tolerance.
//!
//! # Features
//!
//! - **Capture**: background UDP receive loop decoding ArtDmx packets into an
//!   arrival-ordered frame store
//! - **Comparison**: tolerant, channel-level diffs between captured and expected frames
//! - **GraphQL**: typed queries and mutations over HTTP, subscriptions over
//!   `graphql-transport-ws`
//! - **Configuration**: explicit config structs, with YAML and environment
//!   loading kept at the edge
//!
//! # Universe numbering
//!
//! Art-Net frames carry 0-indexed universes; the GraphQL API numbers them
//! from 1. Capture APIs take wire universes as plain `u16`, GraphQL APIs take
//! [`ApiUniverse`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use lightcheck::{ApiUniverse, Lightcheck};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> lightcheck::Result<()> {
//!     let harness = Lightcheck::from_env()?;
//!     let mut receiver = harness.receiver();
//!     receiver.start().await?;
//!
//!     let universe = ApiUniverse::new(1).expect("non-zero universe");
//!     harness.lighting()?.set_channel_value(universe, 1, 177).await?;
//!
//!     let frame = receiver
//!         .wait_for_frame(universe.wire(), Duration::from_secs(1), |f| f.channel(1) == Some(177))
//!         .await?;
//!     println!("captured sequence {}", frame.sequence);
//!
//!     receiver.stop().await;
//!     Ok(())
//! }
//! ```

pub mod artnet;
pub mod config;
mod error;
pub mod graphql;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Core exports
pub use error::*;
pub use types::*;

pub use artnet::{CaptureStats, FrameComparator, FrameStore, Receiver, ReceiverState};
pub use config::{CaptureConfig, CompareConfig, GraphqlConfig, HarnessConfig};
pub use graphql::{
    GraphqlClient, GraphqlError, GraphqlRequest, GraphqlResponse, GraphqlTransport, HttpTransport,
    LightingApi, SubscriptionClient,
};

/// Unified entry point for a harness run.
///
/// Holds one [`HarnessConfig`] and hands out the components a test needs,
/// each configured from it.
///
/// ```rust
/// use lightcheck::{HarnessConfig, Lightcheck};
///
/// let harness = Lightcheck::new(HarnessConfig::default());
/// let comparator = harness.comparator();
/// assert_eq!(comparator.tolerance(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Lightcheck {
    config: HarnessConfig,
}

impl Lightcheck {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Configure from `GRAPHQL_ENDPOINT`, `ARTNET_PORT` and friends.
    ///
    /// See [`config`] for the full list of variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(HarnessConfig::from_env()?))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// A stopped receiver bound to the configured capture address once started.
    pub fn receiver(&self) -> Receiver {
        Receiver::new(self.config.capture.clone())
    }

    /// Comparator using the configured tolerance.
    pub fn comparator(&self) -> FrameComparator {
        FrameComparator::new(self.config.compare.tolerance)
    }

    pub fn graphql(&self) -> Result<GraphqlClient> {
        GraphqlClient::new(&self.config.graphql)
    }

    pub fn lighting(&self) -> Result<LightingApi> {
        LightingApi::new(&self.config.graphql)
    }

    /// Open an acknowledged subscription connection.
    pub async fn subscriptions(&self) -> Result<SubscriptionClient> {
        SubscriptionClient::connect(&self.config.graphql).await
    }

    /// Sleep for the configured settle time so the server's fade engine can
    /// emit the state a mutation just set.
    pub async fn settle(&self) {
        tokio::time::sleep(self.config.compare.settle).await;
    }
}
