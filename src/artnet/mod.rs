//! Art-Net DMX capture and comparison.
//!
//! - [`packet`]: decoding (and encoding) of ArtDmx UDP payloads
//! - [`store`]: arrival-ordered, thread-safe frame storage
//! - [`receiver`]: the capture engine that owns the socket and receive task
//! - [`compare`]: tolerant frame comparison
//!
//! Universes are the 0-indexed wire universes throughout this module. Use
//! [`crate::ApiUniverse`] when bridging to the GraphQL API.

pub mod compare;
pub mod packet;
pub mod receiver;
pub mod store;


pub use compare::FrameComparator;
pub use packet::{ARTNET_PORT, decode, decode_at, encode_art_dmx};
pub use receiver::{CaptureStats, Receiver, ReceiverState};
pub use store::FrameStore;
