//! Test utilities for capture tests and benchmarks
//!
//! Helpers for crafting ArtDmx traffic, starting receivers on loopback, and
//! initialising logging.

#![cfg(any(test, feature = "benchmark"))]

use std::net::{SocketAddr, UdpSocket};

use crate::artnet::{Receiver, encode_art_dmx};
use crate::config::CaptureConfig;
use crate::types::DMX_CHANNELS;

/// Initialise `tracing` output for a test; repeated calls are harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A full 512-channel payload with the given `(channel, value)` levels set.
pub fn payload_with(levels: &[(u16, u8)]) -> Vec<u8> {
    let mut payload = vec![0u8; DMX_CHANNELS];
    for &(channel, value) in levels {
        if let Some(slot) = (channel as usize).checked_sub(1).and_then(|i| payload.get_mut(i)) {
            *slot = value;
        }
    }
    payload
}

/// Send one ArtDmx packet from an ephemeral loopback socket.
pub fn send_art_dmx(
    target: SocketAddr,
    universe: u16,
    sequence: u8,
    channels: &[u8],
) -> std::io::Result<()> {
    send_raw(target, &encode_art_dmx(universe, sequence, channels))
}

/// Send arbitrary bytes to `target` from an ephemeral loopback socket.
pub fn send_raw(target: SocketAddr, bytes: &[u8]) -> std::io::Result<()> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    socket.send_to(bytes, target)?;
    Ok(())
}

/// Start a receiver on a free loopback port.
///
/// Returns `None` when the port is taken, in which case the calling test
/// should skip; any other failure panics.
pub async fn start_loopback_receiver() -> Option<(Receiver, SocketAddr)> {
    let mut receiver = Receiver::new(CaptureConfig::loopback(0));
    match receiver.start().await {
        Ok(addr) => Some((receiver, addr)),
        Err(e) if e.is_bind_conflict() => {
            eprintln!("Skipping: {}", e);
            None
        }
        Err(e) => panic!("Failed to start Art-Net receiver: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_with_places_one_indexed_levels() {
        let payload = payload_with(&[(1, 177), (512, 9), (0, 1), (513, 1)]);
        assert_eq!(payload.len(), DMX_CHANNELS);
        assert_eq!(payload[0], 177);
        assert_eq!(payload[511], 9);
        assert_eq!(payload.iter().filter(|&&v| v != 0).count(), 2);
    }
}
