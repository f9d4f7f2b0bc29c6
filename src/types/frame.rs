//! Captured DMX frame type

use std::time::SystemTime;

/// Number of channels in one DMX universe.
pub const DMX_CHANNELS: usize = 512;

/// One decoded snapshot of a DMX universe, captured at a point in time.
///
/// Frames are created by the Art-Net decoder and never mutated afterwards.
/// The capture engine shares them as `Arc<DmxFrame>` between the frame
/// store, snapshots, and subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxFrame {
    /// Capture-local wall clock time, assigned at decode time
    pub timestamp: SystemTime,

    /// Wire universe (0-indexed, unlike the 1-indexed GraphQL API)
    pub universe: u16,

    /// Art-Net sequence byte, for gap and reorder diagnostics only
    pub sequence: u8,

    /// Channel levels; channel `n` lives at index `n - 1`
    pub channels: [u8; DMX_CHANNELS],
}

impl DmxFrame {
    /// Create a new frame
    pub fn new(
        universe: u16,
        sequence: u8,
        channels: [u8; DMX_CHANNELS],
        timestamp: SystemTime,
    ) -> Self {
        Self { timestamp, universe, sequence, channels }
    }

    /// Build an expected frame from `(channel, value)` pairs.
    ///
    /// Channels are 1-indexed. Pairs outside `1..=512` are ignored and all
    /// unlisted channels are zero.
    pub fn expected<I>(universe: u16, levels: I) -> Self
    where
        I: IntoIterator<Item = (u16, u8)>,
    {
        let mut channels = [0u8; DMX_CHANNELS];
        for (channel, value) in levels {
            if let Some(slot) = channel_index(channel).and_then(|i| channels.get_mut(i)) {
                *slot = value;
            }
        }
        Self::new(universe, 0, channels, SystemTime::now())
    }

    /// Level of a 1-indexed channel, or `None` outside `1..=512`.
    pub fn channel(&self, channel: u16) -> Option<u8> {
        channel_index(channel).and_then(|i| self.channels.get(i).copied())
    }
}

/// Translate a 1-indexed DMX channel into an array index.
pub(crate) fn channel_index(channel: u16) -> Option<usize> {
    match channel {
        1..=512 => Some(channel as usize - 1),
        _ => None,
    }
}
