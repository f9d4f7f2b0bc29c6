//! Per-channel comparison results

use std::fmt;

/// A single discrepancy between two frames at one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDiff {
    /// Wire universe of the left-hand frame
    pub universe: u16,
    /// 1-indexed channel number
    pub channel: u16,
    /// Value in the left-hand frame
    pub left: u8,
    /// Value in the right-hand frame
    pub right: u8,
    /// Absolute difference between the two values
    pub diff: u8,
}

impl ChannelDiff {
    pub fn new(universe: u16, channel: u16, left: u8, right: u8) -> Self {
        Self { universe, channel, left, right, diff: left.abs_diff(right) }
    }
}

impl fmt::Display for ChannelDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "universe {} channel {}: {} vs {} (diff {})",
            self.universe, self.channel, self.left, self.right, self.diff
        )
    }
}
