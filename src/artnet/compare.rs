//! Tolerant channel-by-channel frame comparison

use std::sync::Arc;

use crate::types::{ChannelDiff, DmxFrame, channel_index};

/// Diffs frames channel by channel within a fixed tolerance.
///
/// Captured frames may be sampled slightly before or after a fade step
/// completes, so assertions usually allow a small per-channel difference
/// rather than exact byte equality. A tolerance of 0 requires an exact match.
///
/// ```rust
/// use lightcheck::{DmxFrame, FrameComparator};
///
/// let expected = DmxFrame::expected(1, [(10, 50)]);
/// let captured = DmxFrame::expected(1, [(10, 53)]);
///
/// assert!(FrameComparator::new(5).compare(Some(&expected), Some(&captured)).is_empty());
///
/// let diffs = FrameComparator::new(2).compare(Some(&expected), Some(&captured));
/// assert_eq!(diffs.len(), 1);
/// assert_eq!((diffs[0].channel, diffs[0].diff), (10, 3));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameComparator {
    tolerance: u8,
}

impl FrameComparator {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Diff two frames across all 512 channels.
    ///
    /// When either frame is absent there is nothing to compare and the result
    /// is empty; callers decide whether a missing capture is a failure.
    pub fn compare(&self, a: Option<&DmxFrame>, b: Option<&DmxFrame>) -> Vec<ChannelDiff> {
        let (Some(a), Some(b)) = (a, b) else {
            return Vec::new();
        };

        a.channels
            .iter()
            .zip(b.channels.iter())
            .enumerate()
            .filter(|(_, (left, right))| left.abs_diff(**right) > self.tolerance)
            .map(|(index, (&left, &right))| {
                ChannelDiff::new(a.universe, index as u16 + 1, left, right)
            })
            .collect()
    }

    /// Diff only the listed 1-indexed channels of a frame against expected levels.
    ///
    /// Channels outside `1..=512` are skipped. The frame's value is reported
    /// as `left` and the expected level as `right`.
    pub fn compare_channels(&self, frame: Option<&DmxFrame>, expected: &[(u16, u8)]) -> Vec<ChannelDiff> {
        let Some(frame) = frame else {
            return Vec::new();
        };

        expected
            .iter()
            .filter_map(|&(channel, level)| {
                let actual = frame.channels[channel_index(channel)?];
                (actual.abs_diff(level) > self.tolerance)
                    .then(|| ChannelDiff::new(frame.universe, channel, actual, level))
            })
            .collect()
    }

    /// True when both frames are present and match within tolerance.
    pub fn matches(&self, a: Option<&DmxFrame>, b: Option<&DmxFrame>) -> bool {
        a.is_some() && b.is_some() && self.compare(a, b).is_empty()
    }

    /// First frame of `expected.universe` in a capture window that matches
    /// `expected` within tolerance.
    pub fn first_match<'a>(
        &self,
        window: &'a [Arc<DmxFrame>],
        expected: &DmxFrame,
    ) -> Option<&'a Arc<DmxFrame>> {
        window.iter().find(|&frame| {
            let candidate: &DmxFrame = frame;
            candidate.universe == expected.universe && self.matches(Some(candidate), Some(expected))
        })
    }
}
