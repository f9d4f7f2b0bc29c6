//! Core types for captured DMX data.
//!
//! ## Architecture
//!
//! - [`DmxFrame`] is one decoded ArtDmx packet: a wire universe, a sequence
//!   byte, a capture timestamp, and 512 channel levels
//! - [`ChannelDiff`] is one per-channel discrepancy produced by a comparison
//! - [`ApiUniverse`] bridges the 0-indexed wire universe and the 1-indexed
//!   universe numbering of the lighting server's GraphQL API
//!
//! Channel numbers are 1-indexed everywhere in the public API; only the
//! `channels` array itself is indexed from 0.
//!
//! ## Usage Example
//!
//! ```rust
//! use lightcheck::types::{ApiUniverse, DmxFrame};
//!
//! // The API talks about universe 1, the wire carries universe 0
//! let universe = ApiUniverse::new(1).unwrap();
//! let expected = DmxFrame::expected(universe.wire(), [(1, 255), (2, 128)]);
//!
//! assert_eq!(expected.universe, 0);
//! assert_eq!(expected.channel(2), Some(128));
//! assert_eq!(expected.channel(3), Some(0));
//! ```

mod diff;
mod frame;
mod universe;

pub use diff::ChannelDiff;
pub use frame::{DMX_CHANNELS, DmxFrame};
pub(crate) use frame::channel_index;
pub use universe::ApiUniverse;

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_expected_frame_channel_lookup_matches_levels(
            levels in prop::collection::btree_map(1u16..=512, any::<u8>(), 0..64),
            universe in any::<u16>()
        ) {
            let frame = DmxFrame::expected(universe, levels.iter().map(|(&c, &v)| (c, v)));

            for channel in 1..=512u16 {
                let expected = levels.get(&channel).copied().unwrap_or(0);
                prop_assert_eq!(frame.channel(channel), Some(expected));
            }
        }

        #[test]
        fn prop_api_universe_roundtrips_through_wire(api in 1u16..=u16::MAX) {
            let universe = ApiUniverse::new(api).unwrap();
            prop_assert_eq!(universe.wire() + 1, api);
            prop_assert_eq!(ApiUniverse::from_wire(universe.wire()), Some(universe));
        }

        #[test]
        fn prop_channel_diff_is_symmetric(a in any::<u8>(), b in any::<u8>(), channel in 1u16..=512) {
            let forward = ChannelDiff::new(0, channel, a, b);
            let backward = ChannelDiff::new(0, channel, b, a);
            prop_assert_eq!(forward.diff, backward.diff);
            prop_assert_eq!(forward.diff as i16, (a as i16 - b as i16).abs());
        }
    }
}
