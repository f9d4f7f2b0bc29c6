//! ArtDmx packet decoding and encoding
//!
//! ## ArtDmx Packet Layout
//!
//! | Offset | Size | Field | Byte order |
//! |---|---|---|---|
//! | 0 | 8 | `"Art-Net\0"` signature | - |
//! | 8 | 2 | OpCode (`0x5000` for ArtDmx) | little-endian |
//! | 10 | 2 | Protocol version (ignored) | big-endian |
//! | 12 | 1 | Sequence | - |
//! | 13 | 1 | Physical port (ignored) | - |
//! | 14 | 2 | Universe (0-indexed) | little-endian |
//! | 16 | 2 | Payload length | big-endian |
//! | 18 | up to 512 | Channel data | - |
//!
//! The opcode and universe are little-endian while the length is big-endian.
//! The tests pin this against hand-written byte sequences.

use std::time::SystemTime;
use tracing::trace;

use crate::types::{DMX_CHANNELS, DmxFrame};

/// Art-Net packet signature, including the null terminator.
pub const ARTNET_SIGNATURE: &[u8; 8] = b"Art-Net\0";

/// OpCode of ArtDmx (DMX output) packets.
pub const OP_DMX: u16 = 0x5000;

/// Size of the fixed ArtDmx header.
pub const ARTDMX_HEADER_SIZE: usize = 18;

/// Protocol revision written by [`encode_art_dmx`].
pub const PROTOCOL_VERSION: u16 = 14;

/// Conventional Art-Net UDP port.
pub const ARTNET_PORT: u16 = 6454;

const OPCODE_OFFSET: usize = 8;
const SEQUENCE_OFFSET: usize = 12;
const UNIVERSE_OFFSET: usize = 14;
const LENGTH_OFFSET: usize = 16;

/// Decode a raw UDP payload into a frame stamped with the current time.
///
/// Returns `None` for anything that is not a complete ArtDmx packet.
pub fn decode(buf: &[u8]) -> Option<DmxFrame> {
    decode_at(buf, SystemTime::now())
}

/// Decode a raw UDP payload into a frame stamped with `timestamp`.
pub fn decode_at(buf: &[u8], timestamp: SystemTime) -> Option<DmxFrame> {
    if peek_opcode(buf)? != OP_DMX {
        return None;
    }

    let sequence = buf[SEQUENCE_OFFSET];
    let universe = u16::from_le_bytes([buf[UNIVERSE_OFFSET], buf[UNIVERSE_OFFSET + 1]]);
    let length = u16::from_be_bytes([buf[LENGTH_OFFSET], buf[LENGTH_OFFSET + 1]]) as usize;

    let payload = buf.get(ARTDMX_HEADER_SIZE..ARTDMX_HEADER_SIZE + length)?;

    let mut channels = [0u8; DMX_CHANNELS];
    let copied = payload.len().min(DMX_CHANNELS);
    channels[..copied].copy_from_slice(&payload[..copied]);

    trace!("ArtDmx universe={} sequence={} length={}", universe, sequence, length);

    Some(DmxFrame::new(universe, sequence, channels, timestamp))
}

/// Read the opcode of an Art-Net packet without decoding the body.
///
/// Returns `None` when the buffer is shorter than the ArtDmx header or lacks
/// the Art-Net signature.
pub fn peek_opcode(buf: &[u8]) -> Option<u16> {
    if buf.len() < ARTDMX_HEADER_SIZE || &buf[..OPCODE_OFFSET] != ARTNET_SIGNATURE {
        return None;
    }
    Some(u16::from_le_bytes([buf[OPCODE_OFFSET], buf[OPCODE_OFFSET + 1]]))
}

/// Encode an ArtDmx packet.
///
/// At most 512 channel bytes are written; the declared length matches the
/// number of bytes written.
pub fn encode_art_dmx(universe: u16, sequence: u8, channels: &[u8]) -> Vec<u8> {
    let data = &channels[..channels.len().min(DMX_CHANNELS)];

    let mut packet = Vec::with_capacity(ARTDMX_HEADER_SIZE + data.len());
    packet.extend_from_slice(ARTNET_SIGNATURE);
    packet.extend_from_slice(&OP_DMX.to_le_bytes());
    packet.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet.push(sequence);
    packet.push(0); // physical port
    packet.extend_from_slice(&universe.to_le_bytes());
    packet.extend_from_slice(&(data.len() as u16).to_be_bytes());
    packet.extend_from_slice(data);

    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, UNIX_EPOCH};

    /// Universe 0x0102, sequence 7, length 4 (big-endian), channels 1..=4.
    const KNOWN_GOOD: [u8; 22] = [
        b'A', b'r', b't', b'-', b'N', b'e', b't', 0x00, // signature
        0x00, 0x50, // OpDmx, little-endian
        0x00, 0x0e, // protocol version 14
        0x07, // sequence
        0x00, // physical
        0x02, 0x01, // universe 0x0102, little-endian
        0x00, 0x04, // length 4, big-endian
        0x0a, 0x14, 0x1e, 0x28,
    ];

    #[test]
    fn decodes_known_good_packet_with_mixed_endianness() {
        let stamp = UNIX_EPOCH + Duration::from_secs(42);
        let frame = decode_at(&KNOWN_GOOD, stamp).expect("known-good packet should decode");

        assert_eq!(frame.universe, 0x0102);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.timestamp, stamp);
        assert_eq!(&frame.channels[..4], &[10, 20, 30, 40]);
        assert!(frame.channels[4..].iter().all(|&v| v == 0));
    }

    #[test]
    fn encoder_matches_known_good_bytes() {
        let encoded = encode_art_dmx(0x0102, 7, &[10, 20, 30, 40]);
        assert_eq!(encoded, KNOWN_GOOD);
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut packet = KNOWN_GOOD;
        packet[7] = b'!';
        assert!(decode(&packet).is_none());
        assert!(peek_opcode(&packet).is_none());
    }

    #[test]
    fn rejects_big_endian_opcode() {
        let mut packet = KNOWN_GOOD;
        packet[8] = 0x50;
        packet[9] = 0x00;
        assert_eq!(peek_opcode(&packet), Some(0x0050));
        assert!(decode(&packet).is_none());
    }

    #[test]
    fn rejects_length_overrunning_buffer() {
        let mut packet = KNOWN_GOOD;
        packet[17] = 0x05;
        assert!(decode(&packet).is_none());
    }

    #[test]
    fn accepts_header_only_packet() {
        let packet = encode_art_dmx(9, 0, &[]);
        let frame = decode(&packet).expect("zero-length payload is valid");
        assert_eq!(frame.universe, 9);
        assert!(frame.channels.iter().all(|&v| v == 0));
    }

    #[test]
    fn truncates_oversized_payload_to_one_universe() {
        let mut packet = encode_art_dmx(0, 0, &[]);
        packet[16..18].copy_from_slice(&600u16.to_be_bytes());
        packet.extend((0..600).map(|i| (i % 251) as u8));

        let frame = decode(&packet).expect("oversized payload within buffer decodes");
        assert_eq!(frame.channels[511], (511 % 251) as u8);
    }

    #[test]
    fn trailing_bytes_past_declared_length_are_ignored() {
        let mut packet = encode_art_dmx(0, 0, &[1, 2]);
        packet.extend_from_slice(&[99, 99, 99]);

        let frame = decode(&packet).expect("trailing bytes are tolerated");
        assert_eq!(&frame.channels[..3], &[1, 2, 0]);
    }

    #[test]
    fn encoder_clamps_to_512_channels() {
        let packet = encode_art_dmx(0, 0, &[7u8; 700]);
        assert_eq!(packet.len(), ARTDMX_HEADER_SIZE + DMX_CHANNELS);
        assert_eq!(u16::from_be_bytes([packet[16], packet[17]]), 512);
    }

    proptest! {
        #[test]
        fn prop_payload_bytes_land_on_their_channels(
            payload in prop::collection::vec(any::<u8>(), 0..=512),
            universe in any::<u16>(),
            sequence in any::<u8>()
        ) {
            let frame = decode(&encode_art_dmx(universe, sequence, &payload)).unwrap();

            prop_assert_eq!(frame.universe, universe);
            prop_assert_eq!(frame.sequence, sequence);
            for channel in 1..=512u16 {
                let expected = payload.get(channel as usize - 1).copied().unwrap_or(0);
                prop_assert_eq!(frame.channel(channel), Some(expected));
            }
        }

        #[test]
        fn prop_short_buffers_never_decode(buf in prop::collection::vec(any::<u8>(), 0..ARTDMX_HEADER_SIZE)) {
            prop_assert!(decode(&buf).is_none());
        }

        #[test]
        fn prop_non_dmx_opcodes_are_rejected(
            opcode in any::<u16>().prop_filter("not OpDmx", |op| *op != OP_DMX),
            payload in prop::collection::vec(any::<u8>(), 0..64)
        ) {
            let mut packet = encode_art_dmx(0, 0, &payload);
            packet[8..10].copy_from_slice(&opcode.to_le_bytes());
            prop_assert!(decode(&packet).is_none());
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(buf in prop::collection::vec(any::<u8>(), 0..600)) {
            let _ = decode(&buf);
        }
    }
}
