use crate::consts::{
    COMPRESSED_BIT, FRAGMENT_BIT, MORE_FRAGMENTS_BIT, OOB_MARKER, SEQUENCE_MASK,
};
use crate::error::EncodingError;
use crate::msg::Msg;

/// Fragment fields of a datagram header. The byte offset identifies the
/// fragment within its message; `more` is clear on the final fragment.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentInfo {
    pub offset: u32,
    pub more: bool,
}

/// Decoded datagram header. The wire form is a single big-endian
/// sequence word with the fragmented and compressed flags folded into
/// its top bits, followed by an offset word when fragmented. The offset
/// word carries the more-fragments flag in its top bit.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    /// Connectionless datagram, bypasses all channel state
    OutOfBand,
    Message {
        sequence: u32,
        compressed: bool,
        fragment: Option<FragmentInfo>,
    },
}

impl PacketHeader {
    pub fn encode(&self, msg: &mut Msg) -> Result<(), EncodingError> {
        match *self {
            PacketHeader::OutOfBand => msg.write_u32(OOB_MARKER),
            PacketHeader::Message {
                sequence,
                compressed,
                fragment,
            } => {
                let mut word = sequence & SEQUENCE_MASK;
                if compressed {
                    word |= COMPRESSED_BIT;
                }
                if fragment.is_some() {
                    word |= FRAGMENT_BIT;
                }
                msg.write_u32(word)?;

                if let Some(frag) = fragment {
                    let mut offset = frag.offset & !MORE_FRAGMENTS_BIT;
                    if frag.more {
                        offset |= MORE_FRAGMENTS_BIT;
                    }
                    msg.write_u32(offset)?;
                }
                Ok(())
            }
        }
    }

    pub fn decode(msg: &mut Msg) -> Result<Self, EncodingError> {
        let word = msg.read_u32()?;
        if word == OOB_MARKER {
            return Ok(PacketHeader::OutOfBand);
        }

        let fragment = if word & FRAGMENT_BIT != 0 {
            let offset = msg.read_u32()?;
            Some(FragmentInfo {
                offset: offset & !MORE_FRAGMENTS_BIT,
                more: offset & MORE_FRAGMENTS_BIT != 0,
            })
        } else {
            None
        };

        Ok(PacketHeader::Message {
            sequence: word & SEQUENCE_MASK,
            compressed: word & COMPRESSED_BIT != 0,
            fragment,
        })
    }
}

/// Checks whether a raw datagram carries the out-of-band marker, letting
/// owners route connectionless traffic before any channel is consulted.
pub fn is_out_of_band(data: &[u8]) -> bool {
    data.len() >= 4 && u32::from_be_bytes([data[0], data[1], data[2], data[3]]) == OOB_MARKER
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FRAGMENT_HEADER, PACKET_HEADER};

    fn round_trip(header: PacketHeader) -> PacketHeader {
        let mut msg = Msg::new(FRAGMENT_HEADER);
        header.encode(&mut msg).unwrap();
        let mut parsed = Msg::from_slice(msg.as_slice());
        PacketHeader::decode(&mut parsed).unwrap()
    }

    #[test]
    fn plain_header_round_trip() {
        let header = PacketHeader::Message {
            sequence: 42,
            compressed: false,
            fragment: None,
        };
        assert_eq!(round_trip(header), header);
    }

    #[test]
    fn plain_header_is_four_bytes() {
        let mut msg = Msg::new(16);
        PacketHeader::Message {
            sequence: 1,
            compressed: false,
            fragment: None,
        }
        .encode(&mut msg)
        .unwrap();
        assert_eq!(msg.len(), PACKET_HEADER);
    }

    #[test]
    fn fragment_header_round_trip() {
        for more in [true, false] {
            let header = PacketHeader::Message {
                sequence: 9001,
                compressed: true,
                fragment: Some(FragmentInfo { offset: 1392, more }),
            };
            assert_eq!(round_trip(header), header);
        }
    }

    #[test]
    fn fragment_header_is_eight_bytes() {
        let mut msg = Msg::new(16);
        PacketHeader::Message {
            sequence: 1,
            compressed: false,
            fragment: Some(FragmentInfo { offset: 0, more: true }),
        }
        .encode(&mut msg)
        .unwrap();
        assert_eq!(msg.len(), FRAGMENT_HEADER);
    }

    #[test]
    fn compressed_flag_survives_alone() {
        let header = PacketHeader::Message {
            sequence: 7,
            compressed: true,
            fragment: None,
        };
        assert_eq!(round_trip(header), header);
    }

    #[test]
    fn oob_marker_round_trip() {
        assert_eq!(round_trip(PacketHeader::OutOfBand), PacketHeader::OutOfBand);

        let mut msg = Msg::new(8);
        PacketHeader::OutOfBand.encode(&mut msg).unwrap();
        assert!(is_out_of_band(msg.as_slice()));
        assert!(!is_out_of_band(&[0, 0, 0, 1]));
        assert!(!is_out_of_band(&[0xFF, 0xFF]));
    }
}
