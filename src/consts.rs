/// Capacity of the fragment reassembly and staging buffers
pub const MAX_MSGLEN: usize = 16384;
/// Largest datagram the channel hands to the transport
pub const MAX_PACKETLEN: usize = 1400;
/// Header bytes on an unfragmented channel datagram
pub const PACKET_HEADER: usize = 4;
/// Header bytes on a fragment datagram
pub const FRAGMENT_HEADER: usize = 8;
/// Payload bytes carried by each fragment
pub const FRAGMENT_SIZE: usize = MAX_PACKETLEN - FRAGMENT_HEADER;
/// Largest payload that fits in a single unfragmented datagram
pub const MAX_DATAGRAM_PAYLOAD: usize = MAX_PACKETLEN - PACKET_HEADER;
/// Most fragments sent per push_all_fragments call
pub const DEFAULT_FRAGMENT_BURST: usize = 4;

/// Sequence word bit marking a fragment datagram
pub const FRAGMENT_BIT: u32 = 1 << 31;
/// Sequence word bit marking a compressed payload
pub const COMPRESSED_BIT: u32 = 1 << 30;
/// Mask selecting the sequence counter bits of the sequence word
pub const SEQUENCE_MASK: u32 = !(FRAGMENT_BIT | COMPRESSED_BIT);
/// Offset word bit marking that more fragments follow
pub const MORE_FRAGMENTS_BIT: u32 = 1 << 31;
/// Marker word carried instead of a sequence on out-of-band datagrams
pub const OOB_MARKER: u32 = 0xFFFF_FFFF;
