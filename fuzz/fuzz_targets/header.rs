#![no_main]

use libfuzzer_sys::fuzz_target;
use netchan::{
    consts::{FRAGMENT_HEADER, MORE_FRAGMENTS_BIT, SEQUENCE_MASK},
    msg::Msg,
    protocol::{FragmentInfo, PacketHeader},
};

/// Clamps arbitrary header fields to their wire width. A compressed
/// fragment at the top sequence value encodes to the out-of-band marker
/// word, so that one encoding is skipped.
fn normalize(header: PacketHeader) -> Option<PacketHeader> {
    match header {
        PacketHeader::OutOfBand => Some(header),
        PacketHeader::Message {
            sequence,
            compressed,
            fragment,
        } => {
            let sequence = sequence & SEQUENCE_MASK;
            let fragment = fragment.map(|f| FragmentInfo {
                offset: f.offset & !MORE_FRAGMENTS_BIT,
                more: f.more,
            });
            if sequence == SEQUENCE_MASK && compressed && fragment.is_some() {
                return None;
            }
            Some(PacketHeader::Message {
                sequence,
                compressed,
                fragment,
            })
        }
    }
}

fuzz_target!(|header: PacketHeader| {
    let Some(header) = normalize(header) else {
        return;
    };

    let mut msg = Msg::new(FRAGMENT_HEADER);
    header.encode(&mut msg).unwrap();

    let mut parsed = Msg::from_slice(msg.as_slice());
    assert_eq!(PacketHeader::decode(&mut parsed).unwrap(), header);
    assert_eq!(parsed.remaining(), 0);
});
