use std::net::SocketAddr;

use crate::compress::{compress_message, decompress_message};
use crate::consts::{
    DEFAULT_FRAGMENT_BURST, FRAGMENT_SIZE, MAX_DATAGRAM_PAYLOAD, MAX_MSGLEN, MAX_PACKETLEN,
    SEQUENCE_MASK,
};
use crate::error::{NetchanError, Result};
use crate::msg::Msg;
use crate::net::socket::Transport;
use crate::protocol::{FragmentInfo, PacketHeader};

/// Tunables for a channel
#[derive(Debug, Clone)]
pub struct NetchanConfig {
    /// Most fragments push_all_fragments sends in one call
    pub fragment_burst: usize,
    /// Apply the compression hook on the send path
    pub compression: bool,
    /// Payloads below this many bytes are never compressed
    pub compression_threshold: usize,
}

impl Default for NetchanConfig {
    fn default() -> Self {
        NetchanConfig {
            fragment_burst: DEFAULT_FRAGMENT_BURST,
            compression: true,
            compression_threshold: 64,
        }
    }
}

/// Per-peer connection state: sequencing counters plus the fragment
/// reassembly and staging buffers. One instance per logical peer, owned
/// and driven by a single network-tick task; liveness tracking and
/// retransmission, if wanted, are layered above.
#[derive(Debug)]
pub struct Netchan {
    remote_address: SocketAddr,
    session_id: u64,

    dropped: u32,
    incoming_sequence: u32,
    incoming_acknowledged: u32,
    outgoing_sequence: u32,

    // Incoming fragment assembly
    fragment_sequence: u32,
    fragment_buffer: Msg,

    // Outgoing fragment staging
    unsent_fragments: bool,
    unsent_fragment_start: usize,
    unsent_sequence: u32,
    unsent_is_compressed: bool,
    unsent_buffer: Msg,

    config: NetchanConfig,
}

/// Advances a 30-bit sequence counter
fn next_sequence(seq: u32) -> u32 {
    seq.wrapping_add(1) & SEQUENCE_MASK
}

/// Distance from `from` to `to` in 30-bit sequence space, `None` when
/// `to` is not newer than `from`
fn sequence_delta(to: u32, from: u32) -> Option<u32> {
    let diff = to.wrapping_sub(from) & SEQUENCE_MASK;
    if diff == 0 || diff > SEQUENCE_MASK / 2 {
        None
    } else {
        Some(diff)
    }
}

impl Netchan {
    /// Binds a fresh channel to a peer address and session id. Pure
    /// state initialization, no network I/O.
    pub fn setup(remote_address: SocketAddr, session_id: u64) -> Self {
        Self::setup_with_config(remote_address, session_id, NetchanConfig::default())
    }

    pub fn setup_with_config(
        remote_address: SocketAddr,
        session_id: u64,
        config: NetchanConfig,
    ) -> Self {
        Netchan {
            remote_address,
            session_id,
            dropped: 0,
            incoming_sequence: 0,
            incoming_acknowledged: 0,
            outgoing_sequence: 1,
            fragment_sequence: 0,
            fragment_buffer: Msg::new(MAX_MSGLEN),
            unsent_fragments: false,
            unsent_fragment_start: 0,
            unsent_sequence: 0,
            unsent_is_compressed: false,
            unsent_buffer: Msg::new(MAX_MSGLEN),
            config,
        }
    }

    /// Rebinds this channel slot to a new peer, discarding all
    /// sequencing and fragment state
    pub fn reset(&mut self, remote_address: SocketAddr, session_id: u64) {
        let config = self.config.clone();
        *self = Self::setup_with_config(remote_address, session_id, config);
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Packets lost between the last two delivered messages
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn incoming_sequence(&self) -> u32 {
        self.incoming_sequence
    }

    /// Sequence of the last packet that produced a delivered message;
    /// the caller's liveness signal
    pub fn incoming_acknowledged(&self) -> u32 {
        self.incoming_acknowledged
    }

    pub fn outgoing_sequence(&self) -> u32 {
        self.outgoing_sequence
    }

    /// True while a staged oversized message still has fragments queued
    pub fn has_pending_fragments(&self) -> bool {
        self.unsent_fragments
    }

    fn maybe_compress(&self, data: &[u8]) -> Option<Vec<u8>> {
        if !self.config.compression || data.len() < self.config.compression_threshold {
            return None;
        }
        compress_message(data)
    }

    /// Sends a message that fits in a single datagram. Refuses oversized
    /// payloads; those go through `stage_fragments`. Exactly one socket
    /// send, no buffering.
    pub async fn transmit<T: Transport>(&mut self, socket: &mut T, data: &[u8]) -> Result<()> {
        if self.unsent_fragments {
            return Err(NetchanError::FragmentsPending);
        }
        if data.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(NetchanError::MessageTooLarge {
                size: data.len(),
                limit: MAX_DATAGRAM_PAYLOAD,
            });
        }

        let compressed = self.maybe_compress(data);
        let (payload, is_compressed) = match &compressed {
            Some(c) => (c.as_slice(), true),
            None => (data, false),
        };

        let mut msg = Msg::new(MAX_PACKETLEN);
        PacketHeader::Message {
            sequence: self.outgoing_sequence,
            compressed: is_compressed,
            fragment: None,
        }
        .encode(&mut msg)?;
        msg.write_data(payload)?;

        tracing::trace!(
            seq = self.outgoing_sequence,
            len = payload.len(),
            compressed = is_compressed,
            "transmit"
        );
        self.outgoing_sequence = next_sequence(self.outgoing_sequence);
        socket.send(msg.as_slice(), self.remote_address).await
    }

    /// Stages a message too large for one datagram. The compression hook
    /// runs over the whole payload before fragmentation, and the message
    /// claims its sequence number here; every fragment carries it. No
    /// I/O happens until the fragment queue is drained.
    pub fn stage_fragments(&mut self, data: &[u8]) -> Result<()> {
        if self.unsent_fragments {
            return Err(NetchanError::FragmentsPending);
        }
        if data.len() > MAX_MSGLEN {
            return Err(NetchanError::OversizeMessage {
                size: data.len(),
                limit: MAX_MSGLEN,
            });
        }

        self.unsent_buffer.clear();
        match self.maybe_compress(data) {
            Some(compressed) => {
                self.unsent_buffer.write_data(&compressed)?;
                self.unsent_is_compressed = true;
            }
            None => {
                self.unsent_buffer.write_data(data)?;
                self.unsent_is_compressed = false;
            }
        }

        self.unsent_fragments = true;
        self.unsent_fragment_start = 0;
        self.unsent_sequence = self.outgoing_sequence;
        self.outgoing_sequence = next_sequence(self.outgoing_sequence);

        tracing::trace!(
            seq = self.unsent_sequence,
            len = self.unsent_buffer.len(),
            compressed = self.unsent_is_compressed,
            "staged fragments"
        );
        Ok(())
    }

    /// Sends exactly one pending fragment and returns whether more
    /// remain, for callers pacing one fragment per tick
    pub async fn transmit_next_fragment<T: Transport>(&mut self, socket: &mut T) -> Result<bool> {
        if !self.unsent_fragments {
            return Ok(false);
        }

        let total = self.unsent_buffer.len();
        let start = self.unsent_fragment_start;
        let len = FRAGMENT_SIZE.min(total - start);
        let more = start + len < total;

        let mut msg = Msg::new(MAX_PACKETLEN);
        PacketHeader::Message {
            sequence: self.unsent_sequence,
            compressed: self.unsent_is_compressed,
            fragment: Some(FragmentInfo {
                offset: u32::try_from(start)?,
                more,
            }),
        }
        .encode(&mut msg)?;
        msg.write_data(&self.unsent_buffer.as_slice()[start..start + len])?;

        socket.send(msg.as_slice(), self.remote_address).await?;

        tracing::trace!(
            seq = self.unsent_sequence,
            offset = start,
            len,
            more,
            "transmit fragment"
        );

        self.unsent_fragment_start += len;
        if !more {
            self.unsent_fragments = false;
            self.unsent_fragment_start = 0;
            self.unsent_buffer.clear();
        }
        Ok(self.unsent_fragments)
    }

    /// Sends pending fragments until the queue drains or the per-call
    /// burst budget is spent, and returns whether more remain. The
    /// budget keeps one call from flooding a frame's worth of traffic.
    pub async fn push_all_fragments<T: Transport>(&mut self, socket: &mut T) -> Result<bool> {
        let mut budget = self.config.fragment_burst.max(1);
        while self.unsent_fragments && budget > 0 {
            self.transmit_next_fragment(socket).await?;
            budget -= 1;
        }
        Ok(self.unsent_fragments)
    }

    /// Consumes one incoming datagram. `Ok(Some(payload))` is a complete
    /// logical message; `Ok(None)` means the datagram was discarded as
    /// stale or more fragments are still pending. An error means the
    /// peer is desynchronized and the owner should drop the channel.
    pub fn process(&mut self, msg: &mut Msg) -> Result<Option<Vec<u8>>> {
        let (sequence, compressed, fragment) = match PacketHeader::decode(msg)? {
            PacketHeader::OutOfBand => {
                tracing::debug!("out-of-band datagram routed to a channel, discarding");
                return Ok(None);
            }
            PacketHeader::Message {
                sequence,
                compressed,
                fragment,
            } => (sequence, compressed, fragment),
        };

        let delta = match sequence_delta(sequence, self.incoming_sequence) {
            Some(d) => d,
            None => {
                tracing::debug!(
                    sequence,
                    incoming = self.incoming_sequence,
                    "stale or duplicate sequence, discarding"
                );
                return Ok(None);
            }
        };
        self.dropped = delta - 1;

        let Some(fragment) = fragment else {
            self.incoming_sequence = sequence;
            self.incoming_acknowledged = sequence;

            let payload = msg.read_remaining();
            let payload = if compressed {
                decompress_message(payload)?
            } else {
                payload.to_vec()
            };
            return Ok(Some(payload));
        };

        if sequence != self.fragment_sequence {
            self.fragment_sequence = sequence;
            self.fragment_buffer.clear();
        }

        // A duplicate or out-of-order fragment lands on the wrong offset
        if fragment.offset as usize != self.fragment_buffer.len() {
            tracing::debug!(
                sequence,
                offset = fragment.offset,
                expected = self.fragment_buffer.len(),
                "fragment offset mismatch, discarding"
            );
            return Ok(None);
        }

        let payload = msg.read_remaining();
        if self.fragment_buffer.len() + payload.len() > MAX_MSGLEN {
            tracing::warn!(
                sequence,
                assembled = self.fragment_buffer.len(),
                incoming = payload.len(),
                "fragment reassembly overflow"
            );
            return Err(NetchanError::FragmentOverflow {
                length: self.fragment_buffer.len(),
                incoming: payload.len(),
                capacity: MAX_MSGLEN,
            });
        }
        self.fragment_buffer.write_data(payload)?;

        if fragment.more {
            tracing::trace!(
                sequence,
                assembled = self.fragment_buffer.len(),
                "fragment accepted, awaiting more"
            );
            return Ok(None);
        }

        // Last fragment: the reassembled buffer becomes the message
        self.incoming_sequence = sequence;
        self.incoming_acknowledged = sequence;

        let complete = self.fragment_buffer.as_slice().to_vec();
        self.fragment_buffer.clear();
        let complete = if compressed {
            decompress_message(&complete)?
        } else {
            complete
        };
        Ok(Some(complete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:27910".parse().unwrap()
    }

    #[test]
    fn sequence_delta_orders_new_and_stale() {
        assert_eq!(sequence_delta(1, 0), Some(1));
        assert_eq!(sequence_delta(9, 6), Some(3));
        assert_eq!(sequence_delta(5, 5), None);
        assert_eq!(sequence_delta(4, 5), None);
    }

    #[test]
    fn sequence_delta_handles_wraparound() {
        // One step across the 30-bit wrap still counts as newer
        assert_eq!(sequence_delta(0, SEQUENCE_MASK), Some(1));
        assert_eq!(sequence_delta(2, SEQUENCE_MASK - 1), Some(4));
        assert_eq!(sequence_delta(SEQUENCE_MASK, 0), None);
    }

    #[test]
    fn next_sequence_wraps_inside_the_mask() {
        assert_eq!(next_sequence(1), 2);
        assert_eq!(next_sequence(SEQUENCE_MASK), 0);
    }

    #[test]
    fn setup_zeroes_state() {
        let chan = Netchan::setup(addr(), 0xA1B2);
        assert_eq!(chan.remote_address(), addr());
        assert_eq!(chan.session_id(), 0xA1B2);
        assert_eq!(chan.dropped(), 0);
        assert_eq!(chan.incoming_sequence(), 0);
        assert_eq!(chan.incoming_acknowledged(), 0);
        assert_eq!(chan.outgoing_sequence(), 1);
        assert!(!chan.has_pending_fragments());
    }

    #[test]
    fn reset_rebinds_idempotently() {
        let mut chan = Netchan::setup(addr(), 1);
        chan.stage_fragments(&[0u8; 4000]).unwrap();
        chan.incoming_sequence = 17;

        let other: SocketAddr = "10.0.0.2:27960".parse().unwrap();
        chan.reset(other, 2);
        chan.reset(other, 2);
        assert_eq!(chan.remote_address(), other);
        assert_eq!(chan.session_id(), 2);
        assert_eq!(chan.incoming_sequence(), 0);
        assert_eq!(chan.outgoing_sequence(), 1);
        assert!(!chan.has_pending_fragments());
    }

    #[test]
    fn staging_oversize_message_is_refused() {
        let mut chan = Netchan::setup(addr(), 1);
        let err = chan.stage_fragments(&[0u8; MAX_MSGLEN + 1]).unwrap_err();
        assert!(matches!(err, NetchanError::OversizeMessage { .. }));
        assert!(!chan.has_pending_fragments());
    }

    #[test]
    fn staging_twice_is_refused() {
        let mut chan = Netchan::setup(addr(), 1);
        chan.stage_fragments(&[1u8; 64]).unwrap();
        let err = chan.stage_fragments(&[2u8; 64]).unwrap_err();
        assert!(matches!(err, NetchanError::FragmentsPending));
    }

    #[tokio::test]
    async fn transmit_oversize_payload_is_refused() {
        let mut chan = Netchan::setup(addr(), 1);
        let mut t = crate::net::socket::LoopbackTransport::new();
        let err = chan
            .transmit(&mut t, &[0u8; MAX_DATAGRAM_PAYLOAD + 1])
            .await
            .unwrap_err();
        assert!(matches!(err, NetchanError::MessageTooLarge { .. }));
        assert_eq!(t.pending(), 0);
        assert_eq!(chan.outgoing_sequence(), 1);
    }

    #[tokio::test]
    async fn transmit_while_fragments_pending_is_refused() {
        let mut chan = Netchan::setup(addr(), 1);
        let mut t = crate::net::socket::LoopbackTransport::new();
        chan.stage_fragments(&[3u8; 128]).unwrap();
        let err = chan.transmit(&mut t, b"tick").await.unwrap_err();
        assert!(matches!(err, NetchanError::FragmentsPending));
    }

    #[tokio::test]
    async fn transmit_next_fragment_without_staging_is_a_noop() {
        let mut chan = Netchan::setup(addr(), 1);
        let mut t = crate::net::socket::LoopbackTransport::new();
        assert!(!chan.transmit_next_fragment(&mut t).await.unwrap());
        assert_eq!(t.pending(), 0);
    }
}
