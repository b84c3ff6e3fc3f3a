//! Connectionless out-of-band datagrams.
//!
//! Used for server discovery and the early handshake before a channel
//! exists. No sequencing or fragmentation applies and no channel state
//! is read or written.

use std::fmt;
use std::net::SocketAddr;

use crate::consts::{MAX_PACKETLEN, PACKET_HEADER};
use crate::error::{NetchanError, Result};
use crate::msg::Msg;
use crate::net::socket::Transport;
use crate::protocol::PacketHeader;

/// Sends an unsequenced datagram carrying formatted text, e.g.
/// `out_of_band_print(&mut t, addr, format_args!("getchallenge {id}"))`.
pub async fn out_of_band_print<T: Transport>(
    socket: &mut T,
    addr: SocketAddr,
    args: fmt::Arguments<'_>,
) -> Result<()> {
    let text = args.to_string();
    out_of_band_data(socket, addr, text.as_bytes()).await
}

/// Sends an unsequenced datagram with a raw payload. The payload must
/// fit in one datagram; there is no fragmentation path for out-of-band
/// traffic.
pub async fn out_of_band_data<T: Transport>(
    socket: &mut T,
    addr: SocketAddr,
    data: &[u8],
) -> Result<()> {
    let limit = MAX_PACKETLEN - PACKET_HEADER;
    if data.len() > limit {
        return Err(NetchanError::MessageTooLarge {
            size: data.len(),
            limit,
        });
    }

    let mut msg = Msg::new(MAX_PACKETLEN);
    PacketHeader::OutOfBand.encode(&mut msg)?;
    msg.write_data(data)?;

    tracing::trace!(%addr, len = data.len(), "out-of-band send");
    socket.send(msg.as_slice(), addr).await
}
