use std::{collections::VecDeque, net::SocketAddr};

use async_trait::async_trait;
use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::error::Result;

/// Transport seam the channel layer sends and receives through: raw
/// bytes and addresses, best-effort, non-blocking. UDP in production, an
/// in-process queue for tests and loopback play.
#[async_trait]
pub trait Transport {
    async fn send(&mut self, data: &[u8], addr: SocketAddr) -> Result<()>;
    async fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;
}

/// Channel transport over a bound tokio UDP socket
#[derive(Debug)]
pub struct UdpTransport {
    pub socket: UdpSocket,
}

impl UdpTransport {
    pub fn new(socket: UdpSocket) -> Self {
        UdpTransport { socket }
    }

    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(UdpTransport { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl From<UdpSocket> for UdpTransport {
    fn from(socket: UdpSocket) -> Self {
        UdpTransport::new(socket)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf).await?)
    }
}

/// In-process transport delivering datagrams through an internal queue,
/// the loopback path of the original engines. Receiving from an empty
/// queue reports `WouldBlock` rather than waiting, matching the
/// non-blocking socket contract.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    queue: VecDeque<(Vec<u8>, SocketAddr)>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Datagrams waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.queue.push_back((data.to_vec(), addr));
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        match self.queue.pop_front() {
            Some((data, addr)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok((n, addr))
            }
            None => Err(std::io::Error::from(std::io::ErrorKind::WouldBlock).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_PACKETLEN;

    fn addr() -> SocketAddr {
        "127.0.0.1:27910".parse().unwrap()
    }

    #[tokio::test]
    async fn loopback_queues_in_order() {
        let mut t = LoopbackTransport::new();
        t.send(b"first", addr()).await.unwrap();
        t.send(b"second", addr()).await.unwrap();
        assert_eq!(t.pending(), 2);

        let mut buf = [0u8; MAX_PACKETLEN];
        let (n, from) = t.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"first");
        assert_eq!(from, addr());
        let (n, _) = t.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"second");
    }

    #[tokio::test]
    async fn loopback_empty_recv_would_block() {
        let mut t = LoopbackTransport::new();
        let mut buf = [0u8; 16];
        assert!(t.recv(&mut buf).await.is_err());
    }
}
