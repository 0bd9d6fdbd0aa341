//! UDP transport.

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use rust_ccn_common::Result;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::{Transport, MAX_DATAGRAM_SIZE};

/// A transport over a single bound UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind a UDP socket at `addr`.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        info!("UDP transport bound to {}", local_addr);
        Ok(Self { socket, local_addr })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send(&self, to: SocketAddr, bytes: Bytes) -> Result<()> {
        let sent = self.socket.send_to(&bytes, to).await?;
        if sent < bytes.len() {
            debug!("Short UDP send to {}: {} of {} bytes", to, sent, bytes.len());
        }
        Ok(())
    }

    async fn recv(&self) -> Result<(SocketAddr, Bytes)> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((from, Bytes::from(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_exchange() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        a.send(b.local_addr(), Bytes::from_static(b"hello")).await.unwrap();
        let (from, bytes) = b.recv().await.unwrap();

        assert_eq!(from, a.local_addr());
        assert_eq!(&bytes[..], b"hello");
    }
}
