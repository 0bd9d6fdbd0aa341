//! In-process transport.
//!
//! Endpoints bound on the same [`MemoryNetwork`] exchange datagrams over
//! unbounded channels. Datagrams sent to an address nobody bound are
//! dropped, like UDP to a closed port.

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use parking_lot::RwLock;
use rust_ccn_common::{Error, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::Transport;

type Datagram = (SocketAddr, Bytes);

/// A registry of in-process endpoints.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    endpoints: Arc<RwLock<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new endpoint at `addr`, replacing any previous binding.
    pub fn bind(&self, addr: SocketAddr) -> MemoryTransport {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.endpoints.write().insert(addr, sender.clone());
        MemoryTransport {
            local_addr: addr,
            network: self.clone(),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    fn deliver(&self, from: SocketAddr, to: SocketAddr, bytes: Bytes) {
        let endpoints = self.endpoints.read();
        match endpoints.get(&to) {
            Some(sender) => {
                if sender.send((from, bytes)).is_err() {
                    debug!("Endpoint {} closed, dropping datagram from {}", to, from);
                }
            }
            None => debug!("No endpoint at {}, dropping datagram from {}", to, from),
        }
    }
}

/// One endpoint on a [`MemoryNetwork`].
#[derive(Debug)]
pub struct MemoryTransport {
    local_addr: SocketAddr,
    network: MemoryNetwork,
    sender: mpsc::UnboundedSender<Datagram>,
    receiver: Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send(&self, to: SocketAddr, bytes: Bytes) -> Result<()> {
        self.network.deliver(self.local_addr, to, bytes);
        Ok(())
    }

    async fn recv(&self) -> Result<(SocketAddr, Bytes)> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| Error::Other(format!("memory endpoint {} unbound", self.local_addr)))
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        let mut endpoints = self.network.endpoints.write();
        if endpoints
            .get(&self.local_addr)
            .is_some_and(|bound| bound.same_channel(&self.sender))
        {
            endpoints.remove(&self.local_addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_memory_exchange() {
        let network = MemoryNetwork::new();
        let a = network.bind(addr(1));
        let b = network.bind(addr(2));

        a.send(b.local_addr(), Bytes::from_static(b"ping")).await.unwrap();
        b.send(a.local_addr(), Bytes::from_static(b"pong")).await.unwrap();

        assert_eq!(b.recv().await.unwrap(), (addr(1), Bytes::from_static(b"ping")));
        assert_eq!(a.recv().await.unwrap(), (addr(2), Bytes::from_static(b"pong")));
    }

    #[tokio::test]
    async fn test_unbound_destination_is_dropped() {
        let network = MemoryNetwork::new();
        let a = network.bind(addr(1));
        a.send(addr(9), Bytes::from_static(b"lost")).await.unwrap();

        {
            let _c = network.bind(addr(3));
        }
        // dropping an endpoint unbinds it
        a.send(addr(3), Bytes::from_static(b"lost")).await.unwrap();

        let nothing = tokio::time::timeout(Duration::from_millis(20), a.recv()).await;
        assert!(nothing.is_err());
    }
}
