//! UDP listener and worker dispatch.
//!
//! The accept loop only receives and hands off: each datagram is copied out
//! of the receive buffer and processed on the blocking thread pool, where
//! the worker checks out its own database session. Persistence therefore
//! never blocks the socket, and a failing worker never reaches the loop.
//!
//! Datagrams are independent: no ordering between them, no delivery
//! guarantee to the sender (plain UDP semantics).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{info, warn};

use siphon_core::metrics::IngestCounters;
use siphon_core::{ConnectionPool, TableRegistry, ingest};

/// UDP ingestion listener.
pub struct Listener {
    socket: UdpSocket,
    pool: ConnectionPool,
    registry: Arc<TableRegistry>,
    counters: Arc<IngestCounters>,
    max_datagram_bytes: usize,
}

impl Listener {
    /// Bind the listener to `addr`.
    ///
    /// # Errors
    /// Returns an I/O error if the socket cannot be bound.
    pub async fn bind(
        addr: &str,
        pool: ConnectionPool,
        registry: Arc<TableRegistry>,
        counters: Arc<IngestCounters>,
        max_datagram_bytes: usize,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(addr = %socket.local_addr()?, "UDP listener bound");
        Ok(Self {
            socket,
            pool,
            registry,
            counters,
            max_datagram_bytes,
        })
    }

    /// Address the socket actually bound to (useful with port 0).
    ///
    /// # Errors
    /// Returns an I/O error if the local address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Accept datagrams until `shutdown` fires.
    ///
    /// Workers dispatched before shutdown finish opportunistically on the
    /// blocking pool; anything lost mid-shutdown is within UDP's own
    /// delivery contract.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; self.max_datagram_bytes];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => self.dispatch(&buf[..len], peer),
                        Err(e) => {
                            // Transient receive errors must not stop the loop.
                            warn!(error = %e, "recv_from failed, continuing");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("Shutdown signalled, listener stopping");
                    break;
                }
            }
        }
    }

    /// Hand one datagram to a blocking-pool worker.
    fn dispatch(&self, payload: &[u8], peer: SocketAddr) {
        self.counters
            .datagrams_received
            .fetch_add(1, Ordering::Relaxed);

        let payload = payload.to_vec();
        let pool = self.pool.clone();
        let registry = Arc::clone(&self.registry);
        let counters = Arc::clone(&self.counters);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.checkout();
            let outcome = ingest(&mut conn, &registry, &payload, Some(peer));
            counters.record_outcome(&outcome);
        });
    }
}
