//! Registry of live WebSocket clients
//!
//! Each connection drives its own push loop; the registry only hands out
//! ids and a channel through which broadcasts reach that loop.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Pending broadcast messages per client before new ones are dropped
const CLIENT_BUFFER: usize = 16;

/// Unique identifier for a WebSocket client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Concurrency-safe set of connected clients
pub struct ConnectionRegistry {
    /// Next client ID to assign
    next_client_id: AtomicU64,
    /// Outgoing message channel of every live client
    clients: DashMap<ClientId, mpsc::Sender<Arc<str>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            next_client_id: AtomicU64::new(1),
            clients: DashMap::new(),
        }
    }

    /// Add a client; broadcasts for it arrive on the returned receiver
    pub fn register(&self) -> (ClientId, mpsc::Receiver<Arc<str>>) {
        let client_id = ClientId(self.next_client_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.insert(client_id, tx);
        debug!("Registered {} ({} connected)", client_id, self.clients.len());
        (client_id, rx)
    }

    /// Remove a client. Returns false if it was already gone.
    pub fn deregister(&self, client_id: ClientId) -> bool {
        let removed = self.clients.remove(&client_id).is_some();
        if removed {
            debug!("Deregistered {} ({} connected)", client_id, self.clients.len());
        }
        removed
    }

    /// Number of connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Queue `message` for every client
    ///
    /// Clients whose receiver is gone are removed. A client with a full
    /// buffer misses this message. Returns the number of clients reached.
    pub fn broadcast(&self, message: &str) -> usize {
        let message: Arc<str> = Arc::from(message);
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.clients.iter() {
            match entry.value().try_send(Arc::clone(&message)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("{} is lagging, dropping broadcast", entry.key());
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removal happens after iteration; DashMap shards stay locked while iterating
        for client_id in closed {
            self.deregister(client_id);
        }

        delivered
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_unique_ids() {
        let registry = ConnectionRegistry::new();

        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.deregister(a));
        assert!(!registry.deregister(a));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_clients() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        assert_eq!(registry.broadcast("{\"total_stocks\":0}"), 2);

        assert_eq!(&*rx_a.recv().await.unwrap(), "{\"total_stocks\":0}");
        assert_eq!(&*rx_b.recv().await.unwrap(), "{\"total_stocks\":0}");
    }

    #[test]
    fn test_broadcast_prunes_closed_clients() {
        let registry = ConnectionRegistry::new();
        let (_a, rx_a) = registry.register();
        let (_b, _rx_b) = registry.register();
        drop(rx_a);

        assert_eq!(registry.broadcast("ping"), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_broadcast_skips_full_clients() {
        let registry = ConnectionRegistry::new();
        let (_a, _rx_a) = registry.register();

        for _ in 0..CLIENT_BUFFER {
            assert_eq!(registry.broadcast("tick"), 1);
        }
        assert_eq!(registry.broadcast("overflow"), 0);
        assert_eq!(registry.len(), 1);
    }
}
