//! Transport abstraction for the sync protocol.
//!
//! The transport owns delivery, retry, and timeout policy; the sync core
//! never blocks on it and never schedules its own timers. Implementations
//! may sit on any request/response substrate that can move
//! [`SyncMessage`]s between nodes.

use async_trait::async_trait;
use std::fmt;

use crate::error::SyncError;
use crate::messages::SyncMessage;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Unique identifier for a node in the sync group.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random node ID.
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Transport trait for sending and receiving sync messages.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Send a message to a specific peer.
    async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()>;

    /// Receive the next message from any peer.
    ///
    /// Blocks until a message is available or an error occurs.
    async fn recv(&self) -> Result<(NodeId, SyncMessage)>;

    /// Receive with timeout.
    ///
    /// Returns None if the timeout expires before a message arrives.
    async fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Option<(NodeId, SyncMessage)>>;

    /// Broadcast a message to all connected peers.
    async fn broadcast(&self, message: SyncMessage) -> Result<()>;

    /// Get the local node's identity.
    fn local_node_id(&self) -> NodeId;

    /// List currently connected peers.
    async fn connected_peers(&self) -> Result<Vec<NodeId>>;
}

/// A simple in-memory transport for tests and simulations.
///
/// Routes messages between nodes over channels.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};

    /// A routed message.
    #[derive(Debug, Clone)]
    struct Envelope {
        from: NodeId,
        message: SyncMessage,
    }

    /// Shared routing state for a group of in-memory transports.
    pub struct MemoryNetwork {
        inboxes: RwLock<HashMap<NodeId, mpsc::Sender<Envelope>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                inboxes: RwLock::new(HashMap::new()),
            })
        }

        /// Attach a transport for the given node.
        pub async fn create_transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(256);
            self.inboxes.write().await.insert(node_id, tx);
            MemoryTransport {
                node_id,
                network: Arc::clone(self),
                receiver: RwLock::new(rx),
            }
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                inboxes: RwLock::new(HashMap::new()),
            }
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        node_id: NodeId,
        network: Arc<MemoryNetwork>,
        receiver: RwLock<mpsc::Receiver<Envelope>>,
    }

    #[async_trait]
    impl SyncTransport for MemoryTransport {
        async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()> {
            let inboxes = self.network.inboxes.read().await;
            let Some(inbox) = inboxes.get(peer) else {
                return Err(SyncError::Transport(format!("peer {peer} not found")));
            };
            inbox
                .send(Envelope {
                    from: self.node_id,
                    message,
                })
                .await
                .map_err(|_| SyncError::Transport("peer disconnected".into()))
        }

        async fn recv(&self) -> Result<(NodeId, SyncMessage)> {
            let mut rx = self.receiver.write().await;
            match rx.recv().await {
                Some(envelope) => Ok((envelope.from, envelope.message)),
                None => Err(SyncError::Transport("channel closed".into())),
            }
        }

        async fn recv_timeout(
            &self,
            timeout: std::time::Duration,
        ) -> Result<Option<(NodeId, SyncMessage)>> {
            let mut rx = self.receiver.write().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Ok(Some((envelope.from, envelope.message))),
                Ok(None) => Err(SyncError::Transport("channel closed".into())),
                Err(_) => Ok(None),
            }
        }

        async fn broadcast(&self, message: SyncMessage) -> Result<()> {
            let inboxes = self.network.inboxes.read().await;
            for (peer_id, inbox) in inboxes.iter() {
                if peer_id != &self.node_id {
                    // A dead peer should not break broadcast for the rest.
                    let _ = inbox
                        .send(Envelope {
                            from: self.node_id,
                            message: message.clone(),
                        })
                        .await;
                }
            }
            Ok(())
        }

        fn local_node_id(&self) -> NodeId {
            self.node_id
        }

        async fn connected_peers(&self) -> Result<Vec<NodeId>> {
            let inboxes = self.network.inboxes.read().await;
            Ok(inboxes
                .keys()
                .filter(|id| *id != &self.node_id)
                .copied()
                .collect())
        }
    }
}
