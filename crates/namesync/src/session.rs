//! Message-driven sync session.
//!
//! Wires one [`FullSyncCoordinator`] to a [`SyncTransport`] and turns the
//! message flow between nodes into coordinator events:
//!
//! ```text
//! Node A                              Node B
//!   |-------- Digest ----------------->|  (A published; B compares)
//!   |<------- Digest ------------------|  (B is behind and cannot name
//!   |                                  |   the gap; it shows A its table)
//!   |-------- State ------------------>|  (A's table + the names B lacks)
//!   |<------- Digest ------------------|  (B re-advertises; tables match,
//!   |                                  |   the exchange goes quiet)
//! ```
//!
//! The session never schedules timers: every send is a reaction to a local
//! publish or an incoming message, so the exchange quiesces exactly when
//! both tables are equal. Periodic re-advertisement, retries, and loss
//! recovery belong to the transport or the application.

use std::time::Duration;

use crate::coordinator::{FullSyncCoordinator, PublishOutcome, SyncEffects, SyncEvent};
use crate::error::{Result, SyncError};
use crate::messages::{SyncMessage, PROTOCOL_VERSION};
use crate::transport::{NodeId, SyncTransport};

use namesync_core::{Name, SeqName};

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long [`SyncSession::run_until_quiet`] waits for the next
    /// message before declaring the exchange quiet.
    pub recv_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recv_timeout: Duration::from_secs(1),
        }
    }
}

/// Counters from a [`SyncSession::run_until_quiet`] drive.
#[derive(Debug, Default)]
pub struct SessionReport {
    /// Messages received and dispatched.
    pub messages_processed: usize,
    /// Update ranges accepted into the local state.
    pub updates_applied: usize,
    /// Identifiers served to peers in `State` replies.
    pub names_sent: usize,
}

/// One node's sync session: a coordinator plus its transport.
pub struct SyncSession<T: SyncTransport> {
    coordinator: FullSyncCoordinator,
    transport: T,
    config: SessionConfig,
}

impl<T: SyncTransport> SyncSession<T> {
    /// Create a session over an existing coordinator.
    pub fn new(coordinator: FullSyncCoordinator, transport: T, config: SessionConfig) -> Self {
        Self {
            coordinator,
            transport,
            config,
        }
    }

    /// The coordinator (read-only).
    pub fn coordinator(&self) -> &FullSyncCoordinator {
        &self.coordinator
    }

    /// The local node's identity.
    pub fn local_node_id(&self) -> NodeId {
        self.transport.local_node_id()
    }

    /// Register a producer prefix. Returns false if already registered.
    pub fn add_prefix(&mut self, prefix: &Name) -> bool {
        self.coordinator.add_prefix(prefix)
    }

    /// Deregister a prefix, re-advertising if the table changed.
    pub async fn remove_prefix(&mut self, prefix: &Name) -> Result<()> {
        let effects = self
            .coordinator
            .handle(SyncEvent::RemovePrefix { prefix: prefix.clone() })?;
        if effects.digest_changed {
            self.advertise().await?;
        }
        Ok(())
    }

    /// Publish locally and advertise the new digest to all peers.
    pub async fn publish(&mut self, prefix: &Name, seq: Option<u32>) -> Result<PublishOutcome> {
        let outcome = self.coordinator.publish(prefix, seq);
        if matches!(outcome, PublishOutcome::Published { .. }) {
            self.advertise().await?;
        }
        Ok(outcome)
    }

    /// Broadcast our current table to every connected peer.
    pub async fn advertise(&self) -> Result<()> {
        self.transport
            .broadcast(SyncMessage::Digest {
                protocol_version: PROTOCOL_VERSION,
                table: self.coordinator.encoded_table(),
            })
            .await
    }

    /// Receive and dispatch one message, if any arrives in time.
    pub async fn process_one(&mut self) -> Result<Option<SyncEffects>> {
        let Some((from, message)) = self.transport.recv_timeout(self.config.recv_timeout).await?
        else {
            return Ok(None);
        };
        self.dispatch(from, message).await.map(Some)
    }

    /// Process messages until the exchange goes quiet, then report.
    pub async fn run_until_quiet(&mut self) -> Result<SessionReport> {
        let mut report = SessionReport::default();
        while let Some(effects) = self.process_one().await? {
            report.messages_processed += 1;
            report.updates_applied += effects.updates.len();
            report.names_sent += effects.send_to_peer.len();
        }
        Ok(report)
    }

    async fn dispatch(&mut self, from: NodeId, message: SyncMessage) -> Result<SyncEffects> {
        message
            .validate_limits()
            .map_err(|reason| SyncError::InvalidMessage(reason.into()))?;
        if message.protocol_version() != PROTOCOL_VERSION {
            return Err(SyncError::VersionMismatch {
                local: PROTOCOL_VERSION,
                peer: message.protocol_version(),
            });
        }

        match message {
            SyncMessage::Digest { table, .. } => {
                tracing::debug!(%from, "peer digest received");
                let effects = self.coordinator.handle(SyncEvent::PeerTable {
                    encoded: table.into(),
                    announced: Vec::new(),
                })?;

                if !effects.send_to_peer.is_empty() {
                    self.reply_state(&from, effects.send_to_peer.clone()).await?;
                } else if !effects.unresolved.is_empty() || !effects.deferred.is_empty() {
                    // The peer holds data we cannot name yet. Showing it
                    // our digest makes it compute the difference on its
                    // side and serve us a State reply.
                    self.transport
                        .send(
                            &from,
                            SyncMessage::Digest {
                                protocol_version: PROTOCOL_VERSION,
                                table: self.coordinator.encoded_table(),
                            },
                        )
                        .await?;
                }
                Ok(effects)
            }
            SyncMessage::State { table, announced, .. } => {
                tracing::debug!(%from, announced = announced.len(), "peer state received");
                let effects = self.coordinator.handle(SyncEvent::PeerTable {
                    encoded: table.into(),
                    announced,
                })?;
                if !effects.send_to_peer.is_empty() {
                    // The embedded table shows the peer still lacks names
                    // we hold; serve them without waiting for its digest.
                    self.reply_state(&from, effects.send_to_peer.clone()).await?;
                }
                if effects.digest_changed {
                    self.advertise().await?;
                }
                Ok(effects)
            }
        }
    }

    async fn reply_state(&self, to: &NodeId, announced: Vec<SeqName>) -> Result<()> {
        self.transport
            .send(
                to,
                SyncMessage::State {
                    protocol_version: PROTOCOL_VERSION,
                    table: self.coordinator.encoded_table(),
                    announced,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryNetwork;

    fn config() -> SessionConfig {
        SessionConfig {
            recv_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_digest_is_answered_with_state() {
        let network = MemoryNetwork::new();
        let node_a = NodeId::from_bytes([0xAA; 32]);
        let node_b = NodeId::from_bytes([0xBB; 32]);

        let mut session_a = SyncSession::new(
            FullSyncCoordinator::new(10),
            network.create_transport(node_a).await,
            config(),
        );
        let transport_b = network.create_transport(node_b).await;

        let prefix = Name::from_uri("/producer/a");
        session_a.add_prefix(&prefix);
        session_a.publish(&prefix, Some(4)).await.unwrap();
        // Drain the advertisement triggered by the publish.
        let _ = transport_b.recv().await.unwrap();

        // B shows A an empty table; A must serve what B is missing.
        let empty = FullSyncCoordinator::new(10);
        transport_b
            .send(
                &node_a,
                SyncMessage::Digest {
                    protocol_version: PROTOCOL_VERSION,
                    table: empty.encoded_table(),
                },
            )
            .await
            .unwrap();

        let effects = session_a.process_one().await.unwrap().unwrap();
        assert_eq!(effects.send_to_peer.len(), 1);

        let (_, reply) = transport_b.recv().await.unwrap();
        match reply {
            SyncMessage::State { announced, .. } => {
                assert_eq!(announced.len(), 1);
                assert_eq!(announced[0].prefix, prefix);
                assert_eq!(announced[0].seq, 4);
            }
            other => panic!("expected State, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let network = MemoryNetwork::new();
        let node_a = NodeId::from_bytes([0xAA; 32]);
        let node_b = NodeId::from_bytes([0xBB; 32]);

        let mut session_a = SyncSession::new(
            FullSyncCoordinator::new(10),
            network.create_transport(node_a).await,
            config(),
        );
        let transport_b = network.create_transport(node_b).await;

        transport_b
            .send(
                &node_a,
                SyncMessage::Digest {
                    protocol_version: PROTOCOL_VERSION + 1,
                    table: FullSyncCoordinator::new(10).encoded_table(),
                },
            )
            .await
            .unwrap();

        let result = session_a.process_one().await;
        assert!(matches!(result, Err(SyncError::VersionMismatch { .. })));
    }
}
