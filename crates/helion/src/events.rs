//! # Replication events
//!
//! The core notifies its [`NetworkDelegate`] synchronously from the
//! structural drain. This module adapts that callback seam to a bounded
//! crossbeam channel so transport code can consume replication on its own
//! thread without ever blocking the simulation: when the consumer falls
//! behind, events are dropped and counted rather than stalling a tick.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use helion_core::{ComponentTag, EntityId, NetworkDelegate};

/// A replication-relevant structural change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicationEvent {
    /// A replicated component entered the world.
    ComponentAdded {
        /// Owning entity at the time of attachment.
        entity: EntityId,
        /// Component type tag.
        tag: ComponentTag,
    },
    /// A replicated component left the world.
    ComponentRemoved {
        /// Owning entity at the time of removal.
        entity: EntityId,
        /// Component type tag.
        tag: ComponentTag,
    },
}

/// [`NetworkDelegate`] that forwards events over a bounded channel.
pub struct ChannelReplicator {
    sender: Sender<ReplicationEvent>,
    receiver: Receiver<ReplicationEvent>,
    dropped: AtomicU64,
}

impl ChannelReplicator {
    /// Creates a replicator with room for `capacity` in-flight events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
        }
    }

    /// The consumer side. Clone freely; crossbeam receivers are cheap.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ReplicationEvent> {
        self.receiver.clone()
    }

    /// Events discarded because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn forward(&self, event: ReplicationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?event, "replication channel full, event dropped");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl NetworkDelegate for ChannelReplicator {
    fn component_added(&self, entity: EntityId, tag: ComponentTag) {
        self.forward(ReplicationEvent::ComponentAdded { entity, tag });
    }

    fn component_removed(&self, entity: EntityId, tag: ComponentTag) {
        self.forward(ReplicationEvent::ComponentRemoved { entity, tag });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_adds_and_removes() {
        let replicator = ChannelReplicator::new(8);
        let events = replicator.subscribe();
        let tag = ComponentTag::of::<u32>();
        let id = EntityId::NULL;

        replicator.component_added(id, tag);
        replicator.component_removed(id, tag);

        assert_eq!(
            events.try_recv().unwrap(),
            ReplicationEvent::ComponentAdded { entity: id, tag }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            ReplicationEvent::ComponentRemoved { entity: id, tag }
        );
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let replicator = ChannelReplicator::new(1);
        let tag = ComponentTag::of::<u32>();

        replicator.component_added(EntityId::NULL, tag);
        replicator.component_added(EntityId::NULL, tag);

        assert_eq!(replicator.dropped(), 1);
        assert_eq!(replicator.subscribe().len(), 1);
    }
}
