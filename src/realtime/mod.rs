//! Fan-out of socket events to logical recipient groups.
//!
//! Every connection subscribes to the same broadcast channel and forwards
//! only the envelopes addressed to a group it has joined.

pub mod protocol;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::realtime::protocol::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    User(Uuid),
    Admins,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub group: Group,
    pub event: ServerEvent,
}

pub struct RealtimeHub {
    tx: broadcast::Sender<Envelope>,
}

impl RealtimeHub {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Returns how many connections saw the envelope. Zero is normal when
    /// nobody is online.
    pub fn publish(&self, group: Group, event: ServerEvent) -> usize {
        self.tx.send(Envelope { group, event }).unwrap_or(0)
    }
}
