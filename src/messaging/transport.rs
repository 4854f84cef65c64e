//! Transport seams. The relay never talks to a concrete transport directly,
//! so the loopback network and a real device link are interchangeable.

use super::{MessagingResult, TransportMessage};
use async_trait::async_trait;

/// Outbound half of a node's link
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Node id this endpoint sends as
    fn local_node(&self) -> &str;

    /// Hand a message to the transport. `Ok` means accepted for delivery,
    /// not delivered.
    async fn send(&self, message: TransportMessage) -> MessagingResult<()>;
}

/// Inbound half: receives every message addressed to a registered path
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: TransportMessage);
}
