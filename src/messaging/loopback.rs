//! In-process message network.
//!
//! Stands in for the device link when running the relay locally and in tests.
//! Each node registers handlers per path; `send` hands the message to the
//! target's handler on a fresh task, optionally after a fixed latency, so
//! delivery is asynchronous the way a radio link is.

use super::{MessageHandler, MessageTransport, MessagingError, MessagingResult, TransportMessage};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Default)]
struct NetworkInner {
    connected: DashSet<String>,
    handlers: DashMap<(String, String), Arc<dyn MessageHandler>>,
    muted_paths: DashSet<String>,
    latency: RwLock<Duration>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Shared handle to an in-process network; clones address the same network
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    inner: Arc<NetworkInner>,
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("connected", &self.inner.connected.len())
            .field("handlers", &self.inner.handlers.len())
            .field("delivered", &self.delivered_count())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `node_id` and return its sending endpoint
    pub fn endpoint(&self, node_id: impl Into<String>) -> LoopbackEndpoint {
        let node_id = node_id.into();
        self.inner.connected.insert(node_id.clone());
        LoopbackEndpoint {
            network: self.clone(),
            node_id,
        }
    }

    /// Route messages for `path` on `node_id` to `handler`, replacing any previous one
    pub fn register_handler(
        &self,
        node_id: impl Into<String>,
        path: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) {
        let node_id = node_id.into();
        self.inner.connected.insert(node_id.clone());
        self.inner.handlers.insert((node_id, path.into()), handler);
    }

    /// Take a node off the network; sends to it fail with `NodeUnreachable`
    pub fn disconnect(&self, node_id: &str) {
        self.inner.connected.remove(node_id);
    }

    pub fn reconnect(&self, node_id: &str) {
        self.inner.connected.insert(node_id.to_string());
    }

    /// Silently lose every message on `path`, like a link that accepts but never delivers
    pub fn mute_path(&self, path: impl Into<String>) {
        self.inner.muted_paths.insert(path.into());
    }

    pub fn unmute_path(&self, path: &str) {
        self.inner.muted_paths.remove(path);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.write() = latency;
    }

    pub fn delivered_count(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn route(&self, message: TransportMessage) -> MessagingResult<()> {
        if !self.inner.connected.contains(&message.target_node) {
            return Err(MessagingError::node_unreachable(&message.target_node));
        }

        if self.inner.muted_paths.contains(&message.path) {
            trace!(path = %message.path, correlation_id = %message.correlation_id, "Muted path, dropping message");
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let key = (message.target_node.clone(), message.path.clone());
        let Some(handler) = self.inner.handlers.get(&key).map(|h| Arc::clone(h.value())) else {
            debug!(
                target_node = %message.target_node,
                path = %message.path,
                "No handler registered, dropping message"
            );
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        };

        let latency = *self.inner.latency.read();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            inner.delivered.fetch_add(1, Ordering::Relaxed);
            handler.on_message(message).await;
        });
        Ok(())
    }
}

/// A node's sending side on a [`LoopbackNetwork`]
#[derive(Clone, Debug)]
pub struct LoopbackEndpoint {
    network: LoopbackNetwork,
    node_id: String,
}

#[async_trait]
impl MessageTransport for LoopbackEndpoint {
    fn local_node(&self) -> &str {
        &self.node_id
    }

    async fn send(&self, mut message: TransportMessage) -> MessagingResult<()> {
        if !self.network.inner.connected.contains(&self.node_id) {
            return Err(MessagingError::delivery(
                &message.path,
                format!("sending node {} is disconnected", self.node_id),
            ));
        }
        message.source_node = self.node_id.clone();
        self.network.route(message)
    }
}
