//! # Companion Query Client
//!
//! Phone-side half of the vitals exchange. Every attempt gets a fresh
//! correlation id and a pending slot; the client's own `/vitals_response`
//! handler completes the slot. A reply whose slot is gone (the attempt timed
//! out or a later attempt replaced it) is counted and discarded.

use crate::constants::paths;
use crate::messaging::{
    MessageHandler, MessageTransport, MessagingError, TransportMessage, VitalsRequest,
    VitalsResponse,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// One bounded request for live vitals
#[async_trait]
pub trait VitalsQuery: Send + Sync {
    /// `None` on timeout, send failure, or an undecodable reply
    async fn request_once(&self, timeout: Duration) -> Option<VitalsResponse>;
}

/// Counters for replies that did not complete an attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryClientStats {
    pub attempts: u64,
    pub late_replies: u64,
    pub rejected_replies: u64,
}

pub struct CompanionQueryClient {
    transport: Arc<dyn MessageTransport>,
    companion_node: String,
    pending: DashMap<Uuid, oneshot::Sender<VitalsResponse>>,
    attempts: AtomicU64,
    late_replies: AtomicU64,
    rejected_replies: AtomicU64,
}

impl std::fmt::Debug for CompanionQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionQueryClient")
            .field("local_node", &self.transport.local_node())
            .field("companion_node", &self.companion_node)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Removes the pending slot when an attempt ends, however it ends
struct PendingSlot<'a> {
    pending: &'a DashMap<Uuid, oneshot::Sender<VitalsResponse>>,
    correlation_id: Uuid,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.correlation_id);
    }
}

impl CompanionQueryClient {
    pub fn new(transport: Arc<dyn MessageTransport>, companion_node: impl Into<String>) -> Self {
        Self {
            transport,
            companion_node: companion_node.into(),
            pending: DashMap::new(),
            attempts: AtomicU64::new(0),
            late_replies: AtomicU64::new(0),
            rejected_replies: AtomicU64::new(0),
        }
    }

    /// Attempts currently waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> QueryClientStats {
        QueryClientStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            late_replies: self.late_replies.load(Ordering::Relaxed),
            rejected_replies: self.rejected_replies.load(Ordering::Relaxed),
        }
    }

    async fn exchange(
        &self,
        request: TransportMessage,
        reply: oneshot::Receiver<VitalsResponse>,
    ) -> Result<VitalsResponse, MessagingError> {
        self.transport.send(request).await?;
        reply.await.map_err(|_| MessagingError::TransportClosed)
    }
}

#[async_trait]
impl VitalsQuery for CompanionQueryClient {
    #[instrument(skip(self), fields(companion = %self.companion_node))]
    async fn request_once(&self, timeout: Duration) -> Option<VitalsResponse> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let request = VitalsRequest::new(&self.companion_node, timeout);
        let correlation_id = request.correlation_id;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(correlation_id, tx);
        let _slot = PendingSlot {
            pending: &self.pending,
            correlation_id,
        };

        let message = request.into_message(self.transport.local_node());
        let result = match tokio::time::timeout(timeout, self.exchange(message, rx)).await {
            Ok(result) => result,
            Err(_) => Err(MessagingError::timeout(
                paths::REQUEST_VITALS,
                timeout.as_millis() as u64,
            )),
        };

        match result {
            Ok(response) => {
                debug!(%correlation_id, response = %response, "Companion answered");
                Some(response)
            }
            Err(e @ MessagingError::Timeout { .. }) => {
                debug!(%correlation_id, error = %e, "Companion did not answer in time");
                None
            }
            Err(e) => {
                warn!(
                    %correlation_id,
                    error = %e,
                    transient = e.is_transient(),
                    "Companion request failed"
                );
                None
            }
        }
    }
}

#[async_trait]
impl MessageHandler for CompanionQueryClient {
    async fn on_message(&self, message: TransportMessage) {
        if message.path != paths::VITALS_RESPONSE {
            return;
        }
        if message.source_node != self.companion_node {
            self.rejected_replies.fetch_add(1, Ordering::Relaxed);
            let error = MessagingError::protocol(format!(
                "vitals response from unexpected node {}",
                message.source_node
            ));
            warn!(correlation_id = %message.correlation_id, error = %error, "Reply ignored");
            return;
        }

        let response = match VitalsResponse::decode(&message.payload) {
            Ok(response) => response,
            Err(e) => {
                self.rejected_replies.fetch_add(1, Ordering::Relaxed);
                warn!(correlation_id = %message.correlation_id, error = %e, "Undecodable vitals response");
                return;
            }
        };

        match self.pending.remove(&message.correlation_id) {
            Some((_, waiter)) => {
                if waiter.send(response).is_err() {
                    self.late_replies.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => {
                self.late_replies.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %message.correlation_id, "Late vitals response discarded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::LoopbackNetwork;

    #[tokio::test(start_paused = true)]
    async fn unanswered_attempt_times_out_and_clears_slot() {
        let network = LoopbackNetwork::new();
        network.endpoint("companion");
        let client = CompanionQueryClient::new(Arc::new(network.endpoint("phone")), "companion");

        let result = client.request_once(Duration::from_secs(5)).await;

        assert!(result.is_none());
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.stats().attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_companion_fails_fast() {
        let network = LoopbackNetwork::new();
        let client = CompanionQueryClient::new(Arc::new(network.endpoint("phone")), "companion");

        let started = tokio::time::Instant::now();
        assert!(client.request_once(Duration::from_secs(5)).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn uncorrelated_reply_is_counted_as_late() {
        let network = LoopbackNetwork::new();
        let client = CompanionQueryClient::new(Arc::new(network.endpoint("phone")), "companion");

        client
            .on_message(TransportMessage {
                source_node: "companion".to_string(),
                target_node: "phone".to_string(),
                path: paths::VITALS_RESPONSE.to_string(),
                correlation_id: Uuid::new_v4(),
                deadline_hint: None,
                payload: b"hr=70,spo2=98,ts=1".to_vec(),
            })
            .await;

        assert_eq!(client.stats().late_replies, 1);
    }

    #[tokio::test]
    async fn reply_from_wrong_node_is_rejected() {
        let network = LoopbackNetwork::new();
        let client = CompanionQueryClient::new(Arc::new(network.endpoint("phone")), "companion");

        client
            .on_message(TransportMessage {
                source_node: "intruder".to_string(),
                target_node: "phone".to_string(),
                path: paths::VITALS_RESPONSE.to_string(),
                correlation_id: Uuid::new_v4(),
                deadline_hint: None,
                payload: b"hr=70,spo2=98,ts=1".to_vec(),
            })
            .await;

        assert_eq!(client.stats().rejected_replies, 1);
        assert_eq!(client.stats().late_replies, 0);
    }
}
