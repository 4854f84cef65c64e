//! # Companion Responder
//!
//! Runs on the companion device. Each `/request_vitals` message is answered
//! with one `/vitals_response` carrying whatever the sensors produced within
//! the sampling window.

use super::sensors::{CapturedVitals, SensorPlatform, SensorSession};
use super::states::{ResponderEvent, ResponderState};
use crate::clock::Clock;
use crate::constants::{paths, timing};
use crate::messaging::{MessageHandler, MessageTransport, TransportMessage, VitalsResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

pub struct CompanionResponder {
    platform: Arc<dyn SensorPlatform>,
    transport: Arc<dyn MessageTransport>,
    clock: Arc<dyn Clock>,
    sampling_window: Duration,
}

impl std::fmt::Debug for CompanionResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionResponder")
            .field("node", &self.transport.local_node())
            .field("sampling_window", &self.sampling_window)
            .finish()
    }
}

impl CompanionResponder {
    pub fn new(
        platform: Arc<dyn SensorPlatform>,
        transport: Arc<dyn MessageTransport>,
        clock: Arc<dyn Clock>,
        sampling_window: Duration,
    ) -> Self {
        Self {
            platform,
            transport,
            clock,
            sampling_window,
        }
    }

    /// Collect one set of readings. The window is the configured sampling
    /// window, shortened to the requester's deadline hint minus
    /// [`timing::REPLY_MARGIN_MS`] when that is smaller, so the reply lands
    /// while the requester is still waiting.
    pub async fn sample(&self, deadline_hint: Option<Duration>) -> VitalsResponse {
        let permitted = self.platform.has_body_sensor_permission();
        let mut state = advance(
            ResponderState::Idle,
            ResponderEvent::RequestReceived { permitted },
        );

        if !permitted {
            debug!(state = %state, "Body sensor permission missing, replying with sentinels");
            return VitalsResponse::unavailable(self.clock.now().timestamp());
        }

        let window = sampling_window_for(self.sampling_window, deadline_hint);

        let mut session = match SensorSession::open(Arc::clone(&self.platform)) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Could not start sensor sampling");
                return VitalsResponse::unavailable(self.clock.now().timestamp());
            }
        };

        let has_oxygen_sensor = session.has_oxygen_sensor();
        let mut captured = CapturedVitals::default();

        let sampling = async {
            loop {
                if !session.record_next(&mut captured).await {
                    return false;
                }
                if captured.is_satisfied(has_oxygen_sensor) {
                    return true;
                }
            }
        };

        let event = match tokio::time::timeout(window, sampling).await {
            Ok(true) => ResponderEvent::ReadingsSatisfied,
            Ok(false) => {
                debug!("Sensor stream ended before readings were complete");
                ResponderEvent::WindowElapsed
            }
            Err(_) => ResponderEvent::WindowElapsed,
        };
        drop(session);

        state = advance(state, event);
        debug!(
            state = %state,
            heart_rate = ?captured.heart_rate,
            oxygen_saturation = ?captured.oxygen_saturation,
            "Sampling finished"
        );

        VitalsResponse::new(
            captured.heart_rate,
            captured.oxygen_saturation,
            self.clock.now().timestamp(),
        )
    }
}

fn sampling_window_for(configured: Duration, deadline_hint: Option<Duration>) -> Duration {
    match deadline_hint {
        Some(hint) => hint
            .saturating_sub(Duration::from_millis(timing::REPLY_MARGIN_MS))
            .min(configured),
        None => configured,
    }
}

fn advance(state: ResponderState, event: ResponderEvent) -> ResponderState {
    match state.transition(event) {
        Some(next) => {
            trace!(from = %state, to = %next, event = event.event_type(), "Responder transition");
            next
        }
        None => {
            warn!(state = %state, event = event.event_type(), "Ignoring invalid responder transition");
            state
        }
    }
}

#[async_trait]
impl MessageHandler for CompanionResponder {
    #[instrument(skip(self, message), fields(correlation_id = %message.correlation_id, from = %message.source_node))]
    async fn on_message(&self, message: TransportMessage) {
        if message.path != paths::REQUEST_VITALS {
            trace!(path = %message.path, "Ignoring message on unrelated path");
            return;
        }

        let response = self.sample(message.deadline_hint).await;
        let reply = message.reply(paths::VITALS_RESPONSE, response.encode());

        match self.transport.send(reply).await {
            Ok(()) => info!(response = %response, "Vitals response sent"),
            Err(e) => warn!(error = %e, "Failed to send vitals response"),
        }
    }
}
