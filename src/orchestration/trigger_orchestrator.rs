//! # Trigger Orchestrator
//!
//! Turns one inbound command into at most one outbound reply.
//!
//! ## Pipeline
//!
//! 1. Rate-limit window check (no side effect)
//! 2. Sender trust lookup, failing closed
//! 3. Trigger phrase match
//! 4. Rate-limit acceptance; the window is stamped here and never rolled back
//! 5. Location fix and companion query, concurrently
//! 6. Reply formatting and a single carrier send
//!
//! Gate rejections are silent apart from logging. Once a command is accepted
//! nothing escapes [`TriggerOrchestrator::handle`]: collaborator failures
//! degrade the reply and panics are caught at this boundary.

use super::types::{CarrierChannel, GateRejection, PositioningProvider, TriggerOutcome};
use crate::companion::VitalsQuery;
use crate::config::RelayConfig;
use crate::gating::{CommandMatcher, Directory, RateLimiter, TrustStore};
use crate::logging::{log_error, log_gate_rejection};
use crate::messaging::VitalsResponse;
use crate::models::{InboundCommand, LocationFix};
use crate::reply::ReplyFormatter;
use crate::storage::RateLimitStore;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// External collaborators the orchestrator is wired to
#[derive(Clone)]
pub struct Collaborators {
    pub rate_limit_store: Arc<dyn RateLimitStore>,
    pub directory: Arc<dyn Directory>,
    pub companion: Arc<dyn VitalsQuery>,
    /// `None` disables location entirely
    pub positioning: Option<Arc<dyn PositioningProvider>>,
    pub carrier: Arc<dyn CarrierChannel>,
}

/// Timing and retry knobs taken from [`RelayConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub location_enabled: bool,
    pub location_timeout: Duration,
}

impl From<&RelayConfig> for OrchestratorSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_attempts: config.companion.max_attempts,
            attempt_timeout: config.companion.attempt_timeout(),
            location_enabled: config.location.enabled,
            location_timeout: config.location.timeout(),
        }
    }
}

pub struct TriggerOrchestrator {
    rate_limiter: Arc<RateLimiter>,
    trust_store: TrustStore,
    matcher: CommandMatcher,
    companion: Arc<dyn VitalsQuery>,
    positioning: Option<Arc<dyn PositioningProvider>>,
    carrier: Arc<dyn CarrierChannel>,
    settings: OrchestratorSettings,
}

impl std::fmt::Debug for TriggerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerOrchestrator")
            .field("rate_limiter", &self.rate_limiter)
            .field("matcher", &self.matcher)
            .field("positioning", &self.positioning.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl TriggerOrchestrator {
    pub fn new(collaborators: Collaborators, config: &RelayConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            collaborators.rate_limit_store,
            config.gating.min_interval_seconds,
        ));

        Self {
            rate_limiter,
            trust_store: TrustStore::new(collaborators.directory),
            matcher: CommandMatcher::new(&config.gating.trigger_phrase),
            companion: collaborators.companion,
            positioning: collaborators.positioning,
            carrier: collaborators.carrier,
            settings: OrchestratorSettings::from(config),
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    /// Run the full pipeline for one command
    #[instrument(skip(self, command), fields(sender = %command.sender, received_at = %command.received_at))]
    pub async fn handle(&self, command: &InboundCommand) -> TriggerOutcome {
        let now = command.received_at.timestamp();

        if !self.rate_limiter.is_open(now) {
            return self.reject(command, GateRejection::RateLimited, None);
        }

        if !self.trust_store.is_trusted(&command.sender).await {
            return self.reject(command, GateRejection::Untrusted, None);
        }

        if !self.matcher.matches(&command.body) {
            return self.reject(command, GateRejection::NoTriggerPhrase, None);
        }

        // Another worker may have been accepted since the first check
        if !self.rate_limiter.allow(now) {
            return self.reject(
                command,
                GateRejection::RateLimited,
                Some("window taken by a concurrent command"),
            );
        }

        info!("Command accepted, collecting telemetry");

        match AssertUnwindSafe(self.fulfil(command)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log_error(
                    "trigger_orchestrator",
                    "fulfil",
                    &message,
                    Some(&command.sender),
                );
                TriggerOutcome::Failed { error: message }
            }
        }
    }

    fn reject(
        &self,
        command: &InboundCommand,
        gate: GateRejection,
        details: Option<&str>,
    ) -> TriggerOutcome {
        log_gate_rejection(&command.sender, gate.gate_name(), details);
        TriggerOutcome::Rejected(gate)
    }

    async fn fulfil(&self, command: &InboundCommand) -> TriggerOutcome {
        let (location, telemetry) = tokio::join!(self.fetch_location(), self.query_companion());

        let reply = ReplyFormatter::format(command.received_at, telemetry.as_ref(), location.as_ref());
        let telemetry_included = telemetry.is_some();
        let location_included = telemetry_included && location.is_some();

        match self.carrier.send(&command.sender, &reply).await {
            Ok(()) => {
                info!(telemetry_included, location_included, "Reply sent");
                TriggerOutcome::Replied {
                    reply,
                    telemetry_included,
                    location_included,
                }
            }
            Err(error) => {
                log_error(
                    "trigger_orchestrator",
                    "send_reply",
                    &error.to_string(),
                    Some(&command.sender),
                );
                TriggerOutcome::SendFailed { reply, error }
            }
        }
    }

    /// Sequential attempts, stopping at the first response
    async fn query_companion(&self) -> Option<VitalsResponse> {
        for attempt in 1..=self.settings.max_attempts {
            if let Some(response) = self
                .companion
                .request_once(self.settings.attempt_timeout)
                .await
            {
                debug!(attempt, "Companion telemetry received");
                return Some(response);
            }
            debug!(
                attempt,
                max_attempts = self.settings.max_attempts,
                "Companion attempt produced no telemetry"
            );
        }
        warn!(
            attempts = self.settings.max_attempts,
            "Companion unavailable, replying without telemetry"
        );
        None
    }

    async fn fetch_location(&self) -> Option<LocationFix> {
        if !self.settings.location_enabled {
            return None;
        }
        let provider = self.positioning.as_ref()?;
        let timeout = self.settings.location_timeout;

        match tokio::time::timeout(timeout, provider.get_fix(timeout)).await {
            Ok(Ok(fix)) => fix,
            Ok(Err(e)) => {
                warn!(error = %e, "Location fix failed");
                None
            }
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "Location fix timed out");
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "panic: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "panic: owned");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "panic with non-string payload");
    }

    #[test]
    fn settings_follow_config() {
        let mut config = RelayConfig::default();
        config.companion.max_attempts = 5;
        config.location.enabled = false;

        let settings = OrchestratorSettings::from(&config);
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.attempt_timeout, Duration::from_secs(5));
        assert!(!settings.location_enabled);
        assert_eq!(settings.location_timeout, Duration::from_secs(10));
    }
}
