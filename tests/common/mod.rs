//! Shared relay test harness: a phone and a scripted companion on a loopback
//! network, with recording collaborators on every outbound edge.

#![allow(dead_code)] // Not every test binary uses every helper

pub mod doubles;

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use telemetry_relay::clock::ManualClock;
use telemetry_relay::config::RelayConfig;
use telemetry_relay::gating::{Directory, StaticDirectory};
use telemetry_relay::messaging::LoopbackNetwork;
use telemetry_relay::models::InboundCommand;
use telemetry_relay::orchestration::{Collaborators, PositioningProvider, TriggerOrchestrator};
use telemetry_relay::simulation::{
    connect_companion, CompanionLink, FixedPositioning, RecordingCarrier, ScriptedSensorPlatform,
};
use telemetry_relay::storage::{InMemoryRateLimitStore, RateLimitStore};
use telemetry_relay::VitalsQuery;

pub const TRUSTED_SENDER: &str = "+15551230000";
pub const UNKNOWN_SENDER: &str = "+15559990000";
pub const TRIGGER_BODY: &str = "  send   DATA 9213 ";

pub fn at_epoch(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap()
}

/// Trusted sender, trigger phrase, received at `seconds`
pub fn trigger_at(seconds: i64) -> InboundCommand {
    InboundCommand::new(TRUSTED_SENDER, TRIGGER_BODY, at_epoch(seconds))
}

pub fn command(sender: &str, body: &str, seconds: i64) -> InboundCommand {
    InboundCommand::new(sender, body, at_epoch(seconds))
}

/// Heart rate 72 after 200ms, SpO2 97 after 300ms
pub fn healthy_platform() -> ScriptedSensorPlatform {
    ScriptedSensorPlatform::new()
        .with_heart_rate_sensor([(Duration::from_millis(200), 72.0_f32)])
        .with_oxygen_sensor("Vendor SpO2 Sensor", [(Duration::from_millis(300), 97.0_f32)])
}

pub struct RelayHarness {
    pub config: RelayConfig,
    pub network: LoopbackNetwork,
    pub platform: Arc<ScriptedSensorPlatform>,
    pub clock: Arc<ManualClock>,
    pub link: CompanionLink,
    pub store: Arc<dyn RateLimitStore>,
    pub carrier: Arc<RecordingCarrier>,
    pub orchestrator: Arc<TriggerOrchestrator>,
}

impl RelayHarness {
    pub fn builder() -> RelayHarnessBuilder {
        RelayHarnessBuilder::default()
    }

    /// Defaults: healthy companion, no positioning, empty rate-limit state
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn last_accepted(&self) -> Option<i64> {
        self.store.load().unwrap()
    }

    pub fn companion_attempts(&self) -> u64 {
        self.link.query_client.stats().attempts
    }
}

pub struct RelayHarnessBuilder {
    config: RelayConfig,
    platform: ScriptedSensorPlatform,
    positioning: Option<Arc<dyn PositioningProvider>>,
    store: Arc<dyn RateLimitStore>,
    directory: Option<Arc<dyn Directory>>,
    companion: Option<Arc<dyn VitalsQuery>>,
}

impl Default for RelayHarnessBuilder {
    fn default() -> Self {
        let mut config = RelayConfig::default();
        config.gating.trusted_senders = vec![TRUSTED_SENDER.to_string()];
        Self {
            config,
            platform: healthy_platform(),
            positioning: None,
            store: Arc::new(InMemoryRateLimitStore::new()),
            directory: None,
            companion: None,
        }
    }
}

impl RelayHarnessBuilder {
    pub fn config(mut self, edit: impl FnOnce(&mut RelayConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn platform(mut self, platform: ScriptedSensorPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn positioning(mut self, positioning: FixedPositioning) -> Self {
        self.positioning = Some(Arc::new(positioning));
        self
    }

    pub fn store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = store;
        self
    }

    pub fn directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Replace the loopback query client seen by the orchestrator
    pub fn companion(mut self, companion: Arc<dyn VitalsQuery>) -> Self {
        self.companion = Some(companion);
        self
    }

    pub fn build(self) -> RelayHarness {
        let network = LoopbackNetwork::new();
        let platform = Arc::new(self.platform);
        let clock = Arc::new(ManualClock::at_epoch_seconds(0));
        let link = connect_companion(
            &network,
            &self.config.companion,
            platform.clone(),
            clock.clone(),
        );
        let carrier = Arc::new(RecordingCarrier::new());
        let directory: Arc<dyn Directory> = match self.directory {
            Some(directory) => directory,
            None => Arc::new(StaticDirectory::new(&self.config.gating.trusted_senders)),
        };
        let companion: Arc<dyn VitalsQuery> = match self.companion {
            Some(companion) => companion,
            None => link.query_client.clone(),
        };

        let orchestrator = Arc::new(TriggerOrchestrator::new(
            Collaborators {
                rate_limit_store: self.store.clone(),
                directory,
                companion,
                positioning: self.positioning,
                carrier: carrier.clone(),
            },
            &self.config,
        ));

        RelayHarness {
            config: self.config,
            network,
            platform,
            clock,
            link,
            store: self.store,
            carrier,
            orchestrator,
        }
    }
}
