//! # Simulation Collaborators
//!
//! In-process stand-ins for the devices and services the relay talks to, and
//! [`connect_companion`] to wire a phone and a companion together over a
//! [`LoopbackNetwork`]. Used by the `relay-sim` binary and by tests.

pub mod carrier;
pub mod positioning;
pub mod sensors;

use crate::clock::Clock;
use crate::companion::{CompanionQueryClient, CompanionResponder, SensorPlatform};
use crate::config::CompanionConfig;
use crate::constants::paths;
use crate::messaging::LoopbackNetwork;
use std::sync::Arc;

pub use carrier::{ConsoleCarrier, RecordingCarrier, SentMessage};
pub use positioning::FixedPositioning;
pub use sensors::{ScriptedReading, ScriptedSensorPlatform};

/// Both ends of a wired phone/companion pair
#[derive(Debug, Clone)]
pub struct CompanionLink {
    pub query_client: Arc<CompanionQueryClient>,
    pub responder: Arc<CompanionResponder>,
}

/// Register a responder on the companion node and a query client on the
/// phone node, using the node ids and sampling window from `config`
pub fn connect_companion(
    network: &LoopbackNetwork,
    config: &CompanionConfig,
    platform: Arc<dyn SensorPlatform>,
    clock: Arc<dyn Clock>,
) -> CompanionLink {
    let phone = Arc::new(network.endpoint(config.phone_node_id.clone()));
    let companion = Arc::new(network.endpoint(config.node_id.clone()));

    let query_client = Arc::new(CompanionQueryClient::new(phone, config.node_id.clone()));
    let responder = Arc::new(CompanionResponder::new(
        platform,
        companion,
        clock,
        config.sampling_window(),
    ));

    network.register_handler(
        config.phone_node_id.clone(),
        paths::VITALS_RESPONSE,
        query_client.clone(),
    );
    network.register_handler(
        config.node_id.clone(),
        paths::REQUEST_VITALS,
        responder.clone(),
    );

    CompanionLink {
        query_client,
        responder,
    }
}
