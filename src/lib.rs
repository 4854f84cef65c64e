#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Telemetry Relay
//!
//! Command-triggered telemetry relay. A trusted sender texts a trigger
//! phrase; the relay asks a paired companion device for live heart rate and
//! oxygen saturation, optionally adds a location fix, and texts back a single
//! formatted reply.
//!
//! ## Architecture
//!
//! - **Gating**: rate limit window, trusted-sender lookup, trigger phrase match.
//!   Rejections are silent.
//! - **Companion exchange**: correlated request/response over a node-addressed
//!   message transport, with bounded retries on the phone side and a bounded
//!   sampling window on the companion side.
//! - **Orchestration**: one worker task per inbound command; collaborator
//!   failures degrade the reply instead of suppressing it.
//!
//! ## Module Organization
//!
//! - [`gating`] - Rate limiter, trust store, command matcher
//! - [`companion`] - Query client, responder, sensor access
//! - [`messaging`] - Transport traits, wire codec, loopback network
//! - [`orchestration`] - Trigger pipeline and relay service
//! - [`reply`] - Reply text formatting
//! - [`storage`] - Durable rate-limit state
//! - [`config`] - Layered configuration
//! - [`simulation`] - In-process collaborators for local runs and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telemetry_relay::clock::SystemClock;
//! use telemetry_relay::config::RelayConfig;
//! use telemetry_relay::gating::StaticDirectory;
//! use telemetry_relay::messaging::LoopbackNetwork;
//! use telemetry_relay::models::InboundCommand;
//! use telemetry_relay::orchestration::{Collaborators, TelemetryRelay, TriggerOrchestrator};
//! use telemetry_relay::simulation::{connect_companion, ConsoleCarrier, ScriptedSensorPlatform};
//! use telemetry_relay::storage::InMemoryRateLimitStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::default();
//! let network = LoopbackNetwork::new();
//! let link = connect_companion(
//!     &network,
//!     &config.companion,
//!     Arc::new(ScriptedSensorPlatform::new()),
//!     Arc::new(SystemClock),
//! );
//!
//! let orchestrator = TriggerOrchestrator::new(
//!     Collaborators {
//!         rate_limit_store: Arc::new(InMemoryRateLimitStore::new()),
//!         directory: Arc::new(StaticDirectory::new(["+15551230000"])),
//!         companion: link.query_client,
//!         positioning: None,
//!         carrier: Arc::new(ConsoleCarrier),
//!     },
//!     &config,
//! );
//!
//! let relay = TelemetryRelay::new(Arc::new(orchestrator));
//! let command = InboundCommand::new("+15551230000", "SEND DATA 9213", chrono::Utc::now());
//! let outcome = relay.dispatch(command)?.await?;
//! println!("{outcome:?}");
//! relay.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod companion;
pub mod config;
pub mod constants;
pub mod error;
pub mod gating;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod reply;
pub mod simulation;
pub mod storage;

pub use companion::{CompanionQueryClient, CompanionResponder, VitalsQuery};
pub use config::{ConfigManager, RelayConfig};
pub use error::{CollaboratorError, RelayError, Result};
pub use messaging::{VitalsRequest, VitalsResponse};
pub use models::{InboundCommand, LocationFix};
pub use orchestration::{TelemetryRelay, TriggerOrchestrator, TriggerOutcome};
pub use reply::ReplyFormatter;
