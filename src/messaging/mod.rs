//! # Companion Messaging
//!
//! Node-addressed, path-qualified message delivery between the relay (phone)
//! and its companion device, plus the vitals wire codec.

pub mod errors;
pub mod loopback;
pub mod message;
pub mod transport;

pub use errors::{MessagingError, MessagingResult};
pub use loopback::{LoopbackEndpoint, LoopbackNetwork};
pub use message::{TransportMessage, VitalsRequest, VitalsResponse};
pub use transport::{MessageHandler, MessageTransport};
