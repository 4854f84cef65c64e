//! # Companion Device Exchange
//!
//! Both ends of the vitals request: the phone-side [`CompanionQueryClient`]
//! and the companion-side [`CompanionResponder`] with its sensor access.

pub mod query_client;
pub mod responder;
pub mod sensors;
pub mod states;

pub use query_client::{CompanionQueryClient, QueryClientStats, VitalsQuery};
pub use responder::CompanionResponder;
pub use sensors::{
    CapturedVitals, ListenerId, SensorDescriptor, SensorError, SensorKind, SensorPlatform,
    SensorReading, SensorSession,
};
pub use states::{ResponderEvent, ResponderState};
