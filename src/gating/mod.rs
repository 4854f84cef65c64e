//! # Command Gating
//!
//! The three checks an inbound command must pass before any companion query
//! is issued: the process-wide rate limit, the trusted-sender lookup, and the
//! trigger-phrase match. All three are silent on rejection.

pub mod command_matcher;
pub mod rate_limiter;
pub mod trust_store;

pub use command_matcher::{normalize_command, CommandMatcher};
pub use rate_limiter::RateLimiter;
pub use trust_store::{normalize_identifier, Directory, StaticDirectory, TrustStore};
