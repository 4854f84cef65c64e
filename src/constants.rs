//! # System Constants
//!
//! Fixed values that define the operational boundaries of the relay. Every
//! tunable here has a matching field in [`crate::config::RelayConfig`] whose
//! default is taken from this module.

/// Trigger phrase a sender must include (after normalization) to request telemetry
pub const TRIGGER_PHRASE: &str = "SEND DATA 9213";

/// Durable key-value entry holding the last accepted request timestamp
pub const RATE_LIMIT_KEY: &str = "last_req_ts";

/// Sentinel marking "no valid reading captured"
pub const SENTINEL: i32 = -1;

/// Transport paths for the phone <-> companion exchange
pub mod paths {
    pub const REQUEST_VITALS: &str = "/request_vitals";
    pub const VITALS_RESPONSE: &str = "/vitals_response";
}

/// Default timing windows, all in seconds unless noted
pub mod timing {
    /// Minimum interval between two accepted requests
    pub const MIN_REQUEST_INTERVAL_SECONDS: i64 = 60;
    /// Per-attempt wait for a companion response
    pub const COMPANION_ATTEMPT_TIMEOUT_MS: u64 = 5_000;
    /// Maximum number of companion query attempts per command
    pub const COMPANION_MAX_ATTEMPTS: u32 = 3;
    /// Companion-side sampling deadline
    pub const SAMPLING_WINDOW_MS: u64 = 3_000;
    /// Time the companion reserves out of the requester's deadline for the reply to travel back
    pub const REPLY_MARGIN_MS: u64 = 250;
    /// Upper bound on the best-effort location fetch
    pub const LOCATION_TIMEOUT_MS: u64 = 10_000;
}

/// Plausibility ranges applied at sensor capture time
pub mod ranges {
    pub const HEART_RATE_MIN: i32 = 0;
    pub const OXYGEN_SATURATION_MIN: i32 = 70;
    pub const OXYGEN_SATURATION_MAX: i32 = 100;
}

/// Lowercase name fragments that identify an oxygen-saturation sensor.
///
/// Vendors expose SpO2 as a generic sensor, so the name is the only signal.
pub const OXYGEN_SENSOR_NAME_HINTS: [&str; 3] = ["spo2", "oxygen", "blood oxygen"];

/// Node id used for the phone side when none is configured
pub const DEFAULT_PHONE_NODE: &str = "phone";

/// Node id used for the companion side when none is configured
pub const DEFAULT_COMPANION_NODE: &str = "companion";
