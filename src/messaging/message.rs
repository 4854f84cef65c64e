//! # Vitals Message Structures
//!
//! The transport envelope and the two protocol messages carried in it.
//!
//! Wire payloads are fixed for interop with existing companion builds:
//! a request has an empty payload, a response is exactly
//! `hr=<int>,spo2=<int>,ts=<epoch-seconds>`. Correlation lives in the
//! envelope, never in the payload.

use super::{MessagingError, MessagingResult};
use crate::constants::{paths, ranges, SENTINEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Envelope for every message on the phone <-> companion link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportMessage {
    pub source_node: String,
    pub target_node: String,
    pub path: String,
    /// Ties a response to the request attempt that caused it
    pub correlation_id: Uuid,
    /// How long the sender intends to wait, if it said
    pub deadline_hint: Option<Duration>,
    pub payload: Vec<u8>,
}

impl TransportMessage {
    /// Build a reply to `self`: addressed back to the sender, same correlation id
    pub fn reply(&self, path: &str, payload: Vec<u8>) -> Self {
        Self {
            source_node: self.target_node.clone(),
            target_node: self.source_node.clone(),
            path: path.to_string(),
            correlation_id: self.correlation_id,
            deadline_hint: None,
            payload,
        }
    }
}

/// One query attempt addressed to a companion node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VitalsRequest {
    pub correlation_id: Uuid,
    pub target_node: String,
    pub deadline_hint: Duration,
}

impl VitalsRequest {
    /// New request with a fresh correlation id
    pub fn new(target_node: impl Into<String>, deadline_hint: Duration) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            target_node: target_node.into(),
            deadline_hint,
        }
    }

    pub fn into_message(self, source_node: impl Into<String>) -> TransportMessage {
        TransportMessage {
            source_node: source_node.into(),
            target_node: self.target_node,
            path: paths::REQUEST_VITALS.to_string(),
            correlation_id: self.correlation_id,
            deadline_hint: Some(self.deadline_hint),
            payload: Vec::new(),
        }
    }
}

/// Live readings from the companion, sentinel `-1` for anything not captured.
///
/// Construction always clamps into the plausible ranges, so a non-sentinel
/// heart rate is `>= 0` and a non-sentinel oxygen saturation is in `[70, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VitalsResponse {
    heart_rate: i32,
    oxygen_saturation: i32,
    captured_at: i64,
}

impl VitalsResponse {
    pub fn new(heart_rate: Option<i32>, oxygen_saturation: Option<i32>, captured_at: i64) -> Self {
        Self {
            heart_rate: heart_rate
                .map(|hr| hr.max(ranges::HEART_RATE_MIN))
                .unwrap_or(SENTINEL),
            oxygen_saturation: oxygen_saturation
                .map(|spo2| {
                    spo2.clamp(
                        ranges::OXYGEN_SATURATION_MIN,
                        ranges::OXYGEN_SATURATION_MAX,
                    )
                })
                .unwrap_or(SENTINEL),
            captured_at,
        }
    }

    /// Both readings missing
    pub fn unavailable(captured_at: i64) -> Self {
        Self::new(None, None, captured_at)
    }

    /// Heart rate in bpm, or `-1`
    pub fn heart_rate(&self) -> i32 {
        self.heart_rate
    }

    /// Oxygen saturation in percent, or `-1`
    pub fn oxygen_saturation(&self) -> i32 {
        self.oxygen_saturation
    }

    /// Capture time in epoch seconds
    pub fn captured_at(&self) -> i64 {
        self.captured_at
    }

    pub fn has_heart_rate(&self) -> bool {
        self.heart_rate != SENTINEL
    }

    pub fn has_oxygen_saturation(&self) -> bool {
        self.oxygen_saturation != SENTINEL
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse a `hr=..,spo2=..,ts=..` payload. Field order is not significant;
    /// every field must appear exactly once and nothing else may.
    pub fn decode(payload: &[u8]) -> MessagingResult<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| MessagingError::message_deserialization(format!("payload is not UTF-8: {e}")))?;

        let mut heart_rate = None;
        let mut oxygen_saturation = None;
        let mut captured_at = None;

        for field in text.trim().split(',') {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                MessagingError::message_deserialization(format!("malformed field '{field}'"))
            })?;
            let (key, value) = (key.trim(), value.trim());

            let slot_taken = match key {
                "hr" => heart_rate.replace(parse_field::<i32>(key, value)?).is_some(),
                "spo2" => oxygen_saturation
                    .replace(parse_field::<i32>(key, value)?)
                    .is_some(),
                "ts" => captured_at.replace(parse_field::<i64>(key, value)?).is_some(),
                other => {
                    return Err(MessagingError::message_deserialization(format!(
                        "unknown field '{other}'"
                    )))
                }
            };
            if slot_taken {
                return Err(MessagingError::message_deserialization(format!(
                    "duplicate field '{key}'"
                )));
            }
        }

        let missing = |name: &str| MessagingError::message_deserialization(format!("missing field '{name}'"));
        let heart_rate = heart_rate.ok_or_else(|| missing("hr"))?;
        let oxygen_saturation = oxygen_saturation.ok_or_else(|| missing("spo2"))?;
        let captured_at = captured_at.ok_or_else(|| missing("ts"))?;

        Ok(Self::new(
            (heart_rate != SENTINEL).then_some(heart_rate),
            (oxygen_saturation != SENTINEL).then_some(oxygen_saturation),
            captured_at,
        ))
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> MessagingResult<T>
where
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        MessagingError::message_deserialization(format!("invalid value '{value}' for '{key}': {e}"))
    })
}

impl fmt::Display for VitalsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hr={},spo2={},ts={}",
            self.heart_rate, self.oxygen_saturation, self.captured_at
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_exact_wire_format() {
        let response = VitalsResponse::new(Some(72), Some(97), 0);
        assert_eq!(response.encode(), b"hr=72,spo2=97,ts=0".to_vec());

        let missing = VitalsResponse::unavailable(1_700_000_000);
        assert_eq!(missing.to_string(), "hr=-1,spo2=-1,ts=1700000000");
    }

    #[test]
    fn decodes_wire_payload() {
        let response = VitalsResponse::decode(b"hr=72,spo2=97,ts=0").unwrap();
        assert_eq!(response.heart_rate(), 72);
        assert_eq!(response.oxygen_saturation(), 97);
        assert_eq!(response.captured_at(), 0);
    }

    #[test]
    fn decode_preserves_sentinels() {
        let response = VitalsResponse::decode(b"hr=-1,spo2=-1,ts=5").unwrap();
        assert!(!response.has_heart_rate());
        assert!(!response.has_oxygen_saturation());
    }

    #[test]
    fn construction_clamps_into_plausible_ranges() {
        let response = VitalsResponse::new(Some(-12), Some(42), 0);
        assert_eq!(response.heart_rate(), 0);
        assert_eq!(response.oxygen_saturation(), 70);

        let response = VitalsResponse::new(Some(180), Some(130), 0);
        assert_eq!(response.heart_rate(), 180);
        assert_eq!(response.oxygen_saturation(), 100);
    }

    #[test]
    fn decode_clamps_out_of_range_values() {
        let response = VitalsResponse::decode(b"hr=64,spo2=55,ts=9").unwrap();
        assert_eq!(response.oxygen_saturation(), 70);
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        let payloads: [&[u8]; 7] = [
            b"",
            b"hr=72,spo2=97",
            b"hr=72,spo2=97,ts=0,extra=1",
            b"hr=72,hr=73,spo2=97,ts=0",
            b"hr=fast,spo2=97,ts=0",
            b"hr:72,spo2=97,ts=0",
            &[0xff, 0xfe],
        ];
        for payload in payloads {
            assert!(
                VitalsResponse::decode(payload).is_err(),
                "payload {payload:?} should be rejected"
            );
        }
    }

    #[test]
    fn request_envelope_has_empty_payload_and_deadline_hint() {
        let request = VitalsRequest::new("watch", Duration::from_secs(5));
        let correlation_id = request.correlation_id;
        let message = request.into_message("phone");

        assert_eq!(message.path, "/request_vitals");
        assert_eq!(message.source_node, "phone");
        assert_eq!(message.target_node, "watch");
        assert_eq!(message.correlation_id, correlation_id);
        assert_eq!(message.deadline_hint, Some(Duration::from_secs(5)));
        assert!(message.payload.is_empty());
    }

    #[test]
    fn reply_swaps_addresses_and_keeps_correlation() {
        let request = VitalsRequest::new("watch", Duration::from_secs(5)).into_message("phone");
        let reply = request.reply("/vitals_response", b"hr=1,spo2=99,ts=0".to_vec());

        assert_eq!(reply.source_node, "watch");
        assert_eq!(reply.target_node, "phone");
        assert_eq!(reply.correlation_id, request.correlation_id);
    }
}
