//! # Reply Formatting
//!
//! Renders the single text reply sent back to a trusted sender. Dates and
//! times are UTC; numbers use `.` as the decimal separator regardless of
//! host locale.

use crate::messaging::VitalsResponse;
use crate::models::LocationFix;
use chrono::{DateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyFormatter;

impl ReplyFormatter {
    /// `DATA ...` when telemetry is present, `NOT AVAILABLE ...` otherwise.
    /// A location is only rendered alongside telemetry.
    pub fn format(
        now: DateTime<Utc>,
        telemetry: Option<&VitalsResponse>,
        location: Option<&LocationFix>,
    ) -> String {
        let date = now.format(DATE_FORMAT);
        let time = now.format(TIME_FORMAT);

        let Some(vitals) = telemetry else {
            return format!("NOT AVAILABLE date={date} time={time}");
        };

        let reply = format!(
            "DATA ts={} date={date} time={time} hr={} spo2={} ts={}",
            now.timestamp(),
            vitals.heart_rate(),
            vitals.oxygen_saturation(),
            vitals.captured_at()
        );
        match location {
            Some(fix) => format!("{reply} lat={:.6} lon={:.6}", fix.latitude, fix.longitude),
            None => reply,
        }
    }
}
