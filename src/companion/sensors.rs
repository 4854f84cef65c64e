//! # Companion Sensor Access
//!
//! [`SensorPlatform`] is the seam to the wearable's sensor manager. Readings
//! are pushed into an unbounded channel supplied at registration, so a
//! sampling loop can await them alongside its deadline.
//!
//! [`SensorSession`] owns every listener it registered and unregisters them
//! when dropped, whichever way the sampling future ends.

use crate::constants::{ranges, OXYGEN_SENSOR_NAME_HINTS};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    HeartRate,
    /// Anything without a dedicated type; vendor SpO2 sensors land here
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorDescriptor {
    pub id: u32,
    pub name: String,
    pub kind: SensorKind,
}

impl SensorDescriptor {
    pub fn new(id: u32, name: impl Into<String>, kind: SensorKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

/// One sensor event; `values[0]` is the primary reading
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor_id: u32,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("Body sensor permission not granted")]
    PermissionDenied,

    #[error("Failed to register listener for sensor {sensor_id}: {message}")]
    Registration { sensor_id: u32, message: String },
}

/// Sensor manager of the companion device
pub trait SensorPlatform: Send + Sync {
    fn has_body_sensor_permission(&self) -> bool;

    fn default_sensor(&self, kind: SensorKind) -> Option<SensorDescriptor>;

    fn sensor_list(&self) -> Vec<SensorDescriptor>;

    fn register_listener(
        &self,
        sensor: &SensorDescriptor,
        sink: mpsc::UnboundedSender<SensorReading>,
    ) -> Result<ListenerId, SensorError>;

    fn unregister_listener(&self, listener: ListenerId);
}

/// Case-insensitive name match against the known oxygen sensor hints
pub fn is_oxygen_sensor(name: &str) -> bool {
    let name = name.to_lowercase();
    OXYGEN_SENSOR_NAME_HINTS
        .iter()
        .any(|hint| name.contains(hint))
}

pub fn find_oxygen_sensor(platform: &dyn SensorPlatform) -> Option<SensorDescriptor> {
    platform
        .sensor_list()
        .into_iter()
        .find(|sensor| is_oxygen_sensor(&sensor.name))
}

/// Truncate and floor a raw heart-rate value; `None` for NaN or infinity
pub fn clamp_heart_rate_reading(raw: f32) -> Option<i32> {
    raw.is_finite()
        .then(|| (raw as i32).max(ranges::HEART_RATE_MIN))
}

/// Truncate and clamp a raw oxygen value into the plausible range
pub fn clamp_oxygen_reading(raw: f32) -> Option<i32> {
    raw.is_finite().then(|| {
        (raw as i32).clamp(
            ranges::OXYGEN_SATURATION_MIN,
            ranges::OXYGEN_SATURATION_MAX,
        )
    })
}

/// Readings captured so far in one sampling window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturedVitals {
    pub heart_rate: Option<i32>,
    pub oxygen_saturation: Option<i32>,
}

impl CapturedVitals {
    /// Heart rate is positive and oxygen is either captured or cannot be
    pub fn is_satisfied(&self, has_oxygen_sensor: bool) -> bool {
        let heart_rate_valid = self.heart_rate.is_some_and(|hr| hr > 0);
        heart_rate_valid && (self.oxygen_saturation.is_some() || !has_oxygen_sensor)
    }
}

/// Scoped set of sensor registrations for one request
pub struct SensorSession {
    platform: Arc<dyn SensorPlatform>,
    listeners: Vec<ListenerId>,
    readings: mpsc::UnboundedReceiver<SensorReading>,
    heart_rate_sensor: Option<SensorDescriptor>,
    oxygen_sensor: Option<SensorDescriptor>,
}

impl fmt::Debug for SensorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorSession")
            .field("listeners", &self.listeners)
            .field("heart_rate_sensor", &self.heart_rate_sensor)
            .field("oxygen_sensor", &self.oxygen_sensor)
            .finish()
    }
}

impl SensorSession {
    /// Resolve the heart-rate and oxygen sensors and register a listener on each
    /// that exists. Listeners registered before a failure are released on return.
    pub fn open(platform: Arc<dyn SensorPlatform>) -> Result<Self, SensorError> {
        if !platform.has_body_sensor_permission() {
            return Err(SensorError::PermissionDenied);
        }

        let heart_rate_sensor = platform.default_sensor(SensorKind::HeartRate);
        let oxygen_sensor = find_oxygen_sensor(platform.as_ref());
        let (sink, readings) = mpsc::unbounded_channel();

        let mut session = Self {
            platform,
            listeners: Vec::with_capacity(2),
            readings,
            heart_rate_sensor,
            oxygen_sensor,
        };

        let sensors: Vec<SensorDescriptor> = [&session.heart_rate_sensor, &session.oxygen_sensor]
            .into_iter()
            .flatten()
            .cloned()
            .collect();

        for sensor in sensors {
            let listener = session.platform.register_listener(&sensor, sink.clone())?;
            debug!(sensor = %sensor.name, listener = %listener, "Sensor listener registered");
            session.listeners.push(listener);
        }

        if session.heart_rate_sensor.is_none() {
            warn!("No heart rate sensor available on this device");
        }

        Ok(session)
    }

    pub fn has_oxygen_sensor(&self) -> bool {
        self.oxygen_sensor.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Wait for the next reading and fold it into `captured`. Returns `false`
    /// once no listener can produce further readings.
    pub async fn record_next(&mut self, captured: &mut CapturedVitals) -> bool {
        let Some(reading) = self.readings.recv().await else {
            return false;
        };
        let Some(&raw) = reading.values.first() else {
            return true;
        };

        let is_heart_rate = self
            .heart_rate_sensor
            .as_ref()
            .is_some_and(|s| s.id == reading.sensor_id);
        let is_oxygen = self
            .oxygen_sensor
            .as_ref()
            .is_some_and(|s| s.id == reading.sensor_id);

        if is_heart_rate {
            if let Some(hr) = clamp_heart_rate_reading(raw) {
                captured.heart_rate = Some(hr);
            }
        } else if is_oxygen {
            if let Some(spo2) = clamp_oxygen_reading(raw) {
                captured.oxygen_saturation = Some(spo2);
            }
        }
        true
    }
}

impl Drop for SensorSession {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            self.platform.unregister_listener(listener);
        }
        debug!("Sensor listeners released");
    }
}
