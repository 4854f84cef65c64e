//! Scripted sensor platform for local runs and tests.

use crate::companion::{
    ListenerId, SensorDescriptor, SensorError, SensorKind, SensorPlatform, SensorReading,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

pub const HEART_RATE_SENSOR_ID: u32 = 1;
pub const OXYGEN_SENSOR_ID: u32 = 2;

/// Reading emitted `after` the listener was registered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedReading {
    pub after: Duration,
    pub value: f32,
}

impl ScriptedReading {
    pub fn new(after: Duration, value: f32) -> Self {
        Self { after, value }
    }
}

impl From<(Duration, f32)> for ScriptedReading {
    fn from((after, value): (Duration, f32)) -> Self {
        Self::new(after, value)
    }
}

/// Sensor manager whose readings follow a fixed script.
///
/// Each registered listener gets a task that replays its sensor's script and
/// then stays alive, holding the sink open, until unregistered.
#[derive(Debug, Default)]
pub struct ScriptedSensorPlatform {
    permission_denied: AtomicBool,
    sensors: Vec<SensorDescriptor>,
    scripts: HashMap<u32, Vec<ScriptedReading>>,
    listeners: Mutex<HashMap<ListenerId, JoinHandle<()>>>,
    next_listener: AtomicU64,
    registrations: AtomicU64,
    unregistrations: AtomicU64,
}

impl ScriptedSensorPlatform {
    /// Permission granted, no sensors
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heart_rate_sensor<I, R>(self, script: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedReading>,
    {
        self.with_sensor(
            SensorDescriptor::new(HEART_RATE_SENSOR_ID, "Heart Rate", SensorKind::HeartRate),
            script,
        )
    }

    pub fn with_oxygen_sensor<I, R>(self, name: &str, script: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedReading>,
    {
        self.with_sensor(
            SensorDescriptor::new(OXYGEN_SENSOR_ID, name, SensorKind::Other),
            script,
        )
    }

    pub fn with_sensor<I, R>(mut self, sensor: SensorDescriptor, script: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedReading>,
    {
        self.scripts
            .insert(sensor.id, script.into_iter().map(Into::into).collect());
        self.sensors.retain(|existing| existing.id != sensor.id);
        self.sensors.push(sensor);
        self
    }

    pub fn without_permission(self) -> Self {
        self.permission_denied.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission_denied.store(!granted, Ordering::SeqCst);
    }

    /// Listeners registered and not yet unregistered
    pub fn active_listeners(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn total_registrations(&self) -> u64 {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn total_unregistrations(&self) -> u64 {
        self.unregistrations.load(Ordering::SeqCst)
    }
}

impl SensorPlatform for ScriptedSensorPlatform {
    fn has_body_sensor_permission(&self) -> bool {
        !self.permission_denied.load(Ordering::SeqCst)
    }

    fn default_sensor(&self, kind: SensorKind) -> Option<SensorDescriptor> {
        if kind == SensorKind::Other {
            return None;
        }
        self.sensors.iter().find(|s| s.kind == kind).cloned()
    }

    fn sensor_list(&self) -> Vec<SensorDescriptor> {
        self.sensors.clone()
    }

    fn register_listener(
        &self,
        sensor: &SensorDescriptor,
        sink: mpsc::UnboundedSender<SensorReading>,
    ) -> Result<ListenerId, SensorError> {
        if !self.sensors.iter().any(|s| s.id == sensor.id) {
            return Err(SensorError::Registration {
                sensor_id: sensor.id,
                message: "unknown sensor".to_string(),
            });
        }

        let listener = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        let script = self.scripts.get(&sensor.id).cloned().unwrap_or_default();
        let sensor_id = sensor.id;

        let task = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for reading in script {
                tokio::time::sleep_until(started + reading.after).await;
                let event = SensorReading {
                    sensor_id,
                    values: vec![reading.value],
                };
                if sink.send(event).is_err() {
                    return;
                }
            }
            // Keep the sink open like a live sensor that simply has nothing new
            std::future::pending::<()>().await;
        });

        self.listeners.lock().insert(listener, task);
        self.registrations.fetch_add(1, Ordering::SeqCst);
        trace!(%listener, sensor_id, "Scripted listener registered");
        Ok(listener)
    }

    fn unregister_listener(&self, listener: ListenerId) {
        if let Some(task) = self.listeners.lock().remove(&listener) {
            task.abort();
            self.unregistrations.fetch_add(1, Ordering::SeqCst);
            trace!(%listener, "Scripted listener unregistered");
        }
    }
}
