//! Phone/companion exchange: correlation, sampling windows, clamping, and
//! listener cleanup.

mod common;

use common::doubles::DelayedCompanion;
use common::healthy_platform;
use std::sync::Arc;
use std::time::Duration;
use telemetry_relay::clock::{Clock, ManualClock};
use telemetry_relay::companion::{CompanionQueryClient, CompanionResponder, SensorPlatform};
use telemetry_relay::config::CompanionConfig;
use telemetry_relay::constants::paths;
use telemetry_relay::messaging::{LoopbackNetwork, MessageHandler, TransportMessage};
use telemetry_relay::simulation::{connect_companion, ScriptedReading, ScriptedSensorPlatform};
use telemetry_relay::VitalsQuery;
use tokio::time::Instant;
use uuid::Uuid;

fn responder_for(platform: Arc<ScriptedSensorPlatform>) -> CompanionResponder {
    let network = LoopbackNetwork::new();
    let platform: Arc<dyn SensorPlatform> = platform;
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
    CompanionResponder::new(
        platform,
        Arc::new(network.endpoint("companion")),
        clock,
        Duration::from_secs(3),
    )
}

fn no_readings() -> Vec<ScriptedReading> {
    Vec::new()
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_not_mistaken_for_current_attempt() {
    let network = LoopbackNetwork::new();
    let client = Arc::new(CompanionQueryClient::new(
        Arc::new(network.endpoint("phone")),
        "companion",
    ));
    network.register_handler("phone", paths::VITALS_RESPONSE, client.clone());
    network.register_handler(
        "companion",
        paths::REQUEST_VITALS,
        Arc::new(DelayedCompanion::new(
            network.endpoint("companion"),
            [(Duration::from_secs(7), 61), (Duration::from_secs(3), 62)],
        )),
    );

    // Attempt 1 times out at t=5; its reply lands at t=7, inside attempt 2
    let first = client.request_once(Duration::from_secs(5)).await;
    assert!(first.is_none());

    let second = client.request_once(Duration::from_secs(5)).await.unwrap();
    assert_eq!(second.heart_rate(), 62);
    assert_eq!(client.stats().late_replies, 1);
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn round_trip_over_loopback_returns_sampled_vitals() {
    let network = LoopbackNetwork::new();
    let config = CompanionConfig::default();
    let link = connect_companion(
        &network,
        &config,
        Arc::new(healthy_platform()),
        Arc::new(ManualClock::at_epoch_seconds(42)),
    );

    let response = link
        .query_client
        .request_once(config.attempt_timeout())
        .await
        .unwrap();

    assert_eq!(response.to_string(), "hr=72,spo2=97,ts=42");
}

#[tokio::test(start_paused = true)]
async fn missing_permission_replies_immediately_with_sentinels() {
    let platform = Arc::new(healthy_platform().without_permission());
    let responder = responder_for(platform.clone());

    let started = Instant::now();
    let response = responder.sample(None).await;

    assert!(started.elapsed() < Duration::from_millis(10));
    assert_eq!(response.to_string(), "hr=-1,spo2=-1,ts=1700000000");
    assert_eq!(platform.total_registrations(), 0);
}

#[tokio::test(start_paused = true)]
async fn early_exit_once_both_readings_arrive() {
    let platform = Arc::new(healthy_platform());
    let responder = responder_for(platform.clone());

    let started = Instant::now();
    let response = responder.sample(None).await;

    assert_eq!(response.heart_rate(), 72);
    assert_eq!(response.oxygen_saturation(), 97);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(platform.total_registrations(), 2);
    assert_eq!(platform.active_listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn heart_rate_alone_suffices_without_oxygen_sensor() {
    let platform = Arc::new(
        ScriptedSensorPlatform::new()
            .with_heart_rate_sensor([(Duration::from_millis(100), 58.6_f32)]),
    );
    let responder = responder_for(platform.clone());

    let started = Instant::now();
    let response = responder.sample(None).await;

    assert_eq!(response.heart_rate(), 58);
    assert!(!response.has_oxygen_saturation());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn readings_are_clamped_at_capture() {
    let platform = Arc::new(
        ScriptedSensorPlatform::new()
            .with_heart_rate_sensor([(Duration::from_millis(100), -5.0_f32)])
            .with_oxygen_sensor("Blood Oxygen", [(Duration::from_millis(100), 150.0_f32)]),
    );
    let responder = responder_for(platform.clone());

    // A zero heart rate is not valid, so sampling runs the whole window
    let started = Instant::now();
    let response = responder.sample(None).await;

    assert_eq!(response.heart_rate(), 0);
    assert_eq!(response.oxygen_saturation(), 100);
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn non_finite_readings_are_ignored() {
    let platform = Arc::new(ScriptedSensorPlatform::new().with_heart_rate_sensor([
        (Duration::from_millis(100), f32::NAN),
        (Duration::from_millis(200), 80.0_f32),
    ]));
    let responder = responder_for(platform);

    let response = responder.sample(None).await;

    assert_eq!(response.heart_rate(), 80);
}

#[tokio::test(start_paused = true)]
async fn window_timeout_releases_listeners() {
    let platform = Arc::new(
        ScriptedSensorPlatform::new()
            .with_heart_rate_sensor(no_readings())
            .with_oxygen_sensor("SpO2", no_readings()),
    );
    let responder = responder_for(platform.clone());

    let started = Instant::now();
    let response = responder.sample(None).await;

    assert!(!response.has_heart_rate());
    assert!(!response.has_oxygen_saturation());
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(platform.active_listeners(), 0);
    assert_eq!(platform.total_unregistrations(), 2);
}

#[tokio::test(start_paused = true)]
async fn deadline_hint_shortens_sampling_window() {
    let platform = Arc::new(ScriptedSensorPlatform::new().with_heart_rate_sensor(no_readings()));
    let responder = responder_for(platform);

    let started = Instant::now();
    responder.sample(Some(Duration::from_secs(1))).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(750));
    assert!(elapsed < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn aborted_sampling_releases_listeners() {
    let platform = Arc::new(
        ScriptedSensorPlatform::new()
            .with_heart_rate_sensor(no_readings())
            .with_oxygen_sensor("SpO2", no_readings()),
    );
    let responder = Arc::new(responder_for(platform.clone()));

    let task = {
        let responder = Arc::clone(&responder);
        tokio::spawn(async move { responder.sample(None).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(platform.active_listeners(), 2);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(platform.active_listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn responder_ignores_other_paths() {
    let platform = Arc::new(healthy_platform());
    let responder = responder_for(platform.clone());

    responder
        .on_message(TransportMessage {
            source_node: "phone".to_string(),
            target_node: "companion".to_string(),
            path: "/ping".to_string(),
            correlation_id: Uuid::new_v4(),
            deadline_hint: None,
            payload: Vec::new(),
        })
        .await;

    assert_eq!(platform.total_registrations(), 0);
}
