//! # Structured Logging Module
//!
//! Environment-aware structured logging: a console layer always, plus a JSON
//! file layer when a log directory is configured.

use crate::config::LoggingConfig;
use chrono::Utc;
use std::fs;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging. Safe to call more than once; only the first
/// call installs a subscriber.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = config
            .level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| get_log_level(&environment).to_string());
        let pid = process::id();

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level.clone()));

        let mut guard = None;
        let mut log_file = None;
        let file_layer = config.log_directory.as_ref().and_then(|log_dir| {
            if let Err(e) = fs::create_dir_all(log_dir) {
                eprintln!(
                    "telemetry-relay: cannot create log directory {}: {e}",
                    log_dir.display()
                );
                return None;
            }

            let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
            let file_name = format!("{environment}.{pid}.{timestamp}.log");
            log_file = Some(log_dir.join(&file_name));

            let file_appender = tracing_appender::rolling::never(log_dir, file_name);
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);

            Some(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
        });

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        // An embedding host may already own the global subscriber
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_level = %log_level,
            log_file = ?log_file,
            "Structured logging initialized"
        );

        guard
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("TELEMETRY_RELAY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log a silent gate rejection. Rejections never produce a reply, so this is
/// the only trace they leave.
pub fn log_gate_rejection(sender: &str, gate: &str, details: Option<&str>) {
    tracing::info!(
        sender = %sender,
        gate = %gate,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "Command rejected"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "Relay error"
    );
}
