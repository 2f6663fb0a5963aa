//! Config validation: field checks with user-friendly messages.

use crate::schema::SightlineConfig;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SightlineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_vision(config, &mut report);
    validate_server(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_vision(config: &SightlineConfig, report: &mut ValidationReport) {
    let Some(vision) = &config.vision else {
        report.warn("vision", "No vision service configured; credentials must be entered per session");
        return;
    };

    match vision.endpoint.as_deref().map(str::trim) {
        None | Some("") => report.warn(
            "vision.endpoint",
            "Endpoint not set; credentials must be entered per session",
        ),
        Some(ep) if !(ep.starts_with("https://") || ep.starts_with("http://")) => {
            report.error("vision.endpoint", format!("Endpoint '{ep}' must start with https://"));
        }
        Some(ep) if ep.starts_with("http://") => {
            report.warn("vision.endpoint", "Endpoint uses plain http; the key will travel unencrypted");
        }
        Some(_) => {}
    }

    if vision.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.warn("vision.apiKey", "API key not set; credentials must be entered per session");
    }

    if vision.timeout_secs == Some(0) {
        report.error("vision.timeoutSecs", "timeoutSecs must be >= 1");
    }
    if vision.max_image_bytes == Some(0) {
        report.error("vision.maxImageBytes", "maxImageBytes must be > 0");
    }
}

fn validate_server(config: &SightlineConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(port) = server.port {
        if port == 0 {
            report.error("server.port", "Port must be > 0");
        } else if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}

fn validate_logging(config: &SightlineConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.error(
            "logging.level",
            format!("Unknown log level '{level}'. Use one of: {}", LOG_LEVELS.join(", ")),
        );
    }
}
