//! Config defaults: fills in runtime values the file leaves out.

use crate::schema::{LoggingConfig, ServerConfig, SightlineConfig, VisionConfig};

/// Image Analysis 4.0 GA API version.
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Default bound on a single remote call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The service rejects images larger than 20 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: SightlineConfig) -> SightlineConfig {
    let config = apply_vision_defaults(config);
    let config = apply_server_defaults(config);
    apply_logging_defaults(config)
}

fn apply_vision_defaults(mut config: SightlineConfig) -> SightlineConfig {
    let vision = config.vision.get_or_insert_with(VisionConfig::default);
    if vision.api_version.is_none() {
        vision.api_version = Some(DEFAULT_API_VERSION.to_string());
    }
    if vision.timeout_secs.is_none() {
        vision.timeout_secs = Some(DEFAULT_TIMEOUT_SECS);
    }
    if vision.max_image_bytes.is_none() {
        vision.max_image_bytes = Some(DEFAULT_MAX_IMAGE_BYTES);
    }
    config
}

fn apply_server_defaults(mut config: SightlineConfig) -> SightlineConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    if server.bind.is_none() {
        server.bind = Some(DEFAULT_BIND.to_string());
    }
    if server.port.is_none() {
        server.port = Some(DEFAULT_PORT);
    }
    config
}

fn apply_logging_defaults(mut config: SightlineConfig) -> SightlineConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.dir.is_none() {
        logging.dir = Some(DEFAULT_LOG_DIR.to_string());
    }
    config
}
