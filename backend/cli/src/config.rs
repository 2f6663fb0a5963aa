use std::fmt;
use std::time::Duration;

use sightline_config::defaults::{
    DEFAULT_API_VERSION, DEFAULT_BIND, DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};
use sightline_config::SightlineConfig;
use sightline_core::AnalysisConfig;
use sightline_understanding::{AzureVisionClient, OrchestrationController, RequestBuilder};

/// Effective runtime configuration: config file values, overridden by env.
#[derive(Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,

    /// Vision endpoint prefilled into new sessions
    pub endpoint: Option<String>,
    /// Subscription key prefilled into new sessions
    pub api_key: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
    pub language: Option<String>,
    pub gender_neutral_caption: Option<bool>,
    pub max_image_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
            endpoint: None,
            api_key: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            language: None,
            gender_neutral_caption: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Overlay process env vars on the loaded config file.
    pub fn from_file_and_env(file: &SightlineConfig) -> Self {
        Self::from_file_and_lookup(file, |key| std::env::var(key).ok())
    }

    /// Overlay a custom variable source (used by tests).
    pub fn from_file_and_lookup(
        file: &SightlineConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::default();
        let vision = file.vision.clone().unwrap_or_default();
        let server = file.server.clone().unwrap_or_default();
        let logging = file.logging.clone().unwrap_or_default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: non_empty("SIGHTLINE_BIND")
                .or(server.bind)
                .unwrap_or(defaults.bind_address),
            port: non_empty("SIGHTLINE_PORT")
                .and_then(|p| p.parse().ok())
                .or(server.port)
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG")
                .or(logging.level)
                .unwrap_or(defaults.log_level),
            log_dir: non_empty("SIGHTLINE_LOG_DIR")
                .or(logging.dir)
                .unwrap_or(defaults.log_dir),
            endpoint: non_empty("AZURE_VISION_ENDPOINT").or(vision.endpoint),
            api_key: non_empty("AZURE_VISION_KEY").or(vision.api_key),
            api_version: vision.api_version.unwrap_or(defaults.api_version),
            timeout: vision
                .timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            language: vision.language,
            gender_neutral_caption: vision.gender_neutral_caption,
            max_image_bytes: vision
                .max_image_bytes
                .filter(|b| *b > 0)
                .unwrap_or(defaults.max_image_bytes),
        }
    }

    /// Endpoint + credential as a session starts out with them.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig::new(
            self.endpoint.clone().unwrap_or_default(),
            self.api_key.clone().unwrap_or_default(),
        )
    }

    pub fn vision_client(&self) -> AzureVisionClient {
        let mut client = AzureVisionClient::new().with_api_version(&self.api_version);
        if let Some(language) = &self.language {
            client = client.with_language(language);
        }
        if let Some(neutral) = self.gender_neutral_caption {
            client = client.with_gender_neutral_caption(neutral);
        }
        client
    }

    pub fn controller(&self) -> OrchestrationController {
        OrchestrationController::new(std::sync::Arc::new(self.vision_client()))
            .with_timeout(self.timeout)
            .with_builder(RequestBuilder::new().with_max_image_bytes(self.max_image_bytes))
    }
}
