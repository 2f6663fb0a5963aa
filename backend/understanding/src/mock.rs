use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sightline_core::{AnalysisRequest, RawAnalysis, RemoteCallError, VisionClient};

/// A vision client that returns canned responses.
pub struct MockVisionClient {
    response: Result<serde_json::Value, RemoteCallError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockVisionClient {
    /// Respond with this service JSON (parsed on every call).
    pub fn from_json(response: serde_json::Value) -> Self {
        Self {
            response: Ok(response),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with `error`.
    pub fn failing(error: RemoteCallError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulate service latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of requests that reached this client.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<RawAnalysis, RemoteCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.response {
            Ok(json) => serde_json::from_value(json.clone())
                .map_err(|e| RemoteCallError::Decode(e.to_string())),
            Err(err) => Err(err.clone()),
        }
    }
}
