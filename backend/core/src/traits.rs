use async_trait::async_trait;

use crate::error::RemoteCallError;
use crate::raw::RawAnalysis;
use crate::types::AnalysisRequest;

/// The external vision service, as seen by the orchestration layer.
///
/// Implementations perform exactly one remote call per invocation and never
/// retry.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Client name (e.g., "azure", "mock").
    fn name(&self) -> &str;

    /// Submit the request and return the service's raw response.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<RawAnalysis, RemoteCallError>;
}
