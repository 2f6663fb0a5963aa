//! Azure AI Vision Image Analysis client.
//!
//! One `POST {endpoint}/computervision/imageanalysis:analyze` per request,
//! image bytes as the body, key in `Ocp-Apim-Subscription-Key`.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::debug;

use sightline_core::raw::RawErrorEnvelope;
use sightline_core::{AnalysisRequest, FeatureSelection, RawAnalysis, RemoteCallError, VisionClient};

const ANALYZE_PATH: &str = "computervision/imageanalysis:analyze";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Longest slice of an unstructured error body kept in a failure message.
const MAX_ERROR_BODY: usize = 300;

pub struct AzureVisionClient {
    client: Client,
    api_version: String,
    language: Option<String>,
    gender_neutral_caption: Option<bool>,
}

impl Default for AzureVisionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureVisionClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            language: None,
            gender_neutral_caption: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_gender_neutral_caption(mut self, enabled: bool) -> Self {
        self.gender_neutral_caption = Some(enabled);
        self
    }

    /// Full analyze URL for `endpoint`, trailing slashes tolerated.
    pub fn analyze_url(&self, endpoint: &str, features: &FeatureSelection) -> Result<Url, RemoteCallError> {
        let base = endpoint.trim().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{ANALYZE_PATH}"))
            .map_err(|e| RemoteCallError::Network(format!("invalid endpoint URL '{base}': {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api-version", &self.api_version);
            query.append_pair("features", &features.query_value());
            if let Some(language) = &self.language {
                query.append_pair("language", language);
            }
            if let Some(neutral) = self.gender_neutral_caption {
                query.append_pair("gender-neutral-caption", if neutral { "true" } else { "false" });
            }
        }
        Ok(url)
    }
}

/// Turn a non-success response into an error, preferring the service's
/// `{"error": {"code", "message"}}` envelope over the raw body.
pub fn error_from_response(status: u16, body: &str) -> RemoteCallError {
    let message = match serde_json::from_str::<RawErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.describe(),
        Err(_) => body.trim().chars().take(MAX_ERROR_BODY).collect(),
    };
    RemoteCallError::from_status(status, message)
}

pub fn parse_analysis(body: &str) -> Result<RawAnalysis, RemoteCallError> {
    serde_json::from_str(body).map_err(|e| RemoteCallError::Decode(e.to_string()))
}

#[async_trait]
impl VisionClient for AzureVisionClient {
    fn name(&self) -> &str {
        "azure"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<RawAnalysis, RemoteCallError> {
        let url = self.analyze_url(&request.config.endpoint, &request.features)?;

        debug!(
            host = url.host_str().unwrap_or(""),
            api_version = %self.api_version,
            bytes = request.image.len(),
            "Sending request to Azure Vision"
        );

        let response = self
            .client
            .post(url)
            .header(KEY_HEADER, request.config.credential.as_str())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(request.image.bytes().to_vec())
            .send()
            .await
            .map_err(|e| RemoteCallError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteCallError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &body));
        }

        parse_analysis(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_url() {
        let client = AzureVisionClient::new();
        let url = client
            .analyze_url("https://demo.cognitiveservices.azure.com/", &FeatureSelection)
            .unwrap();
        assert_eq!(url.path(), "/computervision/imageanalysis:analyze");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("api-version".to_string(), DEFAULT_API_VERSION.to_string()),
                ("features".to_string(), "caption,tags,objects".to_string()),
            ]
        );
    }

    #[test]
    fn test_analyze_url_with_options() {
        let client = AzureVisionClient::new()
            .with_api_version("2023-10-01")
            .with_language("en")
            .with_gender_neutral_caption(true);
        let url = client.analyze_url("https://x.example", &FeatureSelection).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("api-version".into(), "2023-10-01".into())));
        assert!(query.contains(&("language".into(), "en".into())));
        assert!(query.contains(&("gender-neutral-caption".into(), "true".into())));
    }

    #[test]
    fn test_error_envelope_mapped() {
        let err = error_from_response(
            401,
            r#"{"error":{"code":"401","message":"Access denied due to invalid subscription key or wrong API endpoint."}}"#,
        );
        assert!(matches!(err, RemoteCallError::Authentication { status: 401, .. }));
        assert!(err.to_string().contains("authentication"));
        assert!(err.to_string().contains("invalid subscription key"));
    }

    #[test]
    fn test_unstructured_error_body_kept() {
        let err = error_from_response(502, "Bad Gateway");
        assert_eq!(err.to_string(), "vision service error (502): Bad Gateway");

        let err = error_from_response(400, &"x".repeat(1000));
        assert!(err.to_string().len() < 400);
    }

    #[test]
    fn test_parse_analysis_decode_error() {
        assert!(matches!(parse_analysis("not json"), Err(RemoteCallError::Decode(_))));
        assert!(parse_analysis("{}").unwrap().caption.is_none());
    }
}
