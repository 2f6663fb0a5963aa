//! Request building: validated config + image → `AnalysisRequest`.

use reqwest::Url;

use sightline_core::{AnalysisConfig, AnalysisError, AnalysisRequest, FeatureSelection, ImageFormat, ImageInput};

/// The service rejects images larger than 20 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Pure, deterministic transformation from session inputs to a request.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    max_image_bytes: usize,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Build a request for the fixed feature set.
    ///
    /// Config is checked before the image, so a session with neither gets
    /// the credentials prompt first.
    pub fn build(
        &self,
        config: &AnalysisConfig,
        image: &ImageInput,
    ) -> Result<AnalysisRequest, AnalysisError> {
        let config = self.validate_config(config)?;
        self.validate_image(image)?;
        Ok(AnalysisRequest {
            config,
            image: image.clone(),
            features: FeatureSelection,
        })
    }

    /// Check endpoint and credential; returns the trimmed config.
    pub fn validate_config(&self, config: &AnalysisConfig) -> Result<AnalysisConfig, AnalysisError> {
        let endpoint = config.endpoint.trim();
        let credential = config.credential.trim();

        if endpoint.is_empty() {
            return Err(AnalysisError::InvalidConfig("endpoint is required".into()));
        }
        if credential.is_empty() {
            return Err(AnalysisError::InvalidConfig("API key is required".into()));
        }

        let url = Url::parse(endpoint).map_err(|e| {
            AnalysisError::InvalidConfig(format!("endpoint '{endpoint}' is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
            return Err(AnalysisError::InvalidConfig(format!(
                "endpoint '{endpoint}' must be an http(s) URL"
            )));
        }

        Ok(AnalysisConfig::new(endpoint, credential))
    }

    /// Check the payload is non-empty, within limits, and really is the
    /// declared JPEG/PNG.
    pub fn validate_image(&self, image: &ImageInput) -> Result<(), AnalysisError> {
        if image.is_empty() {
            return Err(AnalysisError::InvalidImage("image is empty".into()));
        }
        if image.len() > self.max_image_bytes {
            return Err(AnalysisError::InvalidImage(format!(
                "image is {} bytes; the limit is {} bytes",
                image.len(),
                self.max_image_bytes
            )));
        }

        match ImageFormat::sniff(image.bytes()) {
            None => Err(AnalysisError::InvalidImage(
                "unrecognized image format; upload a JPEG or PNG".into(),
            )),
            Some(actual) if actual != image.format() => Err(AnalysisError::InvalidImage(format!(
                "declared as {} but the contents are {}",
                image.format(),
                actual
            ))),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg_image, png_image};

    fn config() -> AnalysisConfig {
        AnalysisConfig::new("https://x", "k")
    }

    #[test]
    fn test_builds_fixed_feature_request() {
        let req = RequestBuilder::new().build(&config(), &jpeg_image()).unwrap();
        assert_eq!(req.features.query_value(), "caption,tags,objects");
        assert_eq!(req.config.endpoint, "https://x");
        assert_eq!(req.image.format(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_trims_config() {
        let req = RequestBuilder::new()
            .build(&AnalysisConfig::new("  https://x/ ", " k\n"), &png_image())
            .unwrap();
        assert_eq!(req.config.endpoint, "https://x/");
        assert_eq!(req.config.credential, "k");
    }

    #[test]
    fn test_blank_config_is_invalid() {
        let builder = RequestBuilder::new();
        for cfg in [
            AnalysisConfig::new("", "k"),
            AnalysisConfig::new("   ", "k"),
            AnalysisConfig::new("https://x", ""),
            AnalysisConfig::new("https://x", " \t "),
        ] {
            let err = builder.build(&cfg, &jpeg_image()).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidConfig(_)), "{cfg:?}");
        }
    }

    #[test]
    fn test_non_http_endpoint_is_invalid() {
        let builder = RequestBuilder::new();
        let err = builder
            .build(&AnalysisConfig::new("not a url", "k"), &jpeg_image())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
        let err = builder
            .build(&AnalysisConfig::new("ftp://x", "k"), &jpeg_image())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_image_is_invalid() {
        let err = RequestBuilder::new()
            .build(&config(), &ImageInput::new(Vec::new(), ImageFormat::Jpeg))
            .unwrap_err();
        assert_eq!(err, AnalysisError::InvalidImage("image is empty".into()));
    }

    #[test]
    fn test_unrecognized_or_mismatched_image_is_invalid() {
        let builder = RequestBuilder::new();
        let gif = ImageInput::new(b"GIF89a\x01\x00\x01\x00".to_vec(), ImageFormat::Png);
        assert!(matches!(
            builder.build(&config(), &gif),
            Err(AnalysisError::InvalidImage(_))
        ));

        let mislabelled = ImageInput::new(jpeg_image().bytes().to_vec(), ImageFormat::Png);
        let err = builder.build(&config(), &mislabelled).unwrap_err();
        assert!(err.to_string().contains("declared as png"));
    }

    #[test]
    fn test_oversized_image_is_invalid() {
        let err = RequestBuilder::new()
            .with_max_image_bytes(4)
            .build(&config(), &jpeg_image())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidImage(_)));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = RequestBuilder::new();
        let a = builder.build(&config(), &jpeg_image()).unwrap();
        let b = builder.build(&config(), &jpeg_image()).unwrap();
        assert_eq!(a.config, b.config);
        assert_eq!(a.image, b.image);
        assert_eq!(a.features, b.features);
    }
}
