use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Endpoint and credential for the vision service, owned by one session.
///
/// The credential is a secret: `Debug` masks it and it is never serialized.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub credential: String,
}

impl AnalysisConfig {
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: credential.into(),
        }
    }

    /// Both fields are non-blank.
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.credential.trim().is_empty()
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential = if self.credential.is_empty() { "" } else { "***" };
        f.debug_struct("AnalysisConfig")
            .field("endpoint", &self.endpoint)
            .field("credential", &credential)
            .finish()
    }
}

/// Image encodings the vision service accepts from this front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Resolve a declared format from a file extension (`jpg`, `jpeg`, `png`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Resolve a declared format from a MIME type, ignoring parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Identify the encoding from the payload's magic number.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
        }
    }
}

/// Raw encoded image captured from an upload. Immutable once created.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImageInput {
    pub fn new(bytes: impl Into<Vec<u8>>, format: ImageFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    /// Capture an upload whose format is declared by its file name.
    pub fn from_upload(filename: &str, bytes: impl Into<Vec<u8>>) -> Result<Self, AnalysisError> {
        let ext = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let format = ImageFormat::from_extension(ext).ok_or_else(|| {
            AnalysisError::InvalidImage(format!(
                "unsupported file type '{filename}'; upload a .jpg, .jpeg or .png image"
            ))
        })?;
        Ok(Self::new(bytes, format))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One analysis capability requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualFeature {
    Caption,
    Tags,
    Objects,
}

impl VisualFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caption => "caption",
            Self::Tags => "tags",
            Self::Objects => "objects",
        }
    }
}

/// The fixed feature set requested on every call: caption, tags and objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSelection;

impl FeatureSelection {
    const FEATURES: [VisualFeature; 3] =
        [VisualFeature::Caption, VisualFeature::Tags, VisualFeature::Objects];

    pub fn features(&self) -> &'static [VisualFeature] {
        &Self::FEATURES
    }

    /// Comma-separated form used in the `features` query parameter.
    pub fn query_value(&self) -> String {
        Self::FEATURES
            .iter()
            .map(VisualFeature::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A fully validated request, built fresh for each trigger.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub config: AnalysisConfig,
    pub image: ImageInput,
    pub features: FeatureSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Caption {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub confidence: f64,
}

/// Pixel rectangle of a detected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    #[serde(rename = "w")]
    pub width: i64,
    #[serde(rename = "h")]
    pub height: i64,
}

/// A detected object, labelled by its primary tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

/// Normalized, UI-ready result of one analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisResult {
    pub caption: Option<Caption>,
    pub tags: Vec<Tag>,
    pub objects: Vec<DetectedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// Terminal result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Failure { message: String },
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

    #[test]
    fn test_config_completeness() {
        assert!(AnalysisConfig::new("https://x", "k").is_complete());
        assert!(!AnalysisConfig::new("  ", "k").is_complete());
        assert!(!AnalysisConfig::new("https://x", "\t").is_complete());
        assert!(!AnalysisConfig::default().is_complete());
    }

    #[test]
    fn test_config_debug_masks_credential() {
        let cfg = AnalysisConfig::new("https://x", "super-secret-key");
        let dbg = format!("{:?}", cfg);
        assert!(dbg.contains("https://x"));
        assert!(!dbg.contains("super-secret-key"));
    }

    #[test]
    fn test_format_from_extension_and_mime() {
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension(".png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("gif"), None);
        assert_eq!(ImageFormat::from_mime("image/png; charset=binary"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("application/octet-stream"), None);
    }

    #[test]
    fn test_format_sniffing() {
        assert_eq!(ImageFormat::sniff(JPEG_MAGIC), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::sniff(PNG_MAGIC), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(b"GIF89a......"), None);
        assert_eq!(ImageFormat::sniff(b""), None);
    }

    #[test]
    fn test_image_from_upload() {
        let image = ImageInput::from_upload("holiday.JPEG", JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(image.format(), ImageFormat::Jpeg);
        assert_eq!(image.len(), JPEG_MAGIC.len());

        let err = ImageInput::from_upload("notes.txt", b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidImage(_)));
        assert!(ImageInput::from_upload("no_extension", b"x".to_vec()).is_err());
    }

    #[test]
    fn test_feature_selection_is_fixed() {
        let features = FeatureSelection;
        assert_eq!(features.features().len(), 3);
        assert_eq!(features.query_value(), "caption,tags,objects");
    }

    #[test]
    fn test_outcome_serialization() {
        let failure = AnalysisOutcome::Failure {
            message: "timed out".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["message"], "timed out");

        let success = AnalysisOutcome::Success(AnalysisResult::default());
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json["tags"].as_array().unwrap().is_empty());
    }
}
