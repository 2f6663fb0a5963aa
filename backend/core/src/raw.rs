//! Raw response shape of the image analysis service.
//!
//! Every section is optional: the service omits what it was not asked for or
//! could not produce, and interpretation must cope with any subset.

use serde::Deserialize;

use crate::types::{BoundingBox, ImageMetadata};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    #[serde(default, rename = "captionResult")]
    pub caption: Option<RawCaption>,

    #[serde(default, rename = "tagsResult")]
    pub tags: Option<RawTagList>,

    #[serde(default, rename = "objectsResult")]
    pub objects: Option<RawObjectList>,

    #[serde(default)]
    pub metadata: Option<ImageMetadata>,

    #[serde(default)]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCaption {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTag {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTagList {
    #[serde(default, rename = "values")]
    pub list: Vec<RawTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObject {
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    /// Candidate labels, best first. Not guaranteed non-empty.
    #[serde(default)]
    pub tags: Vec<RawTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawObjectList {
    #[serde(default, rename = "values")]
    pub list: Vec<RawObject>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct RawErrorEnvelope {
    pub error: RawErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RawErrorBody {
    /// `"(Code) message"`, or whichever half is present.
    pub fn describe(&self) -> String {
        match (self.code.as_deref(), self.message.as_deref()) {
            (Some(code), Some(msg)) => format!("({code}) {msg}"),
            (None, Some(msg)) => msg.to_string(),
            (Some(code), None) => format!("({code})"),
            (None, None) => String::new(),
        }
    }
}
