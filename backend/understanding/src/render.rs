//! Presentation of outcomes for the UI layers.
//!
//! Both the terminal and the HTTP API render through `AnalysisView`, so the
//! percentages and separators are identical everywhere.

use serde::Serialize;

use sightline_core::{AnalysisOutcome, AnalysisResult, DetectedObject, Tag};

pub const SUCCESS_BANNER: &str = "Analysis Complete!";

/// Confidence in [0,1] as a percentage with `decimals` places.
pub fn format_percent(confidence: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, confidence * 100.0)
}

/// Caption confidence, one decimal: `0.8734` → `87.3%`.
pub fn caption_percent(confidence: f64) -> String {
    format_percent(confidence, 1)
}

/// Tag and object confidence, whole percent: `0.95` → `95%`.
pub fn whole_percent(confidence: f64) -> String {
    format_percent(confidence, 0)
}

/// `"dog (95%), animal (80%)"`
pub fn tag_line(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("{} ({})", t.name, whole_percent(t.confidence)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"dog - 90%"`
pub fn object_line(object: &DetectedObject) -> String {
    format!("{} - {}", object.label, whole_percent(object.confidence))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionView {
    pub text: String,
    pub confidence: String,
}

/// UI-ready strings for one outcome. Empty sections are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisView {
    pub banner: Banner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<CaptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<String>,
}

impl AnalysisView {
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        match outcome {
            AnalysisOutcome::Success(result) => Self::from_result(result),
            AnalysisOutcome::Failure { message } => Self {
                banner: Banner {
                    kind: BannerKind::Error,
                    text: format!("Error: {message}"),
                },
                caption: None,
                tags: None,
                objects: Vec::new(),
            },
        }
    }

    fn from_result(result: &AnalysisResult) -> Self {
        Self {
            banner: Banner {
                kind: BannerKind::Success,
                text: SUCCESS_BANNER.to_string(),
            },
            caption: result.caption.as_ref().map(|c| CaptionView {
                text: c.text.clone(),
                confidence: caption_percent(c.confidence),
            }),
            tags: (!result.tags.is_empty()).then(|| tag_line(&result.tags)),
            objects: result.objects.iter().map(object_line).collect(),
        }
    }
}
