//! Response interpretation: raw service output → `AnalysisResult`, and
//! remote errors → `AnalysisOutcome::Failure`.

use sightline_core::{
    AnalysisOutcome, AnalysisResult, Caption, DetectedObject, RawAnalysis, RawObject, RemoteCallError, Tag,
};

/// Tags surfaced per analysis, in service order.
pub const MAX_TAGS: usize = 8;

/// Objects considered per analysis, in service order.
pub const MAX_OBJECTS: usize = 5;

pub struct ResponseInterpreter;

impl ResponseInterpreter {
    /// Normalize a raw response. Missing sections are empty, never errors.
    pub fn interpret(raw: RawAnalysis) -> AnalysisResult {
        let caption = raw
            .caption
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| Caption {
                text: c.text,
                confidence: clamp_confidence(c.confidence),
            });

        let tags = raw
            .tags
            .map(|t| t.list)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_TAGS)
            .map(|t| Tag {
                name: t.name,
                confidence: clamp_confidence(t.confidence),
            })
            .collect();

        // Truncate first, then drop objects without a label: an object whose
        // tag list is empty just leaves a gap in the five.
        let objects = raw
            .objects
            .map(|o| o.list)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_OBJECTS)
            .filter_map(primary_label)
            .collect();

        AnalysisResult {
            caption,
            tags,
            objects,
            metadata: raw.metadata,
            model_version: raw.model_version,
        }
    }

    /// Convert a remote failure into a displayable outcome.
    pub fn interpret_failure(error: &RemoteCallError) -> AnalysisOutcome {
        let message = error.to_string();
        let message = if message.trim().is_empty() {
            "the vision service call failed".to_string()
        } else {
            message
        };
        AnalysisOutcome::Failure { message }
    }
}

/// An object is labelled by its first tag only.
fn primary_label(object: RawObject) -> Option<DetectedObject> {
    let primary = object.tags.into_iter().next()?;
    Some(DetectedObject {
        label: primary.name,
        confidence: clamp_confidence(primary.confidence),
        bounding_box: object.bounding_box,
    })
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
