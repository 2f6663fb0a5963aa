//! CLI Analyze Command
//!
//! One-shot analysis of a local image file, rendered to the terminal.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use sightline_core::{AnalysisError, ImageInput};
use sightline_understanding::AnalysisView;

use crate::config::Config;
use crate::terminal_output::{note_error, note_info, note_warn, render_view, supports_color};

const CREDENTIALS_HINT: &str = "Please enter your Azure credentials \
     (--endpoint/--key, AZURE_VISION_ENDPOINT/AZURE_VISION_KEY, or the config file)";

/// Returns `Ok(true)` when the analysis succeeded.
pub async fn run(config: &Config, image_path: &Path, as_json: bool) -> Result<bool> {
    let bytes = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read image: {}", image_path.display()))?;
    let filename = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let image = match ImageInput::from_upload(&filename, bytes) {
        Ok(image) => image,
        Err(err) => {
            note_warn(&err.to_string());
            return Ok(false);
        }
    };

    let analysis_config = config.analysis_config();
    if !analysis_config.is_complete() {
        note_warn(CREDENTIALS_HINT);
        return Ok(false);
    }

    if !as_json {
        note_info(&format!("Analyzing {} ...", image_path.display()));
    }
    info!(path = %image_path.display(), bytes = image.len(), "Analyzing image");

    let controller = config.controller();
    match controller.analyze_once(analysis_config, image).await {
        Ok(outcome) => {
            let view = AnalysisView::from_outcome(&outcome);
            if as_json {
                let report = json!({ "outcome": outcome, "view": view });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_view(&view, supports_color()));
            }
            Ok(outcome.is_success())
        }
        Err(err @ (AnalysisError::InvalidConfig(_) | AnalysisError::InvalidImage(_))) => {
            note_warn(&err.to_string());
            Ok(false)
        }
        Err(err) => {
            note_error(&err.to_string());
            Ok(false)
        }
    }
}
