//! Analysis Event Logger
//!
//! Lifecycle events of one analysis (dispatch, completion, failure) written
//! through `tracing` so they land in the rolling NDJSON log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Dispatched {
        client: String,
        endpoint: String,
        format: String,
        image_bytes: usize,
    },
    Completed {
        has_caption: bool,
        tag_count: usize,
        object_count: usize,
        latency_ms: u64,
    },
    Failed {
        error_msg: String,
        latency_ms: u64,
    },
    Rejected {
        reason: String,
    },
    Superseded,
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AnalysisEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Logs an analysis event, redacting string payloads first.
    pub fn log_event(session_id: &str, mut event: AnalysisEvent) {
        match &mut event {
            AnalysisEvent::Dispatched { endpoint, .. } => {
                *endpoint = redact_sensitive_data(endpoint);
            }
            AnalysisEvent::Failed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            AnalysisEvent::Rejected { reason } => {
                *reason = redact_sensitive_data(reason);
            }
            AnalysisEvent::Completed { .. } | AnalysisEvent::Superseded => {}
        }

        let failed = matches!(event, AnalysisEvent::Failed { .. });
        let entry = EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        if failed {
            warn!(target: "analysis_events", event = %json, "Analysis event");
        } else {
            info!(target: "analysis_events", event = %json, "Analysis event");
        }
    }
}
