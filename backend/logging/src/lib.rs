//! Structured logging for Sightline.
//!
//! Console + rolling NDJSON file output, secret scrubbing, and analysis
//! lifecycle events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AnalysisEvent, EventLogEntry, EventLogger};
pub use logger::{init_logger, LoggerGuard};
pub use redact::redact_sensitive_data;
