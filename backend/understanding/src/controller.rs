//! Orchestration: one trigger → validate → build → call → interpret.
//!
//! Remote failures never escape as errors; they become
//! `AnalysisOutcome::Failure`. Only precondition problems, a busy session, or
//! a superseded request come back as `Err`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use sightline_core::{AnalysisConfig, AnalysisError, AnalysisOutcome, ImageInput, RemoteCallError, VisionClient};
use sightline_logging::{AnalysisEvent, EventLogger};

use crate::interpret::ResponseInterpreter;
use crate::request::RequestBuilder;
use crate::session::{SessionContext, SessionHandle};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Releases the session's in-flight slot if `analyze` is dropped before it
/// records an outcome (client disconnect, caller-side timeout).
struct PendingGuard {
    session: SessionHandle,
    session_id: String,
    ticket: u64,
    armed: bool,
}

impl PendingGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let ticket = self.ticket;
        match self.session.try_lock() {
            Ok(mut ctx) => {
                if ctx.abandon(ticket) {
                    warn!(session = %self.session_id, "Analysis dropped before completion");
                }
            }
            Err(_) => {
                // Lock is busy; release it once the holder is done.
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let session = Arc::clone(&self.session);
                    runtime.spawn(async move {
                        session.lock().await.abandon(ticket);
                    });
                }
            }
        }
    }
}

pub struct OrchestrationController {
    client: Arc<dyn VisionClient>,
    builder: RequestBuilder,
    timeout: Duration,
}

impl OrchestrationController {
    pub fn new(client: Arc<dyn VisionClient>) -> Self {
        Self {
            client,
            builder: RequestBuilder::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_builder(mut self, builder: RequestBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    /// One-shot analysis outside any long-lived session.
    pub async fn analyze_once(
        &self,
        config: AnalysisConfig,
        image: ImageInput,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let session = SessionContext::new()
            .with_config(config)
            .with_image(image)
            .into_handle();
        self.analyze(&session).await
    }

    /// Handle an explicit analyze trigger for `session`.
    pub async fn analyze(&self, session: &SessionHandle) -> Result<AnalysisOutcome, AnalysisError> {
        let (session_id, dispatch) = {
            let mut ctx = session.lock().await;
            let id = ctx.id().to_string();
            match ctx.begin(&self.builder) {
                Ok(dispatch) => (id, dispatch),
                Err(err) => {
                    debug!(session = %id, error = %err, "Analysis not dispatched");
                    EventLogger::log_event(&id, AnalysisEvent::Rejected { reason: err.to_string() });
                    return Err(err);
                }
            }
        };

        let mut guard = PendingGuard {
            session: Arc::clone(session),
            session_id: session_id.clone(),
            ticket: dispatch.ticket,
            armed: true,
        };

        let request = &dispatch.request;
        info!(
            session = %session_id,
            client = self.client.name(),
            format = %request.image.format(),
            bytes = request.image.len(),
            "Dispatching image analysis"
        );
        EventLogger::log_event(
            &session_id,
            AnalysisEvent::Dispatched {
                client: self.client.name().to_string(),
                endpoint: request.config.endpoint.clone(),
                format: request.image.format().to_string(),
                image_bytes: request.image.len(),
            },
        );

        let start = Instant::now();
        let call = tokio::time::timeout(self.timeout, self.client.analyze(request));

        let outcome = tokio::select! {
            _ = dispatch.abort.notified() => {
                info!(session = %session_id, "In-flight analysis discarded");
                EventLogger::log_event(&session_id, AnalysisEvent::Superseded);
                guard.disarm();
                return Err(AnalysisError::Superseded);
            }
            result = call => match result {
                Ok(Ok(raw)) => AnalysisOutcome::Success(ResponseInterpreter::interpret(raw)),
                Ok(Err(err)) => ResponseInterpreter::interpret_failure(&err),
                Err(_elapsed) => {
                    warn!(session = %session_id, timeout_secs = self.timeout.as_secs_f64(), "Vision call timed out");
                    ResponseInterpreter::interpret_failure(&RemoteCallError::Timeout)
                }
            },
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            AnalysisOutcome::Success(result) => EventLogger::log_event(
                &session_id,
                AnalysisEvent::Completed {
                    has_caption: result.caption.is_some(),
                    tag_count: result.tags.len(),
                    object_count: result.objects.len(),
                    latency_ms,
                },
            ),
            AnalysisOutcome::Failure { message } => EventLogger::log_event(
                &session_id,
                AnalysisEvent::Failed {
                    error_msg: message.clone(),
                    latency_ms,
                },
            ),
        }

        let finished = session.lock().await.finish(dispatch.ticket, outcome);
        guard.disarm();
        finished
    }
}
