//! Per-user session context: the config/image/outcome triple plus the
//! bookkeeping for the one request that may be in flight.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use sightline_core::{AnalysisConfig, AnalysisError, AnalysisOutcome, AnalysisRequest, ImageInput};

use crate::request::RequestBuilder;

/// Shared handle to a session; locks are never held across an `.await`.
pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// UI-relevant state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Image and/or config missing; analysis is not offered.
    Idle,
    /// Image present and config complete.
    Ready,
    /// One request in flight; further triggers are rejected.
    Pending,
    /// The last request produced an outcome.
    Resolved,
}

const PROMPT_CREDENTIALS: &str = "Please enter your Azure credentials";
const PROMPT_UPLOAD: &str = "Upload an image to get started";

#[derive(Debug)]
struct InFlight {
    ticket: u64,
    abort: Arc<Notify>,
}

/// A dispatched request, handed from the session to the controller.
#[derive(Debug)]
pub(crate) struct Dispatch {
    pub request: AnalysisRequest,
    pub ticket: u64,
    pub abort: Arc<Notify>,
}

#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    config: AnalysisConfig,
    image: Option<ImageInput>,
    outcome: Option<AnalysisOutcome>,
    in_flight: Option<InFlight>,
    tickets: u64,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            config: AnalysisConfig::default(),
            image: None,
            outcome: None,
            in_flight: None,
            tickets: 0,
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    pub fn into_handle(self) -> SessionHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace endpoint and credential. An in-flight request keeps the
    /// snapshot it was built with; the displayed outcome is untouched.
    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.config = config;
    }

    pub fn image(&self) -> Option<&ImageInput> {
        self.image.as_ref()
    }

    /// Capture a newly uploaded image. Clears the displayed outcome and
    /// discards any in-flight request. Returns whether one was discarded.
    pub fn set_image(&mut self, image: ImageInput) -> bool {
        self.image = Some(image);
        self.outcome = None;
        self.abort_in_flight()
    }

    pub fn clear_image(&mut self) -> bool {
        self.image = None;
        self.outcome = None;
        self.abort_in_flight()
    }

    /// Discard the in-flight request, if any, without a new image.
    pub fn cancel(&mut self) -> bool {
        self.abort_in_flight()
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    pub fn state(&self) -> SessionState {
        if self.in_flight.is_some() {
            SessionState::Pending
        } else if self.outcome.is_some() {
            SessionState::Resolved
        } else if self.preconditions_met() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }

    /// Whether the UI should offer the analyze action.
    pub fn can_trigger(&self) -> bool {
        self.in_flight.is_none() && self.preconditions_met()
    }

    /// Prompt steering the user out of Idle, if that is where they are.
    pub fn advisory(&self) -> Option<&'static str> {
        if self.in_flight.is_some() || self.outcome.is_some() {
            return None;
        }
        match (self.image.is_some(), self.config.is_complete()) {
            (true, false) => Some(PROMPT_CREDENTIALS),
            (false, _) => Some(PROMPT_UPLOAD),
            (true, true) => None,
        }
    }

    fn preconditions_met(&self) -> bool {
        self.image.as_ref().is_some_and(|i| !i.is_empty()) && self.config.is_complete()
    }

    fn abort_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            Some(flight) => {
                flight.abort.notify_one();
                true
            }
            None => false,
        }
    }

    /// Trigger: clear the previous outcome, re-validate, and enter Pending.
    pub(crate) fn begin(&mut self, builder: &RequestBuilder) -> Result<Dispatch, AnalysisError> {
        if self.in_flight.is_some() {
            return Err(AnalysisError::Busy);
        }
        self.outcome = None;

        builder.validate_config(&self.config)?;
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| AnalysisError::InvalidImage("no image uploaded".into()))?;
        let request = builder.build(&self.config, image)?;

        self.tickets += 1;
        let abort = Arc::new(Notify::new());
        self.in_flight = Some(InFlight {
            ticket: self.tickets,
            abort: Arc::clone(&abort),
        });

        Ok(Dispatch {
            request,
            ticket: self.tickets,
            abort,
        })
    }

    /// Release `ticket` without an outcome, e.g. when its caller went away.
    /// Returns whether it was still the request in flight.
    pub(crate) fn abandon(&mut self, ticket: u64) -> bool {
        match &self.in_flight {
            Some(flight) if flight.ticket == ticket => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Store the outcome of `ticket` if it is still the request in flight.
    pub(crate) fn finish(
        &mut self,
        ticket: u64,
        outcome: AnalysisOutcome,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        match &self.in_flight {
            Some(flight) if flight.ticket == ticket => {
                self.in_flight = None;
                self.outcome = Some(outcome.clone());
                Ok(outcome)
            }
            _ => Err(AnalysisError::Superseded),
        }
    }
}
