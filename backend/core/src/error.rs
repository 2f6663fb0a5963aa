use thiserror::Error;

/// Failure of the remote vision call. Every variant renders a non-empty,
/// human-readable message suitable for an error banner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteCallError {
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("request rejected by the vision service ({status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("vision service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out")]
    Timeout,

    #[error("unreadable response from the vision service: {0}")]
    Decode(String),
}

impl RemoteCallError {
    /// Classify a non-success HTTP status into an error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "no details provided".to_string()
        } else {
            message
        };
        match status {
            401 | 403 => Self::Authentication { status, message },
            400..=499 => Self::BadRequest { status, message },
            _ => Self::Service { status, message },
        }
    }
}

/// Errors surfaced by request building and orchestration.
///
/// `InvalidConfig` and `InvalidImage` are advisory: they prevent dispatch and
/// steer the user to fix their input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Remote failure in the taxonomy. The controller converts these into
    /// `AnalysisOutcome::Failure` and never returns this variant; it exists
    /// so client-level code can lift a `RemoteCallError` with `?`.
    #[error(transparent)]
    RemoteCall(#[from] RemoteCallError),

    #[error("an analysis is already in progress")]
    Busy,

    #[error("analysis discarded: superseded by a newer image or cancelled")]
    Superseded,
}

impl AnalysisError {
    /// Whether this error only asks the user to fix their input.
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::InvalidImage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = RemoteCallError::from_status(401, "Access denied due to invalid subscription key");
        assert!(matches!(err, RemoteCallError::Authentication { status: 401, .. }));
        assert!(err.to_string().contains("authentication"));

        assert!(matches!(
            RemoteCallError::from_status(403, "x"),
            RemoteCallError::Authentication { .. }
        ));
        assert!(matches!(
            RemoteCallError::from_status(415, "x"),
            RemoteCallError::BadRequest { .. }
        ));
        assert!(matches!(
            RemoteCallError::from_status(503, "x"),
            RemoteCallError::Service { .. }
        ));
    }

    #[test]
    fn test_empty_message_still_renders() {
        let err = RemoteCallError::from_status(500, "  ");
        assert_eq!(err.to_string(), "vision service error (500): no details provided");
        assert_eq!(RemoteCallError::Timeout.to_string(), "timed out");
    }

    #[test]
    fn test_advisory_kinds() {
        assert!(AnalysisError::InvalidConfig("x".into()).is_advisory());
        assert!(AnalysisError::InvalidImage("x".into()).is_advisory());
        assert!(!AnalysisError::Busy.is_advisory());
        assert!(!AnalysisError::from(RemoteCallError::Timeout).is_advisory());
    }

    #[test]
    fn test_remote_call_is_transparent() {
        let err = AnalysisError::from(RemoteCallError::from_status(401, "bad key"));
        assert_eq!(err.to_string(), "authentication failed (401): bad key");
    }
}
