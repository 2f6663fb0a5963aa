//! Image understanding: turn an uploaded image into caption, tags and
//! detected objects via a cloud vision service.

pub mod azure;
pub mod controller;
pub mod interpret;
pub mod mock;
pub mod render;
pub mod request;
pub mod session;

pub use azure::AzureVisionClient;
pub use controller::OrchestrationController;
pub use interpret::{ResponseInterpreter, MAX_OBJECTS, MAX_TAGS};
pub use mock::MockVisionClient;
pub use render::{AnalysisView, Banner, BannerKind, CaptionView};
pub use request::RequestBuilder;
pub use session::{SessionContext, SessionHandle, SessionState};
