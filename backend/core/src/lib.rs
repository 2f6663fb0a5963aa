pub mod error;
pub mod raw;
pub mod traits;
pub mod types;

pub use error::{AnalysisError, RemoteCallError};
pub use raw::{RawAnalysis, RawCaption, RawObject, RawObjectList, RawTag, RawTagList};
pub use traits::VisionClient;
pub use types::{
    AnalysisConfig, AnalysisOutcome, AnalysisRequest, AnalysisResult, BoundingBox, Caption,
    DetectedObject, FeatureSelection, ImageFormat, ImageInput, ImageMetadata, Tag, VisualFeature,
};
