pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod store;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AppError, DependencyError, InferenceError, ValidationError};
pub use pipeline::{AnalysisOrchestrator, AnalysisResult, ImageBuffer};
pub use store::{ResultHandle, ResultStore};
