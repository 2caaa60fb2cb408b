use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Inference Error: {0}")]
    Inference(#[from] InferenceError),
    #[error("Dependency Error: {0}")]
    Dependency(#[from] DependencyError),
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("Pipeline Error: {0}")]
    Pipeline(String),
    #[error("Store Error: {0}")]
    Store(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("The analysis was cancelled before it completed")]
    Cancelled,
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Rejections raised while checking an uploaded image. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The image payload is empty")]
    Empty,
    #[error("The image could not be decoded: {0}")]
    Undecodable(String),
    #[error("The image is {width}x{height}px, the minimum is {min}x{min}px")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("The multipart form has no '{0}' field")]
    MissingField(&'static str),
}

/// Failures of the segmentation or classification providers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Segmentation failed: {0}")]
    Segmentation(String),
    #[error("Classification failed: {0}")]
    Classification(String),
    #[error("The inference device is unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Failures of remote dependencies such as the narrative generator or a reference lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("The request timed out")]
    Timeout,
    #[error("The service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("The service could not be reached: {0}")]
    Connection(String),
    #[error("The service returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("The service is not configured: {0}")]
    NotConfigured(String),
}

impl DependencyError {
    /// Timeouts, dropped connections and 5xx responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            DependencyError::Timeout | DependencyError::Connection(_) => true,
            DependencyError::Status { status, .. } => *status >= 500,
            DependencyError::InvalidResponse(_) | DependencyError::NotConfigured(_) => false,
        }
    }
}
