use std::path::PathBuf;

/// Input-stage failures. These are the only errors a caller of the analyzer ever sees.
#[derive(Debug, thiserror::Error)]
pub enum ImageDecodeError {
    #[error("Upload is empty")]
    Empty,
    #[error("File too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
    #[error("Unsupported file type, expected an image")]
    UnsupportedFormat,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image has no pixels")]
    EmptyImage,
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(usize),
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Load failures are captured in the model state, never returned by `load_model`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("Model runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Model runtime error: {0}")]
    Runtime(String),
    #[error("Model load aborted: {0}")]
    Aborted(String),
    #[error("Model lifecycle was torn down")]
    TornDown,
}

/// Raised while running the model. Always converted into a fallback prediction.
#[derive(Debug, thiserror::Error)]
pub enum InferenceExecutionError {
    #[error("Preprocessing failed: {0}")]
    Preprocessing(#[from] ImageDecodeError),
    #[error("Model execution failed: {0}")]
    Execution(String),
    #[error("Model produced no output")]
    EmptyOutput,
    #[error("Model score out of range: {0}")]
    ScoreOutOfRange(f32),
    #[error("Inference task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
