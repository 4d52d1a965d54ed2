pub mod decode;
pub mod engine;
pub mod fallback;
pub mod preprocess;

pub use engine::{FallbackReason, InferenceEngine, StatsSnapshot};
pub use fallback::FallbackPredictor;
pub use preprocess::{PreprocessedTensor, preprocess};
