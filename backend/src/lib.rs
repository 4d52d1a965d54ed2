pub mod analysis;
pub mod config;
pub mod error;
pub mod inference;
pub mod model;
pub mod preview;
pub mod readiness;
pub mod service;

pub use analysis::LungAnalyzer;
pub use config::EngineConfig;
pub use service::DetectionService;
