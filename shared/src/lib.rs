use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Prediction {
    Pneumonia,
    Normal,
}

/// Where a result came from. `Simulated` results were produced without the model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultSource {
    #[default]
    Model,
    Simulated,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DetectionResult {
    pub prediction: Prediction,
    /// Probability mass of `prediction`, never of the raw score's class.
    pub confidence: f32,
    /// Base64 encoded heatmap image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<String>,
    #[serde(default)]
    pub source: ResultSource,
}

impl DetectionResult {
    pub fn is_pneumonia(&self) -> bool {
        self.prediction == Prediction::Pneumonia
    }

    pub fn is_simulated(&self) -> bool {
        self.source == ResultSource::Simulated
    }

    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn headline(&self) -> &'static str {
        if self.is_pneumonia() {
            "Pneumonia Detected"
        } else {
            "No Pneumonia Detected"
        }
    }
}

/// Model readiness as shown to the presentation layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReadinessStatus {
    #[serde(rename = "isModelLoaded")]
    pub model_ready: bool,
    #[serde(rename = "isLoading")]
    pub loading: bool,
    pub error: Option<String>,
}

impl ReadinessStatus {
    pub fn checking() -> Self {
        Self {
            model_ready: false,
            loading: true,
            error: None,
        }
    }

    pub fn ready() -> Self {
        Self {
            model_ready: true,
            loading: false,
            error: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            model_ready: false,
            loading: false,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            model_ready: false,
            loading: false,
            error: Some(error.into()),
        }
    }

    /// Results produced in this state come from the fallback predictor.
    pub fn is_simulated(&self) -> bool {
        !self.model_ready && !self.loading
    }
}

impl Default for ReadinessStatus {
    fn default() -> Self {
        Self::checking()
    }
}
