use image::DynamicImage;
use shared::DetectionResult;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ImageDecodeError;
use crate::inference::InferenceEngine;

/// Entry point for the upload collaborator. Input problems are rejected here, before the
/// engine is consulted, so they never turn into simulated results.
#[derive(Clone)]
pub struct LungAnalyzer {
    engine: Arc<InferenceEngine>,
    max_upload_bytes: usize,
}

impl LungAnalyzer {
    pub fn with_upload_limit(engine: Arc<InferenceEngine>, max_upload_bytes: usize) -> Self {
        Self {
            engine,
            max_upload_bytes,
        }
    }

    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    pub async fn analyze_lung_image(&self, bytes: &[u8]) -> Result<DetectionResult, ImageDecodeError> {
        let request_id = Uuid::new_v4();
        let image = decode_upload(bytes, self.max_upload_bytes).map_err(|e| {
            log::warn!("[{}] Rejected upload: {}", request_id, e);
            e
        })?;

        log::info!(
            "[{}] Analyzing {}x{} image ({} bytes)",
            request_id,
            image.width(),
            image.height(),
            bytes.len()
        );
        let result = self.engine.predict(image).await;
        log::info!(
            "[{}] {} with {}% confidence{}",
            request_id,
            result.prediction,
            result.confidence_percent(),
            if result.is_simulated() { " (simulated)" } else { "" }
        );
        Ok(result)
    }

    /// Reads and analyzes a file. The raw bytes are handed back for previews.
    pub async fn analyze_file(
        &self,
        path: &Path,
    ) -> Result<(DetectionResult, Vec<u8>), ImageDecodeError> {
        let bytes = tokio::fs::read(path).await?;
        let result = self.analyze_lung_image(&bytes).await?;
        Ok((result, bytes))
    }
}

pub fn validate_upload(bytes: &[u8], max_bytes: usize) -> Result<(), ImageDecodeError> {
    if bytes.is_empty() {
        return Err(ImageDecodeError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ImageDecodeError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    Ok(())
}

pub fn decode_upload(bytes: &[u8], max_bytes: usize) -> Result<DynamicImage, ImageDecodeError> {
    validate_upload(bytes, max_bytes)?;
    let format = image::guess_format(bytes).map_err(|_| ImageDecodeError::UnsupportedFormat)?;
    let image = image::load_from_memory_with_format(bytes, format)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageDecodeError::EmptyImage);
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelLoadError;
    use crate::inference::FallbackPredictor;
    use crate::model::ModelLifecycle;
    use crate::model::testing::{FixedScoreModel, ScriptedLoader, png_bytes};
    use shared::{Prediction, ResultSource};

    async fn analyzer(loader: Arc<ScriptedLoader>) -> LungAnalyzer {
        let lifecycle = Arc::new(ModelLifecycle::new(loader, "model.pt"));
        lifecycle.load_model().await;
        let engine = InferenceEngine::with_fallback(lifecycle, FallbackPredictor::seeded(3));
        LungAnalyzer::with_upload_limit(Arc::new(engine), 1024 * 1024)
    }

    #[tokio::test]
    async fn valid_upload_reaches_the_model() {
        let analyzer = analyzer(ScriptedLoader::succeeding(FixedScoreModel::new(0.82))).await;

        let result = analyzer.analyze_lung_image(&png_bytes(64, 48)).await.unwrap();

        assert_eq!(result.prediction, Prediction::Pneumonia);
        assert_eq!(result.source, ResultSource::Model);
    }

    #[tokio::test]
    async fn failed_model_still_resolves() {
        let analyzer =
            analyzer(ScriptedLoader::failing(ModelLoadError::Runtime("bad".into()))).await;

        let result = analyzer.analyze_lung_image(&png_bytes(16, 16)).await.unwrap();

        assert!(result.is_simulated());
        assert!(!analyzer.engine().lifecycle().is_model_ready().await);
    }

    #[tokio::test]
    async fn corrupt_upload_is_rejected_without_fallback() {
        let analyzer =
            analyzer(ScriptedLoader::failing(ModelLoadError::Runtime("bad".into()))).await;
        let mut corrupt = png_bytes(32, 32);
        corrupt.truncate(40);

        let err = analyzer.analyze_lung_image(&corrupt).await.unwrap_err();

        assert!(matches!(err, ImageDecodeError::Decode(_)));
        assert_eq!(analyzer.engine().stats().fallbacks(), 0);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let analyzer = analyzer(ScriptedLoader::succeeding(FixedScoreModel::new(0.5))).await;

        let err = analyzer
            .analyze_lung_image(b"%PDF-1.7 definitely not an x-ray")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageDecodeError::UnsupportedFormat));

        let err = analyzer.analyze_lung_image(&[]).await.unwrap_err();
        assert!(matches!(err, ImageDecodeError::Empty));
        assert_eq!(analyzer.engine().stats().fallbacks(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let engine_analyzer = analyzer(ScriptedLoader::succeeding(FixedScoreModel::new(0.5))).await;
        let analyzer = LungAnalyzer::with_upload_limit(Arc::clone(engine_analyzer.engine()), 16);

        let err = analyzer.analyze_lung_image(&png_bytes(8, 8)).await.unwrap_err();

        assert!(matches!(err, ImageDecodeError::TooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn file_analysis_returns_the_bytes_read() {
        let analyzer = analyzer(ScriptedLoader::succeeding(FixedScoreModel::new(0.2))).await;
        let path = std::env::temp_dir().join(format!("lungscan-{}.png", Uuid::new_v4()));
        let bytes = png_bytes(20, 20);
        tokio::fs::write(&path, &bytes).await.unwrap();

        let (result, read) = analyzer.analyze_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(read, bytes);
        assert_eq!(result.prediction, Prediction::Normal);
        assert_eq!(result.source, ResultSource::Model);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let analyzer = analyzer(ScriptedLoader::succeeding(FixedScoreModel::new(0.5))).await;

        let err = analyzer
            .analyze_file(Path::new("/no/such/chest-xray.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImageDecodeError::Io(_)));
    }
}
