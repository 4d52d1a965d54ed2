use clap::Parser;
use futures::future::join_all;
use lungscan::config::EngineConfig;
use lungscan::error::ImageDecodeError;
use lungscan::model::default_loader;
use lungscan::preview::to_data_url;
use lungscan::service::DetectionService;
use serde_json::json;
use shared::DetectionResult;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Classify chest X-rays as PNEUMONIA or NORMAL, one JSON line per file.
#[derive(Parser)]
#[command(name = "lungscan", version)]
struct Cli {
    /// Include a base64 data URL of each image in the output
    #[arg(long)]
    preview: bool,

    /// Images to analyze
    #[arg(required = true, value_name = "IMAGE")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match EngineConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let loader = default_loader(&config.model);
    let service = DetectionService::start(config, loader);

    let status = service.readiness().settled().await;
    if status.is_simulated() {
        log::warn!(
            "Model unavailable{}; results below are simulated and not a diagnosis",
            status
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }

    let outcomes = join_all(
        cli.files
            .iter()
            .map(|path| analyze(&service, path, cli.preview)),
    )
    .await;

    let mut rejected = 0;
    for (path, outcome) in cli.files.iter().zip(outcomes) {
        let line = match outcome {
            Ok((result, data_url)) => json!({
                "file": path.display().to_string(),
                "headline": result.headline(),
                "confidencePercent": result.confidence_percent(),
                "result": result,
                "preview": data_url,
            }),
            Err(e) => {
                rejected += 1;
                json!({
                    "file": path.display().to_string(),
                    "error": e.to_string(),
                })
            }
        };
        println!("{}", line);
    }

    service.shutdown();
    if rejected > 0 {
        log::error!("{} of {} files were rejected", rejected, cli.files.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn analyze(
    service: &DetectionService,
    path: &Path,
    preview: bool,
) -> Result<(DetectionResult, Option<String>), ImageDecodeError> {
    let (result, bytes) = service.analyzer().analyze_file(path).await?;
    let data_url = if preview {
        Some(to_data_url(&bytes)?)
    } else {
        None
    };
    Ok((result, data_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_preview_flag_and_files() {
        let cli = Cli::try_parse_from(["lungscan", "--preview", "a.png", "b.jpg"]).unwrap();
        assert!(cli.preview);
        assert_eq!(cli.files, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["lungscan", "--preview"]).is_err());
    }
}
