use std::num::NonZeroUsize;
use std::process::ExitCode;

use video2sbv::PipelineError;
use video2sbv::backend::{self, ExecutionPlan};
use video2sbv::cli::parse_cli;
use video2sbv::logging::init_logging;
use video2sbv::pipeline::PipelineConfig;
use video2sbv::settings::{EffectiveSettings, resolve_settings};
use video2sbv_decoder::{Configuration, FrameError};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let (cli, sources) = parse_cli();
    init_logging();

    if cli.list_backends {
        backend::display_available_backends();
        return ExitCode::SUCCESS;
    }

    match run(&cli, &sources).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cli: &video2sbv::cli::CliArgs,
    sources: &video2sbv::cli::CliSources,
) -> Result<(), PipelineError> {
    let settings = resolve_settings(cli, sources)?;
    if let Some(path) = &settings.config_path {
        tracing::debug!(path = %path.display(), "loaded configuration file");
    }
    let plan = build_plan(&settings)?;
    let summary = backend::run(plan).await?;
    tracing::info!(
        cues = summary.cues,
        output = %summary.output.display(),
        "done"
    );
    Ok(())
}

fn build_plan(settings: &EffectiveSettings) -> Result<ExecutionPlan, PipelineError> {
    let mut config = Configuration::from_env()?;
    if let Some(name) = &settings.decoder.backend {
        config.backend = backend::parse_backend(name)?;
    }
    if let Some(capacity) = settings.decoder.channel_capacity {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            FrameError::configuration("decoder channel capacity must be greater than zero")
        })?;
        config.channel_capacity = Some(capacity);
    }
    config.input = Some(settings.input.clone());

    Ok(ExecutionPlan {
        config,
        pipeline: PipelineConfig::from_settings(settings),
    })
}
