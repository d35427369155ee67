use std::str::FromStr;
use std::time::Instant;

use video2sbv_decoder::{Backend, Configuration, FrameError};

use crate::PipelineError;
use crate::pipeline::{self, RunSummary};

#[derive(Clone, Debug)]
pub struct ExecutionPlan {
    pub config: Configuration,
    pub pipeline: pipeline::PipelineConfig,
}

/// Runs the pipeline on the configured backend. Failures are returned as is.
pub async fn run(plan: ExecutionPlan) -> Result<RunSummary, PipelineError> {
    let ExecutionPlan { config, pipeline } = plan;

    if config.backend != Backend::Mock {
        let available = Configuration::available_backends();
        if available.is_empty() {
            return Err(FrameError::configuration(
                "no decoding backend available; rebuild with the \"backend-ffmpeg\" feature",
            )
            .into());
        }
        if !available.contains(&config.backend) {
            return Err(FrameError::unsupported(config.backend.as_str()).into());
        }
    }

    let provider_started = Instant::now();
    let provider = config.create_provider().inspect_err(|err| {
        tracing::warn!(
            backend = config.backend.as_str(),
            error = %err,
            "decoder backend failed to initialize"
        );
    })?;
    tracing::info!(
        backend = config.backend.as_str(),
        elapsed = ?provider_started.elapsed(),
        "initialized decoder backend"
    );

    pipeline::run_pipeline(provider, &pipeline)
        .await
        .map_err(|(err, _)| err)
}

pub fn display_available_backends() {
    let names: Vec<&'static str> = Configuration::available_backends()
        .iter()
        .map(Backend::as_str)
        .collect();
    if names.is_empty() {
        println!("available backends: (none compiled)");
    } else {
        println!("available backends: {}", names.join(", "));
    }
}

pub fn parse_backend(value: &str) -> Result<Backend, FrameError> {
    Backend::from_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_rejects_unknown_names() {
        assert_eq!(parse_backend("mock").unwrap(), Backend::Mock);
        assert!(parse_backend("dxva").is_err());
    }
}
