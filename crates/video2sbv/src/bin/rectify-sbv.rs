use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use video2sbv::logging::init_logging;
use video2sbv::rectify::rectify_files;

/// Replace the text of one SBV file with the text of another, keeping the
/// timing of the first.
#[derive(Debug, Parser)]
#[command(name = "rectify-sbv")]
struct Args {
    /// SBV file whose timing lines are kept
    src: PathBuf,

    /// SBV file whose texts are used
    reference: PathBuf,

    /// Output SBV path
    dst: PathBuf,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    match rectify_files(&args.src, &args.reference, &args.dst).await {
        Ok(entries) => {
            tracing::info!(entries, dst = %args.dst.display(), "rectified subtitles written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
