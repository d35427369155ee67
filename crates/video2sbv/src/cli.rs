use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OcrBackend {
    Tesseract,
    Noop,
}

impl OcrBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackend::Tesseract => "tesseract",
            OcrBackend::Noop => "noop",
        }
    }
}

#[derive(Debug, Default)]
pub struct CliSources {
    pub separator_from_cli: bool,
    pub lang_from_cli: bool,
    pub ocr_backend_from_cli: bool,
    pub decoder_channel_capacity_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            separator_from_cli: value_from_cli(matches, "separator"),
            lang_from_cli: value_from_cli(matches, "lang"),
            ocr_backend_from_cli: value_from_cli(matches, "ocr_backend"),
            decoder_channel_capacity_from_cli: value_from_cli(matches, "decoder_channel_capacity"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

#[derive(Debug, Parser)]
#[command(
    name = "video2sbv",
    about = "Extract hardcoded subtitles from a video into an SBV file",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Input video path
    #[arg(required_unless_present = "list_backends")]
    pub video_file: Option<PathBuf>,

    /// Output SBV path
    #[arg(required_unless_present = "list_backends")]
    pub output_file: Option<PathBuf>,

    /// Position of the line separating the subtitles, as a fraction of the video height
    #[arg(long = "separator", id = "separator", default_value_t = video2sbv_locator::DEFAULT_SEPARATOR)]
    pub separator: f64,

    /// Language of the subtitles, as an OCR language identifier
    #[arg(long = "lang", id = "lang", default_value = crate::settings::DEFAULT_LANG)]
    pub lang: String,

    /// Lock decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Print the list of available decoding backends
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// OCR engine used to read subtitle regions
    #[arg(long = "ocr-backend", id = "ocr_backend", value_enum, default_value_t = OcrBackend::Tesseract)]
    pub ocr_backend: OcrBackend,

    /// Path to the tesseract executable
    #[arg(long = "tesseract", value_name = "PATH")]
    pub tesseract: Option<PathBuf>,

    /// Max grey-level variation treated as noise (0-255)
    #[arg(long = "noise-intensity", value_parser = clap::value_parser!(u8))]
    pub noise_intensity: Option<u8>,

    /// Side of the square kernel used to smooth frame differences
    #[arg(
        long = "smooth-kernel-size",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub smooth_kernel_size: Option<u32>,

    /// Differing pixels tolerated before two regions count as different subtitles
    #[arg(long = "diff-px-count-threshold", value_parser = clap::value_parser!(usize))]
    pub diff_px_count_threshold: Option<usize>,

    /// Minimum width and height of a subtitle region, in pixels
    #[arg(long = "min-region-size", value_parser = clap::value_parser!(u32))]
    pub min_region_size: Option<u32>,

    /// Decoder frame queue capacity before applying backpressure
    #[arg(
        long = "decoder-channel-capacity",
        id = "decoder_channel_capacity",
        value_parser = clap::value_parser!(usize)
    )]
    pub decoder_channel_capacity: Option<usize>,

    /// Also write the cue list and run statistics as JSON
    #[arg(long = "json-dump", value_name = "FILE")]
    pub json_dump: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}
