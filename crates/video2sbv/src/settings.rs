use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::cli::{CliArgs, CliSources, OcrBackend};
use video2sbv_comparator::ComparatorSettings;
use video2sbv_locator::LocatorConfig;

pub const DEFAULT_LANG: &str = "chi_tra";
const PROJECT_CONFIG_FILE: &str = "video2sbv.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: Option<String>,
    separator: Option<f64>,
    lang: Option<String>,
    ocr_backend: Option<String>,
    tesseract: Option<String>,
    noise_intensity: Option<u8>,
    smooth_kernel_size: Option<usize>,
    diff_px_count_threshold: Option<usize>,
    min_region_size: Option<u32>,
    decoder_channel_capacity: Option<usize>,
    json_dump: Option<String>,
    progress: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub decoder: DecoderSettings,
    pub locator: LocatorConfig,
    pub comparator: ComparatorSettings,
    pub ocr: OcrSettings,
    pub json_dump: Option<PathBuf>,
    pub progress: bool,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DecoderSettings {
    pub backend: Option<String>,
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub backend: OcrBackend,
    pub lang: String,
    pub tesseract: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
    MissingArgument {
        name: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
            ConfigError::MissingArgument { name } => {
                write!(f, "missing required argument <{name}>")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
            ConfigError::MissingArgument { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let config = read_config(&path)?;
        return Ok((config, Some(path)));
    }

    for candidate in [project_config_path(), default_config_path()]
        .into_iter()
        .flatten()
    {
        if candidate.exists() {
            let config = read_config(&candidate)?;
            return Ok((config, Some(candidate)));
        }
    }

    Ok((FileConfig::default(), None))
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    let FileConfig {
        backend: file_backend,
        separator: file_separator,
        lang: file_lang,
        ocr_backend: file_ocr_backend,
        tesseract: file_tesseract,
        noise_intensity: file_noise_intensity,
        smooth_kernel_size: file_smooth_kernel_size,
        diff_px_count_threshold: file_diff_px_count_threshold,
        min_region_size: file_min_region_size,
        decoder_channel_capacity: file_decoder_channel_capacity,
        json_dump: file_json_dump,
        progress: file_progress,
    } = file;

    let input = cli
        .video_file
        .clone()
        .map(expand_pathbuf)
        .ok_or(ConfigError::MissingArgument { name: "video_file" })?;
    let output = cli
        .output_file
        .clone()
        .map(expand_pathbuf)
        .ok_or(ConfigError::MissingArgument {
            name: "output_file",
        })?;

    let mut backend = normalize_string(cli.backend.clone());
    if backend.is_none() {
        backend = normalize_string(file_backend);
    }

    let mut separator = cli.separator;
    let mut separator_path = None;
    if !sources.separator_from_cli
        && let Some(value) = file_separator
    {
        separator = value;
        separator_path = config_path.clone();
    }
    if !(separator > 0.0 && separator < 1.0) {
        return Err(ConfigError::InvalidValue {
            path: separator_path,
            field: "separator",
            value: separator.to_string(),
        });
    }

    let mut lang = cli.lang.trim().to_string();
    if !sources.lang_from_cli
        && let Some(value) = normalize_string(file_lang)
    {
        lang = value;
    }
    if lang.is_empty() {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "lang",
            value: lang,
        });
    }

    let mut ocr_backend = cli.ocr_backend;
    if !sources.ocr_backend_from_cli
        && let Some(value) = normalize_string(file_ocr_backend)
    {
        ocr_backend = parse_ocr_backend(&value, config_path.as_ref())?;
    }

    let tesseract = match cli.tesseract.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_tesseract)
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref())),
    };

    let defaults = ComparatorSettings::default();
    let locator_defaults = LocatorConfig::default();

    let noise_intensity = cli
        .noise_intensity
        .or(file_noise_intensity)
        .unwrap_or(defaults.noise_intensity);

    let smooth_kernel_size = match cli.smooth_kernel_size {
        Some(value) => value as usize,
        None => match file_smooth_kernel_size {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "smooth_kernel_size",
                    value: "0".to_string(),
                });
            }
            Some(value) => value,
            None => defaults.smooth_kernel_size,
        },
    };

    let diff_px_count_threshold = cli
        .diff_px_count_threshold
        .or(file_diff_px_count_threshold)
        .unwrap_or(defaults.diff_px_count_threshold);

    let min_region_size = cli
        .min_region_size
        .or(file_min_region_size)
        .unwrap_or(locator_defaults.min_region_size);

    let mut decoder_channel_capacity = cli.decoder_channel_capacity;
    if let Some(0) = decoder_channel_capacity {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "decoder_channel_capacity",
            value: "0".to_string(),
        });
    }
    if !sources.decoder_channel_capacity_from_cli
        && let Some(value) = file_decoder_channel_capacity
    {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                path: config_path,
                field: "decoder_channel_capacity",
                value: value.to_string(),
            });
        }
        decoder_channel_capacity = Some(value);
    }

    let json_dump = match cli.json_dump.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_json_dump)
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref())),
    };

    let progress = !cli.no_progress && file_progress.unwrap_or(true);

    Ok(EffectiveSettings {
        input,
        output,
        decoder: DecoderSettings {
            backend,
            channel_capacity: decoder_channel_capacity,
        },
        locator: LocatorConfig {
            separator,
            noise_intensity,
            min_region_size,
        },
        comparator: ComparatorSettings {
            noise_intensity,
            smooth_kernel_size,
            diff_px_count_threshold,
        },
        ocr: OcrSettings {
            backend: ocr_backend,
            lang,
            tesseract,
        },
        json_dump,
        progress,
        config_path,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "video2sbv", "video2sbv")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/")
        && let Some(base) = BaseDirs::new()
    {
        return base.home_dir().join(stripped);
    }
    PathBuf::from(value)
}

fn parse_ocr_backend(value: &str, path: Option<&PathBuf>) -> Result<OcrBackend, ConfigError> {
    OcrBackend::from_str(value, true).map_err(|_| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "ocr_backend",
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    fn parse(args: &[&str]) -> (CliArgs, CliSources) {
        let mut argv = vec!["video2sbv"];
        argv.extend_from_slice(args);
        let matches = CliArgs::command().try_get_matches_from(argv).unwrap();
        let cli = CliArgs::from_arg_matches(&matches).unwrap();
        let sources = CliSources {
            separator_from_cli: args.contains(&"--separator"),
            lang_from_cli: args.contains(&"--lang"),
            ocr_backend_from_cli: args.contains(&"--ocr-backend"),
            decoder_channel_capacity_from_cli: args.contains(&"--decoder-channel-capacity"),
        };
        (cli, sources)
    }

    fn file(contents: &str) -> FileConfig {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn defaults_apply_without_file() {
        let (cli, sources) = parse(&["in.mp4", "out.sbv"]);
        let settings = merge(&cli, &sources, FileConfig::default(), None).unwrap();
        assert_eq!(settings.locator, LocatorConfig::default());
        assert_eq!(settings.comparator, ComparatorSettings::default());
        assert_eq!(
            settings.locator.noise_intensity,
            settings.comparator.noise_intensity
        );
        assert_eq!(settings.ocr.lang, DEFAULT_LANG);
        assert_eq!(settings.ocr.backend, OcrBackend::Tesseract);
        assert!(settings.progress);
        assert!(settings.decoder.backend.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let (cli, sources) = parse(&["in.mp4", "out.sbv"]);
        let config = file(
            r#"
            separator = 0.8
            lang = "eng"
            ocr_backend = "noop"
            noise_intensity = 20
            smooth_kernel_size = 3
            min_region_size = 16
            progress = false
            tesseract = "bin/tesseract"
            "#,
        );
        let path = PathBuf::from("/etc/video2sbv/video2sbv.toml");
        let settings = merge(&cli, &sources, config, Some(path)).unwrap();
        assert_eq!(settings.locator.separator, 0.8);
        assert_eq!(settings.locator.noise_intensity, 20);
        assert_eq!(settings.comparator.noise_intensity, 20);
        assert_eq!(settings.comparator.smooth_kernel_size, 3);
        assert_eq!(settings.locator.min_region_size, 16);
        assert_eq!(settings.ocr.lang, "eng");
        assert_eq!(settings.ocr.backend, OcrBackend::Noop);
        assert_eq!(
            settings.ocr.tesseract,
            Some(PathBuf::from("/etc/video2sbv/bin/tesseract"))
        );
        assert!(!settings.progress);
    }

    #[test]
    fn explicit_cli_values_win_over_file() {
        let (cli, sources) = parse(&[
            "in.mp4",
            "out.sbv",
            "--separator",
            "0.9",
            "--lang",
            "jpn",
            "--noise-intensity",
            "5",
        ]);
        let config = file("separator = 0.5\nlang = \"eng\"\nnoise_intensity = 30\n");
        let settings = merge(&cli, &sources, config, None).unwrap();
        assert_eq!(settings.locator.separator, 0.9);
        assert_eq!(settings.ocr.lang, "jpn");
        assert_eq!(settings.comparator.noise_intensity, 5);
    }

    #[test]
    fn rejects_invalid_values() {
        let (cli, sources) = parse(&["in.mp4", "out.sbv"]);
        let err = merge(&cli, &sources, file("separator = 1.2"), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "separator",
                ..
            }
        ));

        let err = merge(&cli, &sources, file("ocr_backend = \"vision\""), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "ocr_backend",
                ..
            }
        ));

        let err = merge(&cli, &sources, file("decoder_channel_capacity = 0"), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "decoder_channel_capacity",
                ..
            }
        ));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let err = load_config(Some(Path::new("/nonexistent/video2sbv.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn explicit_config_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "lang = \"eng\"\nbackend = \"mock\"\n").unwrap();
        let (config, loaded) = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, Some(path));
        assert_eq!(config.lang.as_deref(), Some("eng"));
        assert_eq!(config.backend.as_deref(), Some("mock"));

        std::fs::write(dir.path().join("broken.toml"), "lang = [").unwrap();
        let err = load_config(Some(&dir.path().join("broken.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
