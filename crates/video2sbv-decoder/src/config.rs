use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "backend-ffmpeg")]
use std::sync::OnceLock;

use crate::core::{DynFrameProvider, FrameError, FrameResult};

pub const BACKEND_ENV: &str = "VIDEO2SBV_BACKEND";
pub const CHANNEL_CAPACITY_ENV: &str = "VIDEO2SBV_CHANNEL_CAPACITY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mock,
    Ffmpeg,
}

impl FromStr for Backend {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Backend::Mock),
            "ffmpeg" => Ok(Backend::Ffmpeg),
            other => Err(FrameError::configuration(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Mock => "mock",
            Backend::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backends that can decode real input files, in preference order.
///
/// The mock backend is never listed: it only replays synthetic frames and
/// must be selected explicitly.
fn compiled_backends() -> Vec<Backend> {
    let mut backends = Vec::new();
    #[cfg(feature = "backend-ffmpeg")]
    {
        if ffmpeg_runtime_available() {
            backends.push(Backend::Ffmpeg);
        }
    }
    backends
}

#[cfg(feature = "backend-ffmpeg")]
fn ffmpeg_runtime_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| ffmpeg_next::init().is_ok())
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub backend: Backend,
    pub input: Option<PathBuf>,
    pub channel_capacity: Option<NonZeroUsize>,
}

impl Default for Configuration {
    fn default() -> Self {
        let backend = compiled_backends()
            .into_iter()
            .next()
            .unwrap_or(Backend::Ffmpeg);
        Self {
            backend,
            input: None,
            channel_capacity: None,
        }
    }
}

impl Configuration {
    pub fn from_env() -> FrameResult<Self> {
        let mut config = Configuration::default();
        if let Ok(backend) = env::var(BACKEND_ENV) {
            config.backend = Backend::from_str(&backend)?;
        }
        if let Ok(capacity) = env::var(CHANNEL_CAPACITY_ENV) {
            let parsed: usize = capacity.parse().map_err(|_| {
                FrameError::configuration(format!(
                    "failed to parse {CHANNEL_CAPACITY_ENV}='{capacity}' as a positive integer"
                ))
            })?;
            let Some(value) = NonZeroUsize::new(parsed) else {
                return Err(FrameError::configuration(format!(
                    "{CHANNEL_CAPACITY_ENV} must be greater than zero"
                )));
            };
            config.channel_capacity = Some(value);
        }
        Ok(config)
    }

    pub fn available_backends() -> Vec<Backend> {
        compiled_backends()
    }

    pub fn create_provider(&self) -> FrameResult<DynFrameProvider> {
        let channel_capacity = self.channel_capacity.map(NonZeroUsize::get);

        match self.backend {
            Backend::Mock => Ok(crate::backends::mock::boxed_mock(channel_capacity)),
            Backend::Ffmpeg => {
                #[cfg(feature = "backend-ffmpeg")]
                {
                    let path = self.input.clone().ok_or_else(|| {
                        FrameError::configuration("FFmpeg backend requires an input path")
                    })?;
                    crate::backends::ffmpeg::boxed_ffmpeg(path, channel_capacity)
                }
                #[cfg(not(feature = "backend-ffmpeg"))]
                {
                    Err(FrameError::unsupported("ffmpeg"))
                }
            }
        }
    }
}
