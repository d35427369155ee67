use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR configuration error: {message}")]
    Configuration { message: String },
    #[error("backend error: {message}")]
    Backend { message: String },
    #[error("failed to run OCR engine: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
