use crate::error::OcrError;
use crate::request::OcrRequest;
use crate::response::OcrResponse;

/// Common interface for all OCR engines.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checks that the engine can serve requests, before any frame is read.
    fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }

    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError>;
}

/// Engine that recognizes nothing. Useful for dry runs.
#[derive(Debug, Default)]
pub struct NoopOcrEngine;

impl OcrEngine for NoopOcrEngine {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn recognize(&self, _: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        Ok(OcrResponse::empty())
    }
}
