/// Raw text returned by an engine, before any post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrResponse {
    pub text: String,
}

impl OcrResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn empty() -> Self {
        Self {
            text: String::new(),
        }
    }
}
