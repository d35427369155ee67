use video2sbv_types::Region;

use crate::plane::LumaPlane;

/// OCR invocation: one grayscale image and the language to read it in.
#[derive(Debug)]
pub struct OcrRequest<'a> {
    plane: LumaPlane<'a>,
    language: &'a str,
}

impl<'a> OcrRequest<'a> {
    pub fn new(plane: LumaPlane<'a>, language: &'a str) -> Self {
        Self { plane, language }
    }

    pub fn for_region(region: &'a Region, language: &'a str) -> Self {
        Self::new(LumaPlane::from_region(region), language)
    }

    pub fn plane(&self) -> &LumaPlane<'a> {
        &self.plane
    }

    pub fn language(&self) -> &'a str {
        self.language
    }
}
