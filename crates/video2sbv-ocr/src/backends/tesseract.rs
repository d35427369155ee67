use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

use crate::{OcrEngine, OcrError, OcrRequest, OcrResponse};

pub const DEFAULT_TESSERACT_BINARY: &str = "tesseract";

/// Runs the `tesseract` command-line tool once per request.
///
/// The image is passed as PNG on stdin and the recognized text is read back
/// from stdout.
#[derive(Debug, Clone)]
pub struct TesseractOcrEngine {
    binary: PathBuf,
    language: String,
}

impl TesseractOcrEngine {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_TESSERACT_BINARY),
            language: language.into(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn available_languages(&self) -> Result<Vec<String>, OcrError> {
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                OcrError::configuration(format!(
                    "failed to launch {}: {err}",
                    self.binary.display()
                ))
            })?;
        check_status(&self.binary, &output)?;
        // Older releases print the listing on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push('\n');
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }
}

impl OcrEngine for TesseractOcrEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn warm_up(&self) -> Result<(), OcrError> {
        let installed = self.available_languages()?;
        let missing: Vec<&str> = self
            .language
            .split('+')
            .map(str::trim)
            .filter(|lang| !lang.is_empty() && !installed.iter().any(|have| have == lang))
            .collect();
        if !missing.is_empty() {
            return Err(OcrError::configuration(format!(
                "tesseract language data not installed: {} (available: {})",
                missing.join(", "),
                installed.join(", ")
            )));
        }
        Ok(())
    }

    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        let plane = request.plane();
        if plane.width() == 0 || plane.height() == 0 {
            return Ok(OcrResponse::empty());
        }
        let png = encode_png(plane.data(), plane.width(), plane.height())?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", request.language()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take()
            && let Err(err) = stdin.write_all(&png)
        {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err.into());
        }
        let output = child.wait_with_output()?;
        check_status(&self.binary, &output)?;
        Ok(OcrResponse::new(String::from_utf8_lossy(&output.stdout)))
    }
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, OcrError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(pixels, width, height, ColorType::L8)
        .map_err(|err| OcrError::backend(format!("failed to encode PNG: {err}")))?;
    Ok(png)
}

fn check_status(binary: &Path, output: &Output) -> Result<(), OcrError> {
    if output.status.success() {
        return Ok(());
    }
    Err(OcrError::backend(format!(
        "{} exited with {}: {}",
        binary.display(),
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    )))
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(char::is_whitespace))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_listing_skips_header() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\nchi_tra\neng\nosd\n";
        assert_eq!(parse_language_list(listing), vec!["chi_tra", "eng", "osd"]);
    }

    #[test]
    fn png_encoding_produces_signature() {
        let png = encode_png(&[0, 255, 255, 0], 2, 2).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[cfg(unix)]
    #[test]
    fn engine_that_ignores_stdin_fails_cleanly() {
        use video2sbv_types::{Region, RegionBounds};

        let binary = Path::new("/bin/false");
        if !binary.exists() {
            eprintln!("skipping: /bin/false not available");
            return;
        }
        // Noise does not compress, so the PNG outgrows the pipe buffer.
        let mut seed = 0x2545_f491_u32;
        let pixels: Vec<u8> = (0..512 * 512)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed as u8
            })
            .collect();
        let region = Region::from_owned(RegionBounds::new(0, 0, 512, 512), pixels).unwrap();
        let engine = TesseractOcrEngine::new("eng").with_binary(binary);
        let err = engine
            .recognize(&OcrRequest::for_region(&region, "eng"))
            .unwrap_err();
        assert!(matches!(err, OcrError::Io(_) | OcrError::Backend { .. }));
    }

    #[test]
    fn missing_binary_is_a_configuration_error() {
        let engine = TesseractOcrEngine::new("eng").with_binary("/nonexistent/video2sbv-tesseract");
        assert!(matches!(
            engine.warm_up(),
            Err(OcrError::Configuration { .. })
        ));
    }
}
