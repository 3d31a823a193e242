//! OCR text extraction behind the [`TextRecognizer`] seam.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::ConvertError;

/// Stored in place of a recognition result that is empty or only whitespace.
pub const NO_TEXT_PLACEHOLDER: &str = "No text found in the image.";

/// Recognises text in a decoded image.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, ConvertError>;
}

/// Decode `image_bytes`, run recognition and apply the placeholder rule.
pub fn extract_text(
    image_bytes: &[u8],
    recognizer: &dyn TextRecognizer,
) -> Result<String, ConvertError> {
    let image =
        image::load_from_memory(image_bytes).map_err(|e| ConvertError::Decode(e.to_string()))?;
    let text = recognizer.recognize(&image)?;
    Ok(or_placeholder(text))
}

/// Replace whitespace-only text with [`NO_TEXT_PLACEHOLDER`].
pub fn or_placeholder(text: String) -> String {
    if text.trim().is_empty() {
        NO_TEXT_PLACEHOLDER.to_string()
    } else {
        text
    }
}

/// Tesseract via leptess.
#[cfg(feature = "tesseract")]
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    language: String,
    data_path: Option<String>,
}

#[cfg(feature = "tesseract")]
impl TesseractRecognizer {
    pub fn new(language: impl Into<String>, data_path: Option<String>) -> Self {
        Self {
            language: language.into(),
            data_path,
        }
    }
}

#[cfg(feature = "tesseract")]
impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, ConvertError> {
        let mut png = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| ConvertError::Ocr(format!("could not encode image: {e}")))?;

        let mut lt = leptess::LepTess::new(self.data_path.as_deref(), &self.language)
            .map_err(|e| ConvertError::Ocr(format!("init failed: {e}")))?;
        lt.set_image_from_mem(&png)
            .map_err(|e| ConvertError::Ocr(format!("set_image failed: {e}")))?;
        lt.get_utf8_text()
            .map_err(|e| ConvertError::Ocr(format!("get_utf8_text failed: {e}")))
    }
}

/// Used when the crate is built without an OCR engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, ConvertError> {
        Err(ConvertError::Ocr(
            "no OCR engine compiled in (enable the `tesseract` feature)".into(),
        ))
    }
}

/// The best recognizer this build provides, for `language` (e.g. "eng").
pub fn default_recognizer(language: &str) -> Arc<dyn TextRecognizer> {
    #[cfg(feature = "tesseract")]
    {
        Arc::new(TesseractRecognizer::new(language, None))
    }
    #[cfg(not(feature = "tesseract"))]
    {
        tracing::warn!("Built without tesseract; OCR for '{}' will fail", language);
        Arc::new(UnavailableRecognizer)
    }
}
