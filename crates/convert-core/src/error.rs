use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to encrypt PDF: {0}")]
    Encrypt(String),

    #[error("Failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[error("Rendering engine unavailable: {0}")]
    RenderUnavailable(String),

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("Failed to write presentation package: {0}")]
    Package(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ConvertError {
    fn from(err: zip::result::ZipError) -> Self {
        ConvertError::Package(err.to_string())
    }
}
