//! Data models for the conversion service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The five conversion operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ImageToPdf,
    PdfMerge,
    PdfPassword,
    PdfToPpt,
    OcrExtraction,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ImageToPdf,
        Operation::PdfMerge,
        Operation::PdfPassword,
        Operation::PdfToPpt,
        Operation::OcrExtraction,
    ];

    /// Stored code, e.g. `image_to_pdf`.
    pub fn code(&self) -> &'static str {
        match self {
            Operation::ImageToPdf => "image_to_pdf",
            Operation::PdfMerge => "pdf_merge",
            Operation::PdfPassword => "pdf_password",
            Operation::PdfToPpt => "pdf_to_ppt",
            Operation::OcrExtraction => "ocr_extraction",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Operation::ImageToPdf => "Image to PDF",
            Operation::PdfMerge => "PDF Merge",
            Operation::PdfPassword => "PDF Password Protection",
            Operation::PdfToPpt => "PDF to PowerPoint",
            Operation::OcrExtraction => "OCR Text Extraction",
        }
    }

    /// Route of the operation's form.
    pub fn form_path(&self) -> &'static str {
        match self {
            Operation::ImageToPdf => "/image-to-pdf/",
            Operation::PdfMerge => "/pdf-merge/",
            Operation::PdfPassword => "/pdf-password/",
            Operation::PdfToPpt => "/pdf-to-ppt/",
            Operation::OcrExtraction => "/ocr-extraction/",
        }
    }

    /// Name of the processed blob for record `id`. OCR produces no blob.
    pub fn output_name(&self, id: i64) -> Option<String> {
        match self {
            Operation::ImageToPdf => Some(format!("converted_{}.pdf", id)),
            Operation::PdfMerge => Some(format!("merged_{}.pdf", id)),
            Operation::PdfPassword => Some(format!("encrypted_{}.pdf", id)),
            Operation::PdfToPpt => Some(format!("presentation_{}.pptx", id)),
            Operation::OcrExtraction => None,
        }
    }

    /// Shown to the user when a conversion library fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::ImageToPdf => "Error converting images.",
            Operation::PdfMerge => "Error merging PDFs.",
            Operation::PdfPassword => "Error protecting PDF.",
            Operation::PdfToPpt => "Error converting PDF to PowerPoint.",
            Operation::OcrExtraction => "Error extracting text.",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.code() == s)
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}

/// Row as stored in the `processed_files` table
#[derive(Debug, Clone, FromRow)]
pub struct DbProcessedFile {
    pub id: i64,
    pub operation: String,
    pub original_file: String,
    pub processed_file: Option<String>,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_size: i64,
    pub is_processed: bool,
    pub error_message: Option<String>,
}

/// One conversion attempt and its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFile {
    pub id: i64,
    pub operation: Operation,
    pub original_file: String,
    pub processed_file: Option<String>,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_size: i64,
    pub is_processed: bool,
    pub error_message: Option<String>,
}

impl ProcessedFile {
    /// Base name of the uploaded blob.
    pub fn original_name(&self) -> &str {
        base_name(&self.original_file)
    }

    /// Base name of the processed blob, if there is one.
    pub fn processed_name(&self) -> Option<&str> {
        self.processed_file.as_deref().map(base_name)
    }
}

impl std::fmt::Display for ProcessedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.operation, self.original_file)
    }
}

impl TryFrom<DbProcessedFile> for ProcessedFile {
    type Error = String;

    fn try_from(row: DbProcessedFile) -> Result<Self, Self::Error> {
        Ok(ProcessedFile {
            id: row.id,
            operation: row.operation.parse()?,
            original_file: row.original_file,
            processed_file: row.processed_file.filter(|p| !p.is_empty()),
            extracted_text: row.extracted_text,
            created_at: row.created_at,
            file_size: row.file_size,
            is_processed: row.is_processed,
            error_message: row.error_message,
        })
    }
}

/// The last path segment of a blob path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Response for `GET /api/history`
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub files: Vec<ProcessedFile>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_codes_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.code().parse::<Operation>().unwrap(), op);
            assert_eq!(op.to_string(), op.code());
        }
        assert!("pdf_split".parse::<Operation>().is_err());
    }

    #[test]
    fn test_serde_uses_stored_codes() {
        let json = serde_json::to_string(&Operation::PdfToPpt).unwrap();
        assert_eq!(json, "\"pdf_to_ppt\"");
    }

    #[test]
    fn test_output_names() {
        assert_eq!(Operation::ImageToPdf.output_name(7).unwrap(), "converted_7.pdf");
        assert_eq!(Operation::PdfMerge.output_name(7).unwrap(), "merged_7.pdf");
        assert_eq!(Operation::PdfPassword.output_name(7).unwrap(), "encrypted_7.pdf");
        assert_eq!(Operation::PdfToPpt.output_name(7).unwrap(), "presentation_7.pptx");
        assert!(Operation::OcrExtraction.output_name(7).is_none());
    }

    #[test]
    fn test_display_and_base_name() {
        let file = ProcessedFile {
            id: 1,
            operation: Operation::PdfMerge,
            original_file: "uploads/abc_first.pdf".into(),
            processed_file: Some("processed/merged_1.pdf".into()),
            extracted_text: None,
            created_at: Utc::now(),
            file_size: 10,
            is_processed: true,
            error_message: None,
        };

        assert_eq!(file.to_string(), "pdf_merge - uploads/abc_first.pdf");
        assert_eq!(file.original_name(), "abc_first.pdf");
        assert_eq!(file.processed_name(), Some("merged_1.pdf"));
    }
}
