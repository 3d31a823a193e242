//! Server-rendered HTML pages

use crate::models::{Operation, ProcessedFile};

/// Escape text for HTML element and attribute content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title} - File Converter</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 760px; margin: 0 auto; padding: 20px;">
  <nav style="margin-bottom: 24px; font-size: 14px;">
    <a href="/" style="color: #2563eb; text-decoration: none; margin-right: 16px;">Home</a>
    <a href="/history/" style="color: #2563eb; text-decoration: none;">History</a>
  </nav>
  <h1 style="color: #333; font-size: 24px;">{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
        body = body,
    )
}

fn flash(error: Option<&str>) -> String {
    match error {
        Some(msg) if !msg.is_empty() => format!(
            r#"  <p class="error" style="background: #fef2f2; color: #dc2626; padding: 12px; border-radius: 6px;">{}</p>"#,
            escape(msg)
        ),
        _ => String::new(),
    }
}

pub fn home() -> String {
    let items: String = Operation::ALL
        .iter()
        .map(|op| {
            format!(
                r#"    <li style="margin: 8px 0;"><a href="{path}" style="color: #2563eb;">{label}</a></li>
"#,
                path = op.form_path(),
                label = op.label(),
            )
        })
        .collect();

    layout(
        "File Converter",
        &format!(
            r#"  <p style="color: #666;">Pick a conversion:</p>
  <ul>
{items}  </ul>"#
        ),
    )
}

/// The upload form for `op`, with an optional error flash.
pub fn operation_form(op: Operation, error: Option<&str>) -> String {
    let fields = match op {
        Operation::ImageToPdf => {
            r#"    <label>Images <input type="file" name="images" accept="image/*" multiple required></label>"#
        }
        Operation::PdfMerge => {
            r#"    <label>PDF files (two or more, in order) <input type="file" name="pdfs" accept=".pdf,application/pdf" multiple required></label>"#
        }
        Operation::PdfPassword => {
            r#"    <label>PDF <input type="file" name="pdf" accept=".pdf,application/pdf" required></label><br><br>
    <label>Password <input type="password" name="password" required></label>"#
        }
        Operation::PdfToPpt => {
            r#"    <label>PDF <input type="file" name="pdf" accept=".pdf,application/pdf" required></label>"#
        }
        Operation::OcrExtraction => {
            r#"    <label>Image <input type="file" name="image" accept="image/*" required></label>"#
        }
    };

    layout(
        op.label(),
        &format!(
            r#"{flash}
  <form method="post" action="{action}" enctype="multipart/form-data">
{fields}
    <br><br>
    <button type="submit" style="background-color: #2563eb; color: white; padding: 10px 24px; border: none; border-radius: 6px; font-weight: 600;">Convert</button>
  </form>"#,
            flash = flash(error),
            action = op.form_path(),
            fields = fields,
        ),
    )
}

const OCR_SUCCESS: &str = "Text successfully extracted from image!";

/// Result page for a finished OCR extraction.
pub fn ocr_result(record_id: i64, text: &str) -> String {
    layout(
        Operation::OcrExtraction.label(),
        &format!(
            r#"  <p style="color: #16a34a;">{success}</p>
  <p style="color: #999; font-size: 12px;">Record #{id}</p>
  <pre id="extracted-text" style="background: #f9f9f9; padding: 15px; border-radius: 6px; white-space: pre-wrap;">{text}</pre>
  <p><a href="{again}" style="color: #2563eb;">Extract another</a></p>"#,
            success = OCR_SUCCESS,
            id = record_id,
            text = escape(text),
            again = Operation::OcrExtraction.form_path(),
        ),
    )
}

pub fn history(files: &[ProcessedFile]) -> String {
    if files.is_empty() {
        return layout(
            "History",
            r#"  <p style="color: #666;">No conversions yet.</p>"#,
        );
    }

    let rows: String = files.iter().map(history_row).collect();
    layout(
        "History",
        &format!(
            r#"  <table style="width: 100%; border-collapse: collapse; font-size: 14px;">
    <tr style="text-align: left; border-bottom: 1px solid #eee;">
      <th>#</th><th>Operation</th><th>File</th><th>Size</th><th>Created</th><th>Status</th><th></th>
    </tr>
{rows}  </table>"#
        ),
    )
}

fn history_row(file: &ProcessedFile) -> String {
    let status = if file.is_processed {
        match file.processed_file {
            Some(_) => format!(r#"<a href="/download/{}/">Download</a>"#, file.id),
            None => "Done".to_string(),
        }
    } else {
        format!(
            r#"<span style="color: #dc2626;">{}</span>"#,
            file.operation.failure_message()
        )
    };

    format!(
        r#"    <tr style="border-bottom: 1px solid #eee;">
      <td>{id}</td><td>{label}</td><td>{name}</td><td>{size}</td><td>{created}</td><td>{status}</td>
      <td><form method="post" action="/history/{id}/delete/"><button type="submit">Delete</button></form></td>
    </tr>
"#,
        id = file.id,
        label = file.operation.label(),
        name = escape(file.original_name()),
        size = file.file_size,
        created = file.created_at.format("%Y-%m-%d %H:%M:%S"),
        status = status,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_forms_use_expected_field_names() {
        let expected = [
            (Operation::ImageToPdf, r#"name="images""#),
            (Operation::PdfMerge, r#"name="pdfs""#),
            (Operation::PdfPassword, r#"name="password""#),
            (Operation::PdfToPpt, r#"name="pdf""#),
            (Operation::OcrExtraction, r#"name="image""#),
        ];
        for (op, field) in expected {
            let html = operation_form(op, None);
            assert!(html.contains(field), "{} form lacks {}", op, field);
            assert!(html.contains(op.form_path()));
            assert!(!html.contains(r#"class="error""#));
        }
    }

    #[test]
    fn test_flash_is_escaped() {
        let html = operation_form(Operation::PdfMerge, Some("<b>bad</b>.pdf is not a PDF file."));
        assert!(html.contains("&lt;b&gt;bad&lt;/b&gt;.pdf is not a PDF file."));
        assert!(!html.contains("<b>bad</b>"));
    }

    #[test]
    fn test_home_lists_all_operations() {
        let html = home();
        for op in Operation::ALL {
            assert!(html.contains(op.label()));
        }
    }

    #[test]
    fn test_history_rows() {
        let files = vec![ProcessedFile {
            id: 3,
            operation: Operation::PdfToPpt,
            original_file: "uploads/abc_deck.pdf".into(),
            processed_file: Some("processed/presentation_3.pptx".into()),
            extracted_text: None,
            created_at: Utc::now(),
            file_size: 1234,
            is_processed: true,
            error_message: None,
        }];

        let html = history(&files);
        assert!(html.contains("/download/3/"));
        assert!(html.contains("/history/3/delete/"));
        assert!(html.contains("abc_deck.pdf"));
        assert!(history(&[]).contains("No conversions yet."));
    }

    #[test]
    fn test_failed_rows_hide_diagnostics() {
        let files = vec![ProcessedFile {
            id: 7,
            operation: Operation::ImageToPdf,
            original_file: "uploads/abc_scan.png".into(),
            processed_file: None,
            extracted_text: None,
            created_at: Utc::now(),
            file_size: 10,
            is_processed: false,
            error_message: Some("Conversion failed: Failed to decode image: <bad header>".into()),
        }];

        let html = history(&files);
        assert!(html.contains("Error converting images."));
        assert!(!html.contains("Failed to decode image"));
        assert!(!html.contains("bad header"));
        assert!(!html.contains("/download/7/"));
    }

    #[test]
    fn test_ocr_result_shows_success_and_escaped_text() {
        let html = ocr_result(5, "a < b");
        assert!(html.contains("Text successfully extracted from image!"));
        assert!(html.contains("a &lt; b"));
        assert!(html.contains("Record #5"));
    }
}
