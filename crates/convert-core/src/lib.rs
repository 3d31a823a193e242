//! File conversion adapters
//!
//! Thin, synchronous wrappers around the libraries that do the real work:
//! - `images_to_pdf`: one Letter page per image (image + lopdf)
//! - `merge_pdfs`: page concatenation (lopdf)
//! - `protect_pdf`: RC4-128 password protection (lopdf)
//! - `pdf_to_slides`: one picture slide per page (pdfium + zip)
//! - `extract_text`: OCR (tesseract, behind the `tesseract` feature)
//!
//! Callers on an async runtime should run these on a blocking thread.

pub mod error;
pub mod images;
pub mod merge;
pub mod ocr;
pub mod protect;
pub mod render;
pub mod slides;

pub use error::ConvertError;
pub use images::{fit_to_page, images_to_pdf, Placement, LETTER_HEIGHT, LETTER_WIDTH};
pub use merge::merge_pdfs;
pub use ocr::{default_recognizer, extract_text, TextRecognizer, NO_TEXT_PLACEHOLDER};
pub use protect::protect_pdf;
pub use render::{PdfiumRasterizer, Rasterizer};
pub use slides::{pdf_to_slides, SlideDeck};

/// Parse PDF bytes and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<usize, ConvertError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ConvertError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len())
}

/// True if `file_name` carries a `.pdf` extension, in any case.
pub fn has_pdf_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{Dictionary, Document, Object, Stream};

    /// Build a PDF with `num_pages` pages, each drawing `<prefix>-Page-<n>`.
    pub fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let catalog_id = doc.new_object_id();
        let mut kids = Vec::new();

        for page_num in 0..num_pages {
            let page_id = doc.new_object_id();
            let content_id = doc.new_object_id();

            let content = format!(
                "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
                prefix,
                page_num + 1
            );
            doc.objects.insert(
                content_id,
                Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())),
            );

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            );
            doc.objects.insert(page_id, Object::Dictionary(page));
            kids.push(Object::Reference(page_id));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(num_pages as i64));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        doc.objects.insert(catalog_id, Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// The `(...)` string drawn on each page, in page order.
    pub fn markers_of(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .values()
            .filter_map(|&id| {
                let content = doc.get_page_content(id).ok()?;
                let text = String::from_utf8_lossy(&content).into_owned();
                let start = text.find('(')? + 1;
                let end = text[start..].find(')')? + start;
                Some(text[start..end].to_string())
            })
            .collect()
    }

    pub fn page_markers(pdf: &[u8]) -> Vec<String> {
        markers_of(&Document::load_mem(pdf).unwrap())
    }

    /// A solid-colour PNG of the given size.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }
}
