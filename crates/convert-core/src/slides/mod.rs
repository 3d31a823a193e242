//! PDF to slide deck
//!
//! Every page is rasterised and placed on its own blank slide. The input PDF
//! and each rendered page pass through uniquely named temp files that are
//! removed before this returns; on error the guards remove them on drop.

mod deck;

pub use deck::{SlideDeck, EMU_PER_INCH, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};

use std::io::Write;
use std::path::Path;

use image::ImageFormat;
use tempfile::Builder;
use tracing::{debug, info};

use crate::error::ConvertError;
use crate::render::Rasterizer;

const TEMP_PREFIX: &str = "convert-";

/// Convert `pdf` into a `.pptx` deck with one picture slide per page.
pub fn pdf_to_slides(pdf: &[u8], rasterizer: &dyn Rasterizer) -> Result<Vec<u8>, ConvertError> {
    pdf_to_slides_in(pdf, rasterizer, &std::env::temp_dir())
}

/// [`pdf_to_slides`] with temp files created under `temp_dir`.
pub fn pdf_to_slides_in(
    pdf: &[u8],
    rasterizer: &dyn Rasterizer,
    temp_dir: &Path,
) -> Result<Vec<u8>, ConvertError> {
    let mut temp_pdf = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".pdf")
        .tempfile_in(temp_dir)?;
    temp_pdf.write_all(pdf)?;
    temp_pdf.flush()?;

    let pages = rasterizer.rasterize(temp_pdf.path())?;
    let mut deck = SlideDeck::new();

    for (index, page) in pages.iter().enumerate() {
        let temp_png = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".png")
            .tempfile_in(temp_dir)?;
        page.save_with_format(temp_png.path(), ImageFormat::Png)
            .map_err(|e| ConvertError::Render {
                page: index + 1,
                detail: format!("could not encode PNG: {}", e),
            })?;
        deck.add_picture_slide(std::fs::read(temp_png.path())?);
        temp_png.close()?;
        debug!("Slide {} added", index + 1);
    }

    let slide_count = deck.len();
    let pptx = deck.finish()?;
    temp_pdf.close()?;

    info!("Built slide deck: {} slides, {} bytes", slide_count, pptx.len());
    Ok(pptx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::{Cursor, Read};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use zip::ZipArchive;

    /// Renders a fixed number of solid pages and remembers the path it saw.
    struct SolidPages {
        count: usize,
        seen: Mutex<Option<PathBuf>>,
    }

    impl SolidPages {
        fn new(count: usize) -> Self {
            Self {
                count,
                seen: Mutex::new(None),
            }
        }
    }

    impl Rasterizer for SolidPages {
        fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
            assert!(pdf_path.exists(), "input copy must exist while rendering");
            assert_eq!(pdf_path.extension().and_then(|e| e.to_str()), Some("pdf"));
            *self.seen.lock().unwrap() = Some(pdf_path.to_path_buf());
            Ok((0..self.count)
                .map(|i| {
                    DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([i as u8 * 40, 0, 0])))
                })
                .collect())
        }
    }

    struct BrokenRenderer {
        seen: Mutex<Option<PathBuf>>,
    }

    impl Rasterizer for BrokenRenderer {
        fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
            *self.seen.lock().unwrap() = Some(pdf_path.to_path_buf());
            Err(ConvertError::Render {
                page: 1,
                detail: "boom".into(),
            })
        }
    }

    #[test]
    fn test_one_slide_per_rendered_page() {
        let renderer = SolidPages::new(3);

        let pptx = pdf_to_slides(b"%PDF-1.5 stub", &renderer).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(pptx)).unwrap();
        for n in 1..=3 {
            assert!(archive.by_name(&format!("ppt/slides/slide{n}.xml")).is_ok());
        }
        assert!(archive.by_name("ppt/slides/slide4.xml").is_err());

        let mut png = Vec::new();
        archive
            .by_name("ppt/media/image2.png")
            .unwrap()
            .read_to_end(&mut png)
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([40, 0, 0]));
    }

    #[test]
    fn test_temp_input_is_removed_after_conversion() {
        let renderer = SolidPages::new(1);

        pdf_to_slides(b"%PDF-1.5 stub", &renderer).unwrap();

        let seen = renderer.seen.lock().unwrap().clone().unwrap();
        assert!(!seen.exists());
    }

    #[test]
    fn test_render_failure_aborts_and_cleans_up() {
        let renderer = BrokenRenderer {
            seen: Mutex::new(None),
        };

        let err = pdf_to_slides(b"%PDF-1.5 stub", &renderer).unwrap_err();

        assert!(matches!(err, ConvertError::Render { page: 1, .. }));
        let seen = renderer.seen.lock().unwrap().clone().unwrap();
        assert!(!seen.exists());
    }

    /// Entries in `dir` created by the converter with the given suffix.
    fn leftovers(dir: &Path, suffix: &str) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX) && name.ends_with(suffix))
            .collect()
    }

    /// Renders one valid page followed by an empty one that PNG cannot encode.
    struct EmptySecondPage;

    impl Rasterizer for EmptySecondPage {
        fn rasterize(&self, _pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
            Ok(vec![
                DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))),
                DynamicImage::ImageRgb8(RgbImage::new(0, 0)),
            ])
        }
    }

    #[test]
    fn test_page_images_are_removed_after_embedding() {
        let dir = tempfile::tempdir().unwrap();

        let pptx = pdf_to_slides_in(b"%PDF-1.5 stub", &SolidPages::new(3), dir.path()).unwrap();

        assert!(!pptx.is_empty());
        assert!(leftovers(dir.path(), ".png").is_empty());
        assert!(leftovers(dir.path(), ".pdf").is_empty());
    }

    #[test]
    fn test_page_images_are_removed_when_encoding_fails() {
        let dir = tempfile::tempdir().unwrap();

        let err = pdf_to_slides_in(b"%PDF-1.5 stub", &EmptySecondPage, dir.path()).unwrap_err();

        assert!(matches!(err, ConvertError::Render { page: 2, .. }));
        assert!(leftovers(dir.path(), ".png").is_empty());
        assert!(leftovers(dir.path(), ".pdf").is_empty());
    }
}
