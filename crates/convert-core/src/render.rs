//! PDF rasterisation behind the [`Rasterizer`] seam.
//!
//! The production implementation binds pdfium at call time, so the service
//! can start (and serve every other operation) on hosts without the library.

use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::error::ConvertError;

/// Renders every page of a PDF on disk to an image, in page order.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError>;
}

/// pdfium-backed rasteriser.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: f32,
}

impl PdfiumRasterizer {
    /// Resolution used when none is configured.
    pub const DEFAULT_DPI: f32 = 200.0;

    pub fn new() -> Self {
        Self::with_dpi(Self::DEFAULT_DPI)
    }

    pub fn with_dpi(dpi: f32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    fn bind() -> Result<Pdfium, ConvertError> {
        let bindings = Pdfium::bind_to_system_library()
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            })
            .map_err(|e| ConvertError::RenderUnavailable(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
        let pdfium = Self::bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| ConvertError::Parse(format!("{:?}", e)))?;

        let pages = document.pages();
        info!("Rasterising {} pages at {} DPI", pages.len(), self.dpi);

        let config = PdfRenderConfig::new().scale_page_by_factor(self.dpi / 72.0);
        let mut images = Vec::with_capacity(pages.len() as usize);

        for (index, page) in pages.iter().enumerate() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| ConvertError::Render {
                    page: index + 1,
                    detail: format!("{:?}", e),
                })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} -> {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}
