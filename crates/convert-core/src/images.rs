//! Image to PDF
//!
//! Each input image becomes one US Letter page. Images are converted to RGB,
//! scaled uniformly to fit the page and centered.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::debug;

use crate::error::ConvertError;

/// US Letter width in points (8.5in at 72 DPI).
pub const LETTER_WIDTH: f32 = 612.0;
/// US Letter height in points (11in at 72 DPI).
pub const LETTER_HEIGHT: f32 = 792.0;

/// Where an image lands on a page, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Scale an image uniformly to fit a page and center it.
///
/// `scale = min(page_w / img_w, page_h / img_h)`; images smaller than the
/// page are scaled up.
pub fn fit_to_page(img_width: u32, img_height: u32, page_width: f32, page_height: f32) -> Placement {
    let (w, h) = (img_width.max(1) as f32, img_height.max(1) as f32);
    let scale = (page_width / w).min(page_height / h);
    let width = w * scale;
    let height = h * scale;

    Placement {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
        scale,
    }
}

/// Build a PDF with one Letter page per image, in input order.
///
/// Any image that fails to decode aborts the whole batch.
pub fn images_to_pdf(images: &[Vec<u8>]) -> Result<Vec<u8>, ConvertError> {
    if images.is_empty() {
        return Err(ConvertError::Operation("No images to convert".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(images.len());

    for (i, bytes) in images.iter().enumerate() {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ConvertError::Decode(format!("image {}: {}", i + 1, e)))?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!("Image {} decoded: {}x{}", i + 1, width, height);

        let image_id = doc.add_object(rgb_image_xobject(width, height, rgb.as_raw())?);
        let placement = fit_to_page(width, height, LETTER_WIDTH, LETTER_HEIGHT);
        let page_id = add_image_page(&mut doc, pages_id, image_id, &placement)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ConvertError::Operation(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Wrap raw 8-bit RGB samples in a Flate-compressed image XObject.
fn rgb_image_xobject(width: u32, height: u32, samples: &[u8]) -> Result<Stream, ConvertError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8i64,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image_id: ObjectId,
    placement: &Placement,
) -> Result<ObjectId, ConvertError> {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(placement.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(placement.height),
                    Object::Real(placement.x),
                    Object::Real(placement.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| ConvertError::Operation(format!("Failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(LETTER_WIDTH),
            Object::Real(LETTER_HEIGHT),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });
    Ok(page_id)
}
