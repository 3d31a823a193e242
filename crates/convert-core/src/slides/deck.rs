//! Minimal PresentationML (PPTX) package writer.
//!
//! Produces one slide master, one blank layout, one theme and one slide per
//! picture. Each picture is stretched over the whole slide canvas.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConvertError;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;
/// Slide canvas width: 10in.
pub const SLIDE_WIDTH_EMU: i64 = 10 * EMU_PER_INCH;
/// Slide canvas height: 7.5in.
pub const SLIDE_HEIGHT_EMU: i64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;

const NS_DECL: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

/// A slide deck under construction. Slides hold PNG-encoded pictures.
#[derive(Debug, Default)]
pub struct SlideDeck {
    pictures: Vec<Vec<u8>>,
}

impl SlideDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slide showing `png` at the origin, stretched to the canvas.
    pub fn add_picture_slide(&mut self, png: Vec<u8>) {
        self.pictures.push(png);
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    /// Serialise the deck as a `.pptx` archive.
    pub fn finish(self) -> Result<Vec<u8>, ConvertError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let count = self.pictures.len();

        let parts = [
            ("[Content_Types].xml", content_types(count)),
            ("_rels/.rels", package_rels()),
            ("docProps/app.xml", app_properties(count)),
            ("docProps/core.xml", core_properties()),
            ("ppt/presentation.xml", presentation(count)),
            ("ppt/_rels/presentation.xml.rels", presentation_rels(count)),
            ("ppt/slideMasters/slideMaster1.xml", slide_master()),
            ("ppt/slideMasters/_rels/slideMaster1.xml.rels", slide_master_rels()),
            ("ppt/slideLayouts/slideLayout1.xml", blank_layout()),
            ("ppt/slideLayouts/_rels/slideLayout1.xml.rels", blank_layout_rels()),
            ("ppt/theme/theme1.xml", theme()),
        ];
        for (name, body) in parts {
            write_entry(&mut zip, name, body.as_bytes(), CompressionMethod::Deflated)?;
        }

        for (i, png) in self.pictures.iter().enumerate() {
            let n = i + 1;
            write_entry(
                &mut zip,
                &format!("ppt/slides/slide{n}.xml"),
                picture_slide(n).as_bytes(),
                CompressionMethod::Deflated,
            )?;
            write_entry(
                &mut zip,
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                picture_slide_rels(n).as_bytes(),
                CompressionMethod::Deflated,
            )?;
            // PNG data is already compressed.
            write_entry(
                &mut zip,
                &format!("ppt/media/image{n}.png"),
                png,
                CompressionMethod::Stored,
            )?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

fn write_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    body: &[u8],
    method: CompressionMethod,
) -> Result<(), ConvertError> {
    zip.start_file(name, SimpleFileOptions::default().compression_method(method))?;
    zip.write_all(body)?;
    Ok(())
}

fn relationship(id: &str, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#)
}

fn relationships(entries: &[String]) -> String {
    format!(
        r#"{XML_HEADER}<Relationships xmlns="{REL_NS}">{}</Relationships>"#,
        entries.concat()
    )
}

fn content_types(slides: usize) -> String {
    let mut overrides = vec![
        ("/ppt/presentation.xml", "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"),
        ("/ppt/slideMasters/slideMaster1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"),
        ("/ppt/slideLayouts/slideLayout1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
        ("/ppt/theme/theme1.xml", "application/vnd.openxmlformats-officedocument.theme+xml"),
        ("/docProps/core.xml", "application/vnd.openxmlformats-package.core-properties+xml"),
        ("/docProps/app.xml", "application/vnd.openxmlformats-officedocument.extended-properties+xml"),
    ]
    .into_iter()
    .map(|(part, kind)| format!(r#"<Override PartName="{part}" ContentType="{kind}"/>"#))
    .collect::<Vec<_>>();

    overrides.extend((1..=slides).map(|n| {
        format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        )
    }));

    format!(
        r#"{XML_HEADER}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>{}</Types>"#,
        overrides.concat()
    )
}

fn package_rels() -> String {
    relationships(&[
        relationship("rId1", &format!("{REL_TYPE}/officeDocument"), "ppt/presentation.xml"),
        relationship(
            "rId2",
            "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            "docProps/core.xml",
        ),
        relationship("rId3", &format!("{REL_TYPE}/extended-properties"), "docProps/app.xml"),
    ])
}

fn app_properties(slides: usize) -> String {
    format!(
        r#"{XML_HEADER}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>convert-core</Application><Slides>{slides}</Slides></Properties>"#
    )
}

fn core_properties() -> String {
    format!(
        r#"{XML_HEADER}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Presentation</dc:title></cp:coreProperties>"#
    )
}

fn presentation(slides: usize) -> String {
    // rId1 is the master, rId2 the theme; slides start at rId3.
    let slide_ids = if slides == 0 {
        String::new()
    } else {
        let ids: String = (0..slides)
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3))
            .collect();
        format!("<p:sldIdLst>{ids}</p:sldIdLst>")
    };

    format!(
        r#"{XML_HEADER}<p:presentation {NS_DECL} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{slide_ids}<p:sldSz cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}" type="screen4x3"/><p:notesSz cx="{SLIDE_HEIGHT_EMU}" cy="{SLIDE_WIDTH_EMU}"/></p:presentation>"#
    )
}

fn presentation_rels(slides: usize) -> String {
    let mut entries = vec![
        relationship("rId1", &format!("{REL_TYPE}/slideMaster"), "slideMasters/slideMaster1.xml"),
        relationship("rId2", &format!("{REL_TYPE}/theme"), "theme/theme1.xml"),
    ];
    entries.extend((1..=slides).map(|n| {
        relationship(
            &format!("rId{}", n + 2),
            &format!("{REL_TYPE}/slide"),
            &format!("slides/slide{n}.xml"),
        )
    }));
    relationships(&entries)
}

fn slide_master() -> String {
    format!(
        r#"{XML_HEADER}<p:sldMaster {NS_DECL}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_master_rels() -> String {
    relationships(&[
        relationship("rId1", &format!("{REL_TYPE}/slideLayout"), "../slideLayouts/slideLayout1.xml"),
        relationship("rId2", &format!("{REL_TYPE}/theme"), "../theme/theme1.xml"),
    ])
}

fn blank_layout() -> String {
    format!(
        r#"{XML_HEADER}<p:sldLayout {NS_DECL} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn blank_layout_rels() -> String {
    relationships(&[relationship(
        "rId1",
        &format!("{REL_TYPE}/slideMaster"),
        "../slideMasters/slideMaster1.xml",
    )])
}

fn picture_slide(n: usize) -> String {
    format!(
        r#"{XML_HEADER}<p:sld {NS_DECL}><p:cSld><p:spTree>{EMPTY_TREE}<p:pic><p:nvPicPr><p:cNvPr id="2" name="Picture {n}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn picture_slide_rels(n: usize) -> String {
    relationships(&[
        relationship("rId1", &format!("{REL_TYPE}/slideLayout"), "../slideLayouts/slideLayout1.xml"),
        relationship("rId2", &format!("{REL_TYPE}/image"), &format!("../media/image{n}.png")),
    ])
}

fn theme() -> String {
    let colors = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "1F497D"),
        ("lt2", "EEECE1"),
        ("accent1", "4F81BD"),
        ("accent2", "C0504D"),
        ("accent3", "9BBB59"),
        ("accent4", "8064A2"),
        ("accent5", "4BACC6"),
        ("accent6", "F79646"),
        ("hlink", "0000FF"),
        ("folHlink", "800080"),
    ]
    .iter()
    .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
    .collect::<String>();

    let font = |face: &str| {
        format!(r#"<a:latin typeface="{face}"/><a:ea typeface=""/><a:cs typeface=""/>"#)
    };
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="9525">{solid}</a:ln>"#);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";

    format!(
        r#"{XML_HEADER}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office">{colors}</a:clrScheme><a:fontScheme name="Office"><a:majorFont>{major}</a:majorFont><a:minorFont>{minor}</a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#,
        major = font("Calibri"),
        minor = font("Calibri"),
    )
}
