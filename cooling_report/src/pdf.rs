//! Serialises laid-out pages into a PDF document.

use std::io::Write;

use chrono::NaiveDateTime;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::fonts::{encode_win_ansi, Font};
use crate::layout::{DrawOp, ImageId, PageState, PAGE_HEIGHT, PAGE_WIDTH};
use crate::ReportError;

/// Raster image to embed as an XObject.
#[derive(Clone, Debug)]
pub struct PdfImage {
    pub id: ImageId,
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct DocumentInfo {
    pub title: String,
    pub producer: String,
    pub created: NaiveDateTime,
}

fn render_error(err: impl std::fmt::Display) -> ReportError {
    ReportError::Render(format!("PDF serialisation failed: {err}"))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ReportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(render_error)?;
    encoder.finish().map_err(render_error)
}

fn text_string(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

/// Document-information strings are UTF-16BE behind a byte-order mark.
fn info_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn image_stream(
    width: u32,
    height: u32,
    color_space: &str,
    data: &[u8],
    smask: Option<ObjectId>,
) -> Result<Stream, ReportError> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(mask) = smask {
        dict.set("SMask", mask);
    }
    Ok(Stream::new(dict, deflate(data)?))
}

fn page_operations(page: &PageState) -> Vec<Operation> {
    let mut ops = Vec::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                font,
                size,
                rise,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font.resource_name().into(), Object::Real(*size)],
                ));
                if *rise != 0.0 {
                    ops.push(Operation::new("Ts", vec![Object::Real(*rise)]));
                }
                ops.push(Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]));
                ops.push(Operation::new("Tj", vec![text_string(text)]));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "rg",
                    vec![
                        Object::Real(color.0),
                        Object::Real(color.1),
                        Object::Real(color.2),
                    ],
                ));
                ops.push(rect(*x, *y, *width, *height));
                ops.push(Operation::new("f", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::StrokeRect {
                x,
                y,
                width,
                height,
                line_width,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("w", vec![Object::Real(*line_width)]));
                ops.push(Operation::new("RG", vec![0.into(), 0.into(), 0.into()]));
                ops.push(rect(*x, *y, *width, *height));
                ops.push(Operation::new("S", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Image {
                id,
                x,
                y,
                width,
                height,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(*width),
                        0.into(),
                        0.into(),
                        Object::Real(*height),
                        Object::Real(*x),
                        Object::Real(*y),
                    ],
                ));
                ops.push(Operation::new("Do", vec![id.resource_name().into()]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    ops
}

fn rect(x: f32, y: f32, width: f32, height: f32) -> Operation {
    Operation::new(
        "re",
        vec![
            Object::Real(x),
            Object::Real(y),
            Object::Real(width),
            Object::Real(height),
        ],
    )
}

/// Build an A4 document from finished pages. Fonts and images live in one
/// resource dictionary inherited by every page.
pub fn write_pdf(
    pages: &[PageState],
    images: &[PdfImage],
    info: &DocumentInfo,
) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }

    let mut xobjects = Dictionary::new();
    for image in images {
        let smask = match &image.alpha {
            Some(alpha) => Some(doc.add_object(image_stream(
                image.width,
                image.height,
                "DeviceGray",
                alpha,
                None,
            )?)),
            None => None,
        };
        let stream = image_stream(image.width, image.height, "DeviceRGB", &image.rgb, smask)?;
        xobjects.set(image.id.resource_name(), doc.add_object(stream));
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
        "ProcSet" => vec![Object::from("PDF"), Object::from("Text"), Object::from("ImageC")],
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content.encode().map_err(render_error)?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let created = info.created.format("D:%Y%m%d%H%M%S").to_string();
    let info_id = doc.add_object(dictionary! {
        "Title" => info_string(&info.title),
        "Producer" => info_string(&info.producer),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(render_error)?;
    Ok(bytes)
}
