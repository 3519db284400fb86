//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).
//!
//! Embedded images are resampled to the raster scale and re-encoded as JPEG
//! before they go into the document, composited onto white since JPEG has no
//! alpha channel.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use ::image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, RgbImage};
use printpdf::*;

use crate::error::{DocumentError, Result};
use crate::layout_config::*;

/// How embedded raster images are prepared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageEncoding {
    /// Device pixels per layout point.
    pub scale: f32,
    /// JPEG quality, 0.0 – 1.0.
    pub quality: f32,
}

impl Default for ImageEncoding {
    fn default() -> Self {
        Self {
            scale: 1.8,
            quality: 0.95,
        }
    }
}

impl ImageEncoding {
    fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.01, 1.0) * 100.0).round() as u8
    }
}

struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a LayoutConfig into PDF bytes.
///
/// Images whose `src` is not a base64 data URI, or whose bytes cannot be
/// decoded, are skipped with a warning.
pub fn render_pdf(config: &LayoutConfig, encoding: &ImageEncoding) -> Result<Vec<u8>> {
    let page_w = Mm(config.page_width_pt * 0.352778);
    let page_h = Mm(config.page_height_pt * 0.352778);

    let mut doc = PdfDocument::new(&config.title);

    // Largest displayed size per source decides the raster resolution.
    let mut wanted: HashMap<&str, (f32, f32)> = HashMap::new();
    for lbox in config.pages.iter().flat_map(|p| p.boxes.iter()) {
        collect_images(lbox, &mut wanted);
    }

    let mut images: HashMap<String, ImageResource> = HashMap::new();
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    for (src, (w, h)) in wanted {
        match prepare_image(src, w, h, encoding) {
            Ok((jpeg, px_width, px_height)) => match RawImage::decode_from_bytes(&jpeg, &mut warnings) {
                Ok(raw) => {
                    let xobj_id = doc.add_image(&raw);
                    images.insert(
                        src.to_string(),
                        ImageResource {
                            xobj_id,
                            px_width,
                            px_height,
                        },
                    );
                }
                Err(e) => log::warn!("Skipping image: PDF encode error: {e}"),
            },
            Err(e) => log::warn!("Skipping image: {e}"),
        }
    }

    let mut pages = Vec::with_capacity(config.pages.len().max(1));
    for page_layout in &config.pages {
        let mut ops = Vec::new();
        if let Some(bg) = config.page_background {
            fill_rect(&mut ops, 0.0, 0.0, config.page_width_pt, config.page_height_pt, bg);
        }
        for lbox in &page_layout.boxes {
            render_box(&mut ops, lbox, config.page_height_pt, &images);
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    if bytes.is_empty() {
        return Err(DocumentError::RenderExport("PDF writer produced no output".into()));
    }
    log::debug!(
        "Rendered {} page(s), {} image(s), {} bytes",
        config.pages.len(),
        images.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Parse a `data:<mime>;base64,<data>` URI and return the decoded bytes.
pub(crate) fn parse_data_uri(src: &str) -> std::result::Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!("image src must be a base64 data URI, got {preview:?}")
    })?;
    let (header, data) = rest
        .split_once(',')
        .ok_or("invalid data URI: missing ',' between header and data")?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

/// Decode, resample to `scale` device pixels per point, flatten onto white
/// and encode as JPEG. Returns the JPEG bytes and their pixel size.
fn prepare_image(
    src: &str,
    width_pt: f32,
    height_pt: f32,
    encoding: &ImageEncoding,
) -> std::result::Result<(Vec<u8>, u32, u32), String> {
    let bytes = parse_data_uri(src)?;
    let decoded = ::image::load_from_memory(&bytes).map_err(|e| format!("decode error: {e}"))?;

    let target_w = ((width_pt * encoding.scale).round() as u32).max(1);
    let target_h = ((height_pt * encoding.scale).round() as u32).max(1);
    let resized = if (target_w, target_h) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    let flat = flatten_onto_white(&resized);
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, encoding.jpeg_quality())
        .encode_image(&flat)
        .map_err(|e| format!("JPEG encode error: {e}"))?;
    Ok((jpeg, flat.width(), flat.height()))
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let over = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        ::image::Rgb([over(r), over(g), over(b)])
    })
}

fn collect_images<'a>(lbox: &'a LayoutBox, out: &mut HashMap<&'a str, (f32, f32)>) {
    if let Some(img) = &lbox.image {
        let slot = out.entry(img.src.as_str()).or_insert((0.0, 0.0));
        slot.0 = slot.0.max(img.width);
        slot.1 = slot.1.max(img.height);
    }
    for child in &lbox.children {
        collect_images(child, out);
    }
}

/// Convert a UTF-8 string to Windows-1252 bytes for a builtin font.
///
/// printpdf hands builtin-font text to lopdf, which writes `as_bytes()` into
/// the content stream unchanged, so the bytes must already be WinAnsi. Plain
/// ASCII stays a valid `String`. Anything in 0x80-0xFF does not, and such a
/// value must only ever be moved into `Op::WriteTextBuiltinFont`: nothing
/// may call `chars()`, format it, or run `PdfPage::extract_text` over it.
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let bytes = e.into_bytes();
            // SAFETY: only reachable for non-ASCII WinAnsi text, which the
            // caller passes straight to printpdf's builtin-font serializer.
            // That path reads the buffer through `as_bytes()` alone.
            #[allow(unsafe_code)]
            unsafe {
                String::from_utf8_unchecked(bytes)
            }
        }
    }
}

fn rgb(c: [f32; 4]) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Fill a rectangle given in PDF coordinates (origin bottom-left).
fn fill_rect(ops: &mut Vec<Op>, x: f32, y: f32, w: f32, h: f32, color: [f32; 4]) {
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    point(x, y),
                    point(x + w, y),
                    point(x + w, y + h),
                    point(x, y + h),
                ],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn stroke_rect(ops: &mut Vec<Op>, x: f32, y: f32, w: f32, h: f32, border: &BorderStyle) {
    ops.push(Op::SetOutlineColor {
        col: rgb(border.color),
    });
    ops.push(Op::SetOutlineThickness {
        pt: Pt(border.width),
    });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                point(x, y + h),
                point(x + w, y + h),
                point(x + w, y),
                point(x, y),
            ],
            is_closed: true,
        },
    });
}

fn write_text(ops: &mut Vec<Op>, x: f32, y: f32, text: &str, size: f32, font: BuiltinFont, color: [f32; 4]) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Render a LayoutBox and its children. Layout coordinates are top-left
/// based; PDF coordinates are bottom-left based.
fn render_box(ops: &mut Vec<Op>, lbox: &LayoutBox, page_height: f32, images: &HashMap<String, ImageResource>) {
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;

    if let Some(bg) = lbox.background_color {
        fill_rect(ops, lbox.x, bottom, lbox.width, lbox.height, bg);
    }

    if let Some(border) = &lbox.border {
        stroke_rect(ops, lbox.x, bottom, lbox.width, lbox.height, border);
    }

    if let Some(text) = &lbox.text {
        let font = match (text.bold, text.italic) {
            (true, true) => BuiltinFont::HelveticaBoldOblique,
            (true, false) => BuiltinFont::HelveticaBold,
            (false, true) => BuiltinFont::HelveticaOblique,
            (false, false) => BuiltinFont::Helvetica,
        };
        // Baseline sits roughly one ascender below the top of the line.
        let ascender = text.font_size * 0.75;

        for line in text.lines.iter().filter(|l| !l.text.is_empty()) {
            let x = lbox.x + line.x_offset;
            let baseline = top - line.y_offset - ascender;
            write_text(ops, x, baseline, &line.text, text.font_size, font, text.color);

            if text.underline {
                let y = baseline - text.font_size * 0.1;
                ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
                ops.push(Op::SetOutlineColor { col: rgb(text.color) });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![point(x, y), point(lbox.x + lbox.width, y)],
                        is_closed: false,
                    },
                });
            }
        }

        if let Some(marker) = &text.list_marker {
            write_text(
                ops,
                lbox.x - 16.0,
                top - ascender,
                marker,
                text.font_size,
                BuiltinFont::Helvetica,
                text.color,
            );
        }
    }

    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(&img.src) {
            // At 72 dpi one image pixel spans one point, so scale maps pixels
            // back to the box size.
            let scale_x = img.width / res.px_width.max(1) as f32;
            let scale_y = img.height / res.px_height.max(1) as f32;
            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(top - img.height)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_data_uri(w: u32, h: u32) -> String {
        let img = ::image::RgbaImage::from_pixel(w, h, ::image::Rgba([200, 10, 10, 128]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64_STD.encode(png))
    }

    #[test]
    fn render_empty_page() {
        let config = LayoutConfig::new("empty", &PageGeometry::a4_portrait(40.0));
        let bytes = render_pdf(&config, &ImageEncoding::default()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn data_uri_parsing() {
        assert!(parse_data_uri("https://example.com/logo.png").is_err());
        assert!(parse_data_uri("data:image/png,plain").is_err());
        assert_eq!(parse_data_uri("data:text/plain;base64,aGk=").unwrap(), b"hi");
    }

    #[test]
    fn images_are_resampled_to_jpeg() {
        let src = png_data_uri(10, 5);
        let encoding = ImageEncoding {
            scale: 1.8,
            quality: 0.95,
        };
        let (jpeg, w, h) = prepare_image(&src, 100.0, 50.0, &encoding).unwrap();
        assert_eq!((w, h), (180, 90));
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8], "JPEG SOI marker");

        let back = ::image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let [r, g, _] = back.get_pixel(90, 45).0;
        assert!(r > 200 && g > 100, "half-transparent red blends toward white");
    }

    #[test]
    fn winlatin_keeps_ascii_valid_and_maps_the_rest_to_cp1252() {
        let plain = to_winlatin("Total: $37.50");
        assert_eq!(plain, "Total: $37.50");

        let accented = to_winlatin("Caf\u{e9} \u{20ac}5\u{a0}\u{2014} \u{4e2d}");
        assert_eq!(accented.as_bytes(), b"Caf\xE9 \x805 \x97 ?");
    }

    #[test]
    fn page_background_is_painted() {
        let mut config = LayoutConfig::new("bg", &PageGeometry::a4_portrait(40.0));
        config.pages.push(PageLayout::new(0));
        let plain = render_pdf(&config, &ImageEncoding::default()).unwrap();
        config.page_background = Some([1.0, 1.0, 1.0, 1.0]);
        let white = render_pdf(&config, &ImageEncoding::default()).unwrap();
        assert!(white.len() > plain.len());
    }
}
