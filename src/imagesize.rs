use image::ImageReader;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Svg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    Image(ImageMetadata),
    UnknownFormat,
}

// Natural pixel dimensions of the file at `path`. `None` means the file is
// missing or unreadable; an unrecognized or undecodable payload is a distinct
// outcome so the caller can report it separately.
pub(crate) fn probe(path: &Path) -> Option<Probe> {
    let bytes = std::fs::read(path).ok()?;
    Some(probe_bytes(&bytes))
}

pub(crate) fn probe_bytes(bytes: &[u8]) -> Probe {
    if let Some(metadata) = raster_size(bytes) {
        return Probe::Image(metadata);
    }
    if looks_like_svg(bytes) {
        if let Some(metadata) = svg_size(bytes) {
            return Probe::Image(metadata);
        }
    }
    Probe::UnknownFormat
}

// Header-only read; pixel data is never decoded.
fn raster_size(bytes: &[u8]) -> Option<ImageMetadata> {
    let format = match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => ImageFormat::Png,
        image::ImageFormat::Jpeg => ImageFormat::Jpeg,
        image::ImageFormat::Gif => ImageFormat::Gif,
        image::ImageFormat::Bmp => ImageFormat::Bmp,
        _ => return None,
    };
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(ImageMetadata {
        width,
        height,
        format,
    })
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    text.trim_start_matches('\u{feff}').trim_start().starts_with('<')
}

// Width/height attributes of the root <svg>, falling back to the viewBox.
fn svg_size(bytes: &[u8]) -> Option<ImageMetadata> {
    let text = std::str::from_utf8(bytes).ok()?;
    let doc = roxmltree::Document::parse(text).ok()?;
    let root = doc
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name().eq_ignore_ascii_case("svg"))?;
    let width = root.attribute("width").and_then(parse_number);
    let height = root.attribute("height").and_then(parse_number);
    let (w, h) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            let (_, _, w, h) = parse_viewbox(root.attribute("viewBox"))?;
            (w, h)
        }
    };
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(ImageMetadata {
        width: w.round().max(1.0) as u32,
        height: h.round().max(1.0) as u32,
        format: ImageFormat::Svg,
    })
}

fn parse_viewbox(view_box: Option<&str>) -> Option<(f32, f32, f32, f32)> {
    let vb = view_box?;
    let mut it = vb
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty());
    let min_x = it.next()?.parse::<f32>().ok()?;
    let min_y = it.next()?.parse::<f32>().ok()?;
    let w = it.next()?.parse::<f32>().ok()?;
    let h = it.next()?.parse::<f32>().ok()?;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some((min_x, min_y, w, h))
}

fn parse_number(input: &str) -> Option<f32> {
    let s = input.trim();
    // Ignore unit suffixes (treat user units as-is).
    let s = s
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim_end_matches("mm")
        .trim_end_matches("cm")
        .trim_end_matches("in")
        .trim();
    s.parse::<f32>().ok()
}
