//! Nearest-neighbour resizing of staged favicons.
//!
//! Only PNG and JPEG payloads are re-encoded; everything else (ICO, SVG, GIF)
//! is returned untouched.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::io::{Limits, Reader};
use image::{DynamicImage, ImageFormat};

use crate::types::errors::FaviconError;
use crate::types::favicon::FetchedContent;

/// Largest side the resizer produces, requested or derived.
pub const MAX_TARGET_SIDE: u32 = 1024;

/// Largest source side the decoder accepts.
pub const MAX_SOURCE_SIDE: u32 = 8192;

/// Encodings the resizer can decode and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedFormat {
    Png,
    Jpeg,
}

impl SupportedFormat {
    /// Detects the format by declared mime type, then by file extension.
    pub fn detect(mime_type: &str, file_name: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => return Some(SupportedFormat::Png),
            "image/jpeg" | "image/jpg" => return Some(SupportedFormat::Jpeg),
            _ => {}
        }
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Some(SupportedFormat::Png),
            Some("jpg") | Some("jpeg") => Some(SupportedFormat::Jpeg),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            SupportedFormat::Png => ImageFormat::Png,
            SupportedFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Scales `content` to `x` by `y` pixels.
///
/// A zero in exactly one dimension is derived from the source aspect ratio.
/// Negative targets and `0x0` are rejected before the format is inspected.
/// Results with a side above [`MAX_TARGET_SIDE`] are refused, so an extreme
/// aspect ratio cannot blow up the derived side.
pub fn resize_image(content: FetchedContent, x: i32, y: i32) -> Result<FetchedContent, FaviconError> {
    if x < 0 || y < 0 || (x == 0 && y == 0) {
        return Err(FaviconError::InvalidDimensions { x, y });
    }
    let Some(format) = SupportedFormat::detect(&content.mime_type, &content.file_name) else {
        return Ok(content);
    };

    let source = decode(&content.payload, format)?;
    let (width, height) = target_dimensions(source.width(), source.height(), x as u32, y as u32);
    if width > MAX_TARGET_SIDE || height > MAX_TARGET_SIDE {
        return Err(FaviconError::TooLarge { width, height });
    }
    let resized = source.resize_exact(width, height, FilterType::Nearest);

    let mut buf = Cursor::new(Vec::new());
    match format {
        SupportedFormat::Png => resized.write_to(&mut buf, ImageFormat::Png)?,
        // JPEG carries no alpha channel.
        SupportedFormat::Jpeg => {
            DynamicImage::ImageRgb8(resized.to_rgb8()).write_to(&mut buf, ImageFormat::Jpeg)?
        }
    }

    Ok(FetchedContent {
        payload: buf.into_inner(),
        ..content
    })
}

fn decode(payload: &[u8], format: SupportedFormat) -> Result<DynamicImage, FaviconError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_SIDE);
    limits.max_image_height = Some(MAX_SOURCE_SIDE);
    let mut reader = Reader::with_format(Cursor::new(payload), format.image_format());
    reader.limits(limits);
    Ok(reader.decode()?)
}

fn target_dimensions(src_w: u32, src_h: u32, x: u32, y: u32) -> (u32, u32) {
    let scale = |num: u32, factor: u32, den: u32| -> u32 {
        if den == 0 {
            return factor.max(1);
        }
        let scaled = (u64::from(num) * u64::from(factor) + u64::from(den) / 2) / u64::from(den);
        scaled.clamp(1, u64::from(u32::MAX)) as u32
    };
    match (x, y) {
        (x, 0) => (x, scale(src_h, x, src_w)),
        (0, y) => (scale(src_w, y, src_h), y),
        (x, y) => (x, y),
    }
}
