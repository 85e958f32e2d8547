//! Unit tests for favicon resizing.

#[path = "../common/mod.rs"]
mod common;

use bookmarks::services::image_resizer::{resize_image, SupportedFormat, MAX_TARGET_SIDE};
use bookmarks::types::errors::FaviconError;
use bookmarks::types::favicon::FetchedContent;
use common::png_bytes;
use rstest::rstest;

fn content(file_name: &str, mime_type: &str, payload: Vec<u8>) -> FetchedContent {
    FetchedContent {
        url: format!("https://example.com/{}", file_name),
        file_name: file_name.to_string(),
        mime_type: mime_type.to_string(),
        payload,
    }
}

fn dimensions(payload: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(payload).expect("decode resized image");
    (img.width(), img.height())
}

#[rstest]
#[case("image/png", "x.bin", Some(SupportedFormat::Png))]
#[case("image/jpeg; charset=binary", "x.bin", Some(SupportedFormat::Jpeg))]
#[case("", "icon.PNG", Some(SupportedFormat::Png))]
#[case("application/octet-stream", "photo.jpeg", Some(SupportedFormat::Jpeg))]
#[case("image/png", "photo.jpg", Some(SupportedFormat::Png))]
#[case("image/x-icon", "favicon.ico", None)]
#[case("image/svg+xml", "icon.svg", None)]
fn test_format_detection(#[case] mime: &str, #[case] name: &str, #[case] expected: Option<SupportedFormat>) {
    assert_eq!(SupportedFormat::detect(mime, name), expected);
}

#[rstest]
#[case(100, 50, 50, 0, (50, 25))]
#[case(100, 50, 0, 10, (20, 10))]
#[case(16, 16, 50, 0, (50, 50))]
#[case(30, 20, 12, 8, (12, 8))]
fn test_png_is_resized(
    #[case] width: u32,
    #[case] height: u32,
    #[case] x: i32,
    #[case] y: i32,
    #[case] expected: (u32, u32),
) {
    let resized = resize_image(content("icon.png", "image/png", png_bytes(width, height)), x, y).unwrap();
    assert_eq!(dimensions(&resized.payload), expected);
    assert_eq!(resized.file_name, "icon.png");
}

#[test]
fn test_jpeg_is_resized() {
    let img = image::RgbImage::from_pixel(40, 20, image::Rgb([10, 20, 30]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();

    let resized = resize_image(content("photo.jpg", "image/jpeg", buf.into_inner()), 20, 0).unwrap();
    assert_eq!(dimensions(&resized.payload), (20, 10));
}

#[rstest]
#[case(0, 0)]
#[case(-1, 10)]
#[case(10, -1)]
fn test_invalid_dimensions_are_rejected(#[case] x: i32, #[case] y: i32) {
    let result = resize_image(content("favicon.ico", "image/x-icon", vec![1, 2, 3]), x, y);
    assert!(matches!(result, Err(FaviconError::InvalidDimensions { .. })));
}

#[test]
fn test_unsupported_format_passes_through() {
    let original = content("favicon.ico", "image/x-icon", vec![0, 0, 1, 0]);
    let result = resize_image(original.clone(), 50, 0).unwrap();
    assert_eq!(result, original);
}

#[test]
fn test_corrupt_png_is_an_error() {
    let result = resize_image(content("icon.png", "image/png", b"not a png".to_vec()), 50, 0);
    assert!(matches!(result, Err(FaviconError::Image(_))));
}

#[test]
fn test_derived_side_is_capped() {
    let result = resize_image(content("tall.png", "image/png", png_bytes(1, 4000)), 50, 0);
    assert!(matches!(
        result,
        Err(FaviconError::TooLarge { width: 50, height }) if height > MAX_TARGET_SIDE
    ));
}

#[test]
fn test_oversized_request_is_refused() {
    let result = resize_image(content("icon.png", "image/png", png_bytes(4, 4)), 5000, 0);
    assert!(matches!(result, Err(FaviconError::TooLarge { .. })));
}

#[test]
fn test_oversized_source_is_refused() {
    let result = resize_image(content("tall.png", "image/png", png_bytes(1, 20_000)), 50, 0);
    assert!(result.is_err());
}
