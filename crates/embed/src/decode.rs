//! Base64 image payload decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;

use crate::EmbedError;

/// Drops a `data:<mime>;base64,` prefix if present.
///
/// Browsers send canvas captures as data URIs; everything up to the first
/// comma is metadata.
pub fn strip_data_uri(payload: &str) -> &str {
    let trimmed = payload.trim();
    if trimmed.starts_with("data:") {
        match trimmed.split_once(',') {
            Some((_, body)) => body,
            None => "",
        }
    } else {
        trimmed
    }
}

/// Decodes a base64 (or data URI) payload into raw bytes.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, EmbedError> {
    let body = strip_data_uri(payload);
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(EmbedError::InvalidImage("image payload is empty".into()));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| EmbedError::InvalidImage(format!("base64 decode failed: {e}")))
}

/// Decodes a base64 (or data URI) payload into an in-memory image.
///
/// Never panics on malformed input; every failure is an
/// [`EmbedError::InvalidImage`].
pub fn decode_base64_image(payload: &str) -> Result<DynamicImage, EmbedError> {
    let bytes = decode_base64_payload(payload)?;
    image::load_from_memory(&bytes)
        .map_err(|e| EmbedError::InvalidImage(format!("unsupported or corrupt image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn strip_data_uri_prefix() {
        assert_eq!(strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("  QUJD  "), "QUJD");
        assert_eq!(strip_data_uri("data:image/png;base64"), "");
    }

    #[test]
    fn decode_plain_png() {
        let img = decode_base64_image(&png_base64(8, 6)).unwrap();
        assert_eq!(img.width(), 8);
        assert_eq!(img.height(), 6);
    }

    #[test]
    fn decode_data_uri_png() {
        let payload = format!("data:image/png;base64,{}", png_base64(4, 4));
        let img = decode_base64_image(&payload).unwrap();
        assert_eq!(img.width(), 4);
    }

    #[test]
    fn decode_tolerates_line_breaks() {
        let encoded = png_base64(5, 5);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(decode_base64_image(&wrapped).is_ok());
    }

    #[test]
    fn empty_payload_is_invalid_image() {
        assert!(matches!(
            decode_base64_image(""),
            Err(EmbedError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_base64_image("data:image/png;base64,"),
            Err(EmbedError::InvalidImage(_))
        ));
    }

    #[test]
    fn garbage_base64_is_invalid_image() {
        let err = decode_base64_image("!!!not-base64???").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn valid_base64_of_non_image_is_invalid_image() {
        let payload = STANDARD.encode(b"definitely not a picture");
        let err = decode_base64_image(&payload).unwrap_err();
        assert!(matches!(err, EmbedError::InvalidImage(_)));
    }
}
