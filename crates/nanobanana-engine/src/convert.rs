use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};

use nanobanana_contracts::request::OutputFormat;

use crate::error::GenerationError;

pub const JPEG_QUALITY: u8 = 92;

pub fn format_for_mime(mime_type: &str) -> OutputFormat {
    if mime_type.to_ascii_lowercase().contains("png") {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    }
}

/// Re-encodes `bytes` into `target` unless the declared mime already matches.
pub fn normalize_format(
    bytes: Vec<u8>,
    mime_type: &str,
    target: OutputFormat,
) -> Result<Vec<u8>, GenerationError> {
    if format_for_mime(mime_type) == target {
        return Ok(bytes);
    }

    let decoded = image::load_from_memory(&bytes).map_err(GenerationError::ImageDecode)?;
    let mut out = Vec::new();
    match target {
        OutputFormat::Jpeg => {
            let flattened = flatten_onto_white(&decoded);
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .encode_image(&flattened)
                .map_err(GenerationError::ImageEncode)?;
        }
        OutputFormat::Png => {
            decoded
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
                .map_err(GenerationError::ImageEncode)?;
        }
    }
    Ok(out)
}

/// Drops the alpha channel by compositing over opaque white.
///
/// Palette images arrive here already expanded to RGB(A) by the decoder.
fn flatten_onto_white(source: &DynamicImage) -> RgbImage {
    if !source.color().has_alpha() {
        return source.to_rgb8();
    }
    let rgba = source.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = u32::from(src[3]);
        for channel in 0..3 {
            let value = u32::from(src[channel]);
            dst[channel] = ((value * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
    }
    out
}
