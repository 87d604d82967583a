//! Image codec adapter: raster decode, PNG re-encode and data URLs.
//!
//! Only PNG and JPEG are accepted. Decoded images are always promoted to
//! RGBA so the overlay renderer works on a single pixel format.

use base64::Engine;
use image::{ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Pixel buffer handed from the decoder to the overlay renderer.
pub type PixelBuffer = RgbaImage;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported image format: {0}")]
    Unsupported(String),
    #[error("malformed image data: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode png: {0}")]
pub struct EncodeError(#[from] image::ImageError);

/// Source formats a panel can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
}

impl SourceFormat {
    /// Resolve a file extension, case-insensitively. `jpg` is treated as `jpeg`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(SourceFormat::Png),
            "jpeg" | "jpg" => Some(SourceFormat::Jpeg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Subtype used in `data:image/<subtype>` URLs.
    pub fn mime_subtype(&self) -> &'static str {
        match self {
            SourceFormat::Png => "png",
            SourceFormat::Jpeg => "jpeg",
        }
    }

    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(SourceFormat::Png),
            image::ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            _ => None,
        }
    }
}

/// Decode PNG or JPEG bytes into an RGBA buffer. The format is sniffed from
/// the content, not trusted from the file name.
pub fn decode(data: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    match reader.format() {
        Some(format) if SourceFormat::from_image_format(format).is_some() => {}
        Some(format) => return Err(DecodeError::Unsupported(format!("{:?}", format))),
        None => return Err(DecodeError::Unsupported("unrecognised content".to_string())),
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    Ok(img.to_rgba8())
}

/// Wrap raw bytes as `data:image/<subtype>;base64,<payload>` without decoding.
pub fn encode_data_url(data: &[u8], mime_subtype: &str) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:image/{};base64,{}", mime_subtype, payload)
}

/// Serialize a pixel buffer to PNG and wrap it as a data URL.
pub fn encode_png_data_url(buffer: &PixelBuffer) -> Result<String, EncodeError> {
    let mut output = Cursor::new(Vec::new());
    buffer.write_to(&mut output, image::ImageFormat::Png)?;
    Ok(encode_data_url(&output.into_inner(), "png"))
}

/// Fallback payload substituted for images that cannot be read or decoded.
///
/// The asset file holds the exact string to serve (normally a ready-made data
/// URL). A missing asset degrades to an empty string.
#[derive(Debug, Clone, Default)]
pub struct Placeholder(String);

impl Placeholder {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Placeholder(contents),
            Err(e) => {
                log::warn!(
                    "[codec] Could not read placeholder asset {}: {}; using an empty payload",
                    path.display(),
                    e
                );
                Placeholder(String::new())
            }
        }
    }

    pub fn new(payload: impl Into<String>) -> Self {
        Placeholder(payload.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
