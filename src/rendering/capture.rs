//! Raster capture of mounted content at a resolved geometry

use crate::rendering::geometry::ResolvedGeometry;
use crate::{Error, Result, SurfaceHandle};
use log::debug;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Background painted behind the content before capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// Leave the surface untouched (alpha preserved)
    Transparent,
    /// Any CSS color
    Color(String),
}

impl Background {
    /// Unset, blank, `transparent` and `none` all mean transparent.
    pub fn from_option(color: Option<&str>) -> Self {
        match color.map(str::trim) {
            None | Some("") => Background::Transparent,
            Some(c) if c.eq_ignore_ascii_case("transparent") || c.eq_ignore_ascii_case("none") => {
                Background::Transparent
            }
            Some(c) => Background::Color(c.to_string()),
        }
    }

    pub fn css(&self) -> Option<&str> {
        match self {
            Background::Transparent => None,
            Background::Color(c) => Some(c.as_str()),
        }
    }
}

/// Width and height from the IHDR chunk, which must directly follow the
/// signature.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || !bytes.starts_with(PNG_SIGNATURE) || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Some((width, height))
}

/// Capture the mounted content as PNG at exactly `geometry`'s pixel size.
pub async fn capture(surface: &SurfaceHandle, geometry: &ResolvedGeometry, background: &Background) -> Result<Vec<u8>> {
    debug!(
        "capturing {}x{} at zoom {} ({:?})",
        geometry.final_width, geometry.final_height, geometry.zoom_scale, background
    );
    let bytes = surface.capture(*geometry, background.css().map(str::to_string)).await?;
    let (width, height) =
        png_dimensions(&bytes).ok_or_else(|| Error::CaptureFailure("surface did not return PNG data".into()))?;
    if (width, height) != (geometry.final_width, geometry.final_height) {
        return Err(Error::CaptureFailure(format!(
            "captured {}x{} but {}x{} was resolved",
            width, height, geometry.final_width, geometry.final_height
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_sentinels() {
        assert_eq!(Background::from_option(None), Background::Transparent);
        assert_eq!(Background::from_option(Some("transparent")), Background::Transparent);
        assert_eq!(Background::from_option(Some(" None ")), Background::Transparent);
        assert_eq!(Background::from_option(Some("")), Background::Transparent);
    }

    #[test]
    fn colors_pass_through() {
        let bg = Background::from_option(Some("#00FF00"));
        assert_eq!(bg.css(), Some("#00FF00"));
        assert_eq!(Background::Transparent.css(), None);
    }

    fn header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    #[test]
    fn dimensions_come_from_ihdr() {
        assert_eq!(png_dimensions(&header(302, 150)), Some((302, 150)));
    }

    #[test]
    fn non_png_bytes_have_no_dimensions() {
        assert_eq!(png_dimensions(b"<svg></svg> and some padding bytes"), None);
        assert_eq!(png_dimensions(PNG_SIGNATURE), None);
        let mut wrong_chunk = header(1, 1);
        wrong_chunk[12..16].copy_from_slice(b"IDAT");
        assert_eq!(png_dimensions(&wrong_chunk), None);
    }
}
