//! Final raster geometry from the natural box, explicit size and DPI

use crate::rendering::probe::NaturalBox;
use crate::{Error, Result, BASE_DPI};

/// Pixel size of the capture and the zoom the content is painted at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedGeometry {
    pub final_width: u32,
    pub final_height: u32,
    pub zoom_scale: f64,
    /// Both dimensions were given, so the content fills the area without
    /// keeping its aspect ratio
    pub stretch: bool,
}

impl ResolvedGeometry {
    /// Capture width in CSS pixels (device pixels divided by zoom).
    pub fn css_width(&self) -> f64 {
        self.final_width as f64 / self.zoom_scale
    }

    /// Capture height in CSS pixels.
    pub fn css_height(&self) -> f64 {
        self.final_height as f64 / self.zoom_scale
    }
}

/// Combine the natural box with the requested size and resolution.
///
/// - only a width: height follows the natural aspect ratio
/// - only a height: width follows the natural aspect ratio
/// - both: used as given, the content is stretched
/// - neither: natural size
///
/// The base size is then scaled by `resolution_dpi / 96`, which is also the
/// zoom the surface paints at. Rounding is half away from zero, the same as
/// `Math.round` for the non-negative values seen here. Zero-valued explicit
/// dimensions count as unset.
pub fn resolve(
    natural: &NaturalBox,
    explicit_width: Option<u32>,
    explicit_height: Option<u32>,
    resolution_dpi: u32,
) -> Result<ResolvedGeometry> {
    if !(natural.width.is_finite() && natural.width > 0.0) || !(natural.height.is_finite() && natural.height > 0.0) {
        return Err(Error::GeometryUnavailable(format!(
            "degenerate natural size {}x{}",
            natural.width, natural.height
        )));
    }
    if resolution_dpi == 0 {
        return Err(Error::GeometryUnavailable("resolution must be positive".into()));
    }

    let explicit_width = explicit_width.filter(|w| *w > 0).map(f64::from);
    let explicit_height = explicit_height.filter(|h| *h > 0).map(f64::from);

    let (base_width, base_height) = match (explicit_width, explicit_height) {
        (Some(w), None) => (w, (natural.height * (w / natural.width)).round()),
        (None, Some(h)) => ((natural.width * (h / natural.height)).round(), h),
        (Some(w), Some(h)) => (w, h),
        (None, None) => (natural.width, natural.height),
    };

    let scale = resolution_dpi as f64 / BASE_DPI as f64;
    let final_width = to_pixels((base_width * scale).round(), "width")?;
    let final_height = to_pixels((base_height * scale).round(), "height")?;

    Ok(ResolvedGeometry {
        final_width,
        final_height,
        zoom_scale: scale,
        stretch: explicit_width.is_some() && explicit_height.is_some(),
    })
}

fn to_pixels(value: f64, axis: &str) -> Result<u32> {
    if (1.0..=u32::MAX as f64).contains(&value) {
        Ok(value as u32)
    } else {
        Err(Error::GeometryUnavailable(format!("resolved {} {} is out of range", axis, value)))
    }
}
