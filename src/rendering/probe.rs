//! Bounding-box measurement of mounted vector content

use crate::{Error, Result, SurfaceHandle};
use log::debug;
use serde::Deserialize;

/// Box as reported by the page (`SVGGraphicsElement.getBBox()`), unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Footprint of the untouched vector content.
///
/// The origin is floored and the size ceiled, so the box never
/// under-reports the content and nothing gets clipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalBox {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl NaturalBox {
    pub fn from_raw(raw: RawBox) -> Result<Self> {
        let finite = [raw.x, raw.y, raw.width, raw.height].iter().all(|v| v.is_finite());
        if !finite {
            return Err(Error::GeometryUnavailable(format!("non-finite bounding box {:?}", raw)));
        }
        Ok(Self {
            width: raw.width.ceil(),
            height: raw.height.ceil(),
            x: raw.x.floor(),
            y: raw.y.floor(),
        })
    }
}

/// Measure the single top-level `<svg>` element mounted on the surface.
///
/// Callers must have mounted the markup and let it settle first.
pub async fn probe(surface: &SurfaceHandle) -> Result<NaturalBox> {
    let raw = surface
        .measure()
        .await?
        .ok_or_else(|| Error::GeometryUnavailable("no <svg> element found in mounted content".into()))?;
    let natural = NaturalBox::from_raw(raw)?;
    debug!(
        "natural box {}x{} at ({}, {})",
        natural.width, natural.height, natural.x, natural.y
    );
    Ok(natural)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_box_ceils_size_and_floors_origin() {
        let raw = RawBox { x: -8.4, y: 3.9, width: 199.2, height: 100.0 };
        let b = NaturalBox::from_raw(raw).unwrap();
        assert_eq!(b.x, -9.0);
        assert_eq!(b.y, 3.0);
        assert_eq!(b.width, 200.0);
        assert_eq!(b.height, 100.0);
    }

    #[test]
    fn natural_box_rejects_nan() {
        let raw = RawBox { x: 0.0, y: 0.0, width: f64::NAN, height: 10.0 };
        let err = NaturalBox::from_raw(raw).unwrap_err();
        assert_eq!(err.kind(), "GeometryUnavailable");
    }

    #[test]
    fn raw_box_deserializes_from_page_json() {
        let raw: RawBox = serde_json::from_str(r#"{"x":0.5,"y":-1,"width":120.25,"height":48}"#).unwrap();
        assert_eq!(raw.width, 120.25);
        assert_eq!(raw.y, -1.0);
    }
}
