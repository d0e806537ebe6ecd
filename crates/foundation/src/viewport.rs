use serde::{Deserialize, Serialize};

use crate::projection::lon_lat_to_web_mercator;

/// A map coordinate in the units of the surface's projection.
///
/// Serialized as a `[x, y]` pair, which is how viewport state is stored in
/// browser history entries.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Web Mercator coordinate of a WGS84 longitude/latitude.
    pub fn from_lon_lat(lon_deg: f64, lat_deg: f64) -> Self {
        let (x, y) = lon_lat_to_web_mercator(lon_deg, lat_deg);
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(v: [f64; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.x, c.y]
    }
}

/// Visible map state: center, zoom level and rotation (radians).
///
/// Zoom clamping and rotation normalization belong to the render surface;
/// this type carries whatever the surface reports.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub center: Coordinate,
    pub zoom: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl ViewportState {
    pub fn new(center: Coordinate, zoom: f64, rotation: f64) -> Self {
        Self {
            center,
            zoom,
            rotation,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.zoom.is_finite() && self.rotation.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, ViewportState};

    #[test]
    fn serializes_center_as_pair() {
        let s = ViewportState::new(Coordinate::new(1.5, -2.0), 8.0, 0.25);
        let json = serde_json::to_string(&s).expect("json");
        assert_eq!(json, r#"{"center":[1.5,-2.0],"zoom":8.0,"rotation":0.25}"#);
        let back: ViewportState = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, s);
    }

    #[test]
    fn rotation_defaults_to_zero() {
        let s: ViewportState = serde_json::from_str(r#"{"center":[0,0],"zoom":3}"#).expect("parse");
        assert_eq!(s.rotation, 0.0);
    }

    #[test]
    fn finiteness_covers_every_field() {
        let ok = ViewportState::new(Coordinate::new(0.0, 0.0), 1.0, 0.0);
        assert!(ok.is_finite());
        assert!(!ViewportState { zoom: f64::NAN, ..ok }.is_finite());
        assert!(!ViewportState { center: Coordinate::new(f64::INFINITY, 0.0), ..ok }.is_finite());
    }
}
