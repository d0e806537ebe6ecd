/// WGS84 semi-major axis (meters), also the Web Mercator sphere radius.
pub const WGS84_A: f64 = 6_378_137.0;

/// Units of the render surface's active projection.
///
/// Codes follow the conventional projection unit strings (`degrees`, `m`,
/// `ft`, `us-ft`, `pixels`, `tile-pixels`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProjectionUnits {
    Degrees,
    Meters,
    Feet,
    UsFeet,
    Pixels,
    TilePixels,
}

impl ProjectionUnits {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "degrees" => Some(Self::Degrees),
            "m" => Some(Self::Meters),
            "ft" => Some(Self::Feet),
            "us-ft" => Some(Self::UsFeet),
            "pixels" => Some(Self::Pixels),
            "tile-pixels" => Some(Self::TilePixels),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Degrees => "degrees",
            Self::Meters => "m",
            Self::Feet => "ft",
            Self::UsFeet => "us-ft",
            Self::Pixels => "pixels",
            Self::TilePixels => "tile-pixels",
        }
    }

    /// Angular units keep full coordinate precision in permalinks.
    pub fn is_angular(self) -> bool {
        matches!(self, Self::Degrees)
    }
}

impl std::fmt::Display for ProjectionUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Spherical Web Mercator forward projection, degrees in, meters out.
pub fn lon_lat_to_web_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    // Clamp to the square extent so the poles don't map to infinity.
    let lat = lat_deg.clamp(-85.051_128_779_806_59, 85.051_128_779_806_59);
    let x = WGS84_A * lon_deg.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}
