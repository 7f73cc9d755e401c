use crate::crs::Crs;
use crate::error::{PermalinkError, PermalinkResult};
use crate::scale_zoom;
use crate::theme::ThemeToken;
use crate::transform::CoordinateTransformer;

/// Screen resolution assumed when turning a scale into a map extent
const SCREEN_DPI: f64 = 96.0;
const METERS_PER_INCH: f64 = 0.0254;

/// One map view: center, CRS, scale, rotation and an optional theme.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Easting or longitude, in `crs` units
    pub x: f64,
    /// Northing or latitude, in `crs` units
    pub y: f64,
    pub crs: Crs,
    /// Scale denominator (10000 means 1:10000)
    pub scale: f64,
    /// Degrees, clockwise
    pub rotation: f64,
    pub theme: Option<ThemeToken>,
}

impl ViewState {
    pub fn new(x: f64, y: f64, crs: Crs, scale: f64) -> Self {
        Self {
            x,
            y,
            crs,
            scale,
            rotation: 0.0,
            theme: None,
        }
    }

    /// A WGS84 view from latitude/longitude, the order external links use
    pub fn from_lat_lon(lat: f64, lon: f64, scale: f64) -> Self {
        Self::new(lon, lat, Crs::Wgs84, scale)
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_theme(mut self, theme: Option<ThemeToken>) -> Self {
        self.theme = theme;
        self
    }

    /// Checks ranges and normalises rotation to (-180, 180]
    pub fn validate(mut self) -> PermalinkResult<Self> {
        for (param, value) in [
            ("x", self.x),
            ("y", self.y),
            ("scale", self.scale),
            ("rotation", self.rotation),
        ] {
            if !value.is_finite() {
                return Err(PermalinkError::out_of_range(param, value));
            }
        }
        if self.scale <= 0.0 {
            return Err(PermalinkError::out_of_range("scale", self.scale));
        }
        if self.crs.is_geographic() {
            if !(-90.0..=90.0).contains(&self.y) {
                return Err(PermalinkError::out_of_range("latitude", self.y));
            }
            if !(-180.0..=180.0).contains(&self.x) {
                return Err(PermalinkError::out_of_range("longitude", self.x));
            }
        }
        self.rotation = normalize_rotation(self.rotation);
        Ok(self)
    }

    /// Web-map zoom equivalent of the scale
    pub fn zoom(&self) -> f64 {
        scale_zoom::estimate_zoom_from_scale(self.scale)
    }

    /// Same view within the round-trip tolerance of its CRS
    pub fn approx_eq(&self, other: &Self) -> bool {
        let tolerance = self.crs.round_trip_tolerance();
        self.crs == other.crs
            && (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.scale - other.scale).abs() <= 1e-9 * self.scale.abs().max(1.0)
            && (self.rotation - other.rotation).abs() <= 1e-9
            && self.theme == other.theme
    }

    /// The same view with its center expressed in `target`
    pub fn to_crs(
        &self,
        transformer: &dyn CoordinateTransformer,
        target: Crs,
    ) -> PermalinkResult<Self> {
        let (x, y) = transformer.transform(self.x, self.y, self.crs, target)?;
        Ok(Self {
            x,
            y,
            crs: target,
            ..self.clone()
        })
    }

    /// Center as (latitude, longitude) in WGS84
    pub fn lat_lon(&self, transformer: &dyn CoordinateTransformer) -> PermalinkResult<(f64, f64)> {
        let (lon, lat) = transformer.transform(self.x, self.y, self.crs, Crs::Wgs84)?;
        Ok((lat, lon))
    }

    /// Extent (minx, miny, maxx, maxy) shown by a `width` x `height` pixel viewer at 96 dpi.
    ///
    /// Only meaningful for projected CRSs, where map units are metres.
    pub fn bbox(&self, width: u32, height: u32) -> (f64, f64, f64, f64) {
        let pixels_per_meter = SCREEN_DPI / METERS_PER_INCH;
        let half_width = (width as f64 / pixels_per_meter) * self.scale / 2.0;
        let half_height = (height as f64 / pixels_per_meter) * self.scale / 2.0;
        (
            self.x - half_width,
            self.y - half_height,
            self.x + half_width,
            self.y + half_height,
        )
    }
}

pub(crate) fn normalize_rotation(rotation: f64) -> f64 {
    let r = rotation % 360.0;
    if r > 180.0 {
        r - 360.0
    } else if r <= -180.0 {
        r + 360.0
    } else {
        r
    }
}
