//! Coordinate transforms between the CRSs a permalink can carry.

use crate::crs::Crs;
use crate::error::{PermalinkError, PermalinkResult};
use proj4rs::Proj;

/// Latitude at which Web Mercator becomes a square world
pub const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Northing of [`WEB_MERCATOR_MAX_LATITUDE`]
const WEB_MERCATOR_MAX_Y: f64 = 20_037_508.342_789_244 + 1e-6;

/// Moves a point from one CRS to another.
pub trait CoordinateTransformer: Send + Sync {
    fn transform(&self, x: f64, y: f64, from: Crs, to: Crs) -> PermalinkResult<(f64, f64)>;
}

/// Transformer backed by `proj4rs`, with definitions from the EPSG registry.
///
/// Geographic coordinates go in and come out as (longitude, latitude) in degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Proj4Transformer;

impl Proj4Transformer {
    fn projection(crs: Crs, from: Crs, to: Crs) -> PermalinkResult<Proj> {
        let unavailable = || PermalinkError::TransformUnavailable {
            from: from.to_string(),
            to: to.to_string(),
        };
        let definition = crs.proj4_definition().ok_or_else(unavailable)?;
        Proj::from_proj_string(definition).map_err(|e| {
            tracing::warn!("Bad PROJ definition for {crs}: {e}");
            unavailable()
        })
    }
}

impl CoordinateTransformer for Proj4Transformer {
    fn transform(&self, x: f64, y: f64, from: Crs, to: Crs) -> PermalinkResult<(f64, f64)> {
        if from == to {
            return Ok((x, y));
        }
        let src = Self::projection(from, from, to)?;
        let dst = Self::projection(to, from, to)?;
        let failed = || PermalinkError::ProjectionFailed {
            crs: to.to_string(),
        };

        if from.is_geographic() && to == Crs::WebMercator && y.abs() > WEB_MERCATOR_MAX_LATITUDE {
            return Err(failed());
        }

        let mut point = if from.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        proj4rs::transform::transform(&src, &dst, &mut point).map_err(|e| {
            tracing::debug!("{from} -> {to} failed for ({x}, {y}): {e}");
            failed()
        })?;

        let (out_x, out_y) = if to.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(failed());
        }
        if to == Crs::WebMercator && out_y.abs() > WEB_MERCATOR_MAX_Y {
            return Err(failed());
        }
        Ok((out_x, out_y))
    }
}
