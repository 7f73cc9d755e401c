//! Links that open the current view in Google Maps and Google Earth.

use crate::error::PermalinkResult;
use crate::scale_zoom;
use crate::transform::CoordinateTransformer;
use crate::view_state::ViewState;
use serde::Serialize;

const GOOGLE_MAPS_BASE: &str = "https://www.google.co.jp/maps";
const GOOGLE_EARTH_BASE: &str = "https://earth.google.com/web";

/// Both hand-off links for one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalLinks {
    pub google_maps: String,
    pub google_earth: String,
}

impl ExternalLinks {
    pub fn new(
        view: &ViewState,
        transformer: &dyn CoordinateTransformer,
    ) -> PermalinkResult<Self> {
        Ok(Self {
            google_maps: google_maps_url(view, transformer)?,
            google_earth: google_earth_url(view, transformer)?,
        })
    }
}

fn rounded_zoom(view: &ViewState) -> u32 {
    view.zoom().round().clamp(0.0, scale_zoom::MAX_ZOOM) as u32
}

/// `https://www.google.co.jp/maps/@lat,lon,<zoom>z`
pub fn google_maps_url(
    view: &ViewState,
    transformer: &dyn CoordinateTransformer,
) -> PermalinkResult<String> {
    let (lat, lon) = view.lat_lon(transformer)?;
    let zoom = rounded_zoom(view);
    Ok(format!("{GOOGLE_MAPS_BASE}/@{lat:.6},{lon:.6},{zoom}z"))
}

/// `https://earth.google.com/web/@lat,lon,<altitude>a,35y,0h,0t,0r`
pub fn google_earth_url(
    view: &ViewState,
    transformer: &dyn CoordinateTransformer,
) -> PermalinkResult<String> {
    let (lat, lon) = view.lat_lon(transformer)?;
    let altitude = scale_zoom::google_earth_altitude(rounded_zoom(view) as f64);
    Ok(format!(
        "{GOOGLE_EARTH_BASE}/@{lat:.6},{lon:.6},{altitude}a,35y,0h,0t,0r"
    ))
}
