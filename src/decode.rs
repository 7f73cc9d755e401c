//! Turns incoming URLs and coordinate text back into a [`ViewState`].
//!
//! Three input shapes are recognised and always tried in this order:
//!
//! 1. the internal permalink scheme (`x`/`y` query parameters, a `location`
//!    JSON blob, or `lat`/`lon`);
//! 2. a Google Maps style `@lat,lon,<n>z` path segment;
//! 3. bare coordinate text, on its own or inside a `q`/`ll`/`query`/`center`
//!    parameter or a `/place/` segment.
//!
//! Once the internal parameters are present the input is committed to the
//! internal shape: malformed values are reported, not retried as the later
//! shapes.

use crate::crs::Crs;
use crate::error::{PermalinkError, PermalinkResult};
use crate::regex_patterns::{
    RE_BARE_DECIMAL, RE_GLUED_HEMISPHERE, RE_GOOGLE_AT, RE_PLACE_SEGMENT,
};
use crate::scale_zoom;
use crate::theme::ThemeToken;
use crate::view_state::ViewState;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Query parameters that may carry bare coordinates inside a foreign URL
const COORDINATE_PARAMS: &[&str] = &["q", "ll", "query", "center"];

/// Which input shape a decoded view came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlShape {
    Internal,
    GoogleMaps,
    BareCoordinates,
}

impl fmt::Display for UrlShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Internal => "internal",
            Self::GoogleMaps => "google_maps",
            Self::BareCoordinates => "bare_coordinates",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub view: ViewState,
    pub shape: UrlShape,
    /// Zoom stated by the input, or derived from the scale
    pub zoom: f64,
}

impl Decoded {
    fn new(view: ViewState, shape: UrlShape, zoom: Option<f64>) -> PermalinkResult<Self> {
        if let Some(zoom) = zoom.filter(|z| !(0.0..=scale_zoom::MAX_ZOOM).contains(z)) {
            return Err(PermalinkError::out_of_range("zoom", zoom));
        }
        let view = view.validate()?;
        let zoom = zoom.unwrap_or_else(|| view.zoom());
        Ok(Self { view, shape, zoom })
    }
}

/// The JSON object accepted in the `location` parameter
#[derive(Debug, Deserialize)]
struct LocationParam {
    x: f64,
    y: f64,
    scale: Option<f64>,
    zoom: Option<f64>,
    crs: Option<String>,
    rotation: Option<f64>,
    theme: Option<String>,
}

/// Decodes any supported URL or coordinate text.
pub fn decode(input: &str) -> PermalinkResult<Decoded> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PermalinkError::EmptyInput);
    }

    let split = SplitInput::new(input);

    if let Some(decoded) = decode_query(&split.params)? {
        return Ok(decoded);
    }
    if let Some(decoded) = decode_google(&split.path)? {
        return Ok(decoded);
    }
    if let Some(decoded) = decode_google(input)? {
        return Ok(decoded);
    }
    if let Some(decoded) = decode_bare(input, &split)? {
        return Ok(decoded);
    }

    Err(PermalinkError::UnrecognizedInput(input.to_string()))
}

/// Applies the internal scheme to already split and decoded query parameters.
///
/// `Ok(None)` means the parameters do not use the internal scheme at all.
pub fn decode_query(params: &HashMap<String, String>) -> PermalinkResult<Option<Decoded>> {
    if let Some(location) = params.get("location") {
        return decode_location(location).map(Some);
    }
    if params.contains_key("x") && params.contains_key("y") {
        return decode_xy(params).map(Some);
    }
    let lon_key = ["lon", "lng"].into_iter().find(|k| params.contains_key(*k));
    if let (true, Some(lon_key)) = (params.contains_key("lat"), lon_key) {
        let lat = required_number(params, "lat")?;
        let lon = required_number(params, lon_key)?;
        let zoom = zoom_param(params)?;
        let scale = match optional_number(params, "scale")? {
            Some(scale) => scale,
            None => zoom.map_or(scale_zoom::DEFAULT_SCALE, scale_zoom::estimate_scale_from_zoom),
        };
        let view = ViewState::from_lat_lon(lat, lon, scale)
            .with_rotation(optional_number(params, "rotation")?.unwrap_or(0.0))
            .with_theme(theme_param(params)?);
        return Decoded::new(view, UrlShape::Internal, zoom).map(Some);
    }
    Ok(None)
}

fn decode_xy(params: &HashMap<String, String>) -> PermalinkResult<Decoded> {
    let x = required_number(params, "x")?;
    let y = required_number(params, "y")?;
    let crs = match params.get("crs").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(crs) => Crs::parse(crs)?,
        None => Crs::default(),
    };
    let zoom = zoom_param(params)?;
    let scale = match optional_number(params, "scale")? {
        Some(scale) => scale,
        None => zoom.map_or(scale_zoom::DEFAULT_SCALE, scale_zoom::estimate_scale_from_zoom),
    };
    let rotation = optional_number(params, "rotation")?.unwrap_or(0.0);

    let view = ViewState::new(x, y, crs, scale)
        .with_rotation(rotation)
        .with_theme(theme_param(params)?);
    Decoded::new(view, UrlShape::Internal, zoom)
}

fn decode_location(location: &str) -> PermalinkResult<Decoded> {
    let location = location.trim();
    if location.is_empty() {
        return Err(PermalinkError::InvalidLocation(
            "location parameter is empty".to_string(),
        ));
    }
    let loc: LocationParam = serde_json::from_str(location)
        .map_err(|e| PermalinkError::InvalidLocation(e.to_string()))?;

    let crs = match loc.crs.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(crs) => Crs::parse(crs)?,
        None => Crs::default(),
    };
    let scale = loc.scale.unwrap_or_else(|| {
        loc.zoom
            .map_or(scale_zoom::DEFAULT_SCALE, scale_zoom::estimate_scale_from_zoom)
    });
    let theme = match loc.theme.as_deref() {
        Some(theme) => ThemeToken::parse(theme)?,
        None => None,
    };
    let view = ViewState::new(loc.x, loc.y, crs, scale)
        .with_rotation(loc.rotation.unwrap_or(0.0))
        .with_theme(theme);
    Decoded::new(view, UrlShape::Internal, loc.zoom)
}

fn decode_google(text: &str) -> PermalinkResult<Option<Decoded>> {
    let Some(caps) = RE_GOOGLE_AT.captures(text) else {
        return Ok(None);
    };
    let lat = parse_number("lat", &caps[1])?;
    let lon = parse_number("lon", &caps[2])?;
    let zoom = match caps.get(3) {
        Some(value) => {
            let value = parse_number("zoom", value.as_str())?;
            if value < 0.0 {
                return Err(PermalinkError::out_of_range("zoom", value));
            }
            match caps.get(4).map(|m| m.as_str()) {
                Some("m") => scale_zoom::zoom_from_earth_distance(value),
                Some("a") => scale_zoom::zoom_from_google_earth_altitude(value),
                _ => value,
            }
        }
        None => scale_zoom::DEFAULT_ZOOM,
    };
    let view = ViewState::from_lat_lon(lat, lon, scale_zoom::estimate_scale_from_zoom(zoom));
    Decoded::new(view, UrlShape::GoogleMaps, Some(zoom)).map(Some)
}

fn decode_bare(input: &str, split: &SplitInput) -> PermalinkResult<Option<Decoded>> {
    let mut candidates: Vec<String> = vec![];
    if split.is_url {
        candidates.extend(
            COORDINATE_PARAMS
                .iter()
                .filter_map(|key| split.params.get(*key))
                .cloned(),
        );
        if let Some(caps) = RE_PLACE_SEGMENT.captures(&split.path) {
            let segment = urlencoding::decode(&caps[1])
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| caps[1].to_string());
            candidates.push(segment);
        }
    } else {
        candidates.push(input.to_string());
    }

    for candidate in candidates {
        if let Some((lat, lon, zoom)) = parse_bare_coordinates(&candidate)? {
            let scale = zoom.map_or(scale_zoom::DEFAULT_SCALE, scale_zoom::estimate_scale_from_zoom);
            let view = ViewState::from_lat_lon(lat, lon, scale);
            return Decoded::new(view, UrlShape::BareCoordinates, zoom).map(Some);
        }
    }
    Ok(None)
}

/// Reads latitude, longitude and an optional zoom from free text.
fn parse_bare_coordinates(text: &str) -> PermalinkResult<Option<(f64, f64, Option<f64>)>> {
    if let Some(caps) = RE_BARE_DECIMAL.captures(text) {
        let a = parse_number("latitude", &caps[1])?;
        let b = parse_number("longitude", &caps[2])?;
        let zoom = caps
            .get(3)
            .map(|m| parse_number("zoom", m.as_str()))
            .transpose()?;
        // Longitude first is a common slip; only swap when the order is unambiguous
        let (lat, lon) = if a.abs() > 90.0 && b.abs() <= 90.0 {
            (b, a)
        } else {
            (a, b)
        };
        return Ok(Some((lat, lon, zoom)));
    }
    HemisphereCoordinates::parse(text).map(|found| found.map(|c| (c.lat, c.lon, None)))
}

/// `40 30 N 74 15 W` and friends, degrees with optional minutes and seconds
#[derive(Debug, Clone, Copy, PartialEq)]
struct HemisphereCoordinates {
    lat: f64,
    lon: f64,
}

impl HemisphereCoordinates {
    fn parse(text: &str) -> PermalinkResult<Option<Self>> {
        let pieces = Self::pieces(text);
        let (lat_parts, lat_ns, lon_parts, lon_ew) = match pieces.len() {
            4 if Self::is_coor(&pieces[1], &pieces[3]) => {
                (&pieces[0..1], &pieces[1], &pieces[2..3], &pieces[3])
            }
            6 if Self::is_coor(&pieces[2], &pieces[5]) => {
                (&pieces[0..2], &pieces[2], &pieces[3..5], &pieces[5])
            }
            8 if Self::is_coor(&pieces[3], &pieces[7]) => {
                (&pieces[0..3], &pieces[3], &pieces[4..7], &pieces[7])
            }
            _ => return Ok(None),
        };

        let lat = Self::to_decimal(lat_parts, "latitude", 90.0)?;
        let lon = Self::to_decimal(lon_parts, "longitude", 180.0)?;
        let lat = if lat_ns.eq_ignore_ascii_case("S") { -lat } else { lat };
        let lon = if lon_ew.eq_ignore_ascii_case("W") { -lon } else { lon };
        Ok(Some(Self { lat, lon }))
    }

    /// Splits on separators and degree marks; `O` (German "Ost") means east
    fn pieces(text: &str) -> Vec<String> {
        let cleaned: String = text
            .chars()
            .map(|c| match c {
                '_' | ',' | ';' | '°' | '′' | '″' | '\'' | '"' => ' ',
                c => c,
            })
            .collect();
        cleaned
            .split_whitespace()
            .flat_map(|s| match RE_GLUED_HEMISPHERE.captures(s) {
                Some(caps) => vec![caps[1].to_string(), caps[2].to_string()],
                None => vec![s.to_string()],
            })
            .map(|s| {
                if s == "O" || s == "o" {
                    "E".to_string()
                } else {
                    s
                }
            })
            .collect()
    }

    /// Check if strings represent valid N/S and E/W directions
    fn is_coor(ns: &str, ew: &str) -> bool {
        let ns = ns.to_uppercase();
        let ew = ew.to_uppercase();
        (ns == "N" || ns == "S") && (ew == "E" || ew == "W")
    }

    fn to_decimal(parts: &[String], param: &str, max_degrees: f64) -> PermalinkResult<f64> {
        let mut value = 0.0;
        for (i, part) in parts.iter().enumerate() {
            let number = parse_number(param, part)?;
            if number < 0.0 || (i > 0 && number >= 60.0) {
                return Err(PermalinkError::out_of_range(param, number));
            }
            value += number / 60f64.powi(i as i32);
        }
        if value > max_degrees {
            return Err(PermalinkError::out_of_range(param, value));
        }
        Ok(value)
    }
}

/// An input split into URL path and query parameters.
///
/// Text that is not URL shaped keeps its whole content as the path.
#[derive(Debug, Clone)]
struct SplitInput {
    path: String,
    /// Decoded query parameters; the first occurrence of a key wins
    params: HashMap<String, String>,
    is_url: bool,
}

impl SplitInput {
    /// Stands in for the host of relative inputs such as `/qgis-map?x=1&y=2`
    const RELATIVE_BASE: &'static str = "http://localhost/";

    fn new(input: &str) -> Self {
        let parsed = if input.starts_with('/') || input.starts_with('?') {
            Url::parse(Self::RELATIVE_BASE).and_then(|base| base.join(input))
        } else if input.contains("://") {
            Url::parse(input)
        } else {
            return Self::text(input);
        };
        match parsed {
            Ok(url) => {
                let mut params = HashMap::new();
                for (key, value) in url.query_pairs() {
                    params
                        .entry(key.into_owned())
                        .or_insert_with(|| value.into_owned());
                }
                Self {
                    path: url.path().to_string(),
                    params,
                    is_url: true,
                }
            }
            Err(e) => {
                tracing::debug!("Treating {input:?} as text: {e}");
                Self::text(input)
            }
        }
    }

    fn text(input: &str) -> Self {
        Self {
            path: input.to_string(),
            params: HashMap::new(),
            is_url: false,
        }
    }
}

fn parse_number(param: &str, value: &str) -> PermalinkResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| PermalinkError::invalid_number(param, value))
}

fn required_number(params: &HashMap<String, String>, key: &str) -> PermalinkResult<f64> {
    match params.get(key) {
        Some(value) if !value.trim().is_empty() => parse_number(key, value),
        _ => Err(PermalinkError::MissingParameter(key.to_string())),
    }
}

fn optional_number(params: &HashMap<String, String>, key: &str) -> PermalinkResult<Option<f64>> {
    match params.get(key) {
        Some(value) if !value.trim().is_empty() => parse_number(key, value).map(Some),
        _ => Ok(None),
    }
}

fn zoom_param(params: &HashMap<String, String>) -> PermalinkResult<Option<f64>> {
    match optional_number(params, "zoom")? {
        Some(zoom) => Ok(Some(zoom)),
        None => optional_number(params, "z"),
    }
}

fn theme_param(params: &HashMap<String, String>) -> PermalinkResult<Option<ThemeToken>> {
    match params.get("theme") {
        Some(theme) => ThemeToken::parse(theme),
        None => Ok(None),
    }
}
