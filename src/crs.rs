//! Coordinate reference system identifiers.

use crate::error::{PermalinkError, PermalinkResult};
use std::fmt;

/// First EPSG code of the JGD2011 plane rectangular series (zone I)
const JAPAN_PLANE_FIRST_CODE: u32 = 6669;

/// A CRS the permalink codec knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Crs {
    /// WGS84 geographic, EPSG:4326
    Wgs84,
    /// Spherical Web Mercator, EPSG:3857
    #[default]
    WebMercator,
    /// JGD2011 geographic, EPSG:6668
    Jgd2011,
    /// WGS84 / UTM, EPSG:326zz (north) and EPSG:327zz (south)
    Utm { zone: u8, north: bool },
    /// JGD2011 / Japan plane rectangular CS I..XIX, EPSG:6669..6687
    JapanPlane { zone: u8 },
    /// Any other EPSG code, resolved through the definition registry
    Other(u32),
}

impl Crs {
    /// Parses `EPSG:nnnn`, a bare code, `CRS:84` or an OGC URN.
    pub fn parse(s: &str) -> PermalinkResult<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "" => return Err(PermalinkError::UnknownCrs(s.to_string())),
            "CRS:84" | "WGS84" | "OGC:CRS84" => return Ok(Self::Wgs84),
            _ => {}
        }

        let code = normalized
            .strip_prefix("URN:OGC:DEF:CRS:EPSG::")
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))
            .or_else(|| normalized.strip_prefix("EPSG:"))
            .unwrap_or(&normalized);

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PermalinkError::UnknownCrs(s.to_string()));
        }
        let code: u32 = code
            .parse()
            .map_err(|_| PermalinkError::UnknownCrs(s.to_string()))?;
        if code == 0 {
            return Err(PermalinkError::UnknownCrs(s.to_string()));
        }
        Ok(Self::from_epsg(code))
    }

    pub const fn from_epsg(code: u32) -> Self {
        match code {
            4326 => Self::Wgs84,
            3857 | 900913 | 102100 | 102113 => Self::WebMercator,
            6668 => Self::Jgd2011,
            32601..=32660 => Self::Utm {
                zone: (code - 32600) as u8,
                north: true,
            },
            32701..=32760 => Self::Utm {
                zone: (code - 32700) as u8,
                north: false,
            },
            6669..=6687 => Self::JapanPlane {
                zone: (code - JAPAN_PLANE_FIRST_CODE + 1) as u8,
            },
            other => Self::Other(other),
        }
    }

    pub const fn epsg(&self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
            Self::Jgd2011 => 6668,
            Self::Utm { zone, north: true } => 32600 + *zone as u32,
            Self::Utm { zone, north: false } => 32700 + *zone as u32,
            Self::JapanPlane { zone } => JAPAN_PLANE_FIRST_CODE + *zone as u32 - 1,
            Self::Other(code) => *code,
        }
    }

    /// PROJ.4 definition string from the EPSG registry
    pub fn proj4_definition(&self) -> Option<&'static str> {
        let code = u16::try_from(self.epsg()).ok()?;
        crs_definitions::from_code(code).map(|def| def.proj4)
    }

    /// Axis units are degrees rather than metres
    pub fn is_geographic(&self) -> bool {
        match self {
            Self::Wgs84 | Self::Jgd2011 => true,
            Self::WebMercator | Self::Utm { .. } | Self::JapanPlane { .. } => false,
            Self::Other(_) => self
                .proj4_definition()
                .is_some_and(|def| def.contains("+proj=longlat") || def.contains("+proj=latlong")),
        }
    }

    /// How close two decoded centers must be to count as the same view
    pub fn round_trip_tolerance(&self) -> f64 {
        if self.is_geographic() { 1e-6 } else { 1e-3 }
    }

    /// Decimal places used when writing a coordinate in this CRS
    pub fn coordinate_precision(&self) -> usize {
        if self.is_geographic() { 8 } else { 6 }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl std::str::FromStr for Crs {
    type Err = PermalinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Wgs84);
        assert_eq!(Crs::parse("epsg:3857").unwrap(), Crs::WebMercator);
        assert_eq!(Crs::parse(" CRS:84 ").unwrap(), Crs::Wgs84);
        assert_eq!(Crs::parse("900913").unwrap(), Crs::WebMercator);
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::6677").unwrap(),
            Crs::JapanPlane { zone: 9 }
        );
    }

    #[test]
    fn test_parse_utm() {
        assert_eq!(
            Crs::parse("EPSG:32654").unwrap(),
            Crs::Utm {
                zone: 54,
                north: true
            }
        );
        assert_eq!(
            Crs::parse("EPSG:32756").unwrap(),
            Crs::Utm {
                zone: 56,
                north: false
            }
        );
    }

    #[test]
    fn test_parse_other_code() {
        assert_eq!(Crs::parse("EPSG:27700").unwrap(), Crs::Other(27700));
    }

    #[test]
    fn test_parse_unknown() {
        for bad in ["", "EPSG:", "EPSG:abc", "mercator", "EPSG:0", "EPSG:-1"] {
            match Crs::parse(bad) {
                Err(PermalinkError::UnknownCrs(s)) => assert_eq!(s, bad),
                other => panic!("{bad:?} should be unknown, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_display_round_trip() {
        for code in [4326, 3857, 6668, 32654, 32701, 6669, 6687, 2154] {
            let crs = Crs::from_epsg(code);
            assert_eq!(crs.to_string(), format!("EPSG:{code}"));
            assert_eq!(Crs::parse(&crs.to_string()).unwrap(), crs);
        }
    }

    #[test]
    fn test_tolerance() {
        assert_eq!(Crs::Wgs84.round_trip_tolerance(), 1e-6);
        assert_eq!(Crs::WebMercator.round_trip_tolerance(), 1e-3);
        assert!(Crs::Jgd2011.is_geographic());
        assert!(!Crs::JapanPlane { zone: 1 }.is_geographic());
    }

    #[test]
    fn test_registry_geographic() {
        // JGD2000 and British National Grid
        assert!(Crs::Other(4612).is_geographic());
        assert_eq!(Crs::Other(4612).round_trip_tolerance(), 1e-6);
        assert!(!Crs::Other(27700).is_geographic());
        assert_eq!(Crs::Other(27700).coordinate_precision(), 6);
    }

    #[test]
    fn test_proj4_definition() {
        let def = Crs::JapanPlane { zone: 9 }.proj4_definition().unwrap();
        assert!(def.contains("+proj=tmerc"));
        assert!(Crs::Utm { zone: 54, north: true }
            .proj4_definition()
            .unwrap()
            .contains("+zone=54"));
        assert_eq!(Crs::Other(1).proj4_definition(), None);
        // Beyond the registry's u16 code range
        assert_eq!(Crs::Other(900_914).proj4_definition(), None);
    }
}
