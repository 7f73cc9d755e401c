/// Degrees, minutes and seconds of one decimal angle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MinSec {
    deg: f64,
    min: f64,
    sec: f64,
    negative: bool,
}

impl MinSec {
    /// Given decimal degrees, convert to minutes, seconds and sign
    pub fn new(deg: f64) -> Self {
        // Round to a suitable number of digits
        let deg_rounded = (deg * 1_000_000.0).round() / 1_000_000.0;
        let min = 60.0 * (deg_rounded.abs() - deg_rounded.abs().floor());
        let min_rounded = (min * 10_000.0).round() / 10_000.0;
        let sec = 60.0 * (min_rounded - min_rounded.floor());
        let sec_rounded = (sec * 100.0).round() / 100.0;

        Self {
            deg: deg_rounded,
            min: min_rounded,
            sec: sec_rounded,
            negative: deg_rounded < 0.0,
        }
    }

    pub const fn deg(&self) -> f64 {
        self.deg
    }

    pub const fn min(&self) -> f64 {
        self.min
    }

    pub const fn sec(&self) -> f64 {
        self.sec
    }

    pub const fn ns(&self) -> &'static str {
        if self.negative { "S" } else { "N" }
    }

    pub const fn ew(&self) -> &'static str {
        if self.negative { "W" } else { "E" }
    }

    /// `35° 40′ 52.45″` without hemisphere
    fn format_unsigned(&self) -> String {
        format!(
            "{}° {}′ {:.2}″",
            self.deg.abs().floor(),
            self.min.floor(),
            self.sec
        )
    }
}

/// `35° 40′ 52.45″ N 139° 45′ 58.92″ E`
pub fn format_position(lat: f64, lon: f64) -> String {
    let lat = MinSec::new(lat);
    let lon = MinSec::new(lon);
    format!(
        "{} {} {} {}",
        lat.format_unsigned(),
        lat.ns(),
        lon.format_unsigned(),
        lon.ew()
    )
}
