use once_cell::sync::Lazy;
use regex::Regex;

/// Google Maps / Google Earth position segment: `@lat,lon[,<n>z|m|a]`
pub static RE_GOOGLE_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@\s*([-+]?[0-9]+(?:\.[0-9]+)?)\s*,\s*([-+]?[0-9]+(?:\.[0-9]+)?)(?:\s*,\s*([-+]?[0-9]+(?:\.[0-9]+)?)([zma])?)?")
        .expect("Invalid regex pattern")
});

/// Two or three decimal numbers separated by commas, semicolons or blanks
pub static RE_BARE_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?[0-9]+(?:\.[0-9]+)?)\s*[,; ]\s*([-+]?[0-9]+(?:\.[0-9]+)?)(?:\s*[,; ]\s*([-+]?[0-9]+(?:\.[0-9]+)?)\s*z?)?\s*$")
        .expect("Invalid regex pattern")
});

/// A number with a hemisphere letter glued to it, e.g. `35.68N`
pub static RE_GLUED_HEMISPHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)([NSEWnsew])$").expect("Invalid regex pattern")
});

/// `/place/<coordinates>` path segment of Google Maps links
pub static RE_PLACE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/place/([^/?#]+)").expect("Invalid regex pattern"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_at() {
        let caps = RE_GOOGLE_AT
            .captures("https://www.google.com/maps/@35.9118462,139.5876715,16z")
            .unwrap();
        assert_eq!(&caps[1], "35.9118462");
        assert_eq!(&caps[2], "139.5876715");
        assert_eq!(&caps[3], "16");
        assert_eq!(&caps[4], "z");

        let caps = RE_GOOGLE_AT.captures("/maps/@35.0,139.0,-5z").unwrap();
        assert_eq!(&caps[3], "-5");
    }

    #[test]
    fn test_bare_decimal() {
        assert!(RE_BARE_DECIMAL.is_match("35.68, 139.76"));
        assert!(RE_BARE_DECIMAL.is_match("35.68;139.76"));
        assert!(RE_BARE_DECIMAL.is_match("-33.86 151.2 12z"));
        assert!(!RE_BARE_DECIMAL.is_match("35.68"));
        assert!(!RE_BARE_DECIMAL.is_match("x=1&y=2"));
    }
}
