use crate::view_state::{ViewState, normalize_rotation};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8089";
pub const DEFAULT_ENDPOINT: &str = "/qgis-map";

/// Writes views as permalink URLs of the form
/// `{base_url}{endpoint}?x=..&y=..&scale=..&crs=..&rotation=..[&theme=..]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermalinkEncoder {
    base_url: String,
    endpoint: String,
}

impl Default for PermalinkEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_ENDPOINT)
    }
}

impl PermalinkEncoder {
    pub fn new(base_url: &str, endpoint: &str) -> Self {
        let endpoint = endpoint.trim();
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            endpoint,
        }
    }

    /// Encoder for links served by this process at `host` (e.g. `localhost:8089`)
    pub fn for_host(host: &str) -> Self {
        Self::new(&format!("http://{host}"), DEFAULT_ENDPOINT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The query string only, without `?`
    pub fn query(&self, view: &ViewState) -> String {
        let precision = view.crs.coordinate_precision();
        let mut query = format!(
            "x={:.*}&y={:.*}&scale={}&crs={}&rotation={}",
            precision,
            view.x,
            precision,
            view.y,
            view.scale,
            view.crs,
            normalize_rotation(view.rotation)
        );
        if let Some(theme) = &view.theme {
            query.push_str("&theme=");
            query.push_str(&urlencoding::encode(&theme.to_param()));
        }
        query
    }

    pub fn encode(&self, view: &ViewState) -> String {
        format!("{}{}?{}", self.base_url, self.endpoint, self.query(view))
    }
}
