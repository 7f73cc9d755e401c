use crate::{
    config::{ServerConfig, find_available_port},
    crs::Crs,
    dms,
    encode::PermalinkEncoder,
    error::PermalinkError,
    external::ExternalLinks,
    navigator::{NavigationOutcome, Navigator},
    scale_zoom,
    session::{InMemorySession, MapSession},
    templates::{Page, TemplateValues},
    transform::{CoordinateTransformer, Proj4Transformer},
    view_state::ViewState,
};
use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, Uri, header::CONTENT_TYPE},
    response::{AppendHeaders, Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

pub type AppNavigator = Navigator<InMemorySession, Proj4Transformer>;

const ENDPOINTS: &[(&str, &str)] = &[
    ("/", "This page"),
    (
        "/qgis-map?x=&y=&scale=&crs=&rotation=&theme=",
        "Move the map to a permalink",
    ),
    ("/navigate?url=", "Move the map to any supported link"),
    (
        "/permalink?width=&height=",
        "Permalink of the current view, with its extent for a viewer size",
    ),
    ("/status", "Server status"),
];

#[derive(Debug, Clone)]
pub struct AppState {
    navigator: AppNavigator,
    encoder: PermalinkEncoder,
    port: u16,
}

impl AppState {
    pub const fn new(navigator: AppNavigator, encoder: PermalinkEncoder, port: u16) -> Self {
        Self {
            navigator,
            encoder,
            port,
        }
    }

    pub const fn navigator(&self) -> &AppNavigator {
        &self.navigator
    }

    fn example_link(&self) -> String {
        let view = ViewState::new(0.0, 0.0, Crs::WebMercator, scale_zoom::DEFAULT_SCALE);
        self.encoder.encode(&view)
    }
}

#[derive(Debug, Deserialize)]
struct NavigateParams {
    url: Option<String>,
}

/// Viewer size in pixels
#[derive(Debug, Default, Deserialize)]
struct ViewportParams {
    width: Option<u32>,
    height: Option<u32>,
}

impl ViewportParams {
    fn from_query(params: &HashMap<String, String>) -> Self {
        let read = |key: &str| params.get(key).and_then(|v| v.trim().parse::<u32>().ok());
        Self {
            width: read("width"),
            height: read("height"),
        }
    }

    /// Extent of `view` in such a viewer; geographic views are measured in Web Mercator
    fn bbox(&self, view: &ViewState, transformer: &dyn CoordinateTransformer) -> Option<BboxBody> {
        let (width, height) = (self.width?, self.height?);
        if width == 0 || height == 0 {
            return None;
        }
        let view = if view.crs.is_geographic() {
            view.to_crs(transformer, Crs::WebMercator).ok()?
        } else {
            view.clone()
        };
        let (minx, miny, maxx, maxy) = view.bbox(width, height);
        Some(BboxBody {
            bbox: [minx, miny, maxx, maxy],
            bbox_crs: view.crs.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct BboxBody {
    bbox: [f64; 4],
    bbox_crs: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ErrorBody {
    fn response(err: &PermalinkError) -> Response {
        let body = Self {
            error: err.to_string(),
            kind: err.kind(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// View fields as they appear in JSON answers
#[derive(Debug, Serialize)]
struct ViewBody {
    x: f64,
    y: f64,
    crs: String,
    scale: f64,
    rotation: f64,
    zoom: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<String>,
}

impl ViewBody {
    fn new(view: &ViewState, zoom: f64) -> Self {
        Self {
            x: view.x,
            y: view.y,
            crs: view.crs.to_string(),
            scale: view.scale,
            rotation: view.rotation,
            zoom,
            theme: view.theme.as_ref().map(|t| t.to_param()),
        }
    }
}

#[derive(Debug, Serialize)]
struct NavigateBody {
    shape: String,
    #[serde(flatten)]
    view: ViewBody,
    theme_applied: bool,
    layers_applied: usize,
    permalink: String,
}

#[derive(Debug, Serialize)]
struct PermalinkBody {
    permalink: String,
    #[serde(flatten)]
    view: ViewBody,
    #[serde(flatten)]
    links: Option<ExternalLinks>,
    #[serde(flatten)]
    extent: Option<BboxBody>,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    running: bool,
    port: u16,
    working_crs: String,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct NotFoundBody {
    error: String,
    endpoints: Vec<&'static str>,
}

#[axum::debug_handler]
async fn main_css() -> impl IntoResponse {
    (
        AppendHeaders([(CONTENT_TYPE, "text/css")]),
        include_str!("../data/main.css"),
    )
}

#[axum::debug_handler]
async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let endpoints = ENDPOINTS
        .iter()
        .map(|(path, description)| {
            format!(
                "<li><code>{}</code> {}</li>",
                html_escape::encode_text(path),
                html_escape::encode_text(description)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let values = TemplateValues::new()
        .text("version", env!("CARGO_PKG_VERSION"))
        .text("port", state.port.to_string())
        .text("working_crs", state.navigator.session().working_crs().to_string())
        .text("example", state.example_link())
        .html("endpoints", endpoints);
    let html = Page::Index
        .render(&values)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Html(html))
}

fn error_page(state: &AppState, err: &PermalinkError) -> Response {
    let values = TemplateValues::new()
        .text("message", err.to_string())
        .text("kind", err.kind())
        .text("example", state.example_link());
    match Page::Error.render(&values) {
        Ok(html) => (StatusCode::BAD_REQUEST, Html(html)).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn navigated_page(
    state: &AppState,
    outcome: &NavigationOutcome,
    viewport: &ViewportParams,
) -> Result<String> {
    let view = &outcome.view;
    let transformer = state.navigator.transformer();
    let position = match view.lat_lon(transformer) {
        Ok((lat, lon)) => dms::format_position(lat, lon),
        Err(_) => format!("{}, {} ({})", view.x, view.y, view.crs),
    };
    let links = ExternalLinks::new(view, transformer).ok();
    let theme = view
        .theme
        .as_ref()
        .and_then(|t| t.theme_name())
        .unwrap_or("-");
    let bbox = match viewport.bbox(view, transformer) {
        Some(extent) => {
            let [minx, miny, maxx, maxy] = extent.bbox;
            format!("{minx:.3},{miny:.3},{maxx:.3},{maxy:.3} ({})", extent.bbox_crs)
        }
        None => "-".to_string(),
    };

    let values = TemplateValues::new()
        .text("position", position)
        .text("x", view.x.to_string())
        .text("y", view.y.to_string())
        .text("crs", view.crs.to_string())
        .text("scale", view.scale.round().to_string())
        .text("zoom", format!("{:.1}", outcome.zoom))
        .text("rotation", view.rotation.to_string())
        .text("theme", theme)
        .text("bbox", bbox)
        .text("permalink", state.encoder.encode(view))
        .text(
            "google_maps",
            links.as_ref().map_or("#", |l| l.google_maps.as_str()),
        )
        .text(
            "google_earth",
            links.as_ref().map_or("#", |l| l.google_earth.as_str()),
        );
    Page::Navigated.render(&values)
}

#[axum::debug_handler]
async fn qgis_map(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let viewport = ViewportParams::from_query(&params);
    match state.navigator.navigate_query(&params).await {
        Ok(outcome) => match navigated_page(&state, &outcome, &viewport) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!("Could not render page: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(err) => error_page(&state, &err),
    }
}

#[axum::debug_handler]
async fn navigate(
    State(state): State<AppState>,
    Query(params): Query<NavigateParams>,
) -> Response {
    let url = params.url.unwrap_or_default();
    match state.navigator.navigate_to(&url).await {
        Ok(outcome) => Json(NavigateBody {
            shape: outcome.shape.to_string(),
            view: ViewBody::new(&outcome.view, outcome.zoom),
            theme_applied: outcome.theme_applied,
            layers_applied: outcome.layers_applied,
            permalink: state.encoder.encode(&outcome.view),
        })
        .into_response(),
        Err(err) => ErrorBody::response(&err),
    }
}

#[axum::debug_handler]
async fn permalink(
    State(state): State<AppState>,
    Query(viewport): Query<ViewportParams>,
) -> impl IntoResponse {
    let view = state.navigator.session().current_view().await;
    let links = state.navigator.external_links().await.ok();
    let extent = viewport.bbox(&view, state.navigator.transformer());
    Json(PermalinkBody {
        permalink: state.encoder.encode(&view),
        view: ViewBody::new(&view, view.zoom()),
        links,
        extent,
    })
}

#[axum::debug_handler]
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusBody {
        running: true,
        port: state.port,
        working_crs: state.navigator.session().working_crs().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            error: format!("No such endpoint: {}", uri.path()),
            endpoints: ENDPOINTS.iter().map(|(path, _)| *path).collect(),
        }),
    )
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/main.css", get(main_css))
        .route("/qgis-map", get(qgis_map))
        .route("/navigate", get(navigate))
        .route("/permalink", get(permalink))
        .route("/status", get(status))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = find_available_port(config.bind, config.port, config.port_range_end)?;
    if port != config.port {
        tracing::warn!("Port {} is taken, using {port}", config.port);
    }

    let initial_view = ViewState::new(0.0, 0.0, config.working_crs, scale_zoom::DEFAULT_SCALE);
    let session = InMemorySession::new(config.working_crs, initial_view, config.themes.clone());
    let navigator = Navigator::new(session, Proj4Transformer);
    let encoder = PermalinkEncoder::for_host(&config.public_host(port));
    let app = create_router(AppState::new(navigator, encoder, port));

    tracing::info!("Starting server on http://{}:{port}", config.bind);

    let addr = SocketAddr::from((config.bind, port));
    tracing::debug!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn spawn_server(working_crs: Crs) -> (String, AppState) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = InMemorySession::new(
            working_crs,
            ViewState::new(0.0, 0.0, working_crs, 20_000.0),
            vec!["Night".to_string()],
        );
        let state = AppState::new(
            Navigator::new(session, Proj4Transformer),
            PermalinkEncoder::for_host(&format!("localhost:{port}")),
            port,
        );
        let app = create_router(state.clone());
        tokio::spawn(async move { axum::serve(listener, app).await });
        (format!("http://127.0.0.1:{port}"), state)
    }

    #[tokio::test]
    async fn test_status() {
        let (base, state) = spawn_server(Crs::WebMercator).await;
        let response = reqwest::get(format!("{base}/status")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["running"], true);
        assert_eq!(body["port"], state.port);
        assert_eq!(body["working_crs"], "EPSG:3857");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (base, _) = spawn_server(Crs::WebMercator).await;
        let html = reqwest::get(format!("{base}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("<code>/navigate?url=</code>"));
        assert!(html.contains("EPSG:3857"));
    }

    #[tokio::test]
    async fn test_qgis_map_moves_session() {
        let (base, state) = spawn_server(Crs::WebMercator).await;
        let response = reqwest::Client::new()
            .get(format!(
                "{base}/qgis-map?x=15558805.18&y=4256848.12&scale=10000&crs=EPSG:3857&rotation=0&theme=Night"
            ))
            .header("origin", "http://example.org")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        let html = response.text().await.unwrap();
        assert!(html.contains("35° 40′ 52.45″ N"));
        assert!(html.contains("https://www.google.co.jp/maps/@35.681236,139.767125,16z"));

        let view = state.navigator().session().current_view().await;
        assert_eq!(view.scale, 10_000.0);
        assert_eq!(
            state.navigator().session().current_theme().await.as_deref(),
            Some("Night")
        );
    }

    #[tokio::test]
    async fn test_qgis_map_error_page() {
        let (base, state) = spawn_server(Crs::WebMercator).await;
        let response = reqwest::get(format!("{base}/qgis-map?x=abc&y=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let html = response.text().await.unwrap();
        assert!(html.contains("invalid_number"));
        assert_eq!(state.navigator().session().current_view().await.x, 0.0);
    }

    #[tokio::test]
    async fn test_navigate_google_link() {
        let (base, _) = spawn_server(Crs::Wgs84).await;
        let url = urlencoding::encode("https://www.google.com/maps/@35.681236,139.767125,16z");
        let response = reqwest::get(format!("{base}/navigate?url={url}"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["shape"], "google_maps");
        assert_eq!(body["crs"], "EPSG:4326");
        assert_eq!(body["zoom"], 16.0);
        assert_eq!(body["scale"], 10_000.0);
        assert!(
            body["permalink"]
                .as_str()
                .unwrap()
                .contains("/qgis-map?x=139.76712500&y=35.68123600")
        );
    }

    #[tokio::test]
    async fn test_navigate_errors() {
        let (base, _) = spawn_server(Crs::WebMercator).await;
        let response = reqwest::get(format!("{base}/navigate?url=nowhere%20special"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "unrecognized_input");

        let body: Value = reqwest::get(format!("{base}/navigate"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["kind"], "empty_input");
    }

    #[tokio::test]
    async fn test_permalink_reflects_navigation() {
        let (base, _) = spawn_server(Crs::Wgs84).await;
        reqwest::get(format!("{base}/navigate?url=35.5,139.5,12"))
            .await
            .unwrap();
        let body: Value = reqwest::get(format!("{base}/permalink"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["crs"], "EPSG:4326");
        assert_eq!(body["scale"], 150_000.0);
        assert_eq!(
            body["google_maps"],
            "https://www.google.co.jp/maps/@35.500000,139.500000,12z"
        );
        assert!(
            body["permalink"]
                .as_str()
                .unwrap()
                .ends_with("/qgis-map?x=139.50000000&y=35.50000000&scale=150000&crs=EPSG:4326&rotation=0")
        );
    }

    #[tokio::test]
    async fn test_permalink_bbox_for_viewer_size() {
        let (base, _) = spawn_server(Crs::WebMercator).await;
        reqwest::get(format!("{base}/qgis-map?x=1000&y=2000&scale=10000&crs=EPSG:3857"))
            .await
            .unwrap();
        let body: Value = reqwest::get(format!("{base}/permalink?width=960&height=480"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["bbox_crs"], "EPSG:3857");
        let bbox: Vec<f64> = body["bbox"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        // 960 px at 96 dpi is 0.254 m of screen, 2540 m at 1:10000
        for (got, want) in bbox.iter().zip([-270.0, 1365.0, 2270.0, 2635.0]) {
            assert!((got - want).abs() < 1e-6, "{bbox:?}");
        }

        let body: Value = reqwest::get(format!("{base}/permalink"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body.get("bbox").is_none());
    }

    #[tokio::test]
    async fn test_qgis_map_shows_bbox() {
        let (base, _) = spawn_server(Crs::WebMercator).await;
        let html = reqwest::get(format!(
            "{base}/qgis-map?x=1000&y=2000&scale=10000&crs=EPSG:3857&width=960&height=480"
        ))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
        assert!(html.contains("-270.000,1365.000,2270.000,2635.000 (EPSG:3857)"), "{html}");
    }

    #[tokio::test]
    async fn test_navigate_reports_layers() {
        let (base, state) = spawn_server(Crs::WebMercator).await;
        let theme = r#"{"current_theme":"Night","layer_states":{"roads":{"name":"Roads","visible":false,"opacity":0.5}}}"#;
        let link = format!("/qgis-map?x=1&y=2&theme={}", urlencoding::encode(theme));
        let body: Value = reqwest::get(format!("{base}/navigate?url={}", urlencoding::encode(&link)))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["theme_applied"], true);
        assert_eq!(body["layers_applied"], 1);
        let layers = state.navigator().session().layer_states().await;
        assert!(!layers["roads"].visible);
    }

    #[tokio::test]
    async fn test_not_found_lists_endpoints() {
        let (base, _) = spawn_server(Crs::WebMercator).await;
        let response = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "No such endpoint: /nope");
        assert!(
            body["endpoints"]
                .as_array()
                .unwrap()
                .iter()
                .any(|e| e == "/status")
        );
    }
}
