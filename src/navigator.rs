//! Dispatches incoming links to the map session.

use crate::decode::{self, Decoded, UrlShape};
use crate::encode::PermalinkEncoder;
use crate::error::{PermalinkError, PermalinkResult};
use crate::external::ExternalLinks;
use crate::session::MapSession;
use crate::theme::ThemeToken;
use crate::transform::CoordinateTransformer;
use crate::view_state::ViewState;
use std::collections::HashMap;

/// What a navigation did to the session
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOutcome {
    /// The applied view, in the session's working CRS
    pub view: ViewState,
    pub shape: UrlShape,
    pub zoom: f64,
    pub theme_applied: bool,
    /// Number of layers whose visibility, opacity or style was set
    pub layers_applied: usize,
}

#[derive(Debug, Clone)]
pub struct Navigator<S, T> {
    session: S,
    transformer: T,
}

impl<S: MapSession, T: CoordinateTransformer> Navigator<S, T> {
    pub const fn new(session: S, transformer: T) -> Self {
        Self {
            session,
            transformer,
        }
    }

    pub const fn session(&self) -> &S {
        &self.session
    }

    pub const fn transformer(&self) -> &T {
        &self.transformer
    }

    /// Decodes any supported URL or coordinate text and moves the map there.
    pub async fn navigate_to(&self, input: &str) -> PermalinkResult<NavigationOutcome> {
        let decoded = decode::decode(input).inspect_err(|e| {
            tracing::warn!("Could not decode '{input}': {e}");
        })?;
        self.apply(decoded).await
    }

    /// Like [`Self::navigate_to`], for query parameters of an internal link.
    pub async fn navigate_query(
        &self,
        params: &HashMap<String, String>,
    ) -> PermalinkResult<NavigationOutcome> {
        let decoded = match decode::decode_query(params) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                let missing = missing_key(params);
                return Err(PermalinkError::MissingParameter(missing.to_string()));
            }
            Err(e) => {
                tracing::warn!("Could not decode query {params:?}: {e}");
                return Err(e);
            }
        };
        self.apply(decoded).await
    }

    async fn apply(&self, decoded: Decoded) -> PermalinkResult<NavigationOutcome> {
        let Decoded { view, shape, zoom } = decoded;
        let view = view.to_crs(&self.transformer, self.session.working_crs())?;

        let mut theme_applied = false;
        if let Some(name) = view.theme.as_ref().and_then(|t| t.theme_name()) {
            let known = self.session.available_themes().await;
            if known.iter().any(|theme| theme == name) {
                theme_applied = self.session.apply_theme(name).await;
            } else {
                tracing::warn!("Unknown map theme '{name}', layers left unchanged");
            }
        }

        let mut layers_applied = 0;
        if let Some(ThemeToken::State(state)) = &view.theme {
            layers_applied = self.session.apply_layer_states(&state.layer_states).await;
        }

        self.session.apply_view(view.clone()).await;
        Ok(NavigationOutcome {
            view,
            shape,
            zoom,
            theme_applied,
            layers_applied,
        })
    }

    /// Permalink for whatever the session currently shows
    pub async fn current_permalink(&self, encoder: &PermalinkEncoder) -> String {
        encoder.encode(&self.session.current_view().await)
    }

    pub async fn external_links(&self) -> PermalinkResult<ExternalLinks> {
        let view = self.session.current_view().await;
        ExternalLinks::new(&view, &self.transformer)
    }
}

/// The internal key a query lacks, judged by which half of a pair it has
fn missing_key(params: &HashMap<String, String>) -> &'static str {
    let has = |key: &str| params.contains_key(key);
    if has("lat") && !has("lon") && !has("lng") {
        "lon"
    } else if (has("lon") || has("lng")) && !has("lat") {
        "lat"
    } else if has("x") {
        "y"
    } else {
        "x"
    }
}
