//! The map session that navigation pushes views into.

use crate::crs::Crs;
use crate::theme::LayerState;
use crate::view_state::ViewState;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// The host map that views are read from and applied to.
pub trait MapSession: Send + Sync {
    /// CRS the map canvas works in; incoming views are transformed into it
    fn working_crs(&self) -> Crs;

    fn current_view(&self) -> impl Future<Output = ViewState> + Send;

    fn apply_view(&self, view: ViewState) -> impl Future<Output = ()> + Send;

    /// Switches to a named map theme; `false` if the project has no such theme
    fn apply_theme(&self, name: &str) -> impl Future<Output = bool> + Send;

    fn available_themes(&self) -> impl Future<Output = Vec<String>> + Send;

    /// Sets visibility, opacity and style per layer id; returns how many layers were set
    fn apply_layer_states(
        &self,
        states: &BTreeMap<String, LayerState>,
    ) -> impl Future<Output = usize> + Send;
}

/// Something changed in an [`InMemorySession`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ViewChanged(ViewState),
    ThemeChanged(String),
    LayerStatesChanged(BTreeMap<String, LayerState>),
}

#[derive(Debug)]
struct SessionState {
    view: ViewState,
    current_theme: Option<String>,
    themes: Vec<String>,
    layer_states: BTreeMap<String, LayerState>,
}

/// A session kept in memory and shared between handlers.
///
/// Cloning gives another handle to the same session.
#[derive(Debug, Clone)]
pub struct InMemorySession {
    working_crs: Crs,
    state: Arc<RwLock<SessionState>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl InMemorySession {
    pub fn new(working_crs: Crs, initial_view: ViewState, themes: Vec<String>) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            working_crs,
            state: Arc::new(RwLock::new(SessionState {
                view: initial_view,
                current_theme: None,
                themes,
                layer_states: BTreeMap::new(),
            })),
            event_tx,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub async fn current_theme(&self) -> Option<String> {
        self.state.read().await.current_theme.clone()
    }

    /// Last known state of every layer a permalink has touched
    pub async fn layer_states(&self) -> BTreeMap<String, LayerState> {
        self.state.read().await.layer_states.clone()
    }
}

impl MapSession for InMemorySession {
    fn working_crs(&self) -> Crs {
        self.working_crs
    }

    async fn current_view(&self) -> ViewState {
        self.state.read().await.view.clone()
    }

    async fn apply_view(&self, view: ViewState) {
        tracing::info!(
            "Applying view x={} y={} crs={} scale={} rotation={}",
            view.x,
            view.y,
            view.crs,
            view.scale,
            view.rotation
        );
        self.state.write().await.view = view.clone();
        let _ = self.event_tx.send(SessionEvent::ViewChanged(view));
    }

    async fn apply_theme(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.themes.iter().any(|theme| theme == name) {
            return false;
        }
        state.current_theme = Some(name.to_string());
        drop(state);
        tracing::info!("Applied map theme '{name}'");
        let _ = self
            .event_tx
            .send(SessionEvent::ThemeChanged(name.to_string()));
        true
    }

    async fn available_themes(&self) -> Vec<String> {
        self.state.read().await.themes.clone()
    }

    async fn apply_layer_states(&self, states: &BTreeMap<String, LayerState>) -> usize {
        if states.is_empty() {
            return 0;
        }
        let mut state = self.state.write().await;
        for (id, layer) in states {
            state.layer_states.insert(id.clone(), layer.clone());
        }
        drop(state);
        tracing::info!("Applied state of {} layer(s)", states.len());
        let _ = self
            .event_tx
            .send(SessionEvent::LayerStatesChanged(states.clone()));
        states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> InMemorySession {
        InMemorySession::new(
            Crs::WebMercator,
            ViewState::new(0.0, 0.0, Crs::WebMercator, 20_000.0),
            vec!["Day".to_string(), "Night".to_string()],
        )
    }

    #[tokio::test]
    async fn test_apply_view_and_notify() {
        let session = session();
        let mut events = session.subscribe_events();
        let view = ViewState::new(100.0, 200.0, Crs::WebMercator, 5_000.0);
        session.apply_view(view.clone()).await;

        assert_eq!(session.current_view().await, view);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::ViewChanged(view));
    }

    #[tokio::test]
    async fn test_apply_theme() {
        let session = session();
        assert!(session.apply_theme("Night").await);
        assert_eq!(session.current_theme().await.as_deref(), Some("Night"));
        assert!(!session.apply_theme("Sepia").await);
        assert_eq!(session.current_theme().await.as_deref(), Some("Night"));
    }

    #[tokio::test]
    async fn test_apply_layer_states() {
        let session = session();
        let mut events = session.subscribe_events();
        let layer = |name: &str, visible: bool, opacity: f64| LayerState {
            name: name.to_string(),
            visible,
            opacity,
            current_style: None,
        };

        let first: BTreeMap<String, LayerState> = [
            ("roads".to_string(), layer("Roads", true, 0.8)),
            ("rivers".to_string(), layer("Rivers", false, 1.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(session.apply_layer_states(&first).await, 2);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LayerStatesChanged(first.clone())
        );

        // Later states overwrite per layer and keep the others
        let second: BTreeMap<String, LayerState> =
            [("roads".to_string(), layer("Roads", false, 0.3))]
                .into_iter()
                .collect();
        assert_eq!(session.apply_layer_states(&second).await, 1);
        let stored = session.layer_states().await;
        assert_eq!(stored.len(), 2);
        assert!(!stored["roads"].visible);
        assert_eq!(stored["roads"].opacity, 0.3);
        assert!(!stored["rivers"].visible);

        assert_eq!(session.apply_layer_states(&BTreeMap::new()).await, 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = session();
        let other = session.clone();
        other
            .apply_view(ViewState::new(1.0, 2.0, Crs::WebMercator, 100.0))
            .await;
        assert_eq!(session.current_view().await.scale, 100.0);
        assert_eq!(session.available_themes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_send_without_subscribers() {
        // No receiver attached; applying must still succeed
        let session = session();
        session
            .apply_view(ViewState::new(1.0, 2.0, Crs::WebMercator, 100.0))
            .await;
        assert_eq!(session.current_view().await.x, 1.0);
    }
}
