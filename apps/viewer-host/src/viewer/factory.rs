use tracing::debug;
use url::Url;

use super::session::{EventSink, SessionDeps, ViewerSession};

/// Decides which navigations get a viewer and builds their sessions.
#[derive(Clone)]
pub struct ViewerUiFactory {
    deps: SessionDeps,
}

impl ViewerUiFactory {
    pub fn new(deps: SessionDeps) -> Self {
        Self { deps }
    }

    pub fn uses_viewer_for_url(&self, url: &Url) -> bool {
        self.deps.viewer_origin.is_viewer_url(url)
    }

    /// `None` for URLs outside the viewer origin.
    pub fn create_session(&self, url: &Url, events: EventSink) -> Option<ViewerSession> {
        if !self.uses_viewer_for_url(url) {
            return None;
        }
        debug!(url = %url, "creating viewer session");
        Some(ViewerSession::open(url, self.deps.clone(), events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stream_handoff::{StreamRegistry, ViewerOrigin};
    use tokio::sync::mpsc;
    use zoom_bus::{HostZoomMap, ZoomBroadcastHub};

    fn factory() -> ViewerUiFactory {
        let hub = ZoomBroadcastHub::new();
        ViewerUiFactory::new(SessionDeps {
            registry: StreamRegistry::new(),
            zoom_levels: Arc::new(HostZoomMap::new(hub.clone())),
            hub,
            viewer_origin: ViewerOrigin::default(),
        })
    }

    #[test]
    fn matches_scheme_and_host_only() {
        let factory = factory();
        for url in [
            "chrome://pdf-viewer/index.html",
            "chrome://pdf-viewer/main.js?x=1",
        ] {
            assert!(factory.uses_viewer_for_url(&Url::parse(url).unwrap()), "{url}");
        }
        for url in [
            "chrome://settings/",
            "https://pdf-viewer/index.html",
            "https://example.com/a.pdf",
        ] {
            assert!(!factory.uses_viewer_for_url(&Url::parse(url).unwrap()), "{url}");
        }
    }

    #[test]
    fn foreign_urls_get_no_session() {
        let factory = factory();
        let (events, _rx) = mpsc::unbounded_channel();
        let url = Url::parse("https://example.com/index.html?streamURL=k").unwrap();
        assert!(factory.create_session(&url, events).is_none());
    }
}
