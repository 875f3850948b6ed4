use std::sync::Arc;

use bytes::Bytes;
use external_open::{ExternalOpener, ExternalProtocolGate, PermissionHelper};
use stream_handoff::{NavigationError, StreamRegistry};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{info, trace};
use url::Url;
use zoom_bus::{HostZoomMap, ZoomBroadcastHub};

use crate::config::HostConfig;
use crate::context::PosterHandle;
use crate::dispatcher::ResourceDispatcher;
use crate::surface::{HeadlessSurface, Surface, SurfaceRegistry};
use crate::viewer::{BundledDataSource, ResourceError, SessionDeps, ViewerUiFactory};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid viewer origin: {0}")]
    InvalidOrigin(#[from] NavigationError),
    #[error("no MIME types configured for interception")]
    NoMimeTypes,
    #[error("viewer resources: {0}")]
    Resources(#[from] ResourceError),
}

/// Everything one host process shares: the stream registry, zoom state,
/// surfaces, the viewer UI resources, and the loading-side and viewer-side
/// entry points built on them.
pub struct ViewerHost {
    config: HostConfig,
    resources: BundledDataSource,
    registry: StreamRegistry,
    zoom: Arc<HostZoomMap>,
    surfaces: SurfaceRegistry,
    dispatcher: ResourceDispatcher,
    factory: ViewerUiFactory,
}

impl ViewerHost {
    pub fn new(
        config: HostConfig,
        consumption: PosterHandle,
        opener: Arc<dyn ExternalOpener>,
        runtime: Handle,
    ) -> Result<Self, HostError> {
        let viewer_origin = config.viewer_origin();
        viewer_origin.url()?;
        if config.mime_types.is_empty() {
            return Err(HostError::NoMimeTypes);
        }

        let registry = StreamRegistry::new();
        let hub = ZoomBroadcastHub::new();
        let zoom = Arc::new(HostZoomMap::with_default_level(
            hub.clone(),
            config.default_zoom_level,
        ));
        let dispatcher = ResourceDispatcher::new(
            config.interception_policy(),
            registry.clone(),
            consumption,
            ExternalProtocolGate::new(opener, runtime),
        );
        let factory = ViewerUiFactory::new(SessionDeps {
            registry: registry.clone(),
            zoom_levels: zoom.clone(),
            hub,
            viewer_origin: viewer_origin.clone(),
        });

        info!(
            viewer_origin = %viewer_origin,
            mime_types = ?config.mime_types,
            default_zoom_level = config.default_zoom_level,
            "viewer host ready"
        );

        Ok(Self {
            config,
            resources: BundledDataSource::builtin()?,
            registry,
            zoom,
            surfaces: SurfaceRegistry::new(),
            dispatcher,
            factory,
        })
    }

    /// Replaces the built-in viewer UI.
    pub fn with_resources(mut self, resources: BundledDataSource) -> Self {
        self.resources = resources;
        self
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn zoom(&self) -> &HostZoomMap {
        &self.zoom
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn dispatcher(&self) -> &ResourceDispatcher {
        &self.dispatcher
    }

    pub fn factory(&self) -> &ViewerUiFactory {
        &self.factory
    }

    /// Serves a viewer-origin request from the viewer UI resources. Requests
    /// for any other origin, or for unknown paths, get `None`.
    pub fn serve(&self, url: &Url) -> Option<(Bytes, &'static str)> {
        if !self.factory.uses_viewer_for_url(url) {
            trace!(%url, "not a viewer resource request");
            return None;
        }
        self.resources.serve(url.path())
    }

    /// Creates a headless surface and registers it. The caller holds the only
    /// strong reference.
    pub fn open_surface(&self, helper: Option<Arc<dyn PermissionHelper>>) -> Arc<HeadlessSurface> {
        let surface = Arc::new(HeadlessSurface::new(self.surfaces.allocate_id(), helper));
        let registered: Arc<dyn Surface> = surface.clone();
        self.surfaces.add(&registered);
        surface
    }
}
