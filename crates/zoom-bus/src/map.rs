use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::{ZoomBroadcastHub, ZoomLevelChange};

/// Read access to the current zoom levels, as seen by a surface.
pub trait ZoomLevelSource: Send + Sync {
    /// Level applied to content served from `scheme://host`.
    fn zoom_level(&self, scheme: &str, host: &str) -> f64;
    /// Level used for origins with no explicit setting.
    fn default_zoom_level(&self) -> f64;
}

/// Zoom levels keyed by `(scheme, host)`, publishing every change on its hub.
pub struct HostZoomMap {
    levels: RwLock<HashMap<(String, String), f64>>,
    default_level: RwLock<f64>,
    hub: ZoomBroadcastHub,
}

impl HostZoomMap {
    pub fn new(hub: ZoomBroadcastHub) -> Self {
        Self::with_default_level(hub, 0.0)
    }

    pub fn with_default_level(hub: ZoomBroadcastHub, default_level: f64) -> Self {
        Self {
            levels: RwLock::new(HashMap::new()),
            default_level: RwLock::new(default_level),
            hub,
        }
    }

    pub fn hub(&self) -> &ZoomBroadcastHub {
        &self.hub
    }

    pub fn set_zoom_level_for_scheme_and_host(&self, scheme: &str, host: &str, level: f64) {
        self.levels
            .write()
            .insert((scheme.to_string(), host.to_string()), level);
        debug!(scheme, host, level, "zoom level updated");
        self.hub.publish(&ZoomLevelChange::new(scheme, host, level));
    }

    pub fn clear_zoom_level_for_scheme_and_host(&self, scheme: &str, host: &str) {
        let removed = self
            .levels
            .write()
            .remove(&(scheme.to_string(), host.to_string()));
        if removed.is_some() {
            let level = self.default_zoom_level();
            self.hub.publish(&ZoomLevelChange::new(scheme, host, level));
        }
    }

    pub fn set_default_zoom_level(&self, level: f64) {
        *self.default_level.write() = level;
        debug!(level, "default zoom level updated");
    }
}

impl ZoomLevelSource for HostZoomMap {
    fn zoom_level(&self, scheme: &str, host: &str) -> f64 {
        self.levels
            .read()
            .get(&(scheme.to_string(), host.to_string()))
            .copied()
            .unwrap_or_else(|| self.default_zoom_level())
    }

    fn default_zoom_level(&self) -> f64 {
        *self.default_level.read()
    }
}
