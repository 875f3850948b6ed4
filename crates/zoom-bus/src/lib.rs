//! Host-wide zoom state shared by every surface.
//!
//! Zoom is tracked as an additive *level* and applied as a multiplicative
//! *factor*; the two are related by `factor = ZOOM_FACTOR_BASE ^ level`.
//! Changes are published per `(scheme, host)` on a [`ZoomBroadcastHub`], which
//! multiplexes unrelated surfaces, so consumers filter on the origin they care
//! about.

mod hub;
mod map;

pub use hub::{ZoomBroadcastHub, ZoomListener, ZoomSubscription};
pub use map::{HostZoomMap, ZoomLevelSource};

/// Multiplicative step between two adjacent zoom levels.
pub const ZOOM_FACTOR_BASE: f64 = 1.2;

const ZOOM_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomLevelChange {
    pub scheme: String,
    pub host: String,
    pub zoom_level: f64,
}

impl ZoomLevelChange {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, zoom_level: f64) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            zoom_level,
        }
    }

    pub fn is_for(&self, scheme: &str, host: &str) -> bool {
        self.scheme == scheme && self.host == host
    }

    pub fn zoom_factor(&self) -> f64 {
        zoom_level_to_factor(self.zoom_level)
    }
}

pub fn zoom_level_to_factor(level: f64) -> f64 {
    ZOOM_FACTOR_BASE.powf(level)
}

pub fn zoom_factor_to_level(factor: f64) -> f64 {
    factor.ln() / ZOOM_FACTOR_BASE.ln()
}

/// Compares zoom values with the tolerance used for user-facing zoom steps.
pub fn zoom_values_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= ZOOM_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_is_identity() {
        assert_eq!(zoom_level_to_factor(0.0), 1.0);
    }

    #[test]
    fn level_steps_scale_by_base() {
        assert!(zoom_values_equal(zoom_level_to_factor(1.0), 1.2));
        assert!(zoom_values_equal(zoom_level_to_factor(2.0), 1.44));
        assert!(zoom_values_equal(zoom_level_to_factor(-1.0), 1.0 / 1.2));
    }

    #[test]
    fn factor_to_level_inverts_conversion() {
        for level in [-3.0, -0.5, 0.0, 0.25, 4.0] {
            let factor = zoom_level_to_factor(level);
            assert!(zoom_values_equal(zoom_factor_to_level(factor), level));
        }
    }

    #[test]
    fn change_matches_exact_origin_only() {
        let change = ZoomLevelChange::new("chrome", "pdf-viewer", 1.0);
        assert!(change.is_for("chrome", "pdf-viewer"));
        assert!(!change.is_for("chrome", "other"));
        assert!(!change.is_for("https", "pdf-viewer"));
    }
}
