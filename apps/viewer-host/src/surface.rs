use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use external_open::PermissionHelper;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// A rendering surface that can be navigated and asked for permissions.
pub trait Surface: Send + Sync {
    fn id(&self) -> SurfaceId;
    fn load_url(&self, url: &Url);
    /// `None` when the surface has no one to ask, which gates treat like a
    /// surface that is gone.
    fn permission_helper(&self) -> Option<Arc<dyn PermissionHelper>>;
}

/// Tracks live surfaces without keeping them alive.
#[derive(Clone, Default)]
pub struct SurfaceRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    surfaces: RwLock<HashMap<SurfaceId, Weak<dyn Surface>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&self) -> SurfaceId {
        SurfaceId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn add(&self, surface: &Arc<dyn Surface>) {
        let id = surface.id();
        self.inner
            .surfaces
            .write()
            .insert(id, Arc::downgrade(surface));
        debug!(surface = %id, "surface registered");
    }

    pub fn remove(&self, id: SurfaceId) -> bool {
        let removed = self.inner.surfaces.write().remove(&id).is_some();
        if removed {
            debug!(surface = %id, "surface removed");
        }
        removed
    }

    pub fn get(&self, id: SurfaceId) -> Option<Arc<dyn Surface>> {
        let surface = self.inner.surfaces.read().get(&id).and_then(Weak::upgrade);
        if surface.is_none() {
            // Drop the stale slot left behind by a surface that was never removed.
            let mut surfaces = self.inner.surfaces.write();
            if surfaces.get(&id).is_some_and(|weak| weak.strong_count() == 0) {
                surfaces.remove(&id);
                trace!(surface = %id, "pruned dead surface");
            }
        }
        surface
    }

    pub fn live_count(&self) -> usize {
        self.inner
            .surfaces
            .read()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Handle that resolves the surface lazily, at the moment work for it
    /// actually runs.
    pub fn getter(&self, id: SurfaceId) -> SurfaceGetter {
        SurfaceGetter {
            id,
            registry: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SurfaceGetter {
    id: SurfaceId,
    registry: SurfaceRegistry,
}

impl SurfaceGetter {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn resolve(&self) -> Option<Arc<dyn Surface>> {
        self.registry.get(self.id)
    }
}

impl fmt::Debug for SurfaceGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SurfaceGetter").field(&self.id).finish()
    }
}

/// Surface without a renderer: remembers where it was sent and answers
/// permission requests through an optional helper.
pub struct HeadlessSurface {
    id: SurfaceId,
    helper: Option<Arc<dyn PermissionHelper>>,
    loaded: Mutex<Vec<Url>>,
}

impl HeadlessSurface {
    pub fn new(id: SurfaceId, helper: Option<Arc<dyn PermissionHelper>>) -> Self {
        Self {
            id,
            helper,
            loaded: Mutex::new(Vec::new()),
        }
    }

    pub fn loaded_urls(&self) -> Vec<Url> {
        self.loaded.lock().clone()
    }

    pub fn last_loaded(&self) -> Option<Url> {
        self.loaded.lock().last().cloned()
    }
}

impl Surface for HeadlessSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn load_url(&self, url: &Url) {
        debug!(surface = %self.id, url = %url, "surface navigating");
        self.loaded.lock().push(url.clone());
    }

    fn permission_helper(&self) -> Option<Arc<dyn PermissionHelper>> {
        self.helper.clone()
    }
}
