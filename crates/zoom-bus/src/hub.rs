use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use slab::Slab;
use tracing::trace;

use crate::ZoomLevelChange;

pub type ZoomListener = Arc<dyn Fn(&ZoomLevelChange) + Send + Sync>;

/// Publish/subscribe fan-out for zoom level changes.
///
/// Listeners live in an arena; each subscription owns its slot through a
/// [`ZoomSubscription`] token and the hub never holds on to subscribers past
/// the token's lifetime.
#[derive(Clone, Default)]
pub struct ZoomBroadcastHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    listeners: RwLock<Slab<ZoomListener>>,
}

impl ZoomBroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> ZoomSubscription
    where
        F: Fn(&ZoomLevelChange) + Send + Sync + 'static,
    {
        let slot = self.inner.listeners.write().insert(Arc::new(listener));
        trace!(slot, "zoom listener subscribed");
        ZoomSubscription {
            hub: Arc::downgrade(&self.inner),
            slot: Some(slot),
        }
    }

    /// Delivers `change` to every listener registered at the time of the call.
    /// Listeners run outside the lock, so they may subscribe or unsubscribe.
    pub fn publish(&self, change: &ZoomLevelChange) -> usize {
        let snapshot: Vec<ZoomListener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &snapshot {
            listener(change);
        }
        trace!(
            scheme = %change.scheme,
            host = %change.host,
            level = change.zoom_level,
            delivered = snapshot.len(),
            "zoom change published"
        );
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

/// Revocable registration with a [`ZoomBroadcastHub`]. Dropping the token
/// removes the listener.
pub struct ZoomSubscription {
    hub: Weak<HubInner>,
    slot: Option<usize>,
}

impl ZoomSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some() && self.hub.strong_count() > 0
    }

    fn release(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        if let Some(hub) = self.hub.upgrade() {
            let mut listeners = hub.listeners.write();
            if listeners.contains(slot) {
                listeners.remove(slot);
                trace!(slot, "zoom listener unsubscribed");
            }
        }
    }
}

impl Drop for ZoomSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ZoomSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomSubscription")
            .field("slot", &self.slot)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> impl Fn(&ZoomLevelChange) + Send + Sync {
        let counter = Arc::clone(counter);
        move |_change: &ZoomLevelChange| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn publish_reaches_each_listener_once() {
        let hub = ZoomBroadcastHub::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let _a = hub.subscribe(counting_listener(&first));
        let _b = hub.subscribe(counting_listener(&second));

        let delivered = hub.publish(&ZoomLevelChange::new("chrome", "pdf-viewer", 1.0));

        assert_eq!(delivered, 2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let hub = ZoomBroadcastHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let subscription = hub.subscribe(counting_listener(&count));
        assert_eq!(hub.subscriber_count(), 1);

        drop(subscription);
        hub.publish(&ZoomLevelChange::new("chrome", "pdf-viewer", 2.0));

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_leaves_other_listeners_alone() {
        let hub = ZoomBroadcastHub::new();
        let kept = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        let _kept = hub.subscribe(counting_listener(&kept));
        let gone = hub.subscribe(counting_listener(&removed));

        gone.unsubscribe();
        // A fresh subscriber may reuse the freed slot; it must not be affected
        // by the earlier token.
        let reused = Arc::new(AtomicUsize::new(0));
        let _reused = hub.subscribe(counting_listener(&reused));
        hub.publish(&ZoomLevelChange::new("https", "example.com", 0.5));

        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
        assert_eq!(reused.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_outliving_hub_is_inert() {
        let hub = ZoomBroadcastHub::new();
        let subscription = hub.subscribe(|_change: &ZoomLevelChange| {});
        assert!(subscription.is_active());
        drop(hub);
        assert!(!subscription.is_active());
        drop(subscription);
    }

    #[test]
    fn listener_can_unsubscribe_during_publish() {
        let hub = ZoomBroadcastHub::new();
        let slot: Arc<Mutex<Option<ZoomSubscription>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let slot = Arc::clone(&slot);
            let seen = Arc::clone(&seen);
            hub.subscribe(move |_change: &ZoomLevelChange| {
                seen.fetch_add(1, Ordering::SeqCst);
                slot.lock().unwrap().take();
            })
        };
        *slot.lock().unwrap() = Some(subscription);

        hub.publish(&ZoomLevelChange::new("chrome", "pdf-viewer", 1.0));
        hub.publish(&ZoomLevelChange::new("chrome", "pdf-viewer", 2.0));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
