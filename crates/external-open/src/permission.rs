use tokio::sync::oneshot;

/// One-shot answer to an open-external permission request.
///
/// Dropping the responder without answering counts as a denial.
#[derive(Debug)]
pub struct PermissionResponder {
    tx: oneshot::Sender<bool>,
}

impl PermissionResponder {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn respond(self, allowed: bool) {
        // The requester may have gone away; nothing to deliver to then.
        let _ = self.tx.send(allowed);
    }

    pub fn allow(self) {
        self.respond(true);
    }

    pub fn deny(self) {
        self.respond(false);
    }
}

/// Permission decision point of a surface. Implementations may answer
/// immediately or hold on to the responder until the user decides.
pub trait PermissionHelper: Send + Sync {
    fn request_open_external_permission(
        &self,
        escaped_url: &str,
        has_user_gesture: bool,
        responder: PermissionResponder,
    );
}

impl<F> PermissionHelper for F
where
    F: Fn(&str, bool, PermissionResponder) + Send + Sync,
{
    fn request_open_external_permission(
        &self,
        escaped_url: &str,
        has_user_gesture: bool,
        responder: PermissionResponder,
    ) {
        (self)(escaped_url, has_user_gesture, responder)
    }
}

/// Answers every request the same way.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    allowed: bool,
}

impl StaticPermission {
    pub fn allow_all() -> Self {
        Self { allowed: true }
    }

    pub fn deny_all() -> Self {
        Self { allowed: false }
    }
}

impl PermissionHelper for StaticPermission {
    fn request_open_external_permission(
        &self,
        _escaped_url: &str,
        _has_user_gesture: bool,
        responder: PermissionResponder,
    ) {
        responder.respond(self.allowed);
    }
}
