use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Unit of work posted across execution contexts.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub type PosterHandle = Arc<dyn TaskPoster>;

/// One-directional posting into an execution context. There is no return
/// channel; replies travel as separately posted tasks.
pub trait TaskPoster: Send + Sync {
    fn post(&self, task: Task);
}

/// Execution context backed by a tokio task that runs posted work one item
/// at a time, in post order.
#[derive(Clone)]
pub struct SerialContext {
    name: &'static str,
    tx: mpsc::UnboundedSender<Task>,
}

impl SerialContext {
    pub fn spawn(name: &'static str, runtime: &Handle) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        let worker = runtime.spawn(async move {
            debug!(context = name, "context started");
            while let Some(task) = rx.recv().await {
                task();
            }
            debug!(context = name, "context drained");
        });
        (Self { name, tx }, worker)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Resolves once every task posted before this call has run.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.post(Box::new(move || {
            let _ = done_tx.send(());
        }));
        let _ = done_rx.await;
    }
}

impl TaskPoster for SerialContext {
    fn post(&self, task: Task) {
        if self.tx.send(task).is_err() {
            warn!(context = self.name, "context stopped; dropping task");
        }
    }
}

/// Context that only runs work when told to. Used where ordering has to be
/// driven step by step.
#[derive(Default)]
pub struct ManualContext {
    queue: Mutex<VecDeque<Task>>,
}

impl ManualContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs the oldest queued task, if any.
    pub fn run_one(&self) -> bool {
        // Pop before running so the task may post follow-up work.
        let next = self.queue.lock().pop_front();
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks, including ones posted while running, until the queue is
    /// empty. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl TaskPoster for ManualContext {
    fn post(&self, task: Task) {
        self.queue.lock().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Task {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(value))
    }

    #[tokio::test]
    async fn serial_context_runs_in_post_order() {
        let (context, _worker) = SerialContext::spawn("consumption", &Handle::current());
        let log = Arc::new(Mutex::new(Vec::new()));
        for value in 0..16 {
            context.post(recorder(&log, value));
        }
        context.flush().await;
        assert_eq!(*log.lock(), (0..16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn serial_context_stops_when_every_poster_is_gone() {
        let (context, worker) = SerialContext::spawn("consumption", &Handle::current());
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        context.post(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        drop(context);
        tokio::time::timeout(std::time::Duration::from_secs(2), worker)
            .await
            .expect("worker exits")
            .expect("worker join");
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_context_waits_to_be_driven() {
        let context = Arc::new(ManualContext::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        context.post(recorder(&log, 1));
        assert!(log.lock().is_empty());
        assert_eq!(context.pending(), 1);

        let nested = {
            let context = Arc::clone(&context);
            let log = Arc::clone(&log);
            Box::new(move || {
                log.lock().push(2);
                context.post(recorder(&log, 3));
            })
        };
        context.post(nested);

        assert_eq!(context.run_until_idle(), 3);
        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert!(!context.run_one());
    }
}
