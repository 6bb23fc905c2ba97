//! Tracking of concurrently running download queues.
//!
//! Queues never touch shared coordinator state. Their listener callbacks only
//! send a message on a channel; one dedicated thread receives those messages
//! and is the sole owner of the set of active queues. That thread turns queue
//! notifications into [`CoordinatorEvent`]s for the owner:
//!
//! ```text
//! DownloadQueue workers ──► CoordinatorListener ──► mpsc ──► coordinator thread
//!                                                              │ owns QueueSet
//!                                                              ▼
//!                              QueueCoordinator::wait_for_completion ◄── events
//! ```
//!
//! A queue is registered before its handle is returned from
//! [`QueueSubmitter::submit_queue`], so registration always precedes any
//! notification from that queue.

mod events;

pub use events::{CompletionSummary, CoordinatorEvent, FailedQueue};

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::download::{DownloadQueue, DownloadTask, Fetcher, QueueConfig, QueueId, QueueSpec};
use crate::listener::{QueueListener, QueueSubmitter};

enum Message {
    Register(Arc<DownloadQueue>),
    Progress(QueueId),
    Finished(QueueId),
    Shutdown,
}

/// Queue listener that forwards notifications to the coordinator thread.
struct CoordinatorListener {
    tx: Mutex<Sender<Message>>,
}

impl CoordinatorListener {
    fn send(&self, message: Message) {
        // The coordinator thread only goes away after shutdown
        let _ = self.tx.lock().send(message);
    }
}

impl QueueListener for CoordinatorListener {
    fn on_queue_progress(&self, queue: &DownloadQueue) {
        self.send(Message::Progress(queue.id()));
    }

    fn on_queue_finished(&self, queue: &DownloadQueue) {
        self.send(Message::Finished(queue.id()));
    }
}

/// State owned by the coordinator thread.
struct CoordinatorLoop {
    queues: IndexMap<QueueId, Arc<DownloadQueue>>,
    summary: CompletionSummary,
    events: Sender<CoordinatorEvent>,
}

impl CoordinatorLoop {
    fn run(mut self, rx: Receiver<Message>) {
        for message in rx {
            match message {
                Message::Register(queue) => self.register(queue),
                Message::Progress(id) => self.progress(id),
                Message::Finished(id) => self.finished(id),
                Message::Shutdown => break,
            }
        }
        debug!("Coordinator thread exiting");
    }

    fn register(&mut self, queue: Arc<DownloadQueue>) {
        debug!(queue = %queue.name(), id = %queue.id(), "Queue registered");
        self.queues.insert(queue.id(), queue);
    }

    fn overall(&self) -> f64 {
        if self.queues.is_empty() {
            return 1.0;
        }
        let sum: f64 = self.queues.values().map(|q| q.progress()).sum();
        sum / self.queues.len() as f64
    }

    fn progress(&mut self, id: QueueId) {
        let Some(queue) = self.queues.get(&id) else {
            return;
        };
        let event = CoordinatorEvent::Progress {
            queue: queue.name().to_string(),
            queue_fraction: queue.progress(),
            overall: self.overall(),
        };
        let _ = self.events.send(event);
    }

    fn finished(&mut self, id: QueueId) {
        let Some(queue) = self.queues.shift_remove(&id) else {
            debug!(id = %id, "Ignoring finish of untracked queue");
            return;
        };

        let name = queue.name().to_string();
        let status = queue.status();
        let failures = queue.failures();

        if failures.is_empty() {
            info!(queue = %name, remaining = self.queues.len(), "Queue finished");
        } else {
            warn!(
                queue = %name,
                failed = failures.len(),
                remaining = self.queues.len(),
                "Queue finished with failures"
            );
        }

        self.summary.record(name.clone(), status, failures.clone());
        let _ = self.events.send(CoordinatorEvent::QueueFinished {
            name,
            status,
            failures,
        });

        if self.queues.is_empty() {
            let summary = std::mem::take(&mut self.summary);
            info!(
                completed = summary.completed.len(),
                failed = summary.failed.len(),
                "All queues complete"
            );
            let _ = self.events.send(CoordinatorEvent::AllComplete(summary));
        }
    }
}

/// Owns the set of active download queues and aggregates their events.
pub struct QueueCoordinator {
    tx: Mutex<Sender<Message>>,
    events: Mutex<Receiver<CoordinatorEvent>>,
    listener: Arc<CoordinatorListener>,
    fetcher: Arc<dyn Fetcher>,
    config: QueueConfig,
    /// Queues submitted whose finished event the owner has not yet seen.
    pending: AtomicUsize,
}

impl QueueCoordinator {
    /// Start a coordinator whose queues transfer through `fetcher`.
    pub fn new(fetcher: Arc<dyn Fetcher>, config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();

        let state = CoordinatorLoop {
            queues: IndexMap::new(),
            summary: CompletionSummary::default(),
            events: events_tx,
        };
        thread::spawn(move || state.run(rx));

        Self {
            listener: Arc::new(CoordinatorListener {
                tx: Mutex::new(tx.clone()),
            }),
            tx: Mutex::new(tx),
            events: Mutex::new(events_rx),
            fetcher,
            config,
            pending: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Number of submitted queues whose finished event has not been consumed.
    pub fn active_queues(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn observe(&self, event: &CoordinatorEvent) {
        if matches!(event, CoordinatorEvent::QueueFinished { .. }) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<CoordinatorEvent> {
        let event = self.events.lock().recv_timeout(timeout).ok()?;
        self.observe(&event);
        Some(event)
    }

    /// Block until every submitted queue has finished.
    ///
    /// Each event is passed to `observer` as it arrives. The set may empty
    /// more than once when queues are submitted after others finished; the
    /// partial summaries are merged and `observer` sees a single
    /// `AllComplete` once nothing submitted is outstanding. Returns
    /// immediately with an empty summary when nothing is pending. Queues must
    /// have been started, otherwise this never returns.
    pub fn wait_for_completion(&self, mut observer: impl FnMut(&CoordinatorEvent)) -> CompletionSummary {
        let events = self.events.lock();
        let mut merged = CompletionSummary::default();
        if self.active_queues() == 0 {
            return merged;
        }

        while let Ok(event) = events.recv() {
            self.observe(&event);
            match event {
                CoordinatorEvent::AllComplete(summary) => {
                    merged.merge(summary);
                    if self.active_queues() == 0 {
                        observer(&CoordinatorEvent::AllComplete(merged.clone()));
                        return merged;
                    }
                    debug!(
                        pending = self.active_queues(),
                        "Set emptied with queues still outstanding"
                    );
                }
                event => observer(&event),
            }
        }
        merged
    }
}

impl QueueSubmitter for QueueCoordinator {
    fn submit_queue(
        &self,
        name: &str,
        parent: &str,
        tasks: Vec<DownloadTask>,
        base_path: &Path,
        cache_path: Option<&Path>,
    ) -> Arc<DownloadQueue> {
        let spec = QueueSpec::new(name, tasks, base_path)
            .with_parent(parent)
            .with_cache_path(cache_path.map(Path::to_path_buf));
        let listener: Arc<dyn QueueListener> = self.listener.clone();
        let queue = DownloadQueue::new(spec, self.config, listener, Arc::clone(&self.fetcher));

        self.pending.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.lock().send(Message::Register(Arc::clone(&queue)));
        queue
    }
}

impl Drop for QueueCoordinator {
    fn drop(&mut self) {
        let _ = self.tx.lock().send(Message::Shutdown);
    }
}
