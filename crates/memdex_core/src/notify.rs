//! Store event delivery.
//!
//! Every mutation of a [`DocumentStore`](crate::DocumentStore) produces a
//! [`StoreEvent`]. Events are queued on a channel and handed to listeners on
//! a dedicated notifier thread, so the mutating caller never runs listener
//! code and is never blocked by it.
//!
//! Per-document `Inserted`, `Updated` and `Deleted` events additionally arm a
//! trailing-edge timer. When the configured quiet period passes without
//! another mutation, one aggregate `Changed` event is delivered.
//!
//! # Usage
//!
//! ```rust
//! use memdex_core::{Config, DocumentStore, EventKind, Schema, StoreEvent};
//! use memdex_codec::doc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let store = DocumentStore::new(Schema::new("id", ["price"]), Config::default());
//! let inserted = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&inserted);
//! store.on([EventKind::Inserted], move |event: &StoreEvent| {
//!     if let StoreEvent::Inserted(_) = event {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//!
//! store.insert(doc! { "id" => 1, "price" => 10 }).unwrap();
//! store.flush_events();
//! assert_eq!(inserted.load(Ordering::SeqCst), 1);
//! ```

use memdex_codec::Document;
use parking_lot::{Mutex, RwLock};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Kind of a store event, used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A bulk load finished.
    Loaded,
    /// A burst of mutations settled.
    Changed,
    /// A document was inserted.
    Inserted,
    /// A document was updated.
    Updated,
    /// A document was deleted.
    Deleted,
    /// The store was closed.
    Closed,
}

/// An event emitted by a document store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A bulk load finished.
    Loaded,
    /// Aggregate event fired once a burst of mutations has settled.
    Changed,
    /// A document was inserted.
    Inserted(Document),
    /// A document was updated.
    Updated {
        /// The document after the update.
        new: Document,
        /// The document before the update.
        old: Document,
    },
    /// A document was deleted; carries the removed document.
    Deleted(Document),
    /// The store was closed.
    Closed,
}

impl StoreEvent {
    /// Returns the kind tag of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            StoreEvent::Loaded => EventKind::Loaded,
            StoreEvent::Changed => EventKind::Changed,
            StoreEvent::Inserted(_) => EventKind::Inserted,
            StoreEvent::Updated { .. } => EventKind::Updated,
            StoreEvent::Deleted(_) => EventKind::Deleted,
            StoreEvent::Closed => EventKind::Closed,
        }
    }

    /// Returns true for per-document mutation events.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreEvent::Inserted(_) | StoreEvent::Updated { .. } | StoreEvent::Deleted(_)
        )
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Listener callback.
pub type Handler = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

struct Listener {
    id: ListenerId,
    kinds: Vec<EventKind>,
    handler: Handler,
}

type Registry = Arc<RwLock<Vec<Listener>>>;

enum Message {
    Event(StoreEvent),
    Flush(Sender<()>),
    Shutdown,
}

struct Worker {
    tx: Sender<Message>,
    handle: JoinHandle<()>,
}

/// Background event dispatcher.
///
/// A disabled notifier accepts registrations but discards every event.
pub struct Notifier {
    listeners: Registry,
    next_id: AtomicU64,
    worker: Mutex<Option<Worker>>,
}

impl Notifier {
    /// Starts a notifier thread coalescing mutations over `debounce`.
    pub fn new(debounce: Duration) -> Self {
        let listeners: Registry = Arc::new(RwLock::new(Vec::new()));
        let (tx, rx) = mpsc::channel();

        let registry = Arc::clone(&listeners);
        let worker = thread::Builder::new()
            .name("memdex-notify".into())
            .spawn(move || run(&rx, &registry, debounce));

        let worker = match worker {
            Ok(handle) => Some(Worker { tx, handle }),
            Err(err) => {
                warn!(error = %err, "failed to spawn notifier thread; events disabled");
                None
            }
        };

        Self {
            listeners,
            next_id: AtomicU64::new(1),
            worker: Mutex::new(worker),
        }
    }

    /// Creates a notifier that never delivers anything.
    pub fn disabled() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
            worker: Mutex::new(None),
        }
    }

    /// Returns true while events are being delivered.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Registers `handler` for events of the given kinds.
    pub fn on<I, F>(&self, kinds: I, handler: F) -> ListenerId
    where
        I: IntoIterator<Item = EventKind>,
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(Listener {
            id,
            kinds: kinds.into_iter().collect(),
            handler: Arc::new(handler),
        });
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Queues an event for delivery.
    pub fn emit(&self, event: StoreEvent) {
        if let Some(worker) = self.worker.lock().as_ref() {
            // a send error means the thread is already gone
            let _ = worker.tx.send(Message::Event(event));
        }
    }

    /// Blocks until every event queued so far has been delivered.
    ///
    /// A pending `Changed` event is not waited for. Calling this from a
    /// listener returns immediately.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        {
            let guard = self.worker.lock();
            let Some(worker) = guard.as_ref() else {
                return;
            };
            if worker.handle.thread().id() == thread::current().id() {
                return;
            }
            if worker.tx.send(Message::Flush(ack_tx)).is_err() {
                return;
            }
        }
        let _ = ack_rx.recv();
    }

    /// Delivers queued events, drops every listener and stops the thread.
    ///
    /// Idempotent. Events emitted afterwards are discarded.
    pub fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            self.listeners.write().clear();
            return;
        };

        let _ = worker.tx.send(Message::Shutdown);
        drop(worker.tx);

        if worker.handle.thread().id() != thread::current().id() && worker.handle.join().is_err()
        {
            warn!("notifier thread panicked");
        }
        self.listeners.write().clear();
        debug!("notifier stopped");
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listener_count())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run(rx: &Receiver<Message>, listeners: &Registry, debounce: Duration) {
    let mut deadline: Option<Instant> = None;

    loop {
        let message = match deadline {
            None => match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            },
            Some(at) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    deadline = None;
                    deliver(listeners, &StoreEvent::Changed);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
        };

        match message {
            Message::Event(event) => {
                if event.is_mutation() {
                    deadline = Some(Instant::now() + debounce);
                }
                deliver(listeners, &event);
            }
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
            Message::Shutdown => break,
        }
    }
}

fn deliver(listeners: &Registry, event: &StoreEvent) {
    let kind = event.kind();
    // handlers run outside the lock so they may register or unregister
    let handlers: Vec<Handler> = listeners
        .read()
        .iter()
        .filter(|l| l.kinds.contains(&kind))
        .map(|l| Arc::clone(&l.handler))
        .collect();

    trace!(?kind, listeners = handlers.len(), "delivering event");

    for handler in handlers {
        if std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
            warn!(?kind, "event listener panicked");
        }
    }
}
