//! Schema change notifications.
//!
//! Two delivery paths fire for every version change, strictly after the
//! document swap and cache clear for that version:
//!
//! - synchronous handlers registered with [`ChangeListeners::add`], invoked
//!   in registration order on the thread that applied the change, so an
//!   accessor called inside a handler already sees the new schema;
//! - a tokio broadcast channel for async consumers ([`ChangeListeners::subscribe`]).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::document::SchemaDocument;

/// Default buffer size for the broadcast channel.
/// Slow receivers lose the oldest changes beyond this limit.
const DEFAULT_BUFFER_SIZE: usize = 64;

/// Payload of a `change` event.
#[derive(Debug, Clone)]
pub struct SchemaChange {
    /// Version before the change; `None` for the first hydration or a replay.
    pub old_version: Option<String>,
    pub new_version: String,
    /// The document now being served.
    pub schema_data: Arc<SchemaDocument>,
}

/// Handle returned by [`ChangeListeners::add`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type ChangeHandler = Arc<dyn Fn(&SchemaChange) + Send + Sync>;

/// Registry of change subscribers.
pub struct ChangeListeners {
    handlers: RwLock<Vec<(ListenerId, ChangeHandler)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<SchemaChange>,
}

impl ChangeListeners {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            sender,
        }
    }

    /// Registers a handler; it runs on every subsequent change.
    pub fn add<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&SchemaChange) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Unregisters a handler. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Subscribe to changes from async code.
    ///
    /// Changes emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SchemaChange> {
        self.sender.subscribe()
    }

    /// Delivers `change` to every handler and broadcast receiver.
    ///
    /// Handlers are snapshotted before the first one runs: a handler that
    /// registers another handler affects the next emission, not this one.
    /// A panicking handler is logged and skipped; the others still run.
    /// Returns the number of synchronous handlers invoked.
    pub fn emit(&self, change: &SchemaChange) -> usize {
        let snapshot: Vec<(ListenerId, ChangeHandler)> = self
            .handlers
            .read()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        for (id, handler) in &snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(change))).is_err() {
                tracing::error!(
                    listener = id.0,
                    version = %change.new_version,
                    "Schema change handler panicked"
                );
            }
        }
        let _ = self.sender.send(change.clone());
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl Default for ChangeListeners {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("handlers", &self.len())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
