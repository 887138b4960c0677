//! Completion/error fan-out to reporting collaborators.
//!
//! Listeners are notified synchronously, on the thread that observed the
//! final byte, in registration order. Callbacks are expected to be short,
//! fire-and-forget operations; a listener that panics is isolated so it can
//! neither suppress the remaining listeners nor poison the parser that
//! invoked it.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::transaction::TransactionData;

/// Receiver of finished-transaction notifications.
pub trait TapListener: Send {
    /// A transaction completed; `data` is the immutable export.
    fn on_transaction_complete(&mut self, data: &TransactionData);

    /// The transport reported an error for the transaction in flight.
    fn on_transaction_error(&mut self, data: &TransactionData, error: &str);
}

/// Handle for deregistering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered listener registry.
#[derive(Default)]
pub struct ListenerSet {
    entries: Vec<(ListenerId, Box<dyn TapListener>)>,
    next_id: u64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener; notification order follows registration order.
    pub fn add(&mut self, listener: Box<dyn TapListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Removes a previously registered listener. Returns whether it was
    /// still registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notify_complete(&mut self, data: &TransactionData) {
        for (id, listener) in &mut self.entries {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_transaction_complete(data)));
            if outcome.is_err() {
                warn!(listener = id.0, "listener panicked in completion callback");
            }
        }
    }

    pub fn notify_error(&mut self, data: &TransactionData, error: &str) {
        for (id, listener) in &mut self.entries {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_transaction_error(data, error)));
            if outcome.is_err() {
                warn!(listener = id.0, "listener panicked in error callback");
            }
        }
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet").field("listeners", &self.entries.len()).finish()
    }
}
