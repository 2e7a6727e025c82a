//! The initialization operation queue.

use std::collections::VecDeque;

use log::debug;

use vitalink_gatt::{Operation, Transport, TransportError};

/// What a queue step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueProgress {
    /// The next operation was issued to the transport.
    Issued,
    /// The queue is drained.
    Done,
}

/// Ordered initialization operations, drained one at a time.
///
/// Operations are enqueued before draining starts and issued strictly in
/// FIFO order, each one triggered by the previous operation's completion
/// event. At most one operation is outstanding against the transport.
/// Nothing is skipped: an operation whose target attribute is absent
/// must not have been enqueued in the first place, which is the session
/// builder's responsibility, not the queue's.
#[derive(Debug, Default)]
pub struct InitQueue {
    pending: VecDeque<Operation>,
    in_progress: bool,
}

impl InitQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        InitQueue::default()
    }

    /// Number of operations not yet completed.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the queue holds no operations.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop all pending operations, e.g. on disconnect.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_progress = false;
    }

    /// Append an operation. Only valid before draining starts.
    pub fn enqueue(&mut self, operation: Operation) {
        debug_assert!(!self.in_progress, "enqueue after draining started");
        self.pending.push_back(operation);
    }

    /// The operation currently outstanding, if any.
    pub fn current(&self) -> Option<&Operation> {
        if self.in_progress {
            self.pending.front()
        } else {
            None
        }
    }

    /// Issue the head operation, or report `Done` on an empty queue.
    pub fn start<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<QueueProgress, TransportError> {
        match self.pending.front() {
            None => {
                self.in_progress = false;
                Ok(QueueProgress::Done)
            }
            Some(operation) => {
                debug!("init queue: issuing {:?}", operation);
                operation.issue(transport)?;
                self.in_progress = true;
                Ok(QueueProgress::Issued)
            }
        }
    }

    /// Consume the completed head operation and issue the next one, or
    /// report `Done` when the queue is drained.
    pub fn on_operation_complete<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<QueueProgress, TransportError> {
        self.in_progress = false;
        self.pending.pop_front();
        self.start(transport)
    }
}
