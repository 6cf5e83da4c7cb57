//! Bounded in-memory channel.
//!
//! Events live in a FIFO queue behind a mutex. A transaction moves taken
//! events out of the queue; rollback puts them back at the head in their
//! original order so redelivery preserves arrival order.

use cosmos_types::RawEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::channel::{Channel, Transaction};
use crate::error::ChannelError;

/// Default number of events the channel can hold.
pub const DEFAULT_CAPACITY: usize = 1000;

type Queue = Arc<Mutex<VecDeque<RawEvent>>>;

/// A cloneable handle to a bounded in-memory event queue.
///
/// Clones share the same queue, so one handle can feed events while
/// another is drained by the sink.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    queue: Queue,
    capacity: usize,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an event at the tail.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Full` when the queue is at capacity.
    pub fn put(&self, event: RawEvent) -> Result<(), ChannelError> {
        let mut queue = self.queue.lock().map_err(|_| ChannelError::LockPoisoned)?;
        if queue.len() >= self.capacity {
            return Err(ChannelError::Full {
                capacity: self.capacity,
            });
        }
        queue.push_back(event);
        Ok(())
    }

    /// Number of events waiting to be taken.
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .map(|queue| queue.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Channel for MemoryChannel {
    type Transaction = MemoryTransaction;

    fn transaction(&self) -> MemoryTransaction {
        MemoryTransaction {
            queue: Arc::clone(&self.queue),
            taken: Vec::new(),
            state: TxnState::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    New,
    Open,
    Completed,
    Closed,
}

impl TxnState {
    fn as_str(self) -> &'static str {
        match self {
            Self::New => "not begun",
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Closed => "closed",
        }
    }
}

/// Transaction over a [`MemoryChannel`].
#[derive(Debug)]
pub struct MemoryTransaction {
    queue: Queue,
    taken: Vec<RawEvent>,
    state: TxnState,
}

impl MemoryTransaction {
    fn expect_state(&self, op: &'static str, expected: TxnState) -> Result<(), ChannelError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ChannelError::InvalidState {
                op,
                state: self.state.as_str(),
            })
        }
    }
}

impl Transaction for MemoryTransaction {
    fn begin(&mut self) -> Result<(), ChannelError> {
        self.expect_state("begin", TxnState::New)?;
        self.state = TxnState::Open;
        Ok(())
    }

    fn take(&mut self) -> Result<Option<RawEvent>, ChannelError> {
        self.expect_state("take from", TxnState::Open)?;
        let mut queue = self.queue.lock().map_err(|_| ChannelError::LockPoisoned)?;
        let event = queue.pop_front();
        if let Some(ref event) = event {
            self.taken.push(event.clone());
        }
        Ok(event)
    }

    fn commit(&mut self) -> Result<(), ChannelError> {
        self.expect_state("commit", TxnState::Open)?;
        self.taken.clear();
        self.state = TxnState::Completed;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ChannelError> {
        self.expect_state("roll back", TxnState::Open)?;
        let mut queue = self.queue.lock().map_err(|_| ChannelError::LockPoisoned)?;
        for event in self.taken.drain(..).rev() {
            queue.push_front(event);
        }
        self.state = TxnState::Completed;
        Ok(())
    }

    fn close(&mut self) {
        if self.state == TxnState::Open && !self.taken.is_empty() {
            tracing::warn!(
                events = self.taken.len(),
                "closing memory transaction with uncommitted takes, returning them to the channel"
            );
            if let Ok(mut queue) = self.queue.lock() {
                for event in self.taken.drain(..).rev() {
                    queue.push_front(event);
                }
            }
        }
        self.state = TxnState::Closed;
    }
}
