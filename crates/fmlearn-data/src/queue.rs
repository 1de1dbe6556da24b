//! Bounded blocking FIFO connecting the pipeline stages.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{DataError, Result};

struct State<T> {
    buf: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// A fixed-capacity multi-producer multi-consumer queue.
///
/// Handles are cheap clones of one shared queue. [`push`](Self::push) blocks
/// while the queue is full, [`pop`](Self::pop) blocks while it is empty.
/// After [`close`](Self::close) pushes fail and pops drain what is left, then
/// return `None`. Hand the consuming side out as a [`Receiver`] so the queue
/// also closes when the consumer goes away.
///
/// ```
/// use fmlearn_data::BoundedQueue;
///
/// let q = BoundedQueue::new(2);
/// q.push(1).unwrap();
/// q.push(2).unwrap();
/// q.close();
/// assert!(q.push(3).is_err());
/// assert_eq!(q.pop(), Some(1));
/// assert_eq!(q.pop(), Some(2));
/// assert_eq!(q.pop(), None);
/// ```
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    buf: VecDeque::with_capacity(capacity),
                    capacity,
                    closed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        }
    }

    /// Appends `item`, waiting for room.
    ///
    /// # Errors
    ///
    /// [`DataError::Closed`] if the queue is closed before the item fits.
    pub fn push(&self, item: T) -> Result<()> {
        let mut state = self.inner.state.lock();
        while !state.closed && state.buf.len() >= state.capacity {
            self.inner.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(DataError::Closed);
        }
        state.buf.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Takes the oldest item, waiting for one; `None` once the queue is
    /// closed and empty.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.inner.state.lock();
        while !state.closed && state.buf.is_empty() {
            self.inner.not_empty.wait(&mut state);
        }
        let item = state.buf.pop_front();
        if item.is_some() {
            self.inner.not_full.notify_one();
        }
        item
    }

    /// Closes the queue and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.state.lock().capacity
    }

    /// Turns this handle into the queue's consuming end.
    pub fn into_receiver(self) -> Receiver<T> {
        Receiver { queue: self }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &state.capacity)
            .field("len", &state.buf.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Iterator for BoundedQueue<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pop()
    }
}

/// Consuming end of a [`BoundedQueue`]; closes the queue when dropped.
///
/// Producers blocked on a full queue are released as soon as the consumer is
/// gone, including when it unwinds from a panic or returns early with `?`.
/// Share it between consumer threads by reference or through an `Arc`.
pub struct Receiver<T> {
    queue: BoundedQueue<T>,
}

impl<T> Receiver<T> {
    /// See [`BoundedQueue::pop`].
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Closes the queue early, stopping the producers.
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.queue.close();
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Receiver").field(&self.queue).finish()
    }
}

impl<T> Iterator for Receiver<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pop()
    }
}
