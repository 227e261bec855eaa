use std::mem;

use crate::{
    Error,
    Result,
};

/// Ring/bounded buffer of T's.
///
/// Every queue handoff between pipeline stages goes through a ring. A full
/// ring signals that the consumer is not ready, and producers must hold on to
/// their data until space frees up.
#[derive(Clone, Debug)]
pub struct Ring<T> {
    buffer: Vec<T>,
    begin: usize,
    len: usize,
}

impl<T> From<Vec<T>> for Ring<T> {
    fn from(buffer: Vec<T>) -> Ring<T> {
        Ring {
            buffer,
            begin: 0,
            len: 0,
        }
    }
}

impl<T: Clone + Default> Ring<T> {
    /// Creates an empty ring which holds up to capacity elements.
    pub fn with_capacity(capacity: usize) -> Ring<T> {
        Ring::from(vec![T::default(); capacity])
    }
}

impl<T: Default> Ring<T> {
    /// Enqueues a value or returns an error if the ring is full.
    pub fn enqueue(&mut self, value: T) -> Result<()> {
        self.enqueue_with(|slot| *slot = value)
    }

    /// Dequeues the value at the head of the ring or returns an error if the
    /// ring is empty.
    pub fn dequeue(&mut self) -> Result<T> {
        self.dequeue_with(|slot| mem::take(slot))
    }
}

impl<T> Ring<T> {
    /// Applies f on the head of the buffer or returns an error if the buffer
    /// is empty. Dequeue's the element f was applied on.
    pub fn dequeue_with<'a, F, R>(&'a mut self, f: F) -> Result<R>
    where
        F: FnOnce(&'a mut T) -> R,
    {
        self.dequeue_maybe(|x| Ok(f(x)))
    }

    /// Similar to dequeue_with(...) except cancels the dequeue operation if
    /// f returns an error.
    pub fn dequeue_maybe<'a, F, R>(&'a mut self, f: F) -> Result<R>
    where
        F: FnOnce(&'a mut T) -> Result<R>,
    {
        if self.len == 0 {
            return Err(Error::Exhausted);
        }

        let buffer_len = self.buffer.len();

        match f(&mut self.buffer[self.begin]) {
            Err(err) => Err(err),
            Ok(res) => {
                self.begin = (self.begin + 1) % buffer_len;
                self.len -= 1;
                Ok(res)
            }
        }
    }

    /// Applies f on the tail slot of the buffer (so that f can mutate the T
    /// as desired) or returns an error if the buffer is full. Enqueue's the
    /// element f was applied on.
    pub fn enqueue_with<'a, F, R>(&'a mut self, f: F) -> Result<R>
    where
        F: FnOnce(&'a mut T) -> R,
    {
        self.enqueue_maybe(|x| Ok(f(x)))
    }

    /// Similar to enqueue_with(...) except cancels the enqueue operation if
    /// f returns an error.
    pub fn enqueue_maybe<'a, F, R>(&'a mut self, f: F) -> Result<R>
    where
        F: FnOnce(&'a mut T) -> Result<R>,
    {
        if self.is_full() {
            return Err(Error::Exhausted);
        }

        let idx = (self.begin + self.len) % self.buffer.len();

        match f(&mut self.buffer[idx]) {
            Err(err) => Err(err),
            Ok(res) => {
                self.len += 1;
                Ok(res)
            }
        }
    }

    /// Returns the current number of items in the ring.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the maximum number of items the ring can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }
}
