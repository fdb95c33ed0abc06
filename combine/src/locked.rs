use crate::Queue;

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A FIFO queue behind a single `parking_lot::Mutex`.
///
/// Every operation takes the lock. It serves as the baseline the combining
/// queue is measured against, and as a reference model in tests.
#[derive(Debug)]
pub struct MutexQueue<T> {
  items: Mutex<VecDeque<T>>,
}

impl<T> MutexQueue<T> {
  /// Creates an empty queue.
  pub fn new() -> Self {
    MutexQueue {
      items: Mutex::new(VecDeque::new()),
    }
  }

  /// Number of queued elements at the moment of the call.
  pub fn len(&self) -> usize {
    self.items.lock().len()
  }

  /// Returns `true` if no element is queued.
  pub fn is_empty(&self) -> bool {
    self.items.lock().is_empty()
  }
}

impl<T> Default for MutexQueue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Queue<T> for MutexQueue<T> {
  fn enqueue(&self, item: T) {
    self.items.lock().push_back(item);
  }

  fn dequeue(&self) -> Option<T> {
    self.items.lock().pop_front()
  }
}
