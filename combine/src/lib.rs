#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! A flat-combining concurrent FIFO queue.
//!
//! Instead of every thread fighting over a lock for every operation, a thread
//! that finds the lock taken publishes its request into a small shared slot
//! array and waits. Whoever does hold the lock becomes the *combiner*: it
//! applies its own operation and then every request sitting in the slots in a
//! single sequential pass, amortizing one lock acquisition over a batch.
//!
//! The queue is unbounded and linearizable. It is *not* FIFO with respect to
//! real arrival time across threads: requests batched into one pass take
//! effect in slot order.
//!
//! ```
//! use fibre_combine::{FlatCombiningQueue, Queue, WaitStrategy};
//!
//! let queue = FlatCombiningQueue::builder()
//!   .slots(8)
//!   .wait_strategy(WaitStrategy::Backoff)
//!   .build()
//!   .unwrap();
//!
//! queue.enqueue("a");
//! queue.enqueue("b");
//! assert_eq!(Queue::dequeue(&queue), Some("a"));
//! ```

pub mod error;
pub mod telemetry;

mod backoff;
mod builder;
mod lock;
mod locked;
mod metrics;
mod queue;
mod slot;

pub use backoff::WaitStrategy;
pub use builder::{QueueBuilder, DEFAULT_SLOTS, MAX_SLOTS};
pub use error::BuildError;
pub use locked::MutexQueue;
pub use metrics::MetricsSnapshot;
pub use queue::FlatCombiningQueue;

/// A shared FIFO queue usable from many threads at once through `&self`.
pub trait Queue<T> {
  /// Adds `item` at the tail.
  fn enqueue(&self, item: T);

  /// Removes the head element, or returns `None` if the queue is empty.
  fn dequeue(&self) -> Option<T>;
}
