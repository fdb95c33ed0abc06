// src/queue.rs

//! The flat-combining queue itself.
//!
//! Every operation starts by trying to become the combiner. A thread that
//! loses publishes its request into a random slot once, then alternates between
//! checking that slot for a result and retrying the lock. Whoever holds the lock
//! applies its own operation, scans the slot array once and resolves every
//! pending request it finds, then lets go.
//!
//! Requests resolved in the same pass are linearized in slot index order, not
//! in the order their threads arrived.

use crate::backoff::{WaitStrategy, Waiter};
use crate::builder::{QueueBuilder, DEFAULT_SLOTS};
use crate::lock::{CombinerGuard, CombinerLock};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::slot::{Request, SlotArray};
use crate::telemetry;
use crate::Queue;

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::fmt;

const LOC_ENQUEUE: &str = "FlatCombiningQueue::enqueue";
const LOC_DEQUEUE: &str = "FlatCombiningQueue::dequeue";
const LOC_COMBINE: &str = "FlatCombiningQueue::combine";

const EVT_BECAME_COMBINER: &str = "BecameCombiner";
const EVT_PUBLISHED: &str = "Published";
const EVT_SERVICED_WHILE_WAITING: &str = "ServicedWhileWaiting";
const EVT_PASS_DONE: &str = "PassDone";
const EVT_INVARIANT_VIOLATED: &str = "InvariantViolated";

const CTR_PUBLISH_COLLISIONS: &str = "PublishCollisions";
const CTR_PASSES: &str = "CombinePasses";

/// A concurrent, unbounded FIFO queue built on flat combining.
///
/// All threads share one queue through `&self` (typically behind an `Arc`).
/// Operations never fail; under contention they may spin until serviced.
///
/// # Ordering
///
/// The queue is linearizable, but operations that are batched into the same
/// combine pass take effect in slot order. Two threads that enqueue "at the
/// same time" may therefore see their values dequeued in either order.
///
/// # Examples
///
/// ```
/// use fibre_combine::FlatCombiningQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(FlatCombiningQueue::new());
/// let producer = {
///   let queue = Arc::clone(&queue);
///   thread::spawn(move || {
///     for i in 0..100 {
///       queue.enqueue(i);
///     }
///   })
/// };
/// producer.join().unwrap();
///
/// let mut drained = Vec::new();
/// while let Some(v) = queue.dequeue() {
///   drained.push(v);
/// }
/// assert_eq!(drained, (0..100).collect::<Vec<_>>());
/// ```
pub struct FlatCombiningQueue<T> {
  lock: CombinerLock,
  /// Touched only while `lock` is held.
  items: UnsafeCell<VecDeque<T>>,
  slots: SlotArray<T>,
  wait_strategy: WaitStrategy,
  metrics: Metrics,
}

// `items` is only reached through a live `CombinerGuard`, and slot payloads are
// handed between threads by the slot tag protocol.
unsafe impl<T: Send> Send for FlatCombiningQueue<T> {}
unsafe impl<T: Send> Sync for FlatCombiningQueue<T> {}

/// Where an operation stands after its acquire-or-announce loop.
enum Announcement<T> {
  /// Never made it into a slot; the request is still ours to apply.
  Unannounced(Request<T>),
  /// Published into the slot at this index.
  Announced(usize),
}

enum Acquired<'a, T> {
  /// Some other thread's pass resolved our slot while we waited.
  Serviced(Option<T>),
  /// We hold the combiner role.
  Combiner(CombinerGuard<'a>, Announcement<T>),
}

impl<T> FlatCombiningQueue<T> {
  /// Creates an empty queue with [`DEFAULT_SLOTS`] publication slots.
  pub fn new() -> Self {
    Self::from_parts(DEFAULT_SLOTS, WaitStrategy::default(), 0)
  }

  /// Returns a builder for a queue with non-default settings.
  pub fn builder() -> QueueBuilder<T> {
    QueueBuilder::new()
  }

  pub(crate) fn from_parts(slots: usize, wait_strategy: WaitStrategy, initial_capacity: usize) -> Self {
    FlatCombiningQueue {
      lock: CombinerLock::new(),
      items: UnsafeCell::new(VecDeque::with_capacity(initial_capacity)),
      slots: SlotArray::new(slots),
      wait_strategy,
      metrics: Metrics::new(),
    }
  }

  /// Number of publication slots.
  pub fn slots(&self) -> usize {
    self.slots.len()
  }

  /// How waiting threads pause between polls.
  pub fn wait_strategy(&self) -> WaitStrategy {
    self.wait_strategy
  }

  /// Snapshot of the queue's internal counters.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }

  /// Appends `item` at the tail of the queue.
  pub fn enqueue(&self, item: T) {
    match self.acquire_or_announce(Request::Enqueue(item), LOC_ENQUEUE) {
      Acquired::Serviced(_) => {}
      Acquired::Combiner(guard, Announcement::Unannounced(request)) => {
        if let Request::Enqueue(item) = request {
          self.items_mut(&guard).push_back(item);
          self.metrics.record_direct();
        }
        self.combine(&guard);
      }
      Acquired::Combiner(guard, Announcement::Announced(index)) => {
        self.combine(&guard);
        // Our own pass resolved the request; clear the slot so it can be reused.
        self.take_own_result(index, LOC_ENQUEUE);
      }
    }
  }

  /// Removes and returns the element at the head of the queue, or `None` if
  /// the queue was empty when the operation took effect.
  pub fn dequeue(&self) -> Option<T> {
    match self.acquire_or_announce(Request::Dequeue, LOC_DEQUEUE) {
      Acquired::Serviced(value) => value,
      Acquired::Combiner(guard, Announcement::Unannounced(_)) => {
        self.combine(&guard);
        self.metrics.record_direct();
        self.items_mut(&guard).pop_front()
      }
      Acquired::Combiner(guard, Announcement::Announced(index)) => {
        self.combine(&guard);
        self.take_own_result(index, LOC_DEQUEUE)
      }
    }
  }

  /// Spins until the caller either holds the combiner lock or finds its
  /// published request already resolved.
  fn acquire_or_announce(&self, request: Request<T>, location: &'static str) -> Acquired<'_, T> {
    let mut waiter = Waiter::new(self.wait_strategy);
    let mut announcement = Announcement::Unannounced(request);
    loop {
      if let Some(guard) = self.lock.try_lock() {
        telemetry::log_event(None, location, EVT_BECAME_COMBINER, None);
        return Acquired::Combiner(guard, announcement);
      }

      announcement = match announcement {
        Announcement::Unannounced(request) => {
          let index = self.slots.random_index();
          match self.slots.try_publish(index, request) {
            Ok(()) => {
              telemetry::log_event(Some(index), location, EVT_PUBLISHED, None);
              Announcement::Announced(index)
            }
            Err(request) => {
              telemetry::increment_counter(location, CTR_PUBLISH_COLLISIONS);
              Announcement::Unannounced(request)
            }
          }
        }
        Announcement::Announced(index) => {
          if let Some(value) = self.slots.try_take(index) {
            telemetry::log_event(Some(index), location, EVT_SERVICED_WHILE_WAITING, None);
            self.metrics.record_serviced_while_waiting();
            return Acquired::Serviced(value);
          }
          Announcement::Announced(index)
        }
      };

      waiter.snooze();
    }
  }

  /// One pass over the slot array, resolving every pending request in index order.
  fn combine(&self, guard: &CombinerGuard<'_>) {
    let items = self.items_mut(guard);
    let batch = self.slots.resolve_pending(|request| match request {
      Request::Enqueue(item) => {
        items.push_back(item);
        None
      }
      Request::Dequeue => items.pop_front(),
    });
    self.metrics.record_pass(batch);
    telemetry::increment_counter(LOC_COMBINE, CTR_PASSES);
    telemetry::log_event(Some(batch), LOC_COMBINE, EVT_PASS_DONE, None);
  }

  /// Collects the result of a request this thread published, after running a
  /// pass itself. A pending slot here means the protocol is broken.
  fn take_own_result(&self, index: usize, location: &'static str) -> Option<T> {
    match self.slots.try_take(index) {
      Some(value) => value,
      None => {
        telemetry::log_event(Some(index), location, EVT_INVARIANT_VIOLATED, None);
        panic!(
          "flat combining invariant violated: slot {} still unresolved after the owner's combine pass",
          index
        );
      }
    }
  }

  #[allow(clippy::mut_from_ref)]
  #[inline]
  fn items_mut<'g>(&'g self, _guard: &'g CombinerGuard<'_>) -> &'g mut VecDeque<T> {
    // SAFETY: the guard proves this thread holds the combiner lock, the only
    // permission to touch `items`. Callers keep at most one such borrow alive.
    unsafe { &mut *self.items.get() }
  }
}

impl<T> Default for FlatCombiningQueue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Queue<T> for FlatCombiningQueue<T> {
  #[inline]
  fn enqueue(&self, item: T) {
    FlatCombiningQueue::enqueue(self, item)
  }

  #[inline]
  fn dequeue(&self) -> Option<T> {
    FlatCombiningQueue::dequeue(self)
  }
}

impl<T> fmt::Debug for FlatCombiningQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FlatCombiningQueue")
      .field("slots", &self.slots)
      .field("combiner_locked", &self.lock.is_locked())
      .field("wait_strategy", &self.wait_strategy)
      .field("metrics", &self.metrics)
      .finish_non_exhaustive()
  }
}
