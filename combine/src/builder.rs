use crate::backoff::WaitStrategy;
use crate::error::BuildError;
use crate::queue::FlatCombiningQueue;

use core::fmt;
use std::marker::PhantomData;

/// Publication slots in a queue built with default settings.
///
/// The value is small on purpose: with few slots, waiting threads collide on
/// publish and fall back to competing for the lock, which keeps batches short.
/// Raising it shifts the contention/throughput trade-off; it never affects
/// correctness.
pub const DEFAULT_SLOTS: usize = 3;

/// Largest slot count a builder accepts. Every combine pass scans all slots.
pub const MAX_SLOTS: usize = 1024;

/// A builder for [`FlatCombiningQueue`] instances.
pub struct QueueBuilder<T> {
  slots: usize,
  wait_strategy: WaitStrategy,
  initial_capacity: usize,
  _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for QueueBuilder<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueBuilder")
      .field("slots", &self.slots)
      .field("wait_strategy", &self.wait_strategy)
      .field("initial_capacity", &self.initial_capacity)
      .finish()
  }
}

impl<T> Default for QueueBuilder<T> {
  fn default() -> Self {
    Self {
      slots: DEFAULT_SLOTS,
      wait_strategy: WaitStrategy::default(),
      initial_capacity: 0,
      _marker: PhantomData,
    }
  }
}

impl<T> QueueBuilder<T> {
  /// Creates a builder with default settings.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the number of publication slots waiting threads can announce into.
  pub fn slots(mut self, slots: usize) -> Self {
    self.slots = slots;
    self
  }

  /// Sets how waiting threads pause between polls.
  pub fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
    self.wait_strategy = strategy;
    self
  }

  /// Reserves room for `capacity` elements up front. The queue still grows
  /// without bound past this.
  pub fn initial_capacity(mut self, capacity: usize) -> Self {
    self.initial_capacity = capacity;
    self
  }

  /// Validates the configuration and builds the queue.
  pub fn build(self) -> Result<FlatCombiningQueue<T>, BuildError> {
    if self.slots == 0 {
      return Err(BuildError::ZeroSlots);
    }
    if self.slots > MAX_SLOTS {
      return Err(BuildError::TooManySlots {
        requested: self.slots,
        max: MAX_SLOTS,
      });
    }
    Ok(FlatCombiningQueue::from_parts(
      self.slots,
      self.wait_strategy,
      self.initial_capacity,
    ))
  }
}
