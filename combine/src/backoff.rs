use std::thread;

/// Spin iterations are `2^step`, capped at this step.
const SPIN_LIMIT: u32 = 6;
/// After this many steps a waiter starts yielding its time slice.
const YIELD_LIMIT: u32 = 10;

/// How a thread waits between polls while another thread holds the combiner role.
///
/// Neither strategy parks: the combine pass never unparks anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
  /// Poll again immediately after a single CPU spin hint.
  #[default]
  Spin,
  /// Spin for exponentially longer stretches, then fall back to
  /// `thread::yield_now` between polls.
  Backoff,
}

/// Per-operation wait state.
#[derive(Debug)]
pub(crate) struct Waiter {
  strategy: WaitStrategy,
  step: u32,
}

impl Waiter {
  #[inline]
  pub(crate) fn new(strategy: WaitStrategy) -> Self {
    Waiter { strategy, step: 0 }
  }

  /// Waits once according to the strategy.
  #[inline]
  pub(crate) fn snooze(&mut self) {
    match self.strategy {
      WaitStrategy::Spin => std::hint::spin_loop(),
      WaitStrategy::Backoff => {
        if self.step <= SPIN_LIMIT {
          for _ in 0..1u32 << self.step {
            std::hint::spin_loop();
          }
        } else {
          thread::yield_now();
        }
        if self.step <= YIELD_LIMIT {
          self.step += 1;
        }
      }
    }
  }

  #[cfg(test)]
  fn step(&self) -> u32 {
    self.step
  }
}
