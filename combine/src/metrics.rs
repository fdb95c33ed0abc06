use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Internal counters for a queue. All updates are relaxed; the numbers are
/// for observation only and never feed back into the protocol.
#[derive(Default)]
pub(crate) struct Metrics {
  pub(crate) combine_passes: CachePadded<AtomicU64>,
  pub(crate) combined_requests: CachePadded<AtomicU64>,
  pub(crate) direct_ops: CachePadded<AtomicU64>,
  pub(crate) serviced_while_waiting: CachePadded<AtomicU64>,
  pub(crate) max_batch: CachePadded<AtomicU64>,
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Records one combine pass that resolved `batch` requests.
  #[inline]
  pub(crate) fn record_pass(&self, batch: usize) {
    self.combine_passes.fetch_add(1, Ordering::Relaxed);
    if batch > 0 {
      let batch = batch as u64;
      self.combined_requests.fetch_add(batch, Ordering::Relaxed);
      self.max_batch.fetch_max(batch, Ordering::Relaxed);
    }
  }

  #[inline]
  pub(crate) fn record_direct(&self) {
    self.direct_ops.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_serviced_while_waiting(&self) {
    self.serviced_while_waiting.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    MetricsSnapshot {
      combine_passes: self.combine_passes.load(Ordering::Relaxed),
      combined_requests: self.combined_requests.load(Ordering::Relaxed),
      direct_ops: self.direct_ops.load(Ordering::Relaxed),
      serviced_while_waiting: self.serviced_while_waiting.load(Ordering::Relaxed),
      max_batch: self.max_batch.load(Ordering::Relaxed),
    }
  }
}

impl fmt::Debug for Metrics {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.snapshot(), f)
  }
}

/// A point-in-time view of a queue's counters.
///
/// Counters are read one at a time without synchronization, so a snapshot
/// taken while other threads are active may be slightly inconsistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
  /// Number of combine passes run by lock holders.
  pub combine_passes: u64,
  /// Number of published requests resolved by a combine pass.
  pub combined_requests: u64,
  /// Number of operations the lock holder applied itself without publishing.
  pub direct_ops: u64,
  /// Number of operations that returned after finding their slot already
  /// resolved by another thread's pass.
  pub serviced_while_waiting: u64,
  /// Largest number of requests resolved in a single pass.
  pub max_batch: u64,
}

impl MetricsSnapshot {
  /// Fraction of operations that went through a slot rather than being
  /// applied directly. Returns `0.0` before any operation has completed.
  pub fn combining_ratio(&self) -> f64 {
    let total = self.combined_requests + self.direct_ops;
    if total == 0 {
      0.0
    } else {
      self.combined_requests as f64 / total as f64
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_pass_tracks_batches() {
    let metrics = Metrics::new();
    metrics.record_pass(0);
    metrics.record_pass(3);
    metrics.record_pass(1);
    let snap = metrics.snapshot();
    assert_eq!(snap.combine_passes, 3);
    assert_eq!(snap.combined_requests, 4);
    assert_eq!(snap.max_batch, 3);
  }

  #[test]
  fn combining_ratio() {
    let empty = MetricsSnapshot::default();
    assert_eq!(empty.combining_ratio(), 0.0);

    let metrics = Metrics::new();
    metrics.record_pass(1);
    metrics.record_direct();
    metrics.record_direct();
    metrics.record_direct();
    assert!((metrics.snapshot().combining_ratio() - 0.25).abs() < f64::EPSILON);
  }
}
