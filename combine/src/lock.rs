// src/lock.rs

//! The combiner lock: a single test-and-set flag.
//!
//! Whoever flips the flag from unlocked to locked owns the combiner role until
//! the flag is cleared again. There is no waiter queue and no fairness; losers
//! simply retry on their next poll.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::CachePadded;

pub(crate) struct CombinerLock {
  locked: CachePadded<AtomicBool>,
}

impl CombinerLock {
  pub(crate) const fn new() -> Self {
    Self {
      locked: CachePadded::new(AtomicBool::new(false)),
    }
  }

  /// Attempts a single unlocked -> locked transition without spinning.
  #[inline]
  pub(crate) fn try_acquire(&self) -> bool {
    // Test before test-and-set.
    if self.locked.load(Ordering::Relaxed) {
      return false;
    }
    self
      .locked
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
      .is_ok()
  }

  /// Unconditionally clears the flag.
  #[inline]
  pub(crate) fn release(&self) {
    self.locked.store(false, Ordering::Release);
  }

  /// Acquires the lock and wraps it in a guard that releases on drop,
  /// including when the critical section unwinds.
  #[inline]
  pub(crate) fn try_lock(&self) -> Option<CombinerGuard<'_>> {
    if self.try_acquire() {
      Some(CombinerGuard { lock: self })
    } else {
      None
    }
  }

  #[inline]
  pub(crate) fn is_locked(&self) -> bool {
    self.locked.load(Ordering::Relaxed)
  }
}

impl fmt::Debug for CombinerLock {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CombinerLock")
      .field("locked", &self.is_locked())
      .finish()
  }
}

/// Proof of holding the combiner role. Dropping it hands the role back.
#[must_use = "the combiner lock is released as soon as the guard is dropped"]
pub(crate) struct CombinerGuard<'a> {
  lock: &'a CombinerLock,
}

impl Drop for CombinerGuard<'_> {
  #[inline]
  fn drop(&mut self) {
    self.lock.release();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn acquire_release_cycle() {
    let lock = CombinerLock::new();
    assert!(!lock.is_locked());
    assert!(lock.try_acquire());
    assert!(lock.is_locked());
    assert!(!lock.try_acquire(), "second acquire must fail while held");
    lock.release();
    assert!(!lock.is_locked());
    assert!(lock.try_acquire());
  }

  #[test]
  fn guard_releases_on_drop() {
    let lock = CombinerLock::new();
    {
      let _guard = lock.try_lock().expect("uncontended lock");
      assert!(lock.is_locked());
      assert!(lock.try_lock().is_none());
    }
    assert!(!lock.is_locked());
  }

  #[test]
  fn guard_releases_on_unwind() {
    let lock = Arc::new(CombinerLock::new());
    let lock_clone = Arc::clone(&lock);
    let result = thread::spawn(move || {
      let _guard = lock_clone.try_lock().expect("uncontended lock");
      panic!("boom inside critical section");
    })
    .join();
    assert!(result.is_err());
    assert!(!lock.is_locked(), "lock must be released after a panic");
  }

  #[test]
  fn mutual_exclusion_under_contention() {
    let lock = Arc::new(CombinerLock::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let entries = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let lock = Arc::clone(&lock);
        let inside = Arc::clone(&inside);
        let entries = Arc::clone(&entries);
        thread::spawn(move || {
          let mut done = 0;
          while done < 1_000 {
            if let Some(_guard) = lock.try_lock() {
              assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0, "two holders at once");
              entries.fetch_add(1, Ordering::Relaxed);
              inside.fetch_sub(1, Ordering::SeqCst);
              done += 1;
            } else {
              std::hint::spin_loop();
            }
          }
        })
      })
      .collect();

    for handle in handles {
      handle.join().unwrap();
    }
    assert_eq!(entries.load(Ordering::Relaxed), 8_000);
  }
}
