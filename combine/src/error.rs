// src/error.rs

//! Errors reported while configuring a queue.

use std::fmt;

/// Errors that can occur when building a queue from a [`QueueBuilder`](crate::QueueBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The queue was configured with zero publication slots. At least one slot
  /// is required for waiting threads to announce their requests.
  ZeroSlots,
  /// The queue was configured with more slots than the combiner is allowed to scan.
  TooManySlots {
    /// The slot count passed to the builder.
    requested: usize,
    /// The largest accepted slot count.
    max: usize,
  },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroSlots => write!(f, "slot count cannot be zero"),
      BuildError::TooManySlots { requested, max } => {
        write!(f, "slot count {} exceeds the maximum of {}", requested, max)
      }
    }
  }
}

impl std::error::Error for BuildError {}
