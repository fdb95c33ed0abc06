// src/slot.rs

//! The publication channel between waiting threads and the combiner.
//!
//! Each slot is a `SlotState<T>` guarded by an atomic tag. The tag is the only
//! thing ever compared-and-swapped; it decides which thread may touch the state
//! cell at any moment:
//!
//! | tag        | cell owner                                   |
//! |------------|----------------------------------------------|
//! | `EMPTY`    | nobody (cell holds `SlotState::Empty`)       |
//! | `CLAIMED`  | the publisher, while it writes its request   |
//! | `ENQUEUE`  | the combiner (lock holder)                   |
//! | `DEQUEUE`  | the combiner (lock holder)                   |
//! | `RESOLVED` | the publisher, until it clears back to empty |
//!
//! `CLAIMED` is a short-lived intermediate so the request can be written into
//! the cell before it becomes visible to a combiner. A combiner treats it like
//! an empty slot.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_utils::CachePadded;
use rand::Rng;

const TAG_EMPTY: u8 = 0;
const TAG_CLAIMED: u8 = 1;
const TAG_ENQUEUE: u8 = 2;
const TAG_DEQUEUE: u8 = 3;
const TAG_RESOLVED: u8 = 4;

/// The contents of one publication slot.
pub(crate) enum SlotState<T> {
  Empty,
  Enqueue(T),
  Dequeue,
  /// A serviced request. For a dequeue this carries the popped value (or
  /// `None` when the queue was empty); for an enqueue it is always `None`.
  Resolved(Option<T>),
}

impl<T> SlotState<T> {
  fn tag(&self) -> u8 {
    match self {
      SlotState::Empty => TAG_EMPTY,
      SlotState::Enqueue(_) => TAG_ENQUEUE,
      SlotState::Dequeue => TAG_DEQUEUE,
      SlotState::Resolved(_) => TAG_RESOLVED,
    }
  }
}

/// An operation a thread wants the combiner to run on its behalf.
pub(crate) enum Request<T> {
  Enqueue(T),
  Dequeue,
}

impl<T> From<Request<T>> for SlotState<T> {
  fn from(request: Request<T>) -> Self {
    match request {
      Request::Enqueue(value) => SlotState::Enqueue(value),
      Request::Dequeue => SlotState::Dequeue,
    }
  }
}

pub(crate) struct Slot<T> {
  tag: AtomicU8,
  state: UnsafeCell<SlotState<T>>,
}

// Access to `state` is serialized by the tag protocol described above.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
  fn new() -> Self {
    Slot {
      tag: AtomicU8::new(TAG_EMPTY),
      state: UnsafeCell::new(SlotState::Empty),
    }
  }

  /// Claims an empty slot and publishes `request` into it. On failure the
  /// request is handed back untouched.
  fn try_publish(&self, request: Request<T>) -> Result<(), Request<T>> {
    if self
      .tag
      .compare_exchange(TAG_EMPTY, TAG_CLAIMED, Ordering::Acquire, Ordering::Relaxed)
      .is_err()
    {
      return Err(request);
    }
    let state: SlotState<T> = request.into();
    let tag = state.tag();
    // SAFETY: winning EMPTY -> CLAIMED grants exclusive access to the cell
    // until the tag is moved on.
    unsafe {
      *self.state.get() = state;
    }
    self.tag.store(tag, Ordering::Release);
    Ok(())
  }

  /// Takes the result out of a resolved slot and returns the slot to empty.
  /// Returns `None` while the request is still pending.
  ///
  /// Must only be called by the thread that published into this slot.
  fn try_take(&self) -> Option<Option<T>> {
    if self.tag.load(Ordering::Acquire) != TAG_RESOLVED {
      return None;
    }
    // SAFETY: a RESOLVED slot belongs to its publisher, which is the caller.
    let state = unsafe { mem::replace(&mut *self.state.get(), SlotState::Empty) };
    self.tag.store(TAG_EMPTY, Ordering::Release);
    match state {
      SlotState::Resolved(value) => Some(value),
      _ => panic!("flat combining invariant violated: resolved slot tag without a resolved state"),
    }
  }

  /// Hands the pending request to `apply` and stores what it returns as the
  /// slot's result. Returns `false` without calling `apply` when the slot holds
  /// no pending request.
  ///
  /// Must only be called while holding the combiner lock.
  fn resolve_with<F>(&self, apply: F) -> bool
  where
    F: FnOnce(Request<T>) -> Option<T>,
  {
    match self.tag.load(Ordering::Acquire) {
      TAG_ENQUEUE | TAG_DEQUEUE => {}
      _ => return false,
    }
    // SAFETY: request tags hand the cell to the combiner, and the caller holds
    // the combiner lock so no other combiner can be here.
    let cell = unsafe { &mut *self.state.get() };
    let request = match mem::replace(cell, SlotState::Empty) {
      SlotState::Enqueue(value) => Request::Enqueue(value),
      SlotState::Dequeue => Request::Dequeue,
      _ => panic!("flat combining invariant violated: request tag without a request state"),
    };
    *cell = SlotState::Resolved(apply(request));
    self.tag.store(TAG_RESOLVED, Ordering::Release);
    true
  }

  fn tag_name(&self) -> &'static str {
    match self.tag.load(Ordering::Relaxed) {
      TAG_EMPTY => "Empty",
      TAG_CLAIMED => "Claimed",
      TAG_ENQUEUE => "Enqueue",
      TAG_DEQUEUE => "Dequeue",
      TAG_RESOLVED => "Resolved",
      _ => "Unknown",
    }
  }
}

/// Fixed-size array of publication slots, one cache line each.
pub(crate) struct SlotArray<T> {
  slots: Box<[CachePadded<Slot<T>>]>,
}

impl<T> SlotArray<T> {
  pub(crate) fn new(len: usize) -> Self {
    debug_assert!(len > 0, "slot array needs at least one slot");
    let slots = (0..len).map(|_| CachePadded::new(Slot::new())).collect();
    SlotArray { slots }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.slots.len()
  }

  /// Uniformly random slot index, drawn from the calling thread's generator.
  #[inline]
  pub(crate) fn random_index(&self) -> usize {
    rand::rng().random_range(0..self.slots.len())
  }

  #[inline]
  pub(crate) fn try_publish(&self, index: usize, request: Request<T>) -> Result<(), Request<T>> {
    self.slots[index].try_publish(request)
  }

  #[inline]
  pub(crate) fn try_take(&self, index: usize) -> Option<Option<T>> {
    self.slots[index].try_take()
  }

  /// Visits every slot once in index order and resolves each pending request
  /// through `apply`. Returns how many requests were resolved.
  ///
  /// Must only be called while holding the combiner lock.
  pub(crate) fn resolve_pending<F>(&self, mut apply: F) -> usize
  where
    F: FnMut(Request<T>) -> Option<T>,
  {
    let mut resolved = 0;
    for slot in self.slots.iter() {
      if slot.resolve_with(&mut apply) {
        resolved += 1;
      }
    }
    resolved
  }
}

impl<T> fmt::Debug for SlotArray<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
      .entries(self.slots.iter().map(|slot| slot.tag_name()))
      .finish()
  }
}
