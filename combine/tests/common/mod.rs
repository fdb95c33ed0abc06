#![allow(dead_code)]

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const LONG_TIMEOUT: Duration = Duration::from_secs(10);
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(120);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 1_000;
pub const ITEMS_HIGH: usize = 10_000;

/// Runs `f` on its own thread and fails the test if it does not finish within
/// `timeout`. A hung queue shows up as a timeout instead of a stuck test run.
pub fn with_watchdog<F, R>(timeout: Duration, f: F) -> R
where
  F: FnOnce() -> R + Send + 'static,
  R: Send + 'static,
{
  let (tx, rx) = mpsc::channel();
  let handle = thread::spawn(move || {
    let result = f();
    let _ = tx.send(());
    result
  });
  match rx.recv_timeout(timeout) {
    Ok(()) => handle.join().expect("watched closure panicked"),
    Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
      Ok(_) => unreachable!("closure finished without signalling"),
      Err(panic) => std::panic::resume_unwind(panic),
    },
    Err(mpsc::RecvTimeoutError::Timeout) => panic!("operation did not complete within {:?}", timeout),
  }
}
