// src/telemetry.rs

//! Opt-in event tracing for the combining protocol.
//!
//! With the `fibre_telemetry` feature every event and counter is recorded into a
//! process-wide collector that can be printed or cleared. Without it every
//! function here compiles to nothing.

#[cfg(feature = "fibre_telemetry")]
/// Recording implementation, compiled with the `fibre_telemetry` feature.
pub mod enabled {
  use std::collections::HashMap;
  use std::fmt;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::thread::{self, ThreadId};
  use std::time::Instant;

  use parking_lot::Mutex;

  static NEXT_EVENT_SEQUENCE_ID: AtomicUsize = AtomicUsize::new(0);

  /// One recorded protocol event.
  #[derive(Clone)]
  pub struct TelemetryEvent {
    /// Global sequence number across all events.
    pub seq_id: usize,
    /// When the event was recorded.
    pub timestamp: Instant,
    /// Thread that recorded the event.
    pub os_thread_id: ThreadId,
    /// Slot index or batch size, depending on the event.
    pub item_id: Option<usize>,
    /// Code location, e.g. `FlatCombiningQueue::enqueue`.
    pub location: &'static str,
    /// Event name, e.g. `Published`.
    pub event_type: &'static str,
    /// Optional free-form detail.
    pub message: Option<String>,
  }

  impl fmt::Debug for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("TelemetryEvent")
        .field("seq", &self.seq_id)
        .field("os_tid", &self.os_thread_id)
        .field("item_id", &self.item_id)
        .field("loc", &self.location)
        .field("evt", &self.event_type)
        .field("msg", &self.message.as_deref().unwrap_or(""))
        .finish()
    }
  }

  type CounterKey = (&'static str, &'static str); // (location, counter_name)

  struct CollectorData {
    events: Vec<TelemetryEvent>,
    counters: HashMap<CounterKey, usize>,
    start_time: Instant,
  }

  impl CollectorData {
    fn new() -> Self {
      CollectorData {
        events: Vec::new(),
        counters: HashMap::new(),
        start_time: Instant::now(),
      }
    }
  }

  lazy_static::lazy_static! {
      static ref GLOBAL_COLLECTOR: Mutex<CollectorData> = Mutex::new(CollectorData::new());
  }

  /// Records an event.
  pub fn log_event_fn(
    item_id: Option<usize>,
    location: &'static str,
    event_type: &'static str,
    message: Option<String>,
  ) {
    let event = TelemetryEvent {
      seq_id: NEXT_EVENT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
      timestamp: Instant::now(),
      os_thread_id: thread::current().id(),
      item_id,
      location,
      event_type,
      message,
    };
    GLOBAL_COLLECTOR.lock().events.push(event);
  }

  /// Bumps the named counter for `location`.
  pub fn increment_counter_fn(location: &'static str, counter_name: &'static str) {
    *GLOBAL_COLLECTOR
      .lock()
      .counters
      .entry((location, counter_name))
      .or_insert(0) += 1;
  }

  /// Copies out the events recorded so far, ordered by sequence id.
  pub fn events_fn() -> Vec<TelemetryEvent> {
    let mut events = GLOBAL_COLLECTOR.lock().events.clone();
    events.sort_by_key(|e| e.seq_id);
    events
  }

  /// Current value of the named counter, `0` if never incremented.
  pub fn counter_fn(location: &'static str, counter_name: &'static str) -> usize {
    GLOBAL_COLLECTOR
      .lock()
      .counters
      .get(&(location, counter_name))
      .copied()
      .unwrap_or(0)
  }

  /// Prints every recorded event and counter to stdout.
  pub fn print_telemetry_report_fn() {
    let collector = GLOBAL_COLLECTOR.lock();
    println!("\n--- Fibre Combine Telemetry Report (Feature: fibre_telemetry) ---");
    println!("Report generated at: {:?}", Instant::now());
    println!("Collection started at: {:?}", collector.start_time);

    if collector.events.is_empty() {
      println!("\n[Events] No detailed events recorded.");
    } else {
      println!("\n[Events] Recorded Events ({}):", collector.events.len());
      let mut sorted_events = collector.events.clone();
      sorted_events.sort_by_key(|e| e.seq_id);

      for event in sorted_events.iter() {
        let time_since_start = event.timestamp.duration_since(collector.start_time);
        let os_tid_short = format!("{:?}", event.os_thread_id)
          .trim_start_matches("ThreadId(")
          .trim_end_matches(')')
          .to_string();

        println!(
          "  +{:<10.6}s [Seq:{:<5}] OS_TID:{:<6} Item:{:<6} Loc:{:<25} Evt:{:<30} Msg: {}",
          time_since_start.as_secs_f64(),
          event.seq_id,
          os_tid_short,
          event.item_id.map_or_else(|| "N/A".to_string(), |id| id.to_string()),
          event.location,
          event.event_type,
          event.message.as_deref().unwrap_or("")
        );
      }
    }

    if collector.counters.is_empty() {
      println!("\n[Counters] No counters recorded.");
    } else {
      println!("\n[Counters] Recorded Counters ({}):", collector.counters.len());
      let mut sorted_counters: Vec<_> = collector.counters.iter().collect();
      sorted_counters.sort_by_key(|(k, _v)| *k);
      for ((loc, name), count) in sorted_counters {
        println!("  Loc:{:<25} Counter:{:<30} Value: {}", loc, name, count);
      }
    }
    println!("\n--- End of Telemetry Report ---");
  }

  /// Drops all recorded events and counters and restarts the clock.
  pub fn clear_telemetry_fn() {
    let mut collector = GLOBAL_COLLECTOR.lock();
    collector.events.clear();
    collector.counters.clear();
    collector.start_time = Instant::now();
    NEXT_EVENT_SEQUENCE_ID.store(0, Ordering::Relaxed);
  }
} // mod enabled

#[cfg(not(feature = "fibre_telemetry"))]
/// No-op implementation used without the `fibre_telemetry` feature.
pub mod disabled {
  /// Does nothing.
  #[inline(always)]
  pub fn log_event_fn(
    _item_id: Option<usize>,
    _location: &'static str,
    _event_type: &'static str,
    _message: Option<String>,
  ) {
  }
  /// Does nothing.
  #[inline(always)]
  pub fn increment_counter_fn(_location: &'static str, _counter_name: &'static str) {}
  /// Does nothing.
  #[inline(always)]
  pub fn print_telemetry_report_fn() {}
  /// Does nothing.
  #[inline(always)]
  pub fn clear_telemetry_fn() {}
}

#[cfg(feature = "fibre_telemetry")]
pub use enabled::{
  clear_telemetry_fn as clear_telemetry, counter_fn as counter, events_fn as events,
  increment_counter_fn as increment_counter, log_event_fn as log_event,
  print_telemetry_report_fn as print_telemetry_report, TelemetryEvent,
};

#[cfg(not(feature = "fibre_telemetry"))]
pub use disabled::{
  clear_telemetry_fn as clear_telemetry, increment_counter_fn as increment_counter,
  log_event_fn as log_event, print_telemetry_report_fn as print_telemetry_report,
};
