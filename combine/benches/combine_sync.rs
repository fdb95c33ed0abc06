// benches/combine_sync.rs

use bench_matrix::{criterion_runner::sync_suite::SyncBenchmarkSuite, AbstractCombination, MatrixCellValue};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use fibre_combine::{FlatCombiningQueue, MutexQueue, Queue};
use std::{
  sync::{Arc, Barrier},
  thread::{self, available_parallelism},
  time::{Duration, Instant},
};

const ITEM_VALUE: u64 = 42;

// --- Config, State, Context ---
#[derive(Debug, Clone)]
struct QueueBenchConfig {
  kind: String,
  slots: usize,
  threads: usize,
  ops_per_thread: usize,
}

#[derive(Default, Debug)]
struct BenchContext {
  actual_ops_total: usize,
}

#[derive(Clone)]
struct QueueBenchState;

// --- Extractor Function ---
fn extract_queue_config(combo: &AbstractCombination) -> Result<QueueBenchConfig, String> {
  let kind = combo.get_string(0)?.to_string();
  let slots = combo.get_u64(1)? as usize;
  let threads = combo.get_u64(2)? as usize;
  let ops_per_thread = combo.get_u64(3)? as usize;

  if threads == 0 {
    return Err("Number of threads must be at least 1.".to_string());
  }
  // The slot axis only applies to the combining queue; skip duplicate mutex cells.
  if kind == "Mutex" && slots != 3 {
    return Err("Mutex baseline has no slot array.".to_string());
  }

  Ok(QueueBenchConfig {
    kind,
    slots,
    threads,
    ops_per_thread,
  })
}

// --- Setup Function ---
fn setup_fn_queue(_cfg: &QueueBenchConfig) -> Result<(BenchContext, QueueBenchState), String> {
  Ok((BenchContext::default(), QueueBenchState))
}

/// Every thread alternates enqueue and dequeue so the queue stays shallow
/// and every operation contends on the same structure.
fn run_pairs<Q>(queue: Arc<Q>, threads: usize, ops_per_thread: usize) -> Duration
where
  Q: Queue<u64> + Send + Sync + 'static,
{
  let barrier = Arc::new(Barrier::new(threads + 1));
  let handles: Vec<_> = (0..threads)
    .map(|_| {
      let queue = Arc::clone(&queue);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        for _ in 0..ops_per_thread / 2 {
          queue.enqueue(ITEM_VALUE);
          let _ = queue.dequeue();
        }
      })
    })
    .collect();

  barrier.wait();
  let start_time = Instant::now();
  for handle in handles {
    handle.join().expect("queue bench thread panicked");
  }
  start_time.elapsed()
}

// --- Benchmark Logic ---
fn benchmark_logic_queue(
  mut ctx: BenchContext,
  state: QueueBenchState,
  cfg: &QueueBenchConfig,
) -> (BenchContext, QueueBenchState, Duration) {
  let duration = if cfg.kind == "Mutex" {
    run_pairs(Arc::new(MutexQueue::new()), cfg.threads, cfg.ops_per_thread)
  } else {
    let queue = FlatCombiningQueue::builder()
      .slots(cfg.slots)
      .build()
      .expect("valid bench configuration");
    run_pairs(Arc::new(queue), cfg.threads, cfg.ops_per_thread)
  };

  ctx.actual_ops_total += cfg.threads * cfg.ops_per_thread;
  (ctx, state, duration)
}

// --- Teardown Function ---
fn teardown_queue(_ctx: BenchContext, _state: QueueBenchState, _cfg: &QueueBenchConfig) {}

// --- Main Benchmark Suite ---
fn combine_sync_benches(c: &mut Criterion) {
  let core_count = available_parallelism().map(|n| n.get() as u64).unwrap_or(4);
  let parameter_axes = vec![
    vec![
      // Axis 0: Queue kind
      MatrixCellValue::String("FlatCombining".to_string()),
      MatrixCellValue::String("Mutex".to_string()),
    ],
    vec![
      // Axis 1: Slots
      MatrixCellValue::Unsigned(3),
      MatrixCellValue::Unsigned(16),
    ],
    vec![
      // Axis 2: Threads
      MatrixCellValue::Unsigned(1),
      MatrixCellValue::Unsigned(4),
      MatrixCellValue::Unsigned(core_count),
    ],
    vec![
      // Axis 3: Ops per thread
      MatrixCellValue::Unsigned(100_000),
    ],
  ];
  let parameter_names = vec!["Kind", "Slots", "Threads", "Ops"]
    .into_iter()
    .map(String::from)
    .collect();

  SyncBenchmarkSuite::new(
    c,
    "CombineSync".to_string(),
    Some(parameter_names),
    parameter_axes,
    Box::new(extract_queue_config),
    setup_fn_queue,
    benchmark_logic_queue,
    teardown_queue,
  )
  .throughput(|cfg: &QueueBenchConfig| Throughput::Elements((cfg.threads * cfg.ops_per_thread) as u64))
  .run();
}

criterion_group!(benches, combine_sync_benches);
criterion_main!(benches);
