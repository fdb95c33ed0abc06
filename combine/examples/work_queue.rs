// examples/work_queue.rs
use fibre_combine::{FlatCombiningQueue, WaitStrategy};
use std::{
  sync::atomic::{AtomicBool, AtomicUsize, Ordering},
  sync::Arc,
  thread,
};

fn main() {
  println!("--- Flat Combining: Shared Work Queue ---");

  let queue = Arc::new(
    FlatCombiningQueue::<String>::builder()
      .slots(4)
      .wait_strategy(WaitStrategy::Backoff)
      .build()
      .expect("valid queue configuration"),
  );
  let num_producers = 4;
  let jobs_per_producer = 5;
  let total_jobs = num_producers * jobs_per_producer;
  let processed = Arc::new(AtomicUsize::new(0));
  let producers_done = Arc::new(AtomicBool::new(false));

  let producers: Vec<_> = (0..num_producers)
    .map(|p| {
      let queue = Arc::clone(&queue);
      thread::spawn(move || {
        for j in 0..jobs_per_producer {
          let job = format!("job-P{}-{}", p, j);
          println!("[Producer {}] Enqueue: {}", p, job);
          queue.enqueue(job);
        }
      })
    })
    .collect();

  let workers: Vec<_> = (0..3)
    .map(|w| {
      let queue = Arc::clone(&queue);
      let processed = Arc::clone(&processed);
      let producers_done = Arc::clone(&producers_done);
      thread::spawn(move || loop {
        match queue.dequeue() {
          Some(job) => {
            println!("[Worker {}] Processing: {}", w, job);
            processed.fetch_add(1, Ordering::Relaxed);
          }
          None if producers_done.load(Ordering::Acquire) => break,
          None => thread::yield_now(),
        }
      })
    })
    .collect();

  for handle in producers {
    handle.join().unwrap();
  }
  producers_done.store(true, Ordering::Release);
  for handle in workers {
    handle.join().unwrap();
  }

  assert_eq!(processed.load(Ordering::Relaxed), total_jobs);
  println!("\nProcessed {} jobs.", total_jobs);
  println!("Metrics: {:?}", queue.metrics());
  println!(
    "Share of operations serviced through slots: {:.1}%",
    queue.metrics().combining_ratio() * 100.0
  );
}
