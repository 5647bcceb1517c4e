//! Generic batch executor: fans item-level work out to a fixed worker pool,
//! retries transient failures, and yields results one batch at a time.
//!
//! The worker pool shape (crossbeam channels, panics caught on the worker
//! side and resumed on the submitting side) mirrors how chunk generation is
//! farmed out to worker threads elsewhere in this codebase; the difference
//! here is that work is batched and a batch boundary is a synchronization
//! point, so peak memory stays bounded by `max_workers` in-flight items
//! rather than the whole item list. Batches are produced by a lazy
//! `Iterator`: nothing beyond the current batch is submitted to the worker
//! pool until the caller asks for the next one, so a caller that stops
//! iterating early halts further submission (in-flight workers finish the
//! batch already in progress).

use crossbeam_channel::{Receiver, Sender};
use std::{
    any::Any,
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

/// Tunables for `BatchExecutor`.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub max_workers: usize,
    pub batch_size: usize,
    pub retry_count: usize,
    pub log_progress: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig { max_workers: 16, batch_size: 4, retry_count: 3, log_progress: false }
    }
}

/// Observable counters, shared between the executor and its worker pool.
#[derive(Default)]
pub struct ExecutorStatistics {
    processed_count: AtomicUsize,
    failed_count: AtomicUsize,
    current_batch: AtomicUsize,
}

impl ExecutorStatistics {
    pub fn processed_count(&self) -> usize {
        self.processed_count.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn current_batch(&self) -> usize {
        self.current_batch.load(Ordering::Relaxed)
    }
}

enum Task<I> {
    Run(usize, I),
}

enum TaskResult<O> {
    Done(usize, Option<O>),
    Panicked(Box<dyn Any + Send + 'static>),
}

/// A fixed-size worker pool that runs `worker_fn` on items submitted to it,
/// retrying on failure up to `retry_count - 1` additional times.
///
/// Not `Clone`; construct one per `process_items` call — workers exit once
/// the task channel is dropped.
struct WorkerPool<I, O> {
    send_task: Sender<Task<I>>,
    recv_result: Receiver<TaskResult<O>>,
    _handles: Vec<thread::JoinHandle<()>>,
}

impl<I, O> WorkerPool<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn new<F>(worker_count: usize, retry_count: usize, worker_fn: Arc<F>) -> Self
    where
        F: Fn(&I) -> Result<O, Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
    {
        let (send_task, recv_task) = crossbeam_channel::unbounded::<Task<I>>();
        let (send_result, recv_result) = crossbeam_channel::unbounded::<TaskResult<O>>();

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let recv_task = recv_task.clone();
            let send_result = send_result.clone();
            let worker_fn = Arc::clone(&worker_fn);
            let retry_count = retry_count.max(1);

            handles.push(thread::spawn(move || {
                let loop_result = catch_unwind(AssertUnwindSafe(|| {
                    while let Ok(Task::Run(index, item)) = recv_task.recv() {
                        let mut attempt_result = worker_fn(&item);
                        for _ in 1..retry_count {
                            if attempt_result.is_ok() {
                                break;
                            }
                            attempt_result = worker_fn(&item);
                        }
                        let out = attempt_result.ok();
                        if send_result.send(TaskResult::Done(index, out)).is_err() {
                            tracing::trace!("executor result sender disconnected, terminating worker");
                            break;
                        }
                    }
                }));
                if let Err(panic) = loop_result {
                    tracing::error!("executor worker panicked, sending panic to submitter");
                    let _ = send_result.send(TaskResult::Panicked(panic));
                }
            }));
        }

        WorkerPool { send_task, recv_result, _handles: handles }
    }

    fn run_batch(&self, items: Vec<I>) -> Vec<Option<O>> {
        let count = items.len();
        for (index, item) in items.into_iter().enumerate() {
            if self.send_task.send(Task::Run(index, item)).is_err() {
                panic!("executor task sender disconnected while submitting a batch");
            }
        }

        let mut results: Vec<Option<O>> = (0..count).map(|_| None).collect();
        let mut remaining = count;
        while remaining > 0 {
            match self.recv_result.recv() {
                Ok(TaskResult::Done(index, out)) => {
                    results[index] = out;
                    remaining -= 1;
                }
                Ok(TaskResult::Panicked(panic)) => resume_unwind(panic),
                Err(_) => panic!("executor result receiver disconnected mid-batch"),
            }
        }
        results
    }
}

/// A lazy stream of non-empty batch outputs. Pulling the next item submits
/// (at most) one more batch of `batch_size` items to the worker pool and
/// blocks until that batch drains; dropping the stream before it's
/// exhausted simply never submits the remaining items.
pub struct BatchStream<I, O, Filt> {
    pool: WorkerPool<I, O>,
    items: std::vec::IntoIter<I>,
    batch_size: usize,
    log_progress: bool,
    filter_fn: Option<Filt>,
    stats: Arc<ExecutorStatistics>,
    batch_index: usize,
}

impl<I, O, Filt> Iterator for BatchStream<I, O, Filt>
where
    I: Send + 'static,
    O: Send + 'static,
    Filt: Fn(&O) -> bool,
{
    type Item = Vec<O>;

    fn next(&mut self) -> Option<Vec<O>> {
        loop {
            let mut batch = Vec::with_capacity(self.batch_size);
            for _ in 0..self.batch_size {
                match self.items.next() {
                    Some(item) => batch.push(item),
                    None => break,
                }
            }
            if batch.is_empty() {
                return None;
            }

            self.batch_index += 1;
            self.stats.current_batch.store(self.batch_index, Ordering::Relaxed);
            if self.log_progress {
                tracing::debug!(batch = self.batch_index, size = batch.len(), "processing batch");
            }

            let results = self.pool.run_batch(batch);

            let mut succeeded = 0;
            let mut output = Vec::new();
            for result in results {
                match result {
                    Some(value) => {
                        succeeded += 1;
                        let keep = self.filter_fn.as_ref().map_or(true, |f| f(&value));
                        if keep {
                            output.push(value);
                        }
                    }
                    None => {
                        self.stats.failed_count.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            self.stats.processed_count.fetch_add(succeeded, Ordering::Relaxed);

            // still advance progress on an empty batch, but don't yield it
            if !output.is_empty() {
                return Some(output);
            }
        }
    }
}

/// Fan `items` out to a worker pool in fixed-size batches, retrying
/// failures. Returns a lazy stream of non-empty batch outputs (in input
/// order) and the shared statistics handle — stopping iteration over the
/// stream halts submission of any batch not already in flight.
///
/// `worker_fn` returning `Err` counts as a failed attempt; exhausting
/// retries drops the item and increments `failed_count`. `filter_fn`, if
/// given, is applied to successful outputs before they're kept.
pub fn process_items<I, O, F, Filt>(
    items: Vec<I>,
    config: &ExecutorConfig,
    worker_fn: F,
    filter_fn: Option<Filt>,
) -> (BatchStream<I, O, Filt>, Arc<ExecutorStatistics>)
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(&I) -> Result<O, Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
    Filt: Fn(&O) -> bool,
{
    let stats = Arc::new(ExecutorStatistics::default());
    let worker_count = config.max_workers.max(1);
    let pool = WorkerPool::new(worker_count, config.retry_count, Arc::new(worker_fn));

    let stream = BatchStream {
        pool,
        items: items.into_iter(),
        batch_size: config.batch_size.max(1),
        log_progress: config.log_progress,
        filter_fn,
        stats: Arc::clone(&stats),
        batch_index: 0,
    };

    (stream, stats)
}

#[test]
fn test_process_items_batches_and_counts_statistics() {
    let items: Vec<i32> = (0..10).collect();
    let config = ExecutorConfig { max_workers: 4, batch_size: 3, retry_count: 1, log_progress: false };

    let (stream, stats) = process_items(
        items,
        &config,
        |n: &i32| Ok::<_, Box<dyn std::error::Error + Send + Sync>>(n * 2),
        None::<fn(&i32) -> bool>,
    );

    let mut all: Vec<i32> = stream.flatten().collect();
    all.sort_unstable();
    assert_eq!(all, (0..10).map(|n| n * 2).collect::<Vec<_>>());
    assert_eq!(stats.processed_count(), 10);
    assert_eq!(stats.failed_count(), 0);
    assert_eq!(stats.current_batch(), 4); // ceil(10 / 3)
}

#[test]
fn test_process_items_retries_then_fails_permanently() {
    use std::sync::atomic::AtomicUsize as Counter;

    let attempts: Arc<Counter> = Arc::new(Counter::new(0));
    let items = vec![1i32];
    let config = ExecutorConfig { max_workers: 1, batch_size: 1, retry_count: 3, log_progress: false };

    let attempts_clone = Arc::clone(&attempts);
    let (stream, stats) = process_items(
        items,
        &config,
        move |_n: &i32| {
            attempts_clone.fetch_add(1, Ordering::Relaxed);
            Err::<i32, _>("always fails".into())
        },
        None::<fn(&i32) -> bool>,
    );

    let batches: Vec<Vec<i32>> = stream.collect();
    assert!(batches.is_empty());
    assert_eq!(stats.failed_count(), 1);
    assert_eq!(attempts.load(Ordering::Relaxed), 3);
}

#[test]
fn test_filter_fn_drops_unwanted_successes() {
    let items: Vec<i32> = vec![1, 2, 3, 4];
    let config = ExecutorConfig { max_workers: 2, batch_size: 4, retry_count: 1, log_progress: false };

    let (stream, _) = process_items(
        items,
        &config,
        |n: &i32| Ok::<_, Box<dyn std::error::Error + Send + Sync>>(*n),
        Some(|n: &i32| n % 2 == 0),
    );

    let mut all: Vec<i32> = stream.flatten().collect();
    all.sort_unstable();
    assert_eq!(all, vec![2, 4]);
}

#[test]
fn test_stream_stops_submitting_once_dropped() {
    // three batches of one item each; only pull the first, then drop the
    // stream -- the remaining two items must never reach the worker fn.
    use std::sync::atomic::AtomicUsize as Counter;

    let calls: Arc<Counter> = Arc::new(Counter::new(0));
    let items = vec![1i32, 2, 3];
    let config = ExecutorConfig { max_workers: 1, batch_size: 1, retry_count: 1, log_progress: false };

    let calls_clone = Arc::clone(&calls);
    let (mut stream, _) = process_items(
        items,
        &config,
        move |n: &i32| {
            calls_clone.fetch_add(1, Ordering::Relaxed);
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(*n)
        },
        None::<fn(&i32) -> bool>,
    );

    assert!(stream.next().is_some());
    drop(stream);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}
