//! Worker-thread batch loading over bounded channels
//!
//! A dispatcher thread feeds planned batches into a job queue of depth
//! `workers * prefetch_factor`; workers materialise the examples and send
//! them back through a result queue of the same depth. Both queues block
//! when full. Results are re-sequenced so batches come out in plan order.

use super::plan::PlannedBatch;
use crate::data::example::Example;
use crate::data::source::ExampleSource;
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

struct Job {
    seq: usize,
    indices: Vec<usize>,
}

type Loaded = (usize, Result<Vec<Example>>);

/// Load every example of a planned batch
pub(crate) fn load_batch(source: &dyn ExampleSource, indices: &[usize]) -> Result<Vec<Example>> {
    indices.iter().map(|&i| source.load(i)).collect()
}

/// Background loader for one epoch's remaining batches
pub struct Prefetcher {
    results: Option<Receiver<Loaded>>,
    pending: BTreeMap<usize, Result<Vec<Example>>>,
    next_seq: usize,
    total: usize,
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Prefetcher {
    /// Start `workers` loader threads (plus a dispatcher) over `batches`
    pub fn spawn(
        source: Arc<dyn ExampleSource>,
        batches: Vec<PlannedBatch>,
        workers: usize,
        prefetch_factor: usize,
    ) -> Self {
        let workers = workers.max(1);
        let depth = (workers * prefetch_factor).max(1);
        let total = batches.len();
        let stop = Arc::new(AtomicBool::new(false));

        let (job_tx, job_rx) = sync_channel::<Job>(depth);
        let (result_tx, result_rx) = sync_channel::<Loaded>(depth);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut threads = Vec::with_capacity(workers + 1);

        let dispatch_stop = Arc::clone(&stop);
        threads.push(std::thread::spawn(move || {
            for (seq, batch) in batches.into_iter().enumerate() {
                if dispatch_stop.load(Ordering::Relaxed) {
                    break;
                }
                if job_tx.send(Job { seq, indices: batch.indices }).is_err() {
                    break;
                }
            }
        }));

        for worker in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let source = Arc::clone(&source);
            let stop = Arc::clone(&stop);
            threads.push(std::thread::spawn(move || loop {
                let job = {
                    let Ok(rx) = job_rx.lock() else { break };
                    match rx.recv() {
                        Ok(job) => job,
                        Err(_) => break,
                    }
                };
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let loaded = load_batch(source.as_ref(), &job.indices);
                if result_tx.send((job.seq, loaded)).is_err() {
                    tracing::trace!(worker, "result queue closed");
                    break;
                }
            }));
        }

        Self { results: Some(result_rx), pending: BTreeMap::new(), next_seq: 0, total, stop, threads }
    }

    /// Next batch in plan order, or `None` once all have been delivered
    pub fn next(&mut self) -> Option<Result<Vec<Example>>> {
        if self.next_seq >= self.total {
            return None;
        }
        loop {
            if let Some(loaded) = self.pending.remove(&self.next_seq) {
                self.next_seq += 1;
                return Some(loaded);
            }
            let received = self.results.as_ref()?.recv();
            match received {
                Ok((seq, loaded)) => {
                    self.pending.insert(seq, loaded);
                }
                Err(_) => {
                    // Workers are gone; nothing more can arrive
                    self.next_seq = self.total;
                    return None;
                }
            }
        }
    }

    /// Batches buffered out of order
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.results.take();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("loader thread panicked");
            }
        }
    }
}
