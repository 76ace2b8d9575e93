//! Background batch prefetching.

use crate::{
    assembler::{AssemblyTiming, BatchAssembler},
    batch::Batch,
    common::*,
};
use std::ops::Deref;

/// The default number of batch buffers in the pool.
pub const DEFAULT_POOL_SIZE: usize = 3;

const WORKER_NAME: &str = "box-data-prefetch";

/// The initializer of [PrefetchScheduler].
#[derive(Debug)]
pub struct PrefetchSchedulerInit {
    pub assembler: BatchAssembler,
    /// The number of batch buffers. It must be at least 2.
    pub pool_size: usize,
    /// If set, log the average timing per this number of batches.
    pub timing_report_interval: Option<NonZeroUsize>,
}

impl PrefetchSchedulerInit {
    pub fn new(assembler: BatchAssembler) -> Self {
        Self {
            assembler,
            pool_size: DEFAULT_POOL_SIZE,
            timing_report_interval: None,
        }
    }

    pub fn build(self) -> Result<PrefetchScheduler> {
        let Self {
            assembler,
            pool_size,
            timing_report_interval,
        } = self;

        ensure!(
            pool_size >= 2,
            "the pool size must be at least 2, but get {}",
            pool_size
        );

        // allocate the pool according to the current record
        let (free_tx, free_rx) = flume::bounded(pool_size);
        for _ in 0..pool_size {
            let batch = assembler.allocate_batch()?;
            free_tx.send(batch).map_err(|_| format_err!("free pool is closed"))?;
        }
        let (ready_tx, ready_rx) = flume::bounded(pool_size - 1);

        let stop = Arc::new(AtomicBool::new(false));
        let filled = Arc::new(AtomicUsize::new(0));

        let worker = {
            let worker = Worker {
                assembler,
                free_rx,
                ready_tx,
                stop: stop.clone(),
                filled: filled.clone(),
                timing_report_interval,
            };
            thread::Builder::new()
                .name(WORKER_NAME.into())
                .spawn(move || worker.run())
                .with_context(|| format!("failed to spawn the '{}' thread", WORKER_NAME))?
        };

        Ok(PrefetchScheduler {
            free_tx: Some(free_tx),
            ready_rx: Some(ready_rx),
            worker: Some(worker),
            stop,
            filled,
            pool_size,
        })
    }
}

/// A snapshot of the prefetching progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchStats {
    /// The number of batches filled by the worker so far.
    pub batches_filled: usize,
    /// The number of filled batches waiting for the consumer.
    pub ready_len: usize,
}

/// Fills batches on a background worker and hands them to the consumer
/// in fill order.
///
/// The worker owns the [BatchAssembler]. A pool of `pool_size` buffers
/// circulates between a free pool and a ready queue of capacity
/// `pool_size - 1`, so the worker blocks once the consumer falls behind.
#[derive(Debug)]
pub struct PrefetchScheduler {
    free_tx: Option<flume::Sender<Batch>>,
    ready_rx: Option<flume::Receiver<Result<Batch>>>,
    worker: Option<JoinHandle<BatchAssembler>>,
    stop: Arc<AtomicBool>,
    filled: Arc<AtomicUsize>,
    pool_size: usize,
}

impl PrefetchScheduler {
    /// Block until the next batch is filled.
    pub fn next_batch(&self) -> Result<BatchGuard<'_>> {
        let ready_rx = self.ready_rx()?;
        let batch = ready_rx
            .recv()
            .map_err(|_| format_err!("the prefetch worker has stopped"))??;
        self.guard(batch)
    }

    /// Wait for the next batch without blocking the executor.
    pub async fn next_batch_async(&self) -> Result<BatchGuard<'_>> {
        let ready_rx = self.ready_rx()?;
        let batch = ready_rx
            .recv_async()
            .await
            .map_err(|_| format_err!("the prefetch worker has stopped"))??;
        self.guard(batch)
    }

    pub fn stats(&self) -> PrefetchStats {
        PrefetchStats {
            batches_filled: self.filled.load(Ordering::SeqCst),
            ready_len: self.ready_rx.as_ref().map(|rx| rx.len()).unwrap_or(0),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Stop the worker after its current batch and take back the assembler.
    pub fn stop(mut self) -> Result<BatchAssembler> {
        self.shutdown()?
            .ok_or_else(|| format_err!("the prefetch worker is already stopped"))
    }

    fn ready_rx(&self) -> Result<&flume::Receiver<Result<Batch>>> {
        self.ready_rx
            .as_ref()
            .ok_or_else(|| format_err!("the prefetch worker has stopped"))
    }

    fn guard(&self, batch: Batch) -> Result<BatchGuard<'_>> {
        let free_tx = self
            .free_tx
            .as_ref()
            .ok_or_else(|| format_err!("the prefetch worker has stopped"))?;
        Ok(BatchGuard {
            batch: Some(batch),
            free_tx,
        })
    }

    fn shutdown(&mut self) -> Result<Option<BatchAssembler>> {
        self.stop.store(true, Ordering::SeqCst);

        // wake up the worker if it is blocked on either channel
        self.free_tx = None;
        self.ready_rx = None;

        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return Ok(None),
        };
        let assembler = worker
            .join()
            .map_err(|_| format_err!("the prefetch worker panicked"))?;
        info!(
            "prefetching stopped after {} batches",
            self.filled.load(Ordering::SeqCst)
        );
        Ok(Some(assembler))
    }
}

impl Drop for PrefetchScheduler {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("{:#}", err);
        }
    }
}

/// A filled batch borrowed from the scheduler.
///
/// The buffer goes back to the free pool when the guard is dropped.
#[derive(Debug)]
pub struct BatchGuard<'a> {
    batch: Option<Batch>,
    free_tx: &'a flume::Sender<Batch>,
}

impl BatchGuard<'_> {
    /// Return the buffer to the free pool.
    pub fn release(self) {}
}

impl Deref for BatchGuard<'_> {
    type Target = Batch;

    fn deref(&self) -> &Self::Target {
        // the batch is taken only on drop
        self.batch.as_ref().unwrap()
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            // the worker may be gone already
            let _ = self.free_tx.send(batch);
        }
    }
}

#[derive(Debug)]
struct Worker {
    assembler: BatchAssembler,
    free_rx: flume::Receiver<Batch>,
    ready_tx: flume::Sender<Result<Batch>>,
    stop: Arc<AtomicBool>,
    filled: Arc<AtomicUsize>,
    timing_report_interval: Option<NonZeroUsize>,
}

impl Worker {
    fn run(self) -> BatchAssembler {
        let Self {
            mut assembler,
            free_rx,
            ready_tx,
            stop,
            filled,
            timing_report_interval,
        } = self;
        let mut window = AssemblyTiming::default();

        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            let mut batch = match free_rx.recv() {
                Ok(batch) => batch,
                Err(_) => break,
            };
            if stop.load(Ordering::SeqCst) {
                break;
            }

            let timing = match assembler.fill(&mut batch) {
                Ok(timing) => timing,
                Err(err) => {
                    warn!("failed to fill a batch: {:#}", err);
                    let _ = ready_tx.send(Err(err));
                    break;
                }
            };
            let count = filled.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(interval) = timing_report_interval {
                window += timing;
                if count % interval.get() == 0 {
                    let n = interval.get() as u32;
                    info!(
                        "average over {} batches: batch {:?}, read {:?}, transform {:?}",
                        n,
                        window.batch / n,
                        window.read / n,
                        window.transform / n
                    );
                    window = AssemblyTiming::default();
                }
            }

            if ready_tx.send(Ok(batch)).is_err() {
                break;
            }
        }

        debug!("prefetch worker exits");
        assembler
    }
}
