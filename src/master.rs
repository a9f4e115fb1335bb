//! Master: resolves the index, runs the worker pool and tracks completion.

use std::{collections::BTreeSet, sync::Arc, time::Instant};

use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    index::{self, Index},
    worker::{Job, Worker},
};

/// Capacity of the job channel. Seeding uses a non-blocking put; a year that
/// does not fit is dropped with a warning and only surfaces again as a
/// deadline failure.
const JOB_QUEUE_CAPACITY: usize = 64;

struct WorkerRecord {
    number: usize,
    handle: JoinHandle<anyhow::Result<()>>,
}

pub struct Master {
    conf: Arc<Config>,
    jobs_tx: Option<mpsc::Sender<Job>>,
    jobs_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    done_tx: mpsc::UnboundedSender<String>,
    done_rx: mpsc::UnboundedReceiver<String>,
    workers: Vec<WorkerRecord>,
    cancel: CancellationToken,
}

impl Master {
    pub fn new(conf: Arc<Config>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel(JOB_QUEUE_CAPACITY);
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        Master {
            conf,
            jobs_tx: Some(jobs_tx),
            jobs_rx: Arc::new(Mutex::new(jobs_rx)),
            done_tx,
            done_rx,
            workers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Master loop.
    ///
    /// Resolves the index, spawns the worker pool, enqueues one job per
    /// pending year and polls for completions until the pending set drains,
    /// the deadline expires or a worker dies. `stop` is not called here; the
    /// caller runs it unconditionally afterwards.
    pub async fn start(&mut self) -> Result<()> {
        let index = index::fetch_index(&self.conf.url, &self.conf.index_regex).await?;
        self.spawn_workers();

        let mut pending = self.pending_years(&index)?;
        self.seed_jobs(&pending, &index);

        let started = Instant::now();
        loop {
            if started.elapsed() > self.conf.run_time_max {
                return Err(Error::DeadlineExceeded(pending.into_iter().collect()));
            }

            if let Some(number) = self.dead_worker() {
                return Err(Error::WorkerDied(number));
            }

            self.drain_completions(&mut pending);

            if pending.is_empty() {
                info!("all done");
                return Ok(());
            }

            info!(?pending, "waiting for completions");
            sleep(self.conf.polling_timeout).await;
        }
    }

    /// Best-effort two-phase shutdown; never fails.
    ///
    /// Closes both channels, signals a graceful terminate, waits the grace
    /// period and aborts whatever is still running.
    pub async fn stop(&mut self) {
        info!("shutting down master");

        // No further enqueue or dequeue once the channels are closed.
        self.jobs_tx.take();
        self.done_rx.close();

        info!("trying to terminate workers");
        self.cancel.cancel();
        sleep(self.conf.terminate_timeout).await;

        if self.workers.iter().all(|w| w.handle.is_finished()) {
            return;
        }

        warn!("some workers did not stop; aborting all of them");
        for worker in &self.workers {
            if !worker.handle.is_finished() {
                worker.handle.abort();
            }
        }
    }

    fn spawn_workers(&mut self) {
        for number in 0..self.conf.workers_count {
            let worker = Worker::new(
                number,
                Arc::clone(&self.conf),
                Arc::clone(&self.jobs_rx),
                self.done_tx.clone(),
                self.cancel.clone(),
            );
            let handle = tokio::spawn(worker.run());
            self.workers.push(WorkerRecord { number, handle });
        }

        info!(count = self.workers.len(), "workers spawned");
    }

    /// Drains every completion signal currently queued, shrinking the
    /// pending set. Removal is idempotent, so duplicate signals for the same
    /// year are no-ops.
    fn drain_completions(&mut self, pending: &mut BTreeSet<String>) {
        while let Ok(year) = self.done_rx.try_recv() {
            pending.remove(&year);
        }
    }

    /// Intersects the requested years with the index, warning about the
    /// unavailable ones. Fails when nothing is left to do.
    fn pending_years(&self, index: &Index) -> Result<BTreeSet<String>> {
        let (available, unavailable): (Vec<String>, Vec<String>) = self
            .conf
            .years
            .iter()
            .cloned()
            .partition(|year| index.contains_key(year));

        if !unavailable.is_empty() {
            warn!(
                ?unavailable,
                available = ?index.values().collect::<Vec<_>>(),
                "some requested years are not in the index"
            );
        }

        if available.is_empty() {
            return Err(Error::NoWork(self.conf.years.clone()));
        }

        Ok(available.into_iter().collect())
    }

    /// Enqueues one job per pending year with a non-blocking put.
    fn seed_jobs(&self, pending: &BTreeSet<String>, index: &Index) {
        let Some(jobs) = &self.jobs_tx else { return };

        for year in pending {
            let Some(filename) = index.get(year) else {
                continue;
            };

            let job = Job {
                year: year.clone(),
                filename: filename.clone(),
            };
            if let Err(err) = jobs.try_send(job) {
                warn!(year = year.as_str(), %err, "cannot enqueue job; dropping the year");
            }
        }
    }

    fn dead_worker(&self) -> Option<usize> {
        self.workers
            .iter()
            .find(|w| w.handle.is_finished())
            .map(|w| w.number)
    }
}

// -- Tests -------------------------------------------------------------------
