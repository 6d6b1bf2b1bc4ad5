//! Owns the generator and matcher threads.
//!
//! Shutdown closes the queue before anything else, so the matcher stops
//! without taking further input no matter when the generator exits. The
//! supervisor keeps a producer of its own until then; otherwise the
//! generator's exit would let the matcher drain and disconnect first.
//!
//! Workers acknowledge their exit over a one-shot channel so shutdown can
//! be bounded: a worker that has not acknowledged within the grace period
//! is reported as fatal and left detached instead of joined. Dropping a
//! `Supervisor` without calling [`Supervisor::shutdown`] still signals
//! both workers and joins whichever ones acknowledge in time.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use twin_core::{MatchEngine, MatcherWorker, MonotonicClock, Record, TracingSink, WorkerReport};
use twin_queue::{CloseHandle, Producer};

use crate::config::RunConfig;
use crate::error::DriverError;
use crate::generator::{Generator, GeneratorReport, RecordSource};

const GENERATOR: &str = "generator";
const MATCHER: &str = "matcher";

/// Sends the exit acknowledgement when dropped, including during unwind.
struct Ack(Sender<()>);

impl Drop for Ack {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

struct Worker<T> {
    name: &'static str,
    thread: JoinHandle<T>,
    done: Receiver<()>,
}

impl<T: Send + 'static> Worker<T> {
    fn spawn<F>(name: &'static str, body: F) -> Result<Self, DriverError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (done_tx, done) = bounded(1);
        let thread = thread::Builder::new()
            .name(format!("twin-{name}"))
            .spawn(move || {
                let _ack = Ack(done_tx);
                body()
            })
            .map_err(|source| DriverError::Spawn { worker: name, source })?;

        Ok(Self { name, thread, done })
    }

    /// Wait up to `grace` for the acknowledgement, then join.
    fn stop(self, grace: Duration) -> Result<T, DriverError> {
        match self.done.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(worker = self.name, ?grace, "worker did not acknowledge shutdown");
                return Err(DriverError::ShutdownTimeout { worker: self.name, grace });
            }
        }
        self.thread
            .join()
            .map_err(|_| DriverError::WorkerPanicked { worker: self.name })
    }
}

/// Final reports from both workers.
#[derive(Debug)]
pub struct ShutdownReport {
    pub generator: GeneratorReport,
    pub matcher: WorkerReport,
}

pub struct Supervisor {
    generator: Option<Worker<GeneratorReport>>,
    matcher: Option<Worker<WorkerReport>>,
    stop_generator: Option<Sender<()>>,
    close_queue: CloseHandle<Record>,
    // Dropped only after the queue is closed.
    hold_open: Option<Producer<Record>>,
    grace: Duration,
}

impl Supervisor {
    /// Spawn the matcher, then the generator feeding it.
    pub fn start<S>(config: &RunConfig, source: S) -> Result<Self, DriverError>
    where
        S: RecordSource + 'static,
    {
        let (producer, consumer) = twin_queue::channel::<Record>();
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let mut supervisor = Self {
            generator: None,
            matcher: None,
            stop_generator: Some(stop_tx),
            close_queue: consumer.close_handle(),
            hold_open: Some(producer.clone()),
            grace: config.grace(),
        };

        let engine = MatchEngine::new(config.engine());
        let core = config.matcher_core;
        supervisor.matcher = Some(Worker::spawn(MATCHER, move || {
            if let Some(core) = core {
                pin_to_core(core);
            }
            let mut worker = MatcherWorker::new(engine, MonotonicClock::new(), TracingSink);
            worker.run(&consumer)
        })?);

        let period = config.period();
        // On error the partly built supervisor is dropped, which closes the
        // queue and stops the matcher.
        supervisor.generator = Some(Worker::spawn(GENERATOR, move || {
            Generator::new(source, producer, period).run(&stop_rx)
        })?);

        tracing::info!(
            delay_ms = config.delay_ms,
            period_ms = config.period_ms,
            grace_ms = config.grace_ms,
            "workers started"
        );
        Ok(supervisor)
    }

    fn signal(&mut self) {
        let pending = self.close_queue.pending();
        self.close_queue.close();
        if pending > 0 {
            tracing::debug!(pending, "records discarded with the queue");
        }
        self.hold_open.take();
        self.stop_generator.take();
    }

    /// Close the queue under the matcher and signal the generator, then
    /// give each the configured grace period. Both are always signalled;
    /// the first failure is returned.
    pub fn shutdown(mut self) -> Result<ShutdownReport, DriverError> {
        let grace = self.grace;
        self.signal();

        let generator = self.generator.take().map(|w| w.stop(grace)).transpose();
        let matcher = self.matcher.take().map(|w| w.stop(grace)).transpose();

        match (generator?, matcher?) {
            (Some(generator), Some(matcher)) => Ok(ShutdownReport { generator, matcher }),
            // `start` either spawns both workers or returns an error.
            _ => unreachable!("supervisor without workers"),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.generator.is_none() && self.matcher.is_none() {
            return;
        }
        tracing::warn!("supervisor dropped without shutdown; stopping workers");
        let grace = self.grace;
        self.signal();
        for result in [
            self.generator.take().map(|w| w.stop(grace).map(drop)),
            self.matcher.take().map(|w| w.stop(grace).map(drop)),
        ]
        .into_iter()
        .flatten()
        {
            if let Err(err) = result {
                tracing::error!(error = %err, "worker failed to stop");
            }
        }
    }
}

fn pin_to_core(core: usize) {
    let pinned = core_affinity::get_core_ids()
        .and_then(|ids| ids.into_iter().find(|id| id.id == core))
        .map(core_affinity::set_for_current)
        .unwrap_or(false);

    if pinned {
        tracing::info!(core, "matcher pinned");
    } else {
        tracing::warn!(core, "could not pin matcher; running unpinned");
    }
}
