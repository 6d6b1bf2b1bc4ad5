//! Matcher loop: pop, purge, score, report.
//!
//! The worker owns the engine and is the only code that ever touches the
//! buffer. It waits in exactly one place, [`Consumer::pop`], which returns
//! early when the queue is closed, so shutdown never has to race a
//! blocked wait.

use std::time::Duration;

use twin_metrics::{LatencyHistogram, Stopwatch};
use twin_queue::{Consumer, PopError};

use crate::engine::{EngineStats, MatchEngine};
use crate::record::Record;
use crate::sink::{dispatch, EventSink};
use crate::time::Clock;

/// Why the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown requested through the queue's close handle.
    Closed,
    /// Every producer went away and the queue ran dry.
    Disconnected,
}

/// Final state handed back when the loop ends.
#[derive(Clone, Debug)]
pub struct WorkerReport {
    pub reason: StopReason,
    pub stats: EngineStats,
    /// Buffered entries dropped at shutdown.
    pub discarded: usize,
    /// Time spent per record in purge + scoring.
    pub latency: LatencyHistogram,
}

/// Single-threaded driver of a [`MatchEngine`].
pub struct MatcherWorker<C, S> {
    engine: MatchEngine,
    clock: C,
    sink: S,
    timer: quanta::Clock,
    latency: LatencyHistogram,
}

impl<C: Clock, S: EventSink> MatcherWorker<C, S> {
    pub fn new(engine: MatchEngine, clock: C, sink: S) -> Self {
        Self {
            engine,
            clock,
            sink,
            timer: quanta::Clock::new(),
            latency: LatencyHistogram::new(),
        }
    }

    /// Run until the queue is closed or disconnected.
    ///
    /// On exit the buffer is discarded, not flushed.
    pub fn run(&mut self, input: &Consumer<Record>) -> WorkerReport {
        tracing::info!(
            target: "twin::matcher",
            delay_ms = self.engine.config().delay.as_millis() as u64,
            malformed = %self.engine.config().malformed,
            "matcher started"
        );

        let reason = loop {
            match input.pop() {
                Ok(record) => self.handle(record),
                Err(PopError::Closed) => break StopReason::Closed,
                Err(PopError::Disconnected) => break StopReason::Disconnected,
                // Only the bounded wait can time out.
                Err(PopError::Timeout) => continue,
            }
        };

        self.stop(reason)
    }

    /// Like [`run`](Self::run), but wakes every `poll` to let `keep_going`
    /// end the loop. For callers that cannot close the queue.
    pub fn run_until(
        &mut self,
        input: &Consumer<Record>,
        poll: Duration,
        mut keep_going: impl FnMut() -> bool,
    ) -> WorkerReport {
        let reason = loop {
            if !keep_going() {
                break StopReason::Closed;
            }
            match input.pop_timeout(poll) {
                Ok(record) => self.handle(record),
                Err(PopError::Timeout) => continue,
                Err(PopError::Closed) => break StopReason::Closed,
                Err(PopError::Disconnected) => break StopReason::Disconnected,
            }
        };

        self.stop(reason)
    }

    /// Process one record: capture `now`, purge, then match or buffer.
    pub fn handle(&mut self, record: Record) {
        let watch = Stopwatch::start_on(&self.timer);
        let now = self.clock.now();
        let processed = self.engine.process(record, now);
        self.latency.record(watch.elapsed_nanos());

        dispatch(&mut self.sink, &processed, now);
    }

    fn stop(&mut self, reason: StopReason) -> WorkerReport {
        let discarded = self.engine.discard_buffer();
        let stats = self.engine.stats();
        tracing::info!(
            target: "twin::matcher",
            ?reason,
            discarded,
            processed = stats.processed,
            matched = stats.matched(),
            "matcher stopped"
        );

        WorkerReport {
            reason,
            stats,
            discarded,
            latency: self.latency.clone(),
        }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
